//! Database schema and migrations for FeedFlow.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    email                     TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password                  TEXT NOT NULL,           -- Argon2 hash
    name                      TEXT,
    role                      TEXT NOT NULL DEFAULT 'user',  -- 'user', 'admin', 'super_admin'
    summary_language          TEXT NOT NULL DEFAULT 'zh',
    item_retention_days       INTEGER NOT NULL DEFAULT 30,   -- -1 disables cleanup
    item_retention_only_read  INTEGER NOT NULL DEFAULT 0,
    last_item_cleanup         TEXT,
    created_at                TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_users_role ON users(role);
"#,
    // v2: feeds and items
    r#"
CREATE TABLE feeds (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id              INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    url                  TEXT NOT NULL,
    title                TEXT NOT NULL,
    description          TEXT,
    site_url             TEXT,
    tags                 TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    title_filter         TEXT,
    default_read_status  INTEGER NOT NULL DEFAULT 0,
    last_fetched_at      TEXT,
    last_error           TEXT,
    created_at           TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at           TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, url)
);

CREATE INDEX idx_feeds_user ON feeds(user_id);

-- (feed_id, link) is the deduplication key
CREATE TABLE items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id      INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    link         TEXT NOT NULL,
    description  TEXT,
    pub_date     TEXT NOT NULL,
    read         INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(feed_id, link)
);

CREATE INDEX idx_items_feed_pub ON items(feed_id, pub_date DESC);
CREATE INDEX idx_items_pub ON items(pub_date DESC);
CREATE INDEX idx_items_read ON items(read);
"#,
    // v3: daily summaries
    r#"
CREATE TABLE daily_summaries (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    summary_date  TEXT NOT NULL,              -- YYYY-MM-DD (UTC)
    content       TEXT NOT NULL,
    language      TEXT NOT NULL DEFAULT 'zh',
    item_count    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, summary_date)
);
"#,
    // v4: system configuration
    r#"
CREATE TABLE system_config (
    key          TEXT PRIMARY KEY,
    value        TEXT NOT NULL,
    description  TEXT,
    updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];
