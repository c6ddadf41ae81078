use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};

use feedflow::{retention, Config, Database, Initializer, WebServer};

fn load_config(path: &str) -> feedflow::Result<Config> {
    if Path::new(path).exists() {
        return Config::load_with_env(path);
    }
    eprintln!("{path} not found, using default configuration.");
    let mut config = Config::default();
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = feedflow::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feedflow::logging::init_console_only(&config.logging.level);
    }

    info!("FeedFlow - RSS reader service");

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = Initializer::new().run(&db, &config).await {
        error!("Initialization failed: {e}");
        return ExitCode::FAILURE;
    }

    let _sweeper = retention::start_retention_sweeper(db.clone(), config.feed.cleanup_interval_secs);

    let server = match WebServer::new(&config, db) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
