//! Authentication module for FeedFlow.
//!
//! Password hashing, registration, and credential checks. Token issuing
//! lives in the web layer.

pub mod password;
pub mod registration;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{authenticate, register, register_with_role, RegistrationRequest};
