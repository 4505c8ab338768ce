//! DeepScout Common Library
//!
//! Shared code for the DeepScout services including:
//! - Database models and repository patterns
//! - Report generator and notifier abstractions
//! - Signed one-click link tokens
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod generator;
pub mod metrics;
pub mod notifier;
pub mod token;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use generator::Generator;
pub use notifier::Notifier;
pub use token::LinkSigner;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default report model
pub const DEFAULT_REPORT_MODEL: &str = "gpt-4";
