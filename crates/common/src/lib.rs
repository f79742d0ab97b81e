//! ContactDesk Common Library
//!
//! Shared code for the ContactDesk gateway and tooling including:
//! - Database models and the store abstraction
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability
//! - Reference data seeding

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod seed;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, Store};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
