//! MCR Common Library
//!
//! Shared code for the managed care reporting service including:
//! - Report model, report operations and their authorization
//! - Form templates, schemas and field validation
//! - Entity formatting and editing
//! - Autosave planning
//! - Dashboard role gating and the UI route table
//! - Report storage (Postgres and in-memory)
//! - Error types, configuration, authentication and metrics

pub mod auth;
pub mod autosave;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod entities;
pub mod errors;
pub mod forms;
pub mod metrics;
pub mod reports;
pub mod routes;

// Re-export commonly used types
pub use auth::{JwtManager, UserContext, UserRole};
pub use config::AppConfig;
pub use db::{MemoryStore, ReportStore, Repository};
pub use errors::{AppError, Result};
pub use forms::FormRegistry;
pub use reports::{Report, ReportKey, ReportService, ReportType};
pub use routes::RouteTable;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
