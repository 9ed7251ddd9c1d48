//! Core domain types and shared logic for the Cinegate media gateway.
//!
//! This crate defines the data model used across all other crates:
//! - Configuration types (loaded by the binaries via figment)
//! - Path-mapping rules and media path normalization
//! - The OAuth token pair persisted by the credential vault
//! - Redirect-cache request fingerprinting

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod rules;
pub mod token;

pub use config::{AppConfig, ResolveMethod};
pub use error::{Error, Result};
pub use fingerprint::request_fingerprint;
pub use rules::{PathRule, PathRules};
pub use token::TokenPair;

/// Terminal retry ceiling for enrichment tasks.
pub const TASK_RETRY_LIMIT: i64 = 3;

/// Retention window for completed tasks before the cleanup sweep removes them.
pub const COMPLETED_TASK_RETENTION_DAYS: i64 = 7;

/// Retention window for failed tasks before the cleanup sweep removes them.
pub const FAILED_TASK_RETENTION_DAYS: i64 = 30;
