//! Common types and utilities shared across the applier crates.
//!
//! This crate holds the run-level error type and the observability
//! initialiser. It stays dependency-light so every other crate in the
//! workspace can depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`ApplierError`] and [`Result`]: Unrecoverable run-level failures
//!
//! # Examples
//!
//! ```rust
//! use applier_common::ApplierError;
//!
//! let err = ApplierError::Authentication("no post-login indicator".into());
//! assert_eq!(err.to_string(), "Authentication failed: no post-login indicator");
//! ```

pub mod observability;

/// Errors that abort a whole run.
///
/// Per-candidate failures never surface as an `ApplierError`; they are
/// recorded on the attempt and the run moves on.
#[derive(thiserror::Error, Debug)]
pub enum ApplierError {
    /// Login did not reach an authenticated state.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The search results view never materialised.
    #[error("Search view unavailable: {0}")]
    SearchUnavailable(String),

    /// The automation boundary reported a fault outside any attempt.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`ApplierError`].
pub type Result<T> = std::result::Result<T, ApplierError>;
