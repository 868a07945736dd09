// src/error.rs

//! Error types for relic
//!
//! Rule and platform-profile sources are allowed to be missing (callers fall
//! back to empty defaults), so only genuinely unrecoverable conditions live
//! here: a broken requirement index, unreadable files that do exist, and
//! malformed rule/profile content.

use thiserror::Error;

/// Errors produced by the relic library
#[derive(Debug, Error)]
pub enum Error {
    /// Requirement index (SQLite) failure. Always fatal: no resolution can
    /// proceed without the index.
    #[error("Requirement index error: {0}")]
    Index(#[from] rusqlite::Error),

    /// I/O failure reading a rule file, platform profile, or artifact tree
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A rule file exists but does not parse
    #[error("Failed to parse rule file {path}: {source}")]
    RuleParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// The platform profile exists but does not parse
    #[error("Failed to parse platform profile {path}: {source}")]
    ProfileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A drop or exclusion entry is not a valid glob pattern
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The requested target package has no BuildRequires in the index
    #[error("Package '{0}' is not present in the requirement index")]
    UnknownTarget(String),
}

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
