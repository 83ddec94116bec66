//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while computing or querying key ownership.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A read was attempted before any ownership table was installed.
    #[error("no topology has been installed yet")]
    UninitializedTopology,
    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A table was requested for an empty membership list.
    #[error("cannot build an ownership table without any members")]
    EmptyMembership,
    /// Every member has a capacity factor of zero.
    #[error("no member has a non-zero capacity factor")]
    NoCapacity,
    /// Table contents violate an ownership invariant.
    #[error("invalid ownership table: {0}")]
    InvalidOwnership(String),
    /// Two tables (or a table and a router) disagree on the segment count.
    #[error("segment count mismatch: expected {expected}, got {actual}")]
    SegmentCountMismatch { expected: u32, actual: u32 },
    /// Configuration or table (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
