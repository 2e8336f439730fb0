//! Error types for the palmreader-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! A missing key is never an error: lookups return `Option`.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem operation failed (creating the data directory, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store is already at a newer schema version than requested.
    #[error("store is at schema v{active}, cannot open at v{requested}")]
    VersionConflict { requested: u32, active: u32 },

    /// A schema migration failed and was rolled back.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The collection was never declared by a migration.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// An `add` targeted a key that is already present.
    #[error("key already exists in {collection}: {key}")]
    KeyExists { collection: String, key: String },

    /// An invalid argument was provided to a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl StoreError {
    /// Whether this is an engine-level I/O failure rather than a caller or
    /// schema error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Io(_) | Self::TaskJoin(_))
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

// ── tests ────────────────────────────────────────────────────────────
