//! Session error types.
//!
//! Storage failures pass through unchanged as [`SessionError::Store`];
//! inference failures as [`SessionError::Gateway`].

use palmreader_store::StoreError;

use crate::gateway::GatewayError;

/// Unified error type for the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The inference gateway could not produce a result.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A chat message had no content after trimming.
    #[error("message is empty")]
    EmptyMessage,
}

/// Convenience alias used throughout the session crate.
pub type Result<T> = std::result::Result<T, SessionError>;
