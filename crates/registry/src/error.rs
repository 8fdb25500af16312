//! Error types for adapter refreshes and configuration.

use std::path::PathBuf;

use adapter_api::ApiError;
use adapter_types::PayloadError;
use thiserror::Error;

/// Why a refresh left the adapter collection untouched.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The request never produced a usable response (network, timeout, non-2xx).
    #[error("adapter request failed: {0}")]
    Transport(#[from] ApiError),

    /// A response arrived but did not hold a list of adapters.
    #[error("adapter response was malformed: {0}")]
    Payload(#[from] PayloadError),

    /// Background refresh was requested outside a tokio runtime.
    #[error("no async runtime available to run the adapter refresh")]
    NoRuntime,
}

impl RefreshError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
