//! Error types shared by the dispatch interceptor and executors.

use crate::envelope::DispatchMode;
use crate::target::TargetKey;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors that can occur while dispatching or executing a call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No executor attached for {target}")]
    MissingExecutor { target: TargetKey },

    #[error("Executor already attached for {target}")]
    ExecutorAlreadyAttached { target: TargetKey },

    #[error("Registration for {target} failed: {mode} dispatch is not supported by this executor")]
    UnsupportedDispatchMode { target: TargetKey, mode: DispatchMode },

    #[error("Registration for {target} failed: no transport configuration found")]
    MissingTransportConfiguration { target: TargetKey },

    #[error("No client registered for {target}")]
    UnregisteredTarget { target: TargetKey },

    #[error("Call {call} failed without worker response")]
    MissingWorkerResponse { call: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
