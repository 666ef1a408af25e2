//! Executor contract and backends.
//!
//! This module contains:
//! - `Executor` trait: pluggable transport/execution backend for dispatched calls
//! - `Handler` trait: type-erased original method body applied by worker loops
//! - Implementations: Local (in-process), SQS (queue-native), Redis (correlated), Mock

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::envelope::{CallEnvelope, DispatchMode};
use crate::error::Result;
use crate::target::TargetKey;

// Implementation modules
pub mod local;
pub mod mock;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(feature = "sqs")]
pub mod sqs;

// Re-exports
pub use local::LocalExecutor;
pub use mock::MockExecutor;
#[cfg(feature = "redis")]
pub use redis::{RedisExecutor, RedisExecutorConfig};
#[cfg(feature = "sqs")]
pub use sqs::{AckPolicy, SqsExecutor, SqsExecutorConfig, SqsTargetConfig};

/// Whether an executor needs per-target registration before calls.
///
/// Selected at construction rather than probed at runtime: an executor that
/// answers [`Registration::Required`] must see `register` exactly once per
/// (target, owning instance) before the first `call` for that pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// `register` sets up transport clients and, in worker mode, worker loops.
    Required,
    /// No setup needed; `register` keeps its default no-op.
    NotRequired,
}

/// Worker-mode selection for an executor instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Register transport bindings and run a worker loop per target.
    #[default]
    Default,
    /// Register transport bindings but never poll for work. For pure callers.
    CallOnly,
}

/// Type-erased original method body, bound to its owner instance.
///
/// Implementations deserialize the argument tuple, run the wrapped method
/// against the captured owner, and serialize the return value.
pub trait Handler: Send + Sync {
    /// Apply the original method to a serialized argument tuple.
    fn apply(&self, payload: &[u8]) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// Pluggable transport/execution backend for dispatched calls.
///
/// Implementations:
/// - `LocalExecutor`: direct in-process invocation, the reference semantics
/// - `SqsExecutor`: queue-native transport, fire-and-forget only
/// - `RedisExecutor`: correlated request/response over a shared store
/// - `MockExecutor`: recording double for tests
#[async_trait]
pub trait Executor: Send + Sync {
    /// Registration capability marker, fixed at construction.
    fn registration(&self) -> Registration {
        Registration::NotRequired
    }

    /// Set up transport for a target and, in worker mode, start its worker
    /// loop. Setup failures (unsupported mode, missing configuration) are
    /// fatal and surface here, before any call is attempted.
    async fn register(
        &self,
        target: &TargetKey,
        handler: Arc<dyn Handler>,
        mode: DispatchMode,
    ) -> Result<()> {
        let _ = (target, handler, mode);
        Ok(())
    }

    /// Transport one intercepted call.
    ///
    /// Fire-and-forget calls resolve to `None` as soon as the envelope is
    /// handed to the transport. Call-and-wait calls resolve to the serialized
    /// result produced by the worker. The handler is the same one passed to
    /// `register`; executors without registration apply it directly.
    async fn call(
        &self,
        handler: Arc<dyn Handler>,
        envelope: CallEnvelope,
    ) -> Result<Option<Vec<u8>>>;
}
