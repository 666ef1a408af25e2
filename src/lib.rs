//! Rewire - transparent remote dispatch for method calls.
//!
//! Wraps ordinary async method calls so they can execute in-process, across a
//! message queue, or through a KV-store-backed request/response channel,
//! without the calling code knowing which. Callers declare methods as
//! fire-and-forget or call-and-wait; pluggable executors carry the calls and
//! run worker loops that apply the original method bodies.

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod target;

pub use dispatch::{DispatchAwaitMethod, DispatchMethod, Method, MethodFuture};
pub use envelope::{CallEnvelope, DispatchMode};
pub use error::{DispatchError, Result};
pub use executor::{ExecutionMode, Executor, Handler, LocalExecutor, Registration};
pub use target::TargetKey;
