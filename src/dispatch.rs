//! Dispatch interception.
//!
//! A declared method is wrapped in an explicit forwarding callable instead of
//! running its body directly: [`DispatchMethod`] for fire-and-forget targets,
//! [`DispatchAwaitMethod`] for call-and-wait targets. On invocation the
//! wrapper builds a [`CallEnvelope`] and forwards it to the executor attached
//! to the owning object; the original body is kept reachable through
//! [`DispatchMethod::original`] for introspection and direct testing.
//!
//! Attaching the executor is an explicit construction step: the owning type's
//! builder creates its wrapped methods, then calls `bind` on each, which
//! registers the target with executors that require setup. `bind` runs at
//! most once per wrapper.

use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::{self, CallEnvelope, DispatchMode};
use crate::error::{DispatchError, Result};
use crate::executor::{Executor, Handler, Registration};
use crate::target::TargetKey;

/// Future returned by wrapped method bodies.
pub type MethodFuture<R> = BoxFuture<'static, Result<R>>;

/// An original method body, bound to its owner instance.
pub type Method<A, R> = Arc<dyn Fn(A) -> MethodFuture<R> + Send + Sync>;

/// Type-erasing adapter that lets worker loops apply the original method to
/// serialized argument tuples.
struct MethodHandler<A, R> {
    original: Method<A, R>,
}

impl<A, R> Handler for MethodHandler<A, R>
where
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    fn apply(&self, payload: &[u8]) -> BoxFuture<'static, Result<Vec<u8>>> {
        let original = self.original.clone();
        let payload = payload.to_vec();
        Box::pin(async move {
            let args: A = envelope::decode(&payload)?;
            let result = original(args).await?;
            envelope::encode(&result)
        })
    }
}

/// Shared plumbing for both wrapper kinds.
struct Wired<A, R> {
    target: TargetKey,
    mode: DispatchMode,
    original: Method<A, R>,
    handler: Arc<dyn Handler>,
    executor: OnceLock<Arc<dyn Executor>>,
}

impl<A, R> Wired<A, R>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    fn new(target: TargetKey, mode: DispatchMode, original: Method<A, R>) -> Self {
        let handler = Arc::new(MethodHandler {
            original: original.clone(),
        });
        Self {
            target,
            mode,
            original,
            handler,
            executor: OnceLock::new(),
        }
    }

    async fn bind(&self, executor: Arc<dyn Executor>) -> Result<()> {
        if self.executor.get().is_some() {
            return Err(DispatchError::ExecutorAlreadyAttached {
                target: self.target.clone(),
            });
        }
        if executor.registration() == Registration::Required {
            executor
                .register(&self.target, self.handler.clone(), self.mode)
                .await?;
        }
        self.executor
            .set(executor)
            .map_err(|_| DispatchError::ExecutorAlreadyAttached {
                target: self.target.clone(),
            })
    }

    async fn forward(&self, args: &A) -> Result<Option<Vec<u8>>> {
        let executor = self
            .executor
            .get()
            .cloned()
            .ok_or_else(|| DispatchError::MissingExecutor {
                target: self.target.clone(),
            })?;
        let payload = envelope::encode(args)?;
        executor
            .call(
                self.handler.clone(),
                CallEnvelope::new(self.target.clone(), payload, self.mode),
            )
            .await
    }
}

/// A fire-and-forget dispatchable method.
///
/// Invocations resolve to no value regardless of what the executor's `call`
/// produces; the caller cannot observe success or failure of the remote
/// execution through the call itself. Transport errors still propagate.
pub struct DispatchMethod<A> {
    wired: Wired<A, ()>,
}

impl<A> DispatchMethod<A>
where
    A: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(
        target: impl Into<TargetKey>,
        original: impl Fn(A) -> MethodFuture<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            wired: Wired::new(
                target.into(),
                DispatchMode::FireAndForget,
                Arc::new(original),
            ),
        }
    }

    /// Attach an executor, registering the target when the executor requires
    /// setup. Runs at most once per wrapper.
    pub async fn bind(&self, executor: Arc<dyn Executor>) -> Result<()> {
        self.wired.bind(executor).await
    }

    pub fn target(&self) -> &TargetKey {
        &self.wired.target
    }

    /// The original method body, exposed for introspection and direct testing.
    pub fn original(&self) -> Method<A, ()> {
        self.wired.original.clone()
    }

    /// Dispatch a call through the attached executor.
    pub async fn invoke(&self, args: A) -> Result<()> {
        self.wired.forward(&args).await?;
        Ok(())
    }
}

/// A call-and-wait dispatchable method.
///
/// Invocations resolve to exactly what the executor's `call` resolves to,
/// failures included.
pub struct DispatchAwaitMethod<A, R> {
    wired: Wired<A, R>,
}

impl<A, R> DispatchAwaitMethod<A, R>
where
    A: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(
        target: impl Into<TargetKey>,
        original: impl Fn(A) -> MethodFuture<R> + Send + Sync + 'static,
    ) -> Self {
        Self {
            wired: Wired::new(target.into(), DispatchMode::CallAndWait, Arc::new(original)),
        }
    }

    /// Attach an executor, registering the target when the executor requires
    /// setup. Runs at most once per wrapper.
    pub async fn bind(&self, executor: Arc<dyn Executor>) -> Result<()> {
        self.wired.bind(executor).await
    }

    pub fn target(&self) -> &TargetKey {
        &self.wired.target
    }

    /// The original method body, exposed for introspection and direct testing.
    pub fn original(&self) -> Method<A, R> {
        self.wired.original.clone()
    }

    /// Dispatch a call and block until its result arrives.
    pub async fn invoke(&self, args: A) -> Result<R> {
        match self.wired.forward(&args).await? {
            Some(bytes) => envelope::decode(&bytes),
            None => Err(DispatchError::MissingWorkerResponse {
                call: self.wired.target.to_string(),
            }),
        }
    }
}
