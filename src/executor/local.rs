//! In-process executor.
//!
//! Calls the wrapped method directly, without any transport. This is the
//! reference for the result semantics every other executor must preserve,
//! and the default test double for wiring code.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Executor, Handler};
use crate::envelope::CallEnvelope;
use crate::error::Result;

/// Executor that applies the wrapped method in the calling process.
///
/// No registration needed; results and errors propagate synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn call(
        &self,
        handler: Arc<dyn Handler>,
        envelope: CallEnvelope,
    ) -> Result<Option<Vec<u8>>> {
        debug!(target = %envelope.target, "Calling locally");
        let result = handler.apply(&envelope.payload).await?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchAwaitMethod, DispatchMethod};
    use crate::error::DispatchError;
    use futures::FutureExt;

    struct Adder {
        offset: i64,
    }

    #[tokio::test]
    async fn test_call_runs_against_owner_instance() {
        let owner = Arc::new(Adder { offset: 40 });
        let method = DispatchAwaitMethod::new("Adder.add", {
            let owner = owner.clone();
            move |(label, n): (String, i64)| {
                let owner = owner.clone();
                async move {
                    assert_eq!(label, "a");
                    Ok(owner.offset + n)
                }
                .boxed()
            }
        });
        method.bind(Arc::new(LocalExecutor::new())).await.unwrap();

        let result = method.invoke(("a".to_string(), 2)).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_handler_error_propagates_to_caller() {
        let method: DispatchAwaitMethod<(), ()> = DispatchAwaitMethod::new("Adder.fail", |()| {
            async { Err(DispatchError::Handler("boom".to_string())) }.boxed()
        });
        method.bind(Arc::new(LocalExecutor::new())).await.unwrap();

        let err = method.invoke(()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }

    #[tokio::test]
    async fn test_fire_and_forget_discards_local_result() {
        let method = DispatchMethod::new("Adder.noop", |(_n,): (i64,)| async { Ok(()) }.boxed());
        method.bind(Arc::new(LocalExecutor::new())).await.unwrap();
        method.invoke((1,)).await.unwrap();
    }
}
