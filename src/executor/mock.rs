//! Mock executor implementation for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Executor, Handler, Registration};
use crate::envelope::{CallEnvelope, DispatchMode};
use crate::error::{DispatchError, Result};
use crate::target::TargetKey;

/// Recorded `register` invocation.
#[derive(Debug, Clone)]
pub struct RegisteredTarget {
    pub target: TargetKey,
    pub mode: DispatchMode,
}

/// Recorded `call` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: TargetKey,
    pub payload: Vec<u8>,
    pub mode: DispatchMode,
}

/// Recording executor for tests.
///
/// Captures every `register` and `call`, returns a scripted result payload,
/// and can be told to fail calls.
#[derive(Default)]
pub struct MockExecutor {
    require_registration: bool,
    registered: RwLock<Vec<RegisteredTarget>>,
    calls: RwLock<Vec<RecordedCall>>,
    result: RwLock<Option<Vec<u8>>>,
    fail_on_call: RwLock<bool>,
}

impl MockExecutor {
    /// Mock without a registration requirement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that requires registration before calls.
    pub fn with_registration() -> Self {
        Self {
            require_registration: true,
            ..Self::default()
        }
    }

    /// Script the payload returned by subsequent calls.
    pub async fn set_result(&self, result: Option<Vec<u8>>) {
        *self.result.write().await = result;
    }

    pub async fn set_fail_on_call(&self, fail: bool) {
        *self.fail_on_call.write().await = fail;
    }

    pub async fn registered(&self) -> Vec<RegisteredTarget> {
        self.registered.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn take_calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.write().await)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn registration(&self) -> Registration {
        if self.require_registration {
            Registration::Required
        } else {
            Registration::NotRequired
        }
    }

    async fn register(
        &self,
        target: &TargetKey,
        _handler: Arc<dyn Handler>,
        mode: DispatchMode,
    ) -> Result<()> {
        self.registered.write().await.push(RegisteredTarget {
            target: target.clone(),
            mode,
        });
        Ok(())
    }

    async fn call(
        &self,
        _handler: Arc<dyn Handler>,
        envelope: CallEnvelope,
    ) -> Result<Option<Vec<u8>>> {
        if *self.fail_on_call.read().await {
            return Err(DispatchError::Transport("Mock call failure".to_string()));
        }
        self.calls.write().await.push(RecordedCall {
            target: envelope.target.clone(),
            payload: envelope.payload.clone(),
            mode: envelope.mode,
        });
        Ok(self.result.read().await.clone())
    }
}
