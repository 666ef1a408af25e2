//! Redis executor implementation.
//!
//! Correlated transport: arguments and results live in keyed slots in the
//! store, a per-target counter produces correlation ids, and list pushes with
//! blocking pops carry the work and response signals. Supports both
//! fire-and-forget and call-and-wait dispatch.
//!
//! Key layout per target key `K` and correlation id `N`:
//! - `callId.K`: atomic counter producing correlation ids
//! - `K`: work list; callers push ids, workers block-pop them
//! - `callArgs.K.N`: serialized argument tuple, written once, read once
//! - `callResult.K.N`: serialized result, written once, read once
//! - `K.N`: response list; the worker pushes the result slot name to wake
//!   the waiting caller

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{ExecutionMode, Executor, Handler, Registration};
use crate::envelope::{CallEnvelope, DispatchMode};
use crate::error::{DispatchError, Result};
use crate::target::TargetKey;

/// Configuration for [`RedisExecutor`].
#[derive(Debug, Clone)]
pub struct RedisExecutorConfig {
    /// Redis connection URL (e.g. redis://localhost:6379).
    pub url: String,
    /// Worker-mode selection for this instance.
    pub mode: ExecutionMode,
    /// Identifier for this process in logs.
    pub instance_id: String,
    /// Optional expiry for argument/result slots. `None` leaves consumed
    /// slots in the store indefinitely.
    pub slot_ttl: Option<Duration>,
}

impl RedisExecutorConfig {
    /// Config for an instance that registers targets and runs worker loops.
    pub fn worker(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: ExecutionMode::Default,
            instance_id: Uuid::new_v4().to_string(),
            slot_ttl: None,
        }
    }

    /// Config for a pure caller that never polls for work.
    pub fn caller(url: impl Into<String>) -> Self {
        Self {
            mode: ExecutionMode::CallOnly,
            ..Self::worker(url)
        }
    }

    /// Set the log identifier for this instance.
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = id.into();
        self
    }

    /// Expire argument/result slots after the given duration.
    pub fn with_slot_ttl(mut self, ttl: Duration) -> Self {
        self.slot_ttl = Some(ttl);
        self
    }
}

/// Redis executor supporting separation of function call and application.
///
/// One connection is dedicated to correlation-id generation; each registered
/// target gets its own connection for calls and, in worker mode, another for
/// its worker loop. Blocking pops would otherwise stall unrelated commands
/// multiplexed on the same connection.
pub struct RedisExecutor {
    config: RedisExecutorConfig,
    counter_conn: ConnectionManager,
    connections: RwLock<HashMap<TargetKey, ConnectionManager>>,
}

impl RedisExecutor {
    /// Connect the shared correlation-id connection.
    pub async fn connect(config: RedisExecutorConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let counter_conn = ConnectionManager::new(client).await?;

        info!(instance = %config.instance_id, url = %config.url, "Connected to Redis");

        Ok(Self {
            config,
            counter_conn,
            connections: RwLock::new(HashMap::new()),
        })
    }

    /// Build the correlation-id counter key for a target.
    fn counter_key(target: &TargetKey) -> String {
        format!("callId.{}", target)
    }

    /// Build the argument slot key for a call.
    fn args_key(target: &TargetKey, call_id: u64) -> String {
        format!("callArgs.{}.{}", target, call_id)
    }

    /// Build the result slot key for a call.
    fn result_key(target: &TargetKey, call_id: u64) -> String {
        format!("callResult.{}.{}", target, call_id)
    }

    /// Build the response list key waking the waiting caller.
    fn response_key(target: &TargetKey, call_id: u64) -> String {
        format!("{}.{}", target, call_id)
    }

    /// Obtain a fresh correlation id for a target.
    async fn next_call_id(&self, target: &TargetKey) -> Result<u64> {
        let mut conn = self.counter_conn.clone();
        let call_id: u64 = conn.incr(Self::counter_key(target), 1).await?;
        Ok(call_id)
    }

    async fn store_slot(
        conn: &mut ConnectionManager,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    /// Block-pop correlation ids for one target until the process exits,
    /// applying the handler and announcing results.
    async fn worker_loop(
        instance_id: String,
        target: TargetKey,
        handler: Arc<dyn Handler>,
        mut conn: ConnectionManager,
        slot_ttl: Option<Duration>,
    ) {
        info!(instance = %instance_id, target = %target, "Starting work");

        loop {
            let popped: Option<(String, u64)> = match conn.brpop(target.as_str(), 0.0).await {
                Ok(popped) => popped,
                Err(e) => {
                    error!(instance = %instance_id, target = %target, error = %e, "Work queue pop failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };
            let Some((_, call_id)) = popped else {
                continue;
            };
            debug!(instance = %instance_id, target = %target, call_id, "Received work");

            let args_key = Self::args_key(&target, call_id);
            let payload: Option<Vec<u8>> = match conn.get(&args_key).await {
                Ok(payload) => payload,
                Err(e) => {
                    error!(instance = %instance_id, target = %target, call_id, error = %e, "Failed to read argument slot");
                    continue;
                }
            };
            let Some(payload) = payload else {
                // A work signal without arguments means the store lost data;
                // nothing from this queue can be trusted anymore.
                error!(instance = %instance_id, target = %target, call_id, "Argument slot missing; stopping worker");
                return;
            };

            let result = match handler.apply(&payload).await {
                Ok(result) => result,
                Err(e) => {
                    // Failures are isolated per call; no result is written,
                    // so a call-and-wait caller keeps waiting.
                    error!(instance = %instance_id, target = %target, call_id, error = %e, "Handler failed");
                    continue;
                }
            };

            let result_key = Self::result_key(&target, call_id);
            if let Err(e) = Self::store_slot(&mut conn, &result_key, &result, slot_ttl).await {
                error!(instance = %instance_id, target = %target, call_id, error = %e, "Failed to write result slot");
                continue;
            }
            let response_key = Self::response_key(&target, call_id);
            let pushed: std::result::Result<(), redis::RedisError> =
                conn.lpush(&response_key, &result_key).await;
            if let Err(e) = pushed {
                error!(instance = %instance_id, target = %target, call_id, error = %e, "Failed to announce result");
                continue;
            }

            debug!(instance = %instance_id, target = %target, call_id, "Finished work");
        }
    }
}

#[async_trait]
impl Executor for RedisExecutor {
    fn registration(&self) -> Registration {
        Registration::Required
    }

    async fn register(
        &self,
        target: &TargetKey,
        handler: Arc<dyn Handler>,
        _mode: DispatchMode,
    ) -> Result<()> {
        let client = Client::open(self.config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        self.connections.write().await.insert(target.clone(), conn);

        info!(instance = %self.config.instance_id, target = %target, "Registered target");

        if self.config.mode != ExecutionMode::CallOnly {
            let worker_client = Client::open(self.config.url.as_str())?;
            let worker_conn = ConnectionManager::new(worker_client).await?;
            tokio::spawn(Self::worker_loop(
                self.config.instance_id.clone(),
                target.clone(),
                handler,
                worker_conn,
                self.config.slot_ttl,
            ));
        }

        Ok(())
    }

    async fn call(
        &self,
        _handler: Arc<dyn Handler>,
        envelope: CallEnvelope,
    ) -> Result<Option<Vec<u8>>> {
        let target = &envelope.target;
        debug!(instance = %self.config.instance_id, target = %target, "Received call");

        let mut conn = self
            .connections
            .read()
            .await
            .get(target)
            .cloned()
            .ok_or_else(|| DispatchError::UnregisteredTarget {
                target: target.clone(),
            })?;

        let call_id = self.next_call_id(target).await?;

        // Save arguments, then signal the worker.
        let args_key = Self::args_key(target, call_id);
        Self::store_slot(&mut conn, &args_key, &envelope.payload, self.config.slot_ttl).await?;
        let _: () = conn.lpush(target.as_str(), call_id).await?;

        if envelope.mode == DispatchMode::FireAndForget {
            debug!(instance = %self.config.instance_id, target = %target, call_id, "Returning without result");
            return Ok(None);
        }

        // Wait for the worker to announce the result slot. No timeout: an
        // abandoned call stays pending until the caller gives up.
        let response_key = Self::response_key(target, call_id);
        let response: Option<(String, String)> = conn.brpop(&response_key, 0.0).await?;
        let Some((_, result_key)) = response else {
            return Err(DispatchError::MissingWorkerResponse {
                call: format!("{}.{}", target, call_id),
            });
        };

        let result: Option<Vec<u8>> = conn.get(&result_key).await?;
        let Some(result) = result else {
            return Err(DispatchError::MissingWorkerResponse {
                call: format!("{}.{}", target, call_id),
            });
        };

        debug!(instance = %self.config.instance_id, target = %target, call_id, "Returning call result");
        Ok(Some(result))
    }
}
