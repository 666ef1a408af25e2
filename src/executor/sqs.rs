//! AWS SQS executor implementation.
//!
//! Queue-native transport: each target key gets its own destination queue and
//! its own client handle. There is no response channel, so only
//! fire-and-forget targets can register; call-and-wait targets are rejected
//! at registration time.
//!
//! Message bodies are base64-encoded argument payloads. Workers long-poll
//! with a bounded wait, handle each received batch concurrently, and wait for
//! the whole batch before the next receive, bounding in-flight work to one
//! batch per target.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client as SqsClient;
use base64::prelude::*;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ExecutionMode, Executor, Handler, Registration};
use crate::envelope::{CallEnvelope, DispatchMode};
use crate::error::{DispatchError, Result};
use crate::target::TargetKey;

/// What the worker does with a message whose handler failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckPolicy {
    /// Delete the message regardless of handler outcome. Failed work is
    /// logged and dropped (at-most-once).
    #[default]
    Always,
    /// Leave failed messages in the queue; they reappear once their
    /// visibility timeout expires.
    RedeliverOnFailure,
}

/// Per-target connection and destination configuration.
#[derive(Debug, Clone, Default)]
pub struct SqsTargetConfig {
    /// AWS region. Uses the default provider chain when not set.
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack or testing).
    pub endpoint_url: Option<String>,
    /// Destination queue URL.
    pub queue_url: String,
}

impl SqsTargetConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            region: None,
            endpoint_url: None,
            queue_url: queue_url.into(),
        }
    }

    /// Set AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set custom endpoint URL (for LocalStack or testing).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }
}

/// Configuration for [`SqsExecutor`].
#[derive(Debug, Clone)]
pub struct SqsExecutorConfig {
    /// Worker-mode selection for this instance.
    pub mode: ExecutionMode,
    /// Identifier for this process in logs.
    pub instance_id: String,
    /// Transport configuration per target key. Every registered target must
    /// have an entry here.
    pub targets: HashMap<TargetKey, SqsTargetConfig>,
    /// Wait time seconds for long polling (default: 1).
    pub wait_time_secs: i32,
    /// Max number of messages to receive in one poll (default: 10).
    pub max_messages: i32,
    /// Visibility timeout in seconds for received messages (default: 30).
    pub visibility_timeout_secs: i32,
    /// Acknowledgment behavior for failed handlers.
    pub ack_policy: AckPolicy,
}

impl SqsExecutorConfig {
    /// Config for an instance that registers targets and runs worker loops.
    pub fn worker() -> Self {
        Self {
            mode: ExecutionMode::Default,
            instance_id: Uuid::new_v4().to_string(),
            targets: HashMap::new(),
            wait_time_secs: 1,
            max_messages: 10,
            visibility_timeout_secs: 30,
            ack_policy: AckPolicy::default(),
        }
    }

    /// Config for a pure caller that never polls for work.
    pub fn caller() -> Self {
        Self {
            mode: ExecutionMode::CallOnly,
            ..Self::worker()
        }
    }

    /// Set the log identifier for this instance.
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = id.into();
        self
    }

    /// Add transport configuration for a target key.
    pub fn with_target(mut self, target: impl Into<TargetKey>, config: SqsTargetConfig) -> Self {
        self.targets.insert(target.into(), config);
        self
    }

    /// Set visibility timeout in seconds.
    pub fn with_visibility_timeout(mut self, secs: i32) -> Self {
        self.visibility_timeout_secs = secs;
        self
    }

    /// Set acknowledgment behavior for failed handlers.
    pub fn with_ack_policy(mut self, policy: AckPolicy) -> Self {
        self.ack_policy = policy;
        self
    }
}

/// SQS executor. Fire-and-forget dispatch only.
pub struct SqsExecutor {
    config: SqsExecutorConfig,
    clients: RwLock<HashMap<TargetKey, SqsClient>>,
}

impl SqsExecutor {
    pub fn new(config: SqsExecutorConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    async fn build_client(target_config: &SqsTargetConfig) -> SqsClient {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = target_config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = target_config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        SqsClient::new(&loader.load().await)
    }

    /// Poll one queue until the process exits, applying the handler to every
    /// received message.
    async fn worker_loop(
        config: SqsExecutorConfig,
        target: TargetKey,
        handler: Arc<dyn Handler>,
        client: SqsClient,
        queue_url: String,
    ) {
        let instance_id = config.instance_id;
        let ack_policy = config.ack_policy;
        info!(instance = %instance_id, target = %target, queue_url = %queue_url, "Starting worker");

        loop {
            match client
                .receive_message()
                .queue_url(&queue_url)
                .wait_time_seconds(config.wait_time_secs)
                .max_number_of_messages(config.max_messages)
                .visibility_timeout(config.visibility_timeout_secs)
                .send()
                .await
            {
                Ok(output) => {
                    let messages = output.messages();
                    if messages.is_empty() {
                        continue;
                    }

                    let work = messages.iter().map(|message| {
                        let instance_id = &instance_id;
                        let target = &target;
                        let handler = handler.clone();
                        let client = client.clone();
                        let queue_url = &queue_url;
                        async move {
                            let Some(body) = message.body() else {
                                return;
                            };
                            debug!(instance = %instance_id, target = %target, "Received work");

                            let succeeded = match BASE64_STANDARD.decode(body) {
                                Ok(payload) => match handler.apply(&payload).await {
                                    Ok(_) => true,
                                    Err(e) => {
                                        error!(
                                            instance = %instance_id,
                                            target = %target,
                                            error = %e,
                                            "Handler failed"
                                        );
                                        false
                                    }
                                },
                                Err(e) => {
                                    // Retrying an undecodable body cannot help.
                                    error!(error = %e, "Failed to decode message body");
                                    true
                                }
                            };

                            if succeeded || ack_policy == AckPolicy::Always {
                                if let Some(receipt) = message.receipt_handle() {
                                    if let Err(e) = client
                                        .delete_message()
                                        .queue_url(queue_url)
                                        .receipt_handle(receipt)
                                        .send()
                                        .await
                                    {
                                        warn!(error = %e, "Failed to delete message");
                                    }
                                }
                                debug!(instance = %instance_id, target = %target, "Finished work");
                            } else {
                                debug!(
                                    instance = %instance_id,
                                    target = %target,
                                    "Message left for redelivery after visibility timeout"
                                );
                            }
                        }
                    });

                    join_all(work).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive messages from SQS");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

#[async_trait]
impl Executor for SqsExecutor {
    fn registration(&self) -> Registration {
        Registration::Required
    }

    async fn register(
        &self,
        target: &TargetKey,
        handler: Arc<dyn Handler>,
        mode: DispatchMode,
    ) -> Result<()> {
        // Mode is checked before any transport client is created.
        if mode != DispatchMode::FireAndForget {
            return Err(DispatchError::UnsupportedDispatchMode {
                target: target.clone(),
                mode,
            });
        }

        let target_config = self
            .config
            .targets
            .get(target)
            .ok_or_else(|| DispatchError::MissingTransportConfiguration {
                target: target.clone(),
            })?
            .clone();

        let client = Self::build_client(&target_config).await;
        self.clients.write().await.insert(target.clone(), client.clone());

        info!(
            instance = %self.config.instance_id,
            target = %target,
            queue_url = %target_config.queue_url,
            "Registered target"
        );

        if self.config.mode != ExecutionMode::CallOnly {
            tokio::spawn(Self::worker_loop(
                self.config.clone(),
                target.clone(),
                handler,
                client,
                target_config.queue_url,
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

        let client = self
            .clients
            .read()
            .await
            .get(target)
            .cloned()
            .ok_or_else(|| DispatchError::UnregisteredTarget {
                target: target.clone(),
            })?;
        let queue_url = self
            .config
            .targets
            .get(target)
            .map(|c| c.queue_url.clone())
            .ok_or_else(|| DispatchError::MissingTransportConfiguration {
                target: target.clone(),
            })?;

        let body = BASE64_STANDARD.encode(&envelope.payload);
        client
            .send_message()
            .queue_url(&queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(format!("Failed to send message: {}", e)))?;

        debug!(instance = %self.config.instance_id, target = %target, "Dispatched call");
        Ok(None)
    }
}
