//! Reply sinks: how a handler talks back to the channel that triggered it.

use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use tracing::{error, warn};

use crate::errors::HostError;
use crate::host::HostClient;

/// Send attempts per reply; the host occasionally drops requests.
const MAX_SEND_RETRIES: u32 = 3;

#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str) -> Result<MessageId, HostError>;
    /// Replace the text of a message previously returned by `send`.
    async fn edit(&self, message: MessageId, text: &str) -> Result<(), HostError>;
    async fn send_file(
        &self,
        text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError>;
    /// Send a reply that is deleted again after `ttl`.
    async fn send_temporary(&self, text: &str, ttl: Duration) -> Result<(), HostError>;
}

/// Sink bound to the channel a command arrived in. Owned exclusively by the
/// handler it was built for, for the duration of one invocation.
pub struct ChannelSink {
    host: Arc<dyn HostClient>,
    channel: ChannelId,
}

impl ChannelSink {
    pub fn new(host: Arc<dyn HostClient>, channel: ChannelId) -> Self {
        Self { host, channel }
    }
}

#[async_trait]
impl ReplySink for ChannelSink {
    async fn send(&self, text: &str) -> Result<MessageId, HostError> {
        let mut last = None;
        for attempt in 1..=MAX_SEND_RETRIES {
            match self.host.send_message(self.channel, text).await {
                Ok(id) => return Ok(id),
                Err(e @ HostError::Forbidden(_)) => {
                    error!(target: "reply", channel = self.channel.get(), error = %e, "cannot send reply, permission forbidden");
                    return Err(e);
                }
                Err(e) => {
                    warn!(target: "reply", channel = self.channel.get(), attempt, error = %e, "failed to send reply");
                    last = Some(e);
                }
            }
        }
        Err(last.unwrap_or_else(|| HostError::Api("send retries exhausted".into())))
    }

    async fn edit(&self, message: MessageId, text: &str) -> Result<(), HostError> {
        self.host.edit_message(self.channel, message, text).await
    }

    async fn send_file(
        &self,
        text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError> {
        self.host.send_file(self.channel, text, filename, data).await
    }

    async fn send_temporary(&self, text: &str, ttl: Duration) -> Result<(), HostError> {
        let id = self.send(text).await?;
        let host = Arc::clone(&self.host);
        let channel = self.channel;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = host.delete_message(channel, id).await {
                warn!(target: "reply", channel = channel.get(), error = %e, "failed to delete temporary reply");
            }
        });
        Ok(())
    }
}
