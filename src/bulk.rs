//! Capped-batch message deletion. Batches never exceed the host's ceiling,
//! every outbound request is followed by the same cooldown whether it
//! succeeded or not, and a rejected batch is demoted to one-at-a-time
//! deletion rather than re-raised.

use std::time::Duration;

use serenity::model::id::{ChannelId, MessageId};
use tracing::{info, warn};

use crate::errors::HostError;
use crate::host::{ArchivedMessage, HostClient};

/// The host rejects batched deletes above this many ids per request.
pub const BATCH_CEILING: usize = 99;
/// Unconditional pause after every outbound delete request.
pub const DELETE_COOLDOWN: Duration = Duration::from_millis(1500);
/// History page size used when walking a channel.
pub const HISTORY_PAGE: u8 = 100;

/// Counters reported to the caller once a run finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkStats {
    /// Messages queued for deletion.
    pub queued: usize,
    /// Batched delete requests attempted.
    pub batch_attempts: usize,
    /// Batches that fell back to single deletes.
    pub fallbacks: usize,
    /// Single deletes that failed even on the slow path.
    pub failed_singles: usize,
}

pub struct BulkDeleter<'a> {
    host: &'a dyn HostClient,
    channel: ChannelId,
    cooldown: Duration,
    pending: Vec<MessageId>,
    stats: BulkStats,
}

impl<'a> BulkDeleter<'a> {
    pub fn new(host: &'a dyn HostClient, channel: ChannelId) -> Self {
        Self::with_cooldown(host, channel, DELETE_COOLDOWN)
    }

    pub fn with_cooldown(host: &'a dyn HostClient, channel: ChannelId, cooldown: Duration) -> Self {
        Self {
            host,
            channel,
            cooldown,
            pending: Vec::with_capacity(BATCH_CEILING),
            stats: BulkStats::default(),
        }
    }

    /// Queue one message; flushes automatically at the batch ceiling.
    pub async fn push(&mut self, message: MessageId) {
        self.pending.push(message);
        self.stats.queued += 1;
        if self.pending.len() == BATCH_CEILING {
            self.flush().await;
        }
    }

    /// Flush whatever is still pending and return the run's counters.
    /// Flushing an empty batch is a no-op.
    pub async fn finish(mut self) -> BulkStats {
        self.flush().await;
        self.stats
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        self.stats.batch_attempts += 1;
        let result = self.host.delete_batch(self.channel, &batch).await;
        // The rate limit does not care whether the request succeeded.
        tokio::time::sleep(self.cooldown).await;
        if let Err(e) = result {
            warn!(target: "bulk", channel = self.channel.get(), batch = batch.len(), error = %e, "batched delete failed, demoting to single deletes");
            self.delete_one_at_a_time(&batch).await;
        }
    }

    async fn delete_one_at_a_time(&mut self, batch: &[MessageId]) {
        self.stats.fallbacks += 1;
        info!(target: "bulk", channel = self.channel.get(), count = batch.len(), "deleting messages one at a time, this will take a while");
        for &message in batch {
            if let Err(e) = self.host.delete_message(self.channel, message).await {
                warn!(target: "bulk", channel = self.channel.get(), message = message.get(), error = %e, "single delete failed");
                self.stats.failed_singles += 1;
            }
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

/// Delete a channel's entire history.
pub async fn clear_channel(host: &dyn HostClient, channel: ChannelId) -> Result<BulkStats, HostError> {
    clear_channel_filtered(host, channel, DELETE_COOLDOWN, |_| true).await
}

/// Walk a channel's history and delete every message `matches` selects.
pub async fn clear_channel_filtered<F>(
    host: &dyn HostClient,
    channel: ChannelId,
    cooldown: Duration,
    matches: F,
) -> Result<BulkStats, HostError>
where
    F: Fn(&ArchivedMessage) -> bool,
{
    let mut deleter = BulkDeleter::with_cooldown(host, channel, cooldown);
    let mut cursor: Option<MessageId> = None;
    loop {
        let page = host.messages_before(channel, cursor, HISTORY_PAGE).await?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = Some(last.id);
        for message in &page {
            if matches(message) {
                deleter.push(message.id).await;
            }
        }
    }
    Ok(deleter.finish().await)
}
