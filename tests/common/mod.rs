//! Shared mocks for exercising the core without a live gateway.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use tokio::sync::Mutex;

use custodian_bot::dispatch::{ChannelRef, EventCtx, GuildRef, UserRef};
use custodian_bot::errors::HostError;
use custodian_bot::host::{ArchivedMessage, ChannelInfo, HostClient};
use custodian_bot::reply::ReplySink;

/// Scripted host: static channels/history, configurable failures, and
/// recorded side effects.
#[derive(Default)]
pub struct MockHost {
    pub channels: Vec<ChannelInfo>,
    /// Per-channel history, newest first.
    pub history: HashMap<ChannelId, Vec<ArchivedMessage>>,
    pub roles: HashMap<RoleId, String>,
    pub member_roles: Mutex<Vec<RoleId>>,
    pub fail_batches: bool,
    pub fail_singles: Vec<MessageId>,
    /// Channels whose history reads fail.
    pub fail_channels: Vec<ChannelId>,
    /// Ids that do not resolve to a user.
    pub unknown_users: Vec<UserId>,
    /// Number of leading sends that fail transiently.
    pub send_failures: Mutex<usize>,
    /// When set, every send fails with a permission error.
    pub forbid_sends: bool,
    pub send_attempts: Mutex<usize>,

    pub batch_calls: Mutex<Vec<Vec<MessageId>>>,
    pub single_calls: Mutex<Vec<MessageId>>,
    pub sent: Mutex<Vec<(ChannelId, String)>>,
    pub edits: Mutex<Vec<(MessageId, String)>>,
    pub files: Mutex<Vec<(String, Vec<u8>)>>,
    pub reactions: Mutex<Vec<(MessageId, String)>>,
    pub role_adds: Mutex<Vec<(UserId, RoleId)>>,
    pub role_removes: Mutex<Vec<(UserId, RoleId)>>,
    next_id: AtomicU64,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self) -> MessageId {
        MessageId::new(9000 + self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl HostClient for MockHost {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId, HostError> {
        *self.send_attempts.lock().await += 1;
        if self.forbid_sends {
            return Err(HostError::Forbidden("cannot post here".into()));
        }
        let mut failures = self.send_failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(HostError::Api("send dropped".into()));
        }
        drop(failures);
        self.sent.lock().await.push((channel, text.to_string()));
        Ok(self.fresh_id())
    }

    async fn send_file(
        &self,
        _channel: ChannelId,
        _text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError> {
        self.files.lock().await.push((filename.to_string(), data));
        Ok(self.fresh_id())
    }

    async fn edit_message(
        &self,
        _channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), HostError> {
        self.edits.lock().await.push((message, text.to_string()));
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> Result<(), HostError> {
        self.single_calls.lock().await.push(message);
        if self.fail_singles.contains(&message) {
            return Err(HostError::Api("single delete rejected".into()));
        }
        Ok(())
    }

    async fn delete_batch(
        &self,
        _channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), HostError> {
        self.batch_calls.lock().await.push(messages.to_vec());
        if self.fail_batches {
            return Err(HostError::Api("batch rejected".into()));
        }
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), HostError> {
        self.reactions.lock().await.push((message, emoji.to_string()));
        Ok(())
    }

    async fn fetch_message(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> Result<ArchivedMessage, HostError> {
        self.history
            .values()
            .flatten()
            .find(|m| m.id == message)
            .cloned()
            .ok_or_else(|| HostError::NotFound("unknown message".into()))
    }

    async fn text_channels(&self, _guild: GuildId) -> Result<Vec<ChannelInfo>, HostError> {
        Ok(self.channels.clone())
    }

    async fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ArchivedMessage>, HostError> {
        if self.fail_channels.contains(&channel) {
            return Err(HostError::Api("history unavailable".into()));
        }
        let Some(messages) = self.history.get(&channel) else {
            return Ok(Vec::new());
        };
        let start = match before {
            None => 0,
            Some(id) => match messages.iter().position(|m| m.id == id) {
                Some(index) => index + 1,
                None => return Ok(Vec::new()),
            },
        };
        Ok(messages
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn member_roles(&self, _guild: GuildId, _user: UserId) -> Result<Vec<RoleId>, HostError> {
        Ok(self.member_roles.lock().await.clone())
    }

    async fn add_member_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError> {
        self.role_adds.lock().await.push((user, role));
        self.member_roles.lock().await.push(role);
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError> {
        self.role_removes.lock().await.push((user, role));
        self.member_roles.lock().await.retain(|r| *r != role);
        Ok(())
    }

    async fn role_name(&self, _guild: GuildId, role: RoleId) -> Result<Option<String>, HostError> {
        Ok(self.roles.get(&role).cloned())
    }

    async fn guild_name(&self, _guild: GuildId) -> Result<String, HostError> {
        Ok("Test Guild".to_string())
    }

    async fn user_exists(&self, user: UserId) -> Result<bool, HostError> {
        Ok(!self.unknown_users.contains(&user))
    }

    async fn is_bot_user(&self, _user: UserId) -> Result<bool, HostError> {
        Ok(false)
    }
}

/// Sink that records replies instead of sending them.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
    pub edits: Mutex<Vec<(MessageId, String)>>,
    pub files: Mutex<Vec<(String, Vec<u8>)>>,
    next_id: AtomicU64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, text: &str) -> Result<MessageId, HostError> {
        self.sent.lock().await.push(text.to_string());
        Ok(MessageId::new(5000 + self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn edit(&self, message: MessageId, text: &str) -> Result<(), HostError> {
        self.edits.lock().await.push((message, text.to_string()));
        Ok(())
    }

    async fn send_file(
        &self,
        _text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError> {
        self.files.lock().await.push((filename.to_string(), data));
        Ok(MessageId::new(4999))
    }

    async fn send_temporary(&self, text: &str, _ttl: Duration) -> Result<(), HostError> {
        self.sent.lock().await.push(text.to_string());
        Ok(())
    }
}

pub fn archived(
    id: u64,
    channel: u64,
    author: u64,
    mentions: &[u64],
    content: &str,
) -> ArchivedMessage {
    ArchivedMessage {
        id: MessageId::new(id),
        channel_id: ChannelId::new(channel),
        author_id: UserId::new(author),
        author_bot: false,
        content: content.to_string(),
        mentions: mentions.iter().copied().map(UserId::new).collect(),
        attachment_urls: Vec::new(),
    }
}

pub fn test_ctx(
    host: Arc<dyn HostClient>,
    guild: Option<u64>,
    user: u64,
    message: u64,
) -> Arc<EventCtx> {
    Arc::new(EventCtx {
        service: "discord",
        user: UserRef {
            id: UserId::new(user),
            name: "tester".to_string(),
        },
        guild: guild.map(|id| GuildRef {
            id: GuildId::new(id),
            name: "Test Guild".to_string(),
        }),
        channel: ChannelRef {
            id: ChannelId::new(1),
            name: "general".to_string(),
        },
        message_id: MessageId::new(message),
        host,
    })
}
