//! The single seam to the chat service. Everything the core does remotely
//! goes through [`HostClient`], which is what lets the dispatch, bulk, and
//! compliance engines run against mocks in tests.

use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateAttachment, CreateMessage, EditMessage, GetMessages};
use serenity::http::Http;
use serenity::model::channel::{ChannelType, Message, ReactionType};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::errors::HostError;

/// A text channel as seen by history scans.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// The slice of a message the core cares about.
#[derive(Debug, Clone)]
pub struct ArchivedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_bot: bool,
    pub content: String,
    pub mentions: Vec<UserId>,
    pub attachment_urls: Vec<String>,
}

impl From<Message> for ArchivedMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            channel_id: m.channel_id,
            author_id: m.author.id,
            author_bot: m.author.bot,
            content: m.content,
            mentions: m.mentions.iter().map(|u| u.id).collect(),
            attachment_urls: m.attachments.iter().map(|a| a.url.clone()).collect(),
        }
    }
}

#[async_trait]
pub trait HostClient: Send + Sync {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId, HostError>;
    async fn send_file(
        &self,
        channel: ChannelId,
        text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError>;
    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), HostError>;
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
        -> Result<(), HostError>;
    /// Atomic batched delete. The host rejects batches over its ceiling.
    async fn delete_batch(
        &self,
        channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), HostError>;
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), HostError>;
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ArchivedMessage, HostError>;
    async fn text_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>, HostError>;
    /// One page of history strictly before `before`, newest first.
    async fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ArchivedMessage>, HostError>;
    async fn member_roles(&self, guild: GuildId, user: UserId) -> Result<Vec<RoleId>, HostError>;
    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError>;
    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError>;
    async fn role_name(&self, guild: GuildId, role: RoleId) -> Result<Option<String>, HostError>;
    async fn guild_name(&self, guild: GuildId) -> Result<String, HostError>;
    async fn user_exists(&self, user: UserId) -> Result<bool, HostError>;
    async fn is_bot_user(&self, user: UserId) -> Result<bool, HostError>;
}

/// REST-backed implementation over serenity's `Http`.
pub struct SerenityHost {
    http: Arc<Http>,
}

impl SerenityHost {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HostClient for SerenityHost {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId, HostError> {
        let message = channel.say(&self.http, text).await?;
        Ok(message.id)
    }

    async fn send_file(
        &self,
        channel: ChannelId,
        text: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<MessageId, HostError> {
        let attachment = CreateAttachment::bytes(data, filename.to_string());
        let message = channel
            .send_files(&self.http, [attachment], CreateMessage::new().content(text))
            .await?;
        Ok(message.id)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), HostError> {
        channel
            .edit_message(&self.http, message, EditMessage::new().content(text))
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), HostError> {
        channel.delete_message(&self.http, message).await?;
        Ok(())
    }

    async fn delete_batch(
        &self,
        channel: ChannelId,
        messages: &[MessageId],
    ) -> Result<(), HostError> {
        channel
            .delete_messages(&self.http, messages.iter().copied())
            .await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), HostError> {
        self.http
            .create_reaction(channel, message, &ReactionType::Unicode(emoji.to_string()))
            .await?;
        Ok(())
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ArchivedMessage, HostError> {
        let message = channel.message(&self.http, message).await?;
        Ok(message.into())
    }

    async fn text_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>, HostError> {
        let channels = guild.channels(&self.http).await?;
        let mut out: Vec<ChannelInfo> = channels
            .into_values()
            .filter(|c| c.kind == ChannelType::Text)
            .map(|c| ChannelInfo {
                id: c.id,
                name: c.name,
            })
            .collect();
        // Channel maps come back unordered; keep scans deterministic.
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    async fn messages_before(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ArchivedMessage>, HostError> {
        let mut request = GetMessages::new().limit(limit);
        if let Some(before) = before {
            request = request.before(before);
        }
        let messages = channel.messages(&self.http, request).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn member_roles(&self, guild: GuildId, user: UserId) -> Result<Vec<RoleId>, HostError> {
        let member = guild.member(&self.http, user).await?;
        Ok(member.roles)
    }

    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError> {
        self.http.add_member_role(guild, user, role, None).await?;
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), HostError> {
        self.http.remove_member_role(guild, user, role, None).await?;
        Ok(())
    }

    async fn role_name(&self, guild: GuildId, role: RoleId) -> Result<Option<String>, HostError> {
        let roles = guild.roles(&self.http).await?;
        Ok(roles.get(&role).map(|r| r.name.clone()))
    }

    async fn guild_name(&self, guild: GuildId) -> Result<String, HostError> {
        let info = self.http.get_guild(guild).await?;
        Ok(info.name)
    }

    async fn user_exists(&self, user: UserId) -> Result<bool, HostError> {
        match self.http.get_user(user).await {
            Ok(_) => Ok(true),
            Err(e) => match HostError::from(e) {
                HostError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn is_bot_user(&self, user: UserId) -> Result<bool, HostError> {
        Ok(self.http.get_user(user).await?.bot)
    }
}
