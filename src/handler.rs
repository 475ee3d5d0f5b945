//! Gateway event handler: filters raw events and feeds the dispatcher.

use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::builder::CreateMessage;
use serenity::model::channel::{Message, Reaction};
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::audit;
use crate::config::BotConfig;
use crate::dispatch::{ChannelRef, Dispatcher, EventCtx, GuildRef, ReactionEventKind, UserRef};
use crate::host::{HostClient, SerenityHost};
use crate::reply::ChannelSink;

pub struct Handler {
    config: Arc<BotConfig>,
    dispatcher: Arc<Dispatcher>,
    bot_user: OnceLock<UserId>,
}

impl Handler {
    pub fn new(config: Arc<BotConfig>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            bot_user: OnceLock::new(),
        }
    }

    fn should_process(&self, channel: ChannelId, author_bot: bool) -> bool {
        if author_bot {
            return false;
        }
        // In debug mode the bot only watches its scratch channels.
        !self.config.debug || self.config.is_debug_channel(channel)
    }

    /// Command authors need one of the guild's approved roles. Everything
    /// else (passive reactions) is open to everyone.
    async fn approved_for_commands(&self, ctx: &Context, msg: &Message) -> bool {
        let Some(guild_id) = msg.guild_id else {
            return false;
        };
        let Some(guild_cfg) = self.config.guild(guild_id) else {
            return false;
        };
        let approved = guild_cfg.approved_role_ids();
        if approved.is_empty() {
            return false;
        }
        let held = self.author_roles(ctx, guild_id, msg).await;
        held.iter().any(|role| approved.contains(role))
    }

    async fn author_roles(&self, ctx: &Context, guild: GuildId, msg: &Message) -> Vec<RoleId> {
        if let Some(member) = &msg.member {
            return member.roles.clone();
        }
        match guild.member(&ctx.http, msg.author.id).await {
            Ok(member) => member.roles,
            Err(e) => {
                warn!(target: "handler", user = msg.author.id.get(), error = %e, "could not resolve member roles");
                Vec::new()
            }
        }
    }

    async fn message_ctx(&self, ctx: &Context, msg: &Message) -> EventCtx {
        let host: Arc<dyn HostClient> = Arc::new(SerenityHost::new(ctx.http.clone()));
        let guild = msg.guild_id.map(|id| GuildRef {
            id,
            name: ctx
                .cache
                .guild(id)
                .map(|g| g.name.clone())
                .unwrap_or_default(),
        });
        let channel_name = msg
            .channel_id
            .name(&ctx)
            .await
            .unwrap_or_else(|_| msg.channel_id.to_string());
        EventCtx {
            service: "discord",
            user: UserRef {
                id: msg.author.id,
                name: msg.author.name.clone(),
            },
            guild,
            channel: ChannelRef {
                id: msg.channel_id,
                name: channel_name,
            },
            message_id: msg.id,
            host,
        }
    }

    async fn handle_reaction(&self, ctx: Context, reaction: Reaction, kind: ReactionEventKind) {
        let Some(user_id) = reaction.user_id else {
            return;
        };
        if Some(user_id) == self.bot_user.get().copied() {
            return;
        }
        if self.config.debug && !self.config.is_debug_channel(reaction.channel_id) {
            return;
        }
        let host: Arc<dyn HostClient> = Arc::new(SerenityHost::new(ctx.http.clone()));
        // Other bots are unworthy of our attention.
        match host.is_bot_user(user_id).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                warn!(target: "handler", user = user_id.get(), error = %e, "could not resolve reacting user");
                return;
            }
        }

        let guild = reaction.guild_id.map(|id| GuildRef {
            id,
            name: ctx
                .cache
                .guild(id)
                .map(|g| g.name.clone())
                .unwrap_or_default(),
        });
        let channel_name = reaction
            .channel_id
            .name(&ctx)
            .await
            .unwrap_or_else(|_| reaction.channel_id.to_string());
        let user_name = ctx
            .cache
            .user(user_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        let event_ctx = Arc::new(EventCtx {
            service: "discord",
            user: UserRef {
                id: user_id,
                name: user_name,
            },
            guild,
            channel: ChannelRef {
                id: reaction.channel_id,
                name: channel_name,
            },
            message_id: reaction.message_id,
            host,
        });
        if let Err(e) = self.dispatcher.tag_reaction(kind, event_ctx).await {
            error!(target: "handler", message = reaction.message_id.get(), error = %e, "error processing tag reaction");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.bot_user.set(ready.user.id);
        info!(target: "handler", user = %ready.user.name, id = ready.user.id.get(), "connected and ready");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if Some(msg.author.id) == self.bot_user.get().copied() {
            return;
        }
        if !self.should_process(msg.channel_id, msg.author.bot) {
            return;
        }
        // Unapproved authors cannot run commands; their non-command chatter
        // still goes through the passive reaction scan.
        if self.dispatcher.parse_command(&msg.content).is_some()
            && !self.approved_for_commands(&ctx, &msg).await
        {
            return;
        }

        let event_ctx = Arc::new(self.message_ctx(&ctx, &msg).await);
        let sink = Arc::new(ChannelSink::new(event_ctx.host.clone(), msg.channel_id));
        if let Err(e) = self.dispatcher.read(&msg.content, event_ctx, sink).await {
            error!(target: "handler", message = msg.id.get(), error = %e, "error reading message");
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(guild_id) = guild_id else {
            return;
        };
        let Some(log_channel) = self.config.log_channel(guild_id) else {
            return;
        };
        // Only the cache still knows the deleted content.
        let Some(message) = ctx
            .cache
            .message(channel_id, deleted_message_id)
            .map(|m| m.clone())
        else {
            debug!(target: "audit", message = deleted_message_id.get(), "deleted message not cached, skipping audit embed");
            return;
        };
        if !self.should_process(channel_id, message.author.bot) {
            return;
        }
        let embed = audit::delete_log_embed(&message);
        if let Err(e) = log_channel
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            error!(target: "audit", error = %e, "could not log deleted message");
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        _event: MessageUpdateEvent,
    ) {
        let (Some(before), Some(after)) = (old_if_available, new) else {
            return;
        };
        if !self.should_process(before.channel_id, before.author.bot) {
            return;
        }
        if !audit::is_visible_edit(&before.content, &after.content) {
            return;
        }
        let Some(guild_id) = before.guild_id else {
            return;
        };
        let Some(log_channel) = self.config.log_channel(guild_id) else {
            return;
        };
        let embed = audit::edit_log_embed(&before, &after);
        if let Err(e) = log_channel
            .send_message(&ctx.http, CreateMessage::new().embed(embed))
            .await
        {
            error!(target: "audit", error = %e, "could not log edited message");
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.handle_reaction(ctx, reaction, ReactionEventKind::Add).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        self.handle_reaction(ctx, reaction, ReactionEventKind::Remove).await;
    }
}
