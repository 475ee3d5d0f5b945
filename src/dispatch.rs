//! Event dispatch. Two independent flows share the registry: inbound text is
//! routed to a command or a passive reaction, and raw reaction events are
//! routed through the persisted reactable store to a tag-reactable handler.

use std::sync::Arc;

use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use tracing::{debug, warn};

use crate::errors::HandlerError;
use crate::host::HostClient;
use crate::registry::{has_permission, Registry};
use crate::reply::ReplySink;
use crate::store::ReactableStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEventKind {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran to completion.
    Handled,
    /// A handler exists but the current guild is outside its restriction set.
    /// Deliberately silent: restricted commands are not advertised.
    Denied,
    /// Nothing was interested in the event.
    NotApplicable,
}

pub type HandlerResult = Result<Outcome, HandlerError>;

/// A parsed `<prefix><name> <args...>` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// A passive trigger hit: which trigger fired, and the full message text.
#[derive(Debug, Clone)]
pub struct TriggerMatch {
    pub trigger: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GuildRef {
    pub id: GuildId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// Per-event metadata handed to handlers. Constructed fresh per event, never
/// mutated. Handlers read from it; the restriction check has already happened
/// by the time a handler sees it and must not be re-derived or bypassed here.
pub struct EventCtx {
    pub service: &'static str,
    pub user: UserRef,
    pub guild: Option<GuildRef>,
    pub channel: ChannelRef,
    pub message_id: MessageId,
    pub host: Arc<dyn HostClient>,
}

impl EventCtx {
    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild.as_ref().map(|g| g.id)
    }
}

pub struct Dispatcher {
    registry: Registry,
    store: Arc<dyn ReactableStore>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(registry: Registry, store: Arc<dyn ReactableStore>, prefix: String) -> Self {
        Self {
            registry,
            store,
            prefix,
        }
    }

    pub fn parse_command(&self, content: &str) -> Option<Invocation> {
        let body = content.strip_prefix(&self.prefix)?;
        let mut tokens = body.split_whitespace();
        let name = tokens.next()?;
        Some(Invocation {
            name: name.to_string(),
            args: tokens.map(str::to_string).collect(),
        })
    }

    /// Text flow: a command if the text parses and resolves, otherwise the
    /// passive reaction scan. A known-but-denied command is consumed and does
    /// not fall through.
    pub async fn read(
        &self,
        content: &str,
        ctx: Arc<EventCtx>,
        sink: Arc<dyn ReplySink>,
    ) -> HandlerResult {
        if let Some(invocation) = self.parse_command(content) {
            if let Some(entry) = self.registry.resolve_command(&invocation.name) {
                if !has_permission(ctx.guild_id(), &entry.restrictions) {
                    debug!(target: "dispatch", command = %invocation.name, guild = ?ctx.guild_id(), "command not permitted here");
                    return Ok(Outcome::Denied);
                }
                return (entry.handler)(invocation, ctx, sink).await;
            }
            debug!(target: "dispatch", command = %invocation.name, "unknown command");
        }
        self.scan_reactions(content, ctx, sink).await
    }

    async fn scan_reactions(
        &self,
        content: &str,
        ctx: Arc<EventCtx>,
        sink: Arc<dyn ReplySink>,
    ) -> HandlerResult {
        let Some((trigger, entry)) = self.registry.resolve_reaction(content) else {
            return Ok(Outcome::NotApplicable);
        };
        if !has_permission(ctx.guild_id(), &entry.restrictions) {
            return Ok(Outcome::Denied);
        }
        let matched = TriggerMatch {
            trigger,
            text: content.to_string(),
        };
        (entry.handler)(matched, ctx, sink).await
    }

    /// Reaction flow: resolve the persisted record for the reacted-to message
    /// and invoke its tag-reactable handler. The permission check uses the
    /// guild the event arrived from, not the one the record was created in.
    pub async fn tag_reaction(&self, kind: ReactionEventKind, ctx: Arc<EventCtx>) -> HandlerResult {
        let record = match self.store.get(ctx.message_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(Outcome::NotApplicable),
            Err(e) => {
                warn!(target: "dispatch", message = ctx.message_id.get(), error = %e, "reactable lookup failed");
                return Err(e.into());
            }
        };
        let Some(entry) = self.registry.resolve_tag_reactable(&record.function_name) else {
            // Stale rows can outlive their handlers; leave them in place.
            debug!(target: "dispatch", function = %record.function_name, message = ctx.message_id.get(), "no handler for stored reactable");
            return Ok(Outcome::NotApplicable);
        };
        if !has_permission(ctx.guild_id(), &entry.restrictions) {
            return Ok(Outcome::Denied);
        }
        (entry.handler)(record.function_args, kind, ctx).await
    }
}
