//! Role management: rebuilding the reactable roles channel and the tag
//! handlers that fire when members react to its messages.

use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, MessageId, RoleId};
use tracing::{error, warn};

use super::Deps;
use crate::bulk;
use crate::config::RoleListEntry;
use crate::dispatch::{EventCtx, HandlerResult, Invocation, Outcome, ReactionEventKind};
use crate::host::HostClient;
use crate::reply::ReplySink;
use crate::store::ReactableStore;

/// Emoji seeded on every reactable role message.
pub const ROLE_REACT_EMOJI: &str = "🔼";
/// Pause between posts while rebuilding the roles channel.
const ROLE_POST_PAUSE: Duration = Duration::from_secs(1);
/// Stored handler name for role-toggle records.
const TOGGLE_ROLE_FN: &str = "toggle_role";

/// Wipe the configured roles channel and repost the role list, marking each
/// role line as a toggle_role reactable.
pub async fn regenroles(
    deps: Arc<Deps>,
    _inv: Invocation,
    ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let Some(guild_cfg) = deps.config.guild(guild) else {
        sink.send("This server is not configured.").await?;
        return Ok(Outcome::Handled);
    };
    let Some(roles_channel) = guild_cfg.roles_channel.map(ChannelId::new) else {
        sink.send("No roles channel is configured for this server.").await?;
        return Ok(Outcome::Handled);
    };

    bulk::clear_channel(ctx.host.as_ref(), roles_channel).await?;

    for entry in &guild_cfg.role_list {
        match entry {
            RoleListEntry::Header { header } => {
                ctx.host.send_message(roles_channel, header).await?;
            }
            RoleListEntry::Role { role, text } => {
                let role_id = RoleId::new(*role);
                if ctx.host.role_name(guild, role_id).await?.is_none() {
                    sink.send(&format!("Role {role} no longer exists, skipping."))
                        .await
                        .ok();
                    continue;
                }
                let message = ctx.host.send_message(roles_channel, text).await?;
                mark_role_reactable(
                    deps.store.as_ref(),
                    ctx.host.as_ref(),
                    roles_channel,
                    message,
                    role_id,
                )
                .await?;
            }
        }
        tokio::time::sleep(ROLE_POST_PAUSE).await;
    }
    Ok(Outcome::Handled)
}

/// Mark an existing message as a role reactable:
/// `addrolereactable <messageid> <roleid>`, invoked in the channel that
/// contains the message.
pub async fn addrolereactable(
    deps: Arc<Deps>,
    inv: Invocation,
    ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let (Some(message_arg), Some(role_arg)) = (inv.args.first(), inv.args.get(1)) else {
        sink.send("Please specify a messageid and roleid").await?;
        return Ok(Outcome::Handled);
    };
    let (Ok(message_id), Ok(role_id)) = (message_arg.parse::<u64>(), role_arg.parse::<u64>())
    else {
        sink.send("Message and role ids must be numeric").await?;
        return Ok(Outcome::Handled);
    };

    let role = RoleId::new(role_id);
    let Some(role_name) = ctx.host.role_name(guild, role).await? else {
        sink.send("No role with that id was found").await?;
        return Ok(Outcome::Handled);
    };
    let message = MessageId::new(message_id);
    if let Err(e) = ctx.host.fetch_message(ctx.channel.id, message).await {
        warn!(target: "roles", message = message_id, error = %e, "reactable target lookup failed");
        sink.send("No message with that id was found").await?;
        return Ok(Outcome::Handled);
    }

    let persisted = mark_role_reactable(
        deps.store.as_ref(),
        ctx.host.as_ref(),
        ctx.channel.id,
        message,
        role,
    )
    .await?;

    // Tidy up the invoking message.
    ctx.host.delete_message(ctx.channel.id, ctx.message_id).await.ok();

    let note = if persisted {
        format!("Added role react for {role_name}")
    } else {
        format!("Added role react for {role_name} (warning: not persisted, it will be lost on restart)")
    };
    sink.send_temporary(&note, Duration::from_secs(5)).await?;
    Ok(Outcome::Handled)
}

/// Seed the reaction emoji, then persist the record. The emoji is not rolled
/// back if persistence fails; the returned flag tells the caller which of the
/// two effects stuck.
pub async fn mark_role_reactable(
    store: &dyn ReactableStore,
    host: &dyn HostClient,
    channel: ChannelId,
    message: MessageId,
    role: RoleId,
) -> Result<bool, crate::errors::HandlerError> {
    host.add_reaction(channel, message, ROLE_REACT_EMOJI).await?;
    match store
        .upsert(message, TOGGLE_ROLE_FN, &role.get().to_string())
        .await
    {
        Ok(()) => Ok(true),
        Err(e) => {
            error!(target: "roles", message = message.get(), error = %e, "unable to persist reactable record");
            Ok(false)
        }
    }
}

/// Tag handler: grant the stored role on ADD, revoke it on REMOVE. Re-adding
/// a held role or removing an absent one is a no-op, so repeated toggling is
/// always safe.
pub async fn toggle_role(arg: String, kind: ReactionEventKind, ctx: Arc<EventCtx>) -> HandlerResult {
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let Ok(role_id) = arg.parse::<u64>() else {
        warn!(target: "roles", arg = %arg, "stored reactable argument is not a role id");
        return Ok(Outcome::NotApplicable);
    };
    let role = RoleId::new(role_id);
    let user = ctx.user.id;
    let held = ctx.host.member_roles(guild, user).await?;
    let has_role = held.contains(&role);
    match kind {
        ReactionEventKind::Add if !has_role => {
            ctx.host.add_member_role(guild, user, role).await?;
        }
        ReactionEventKind::Remove if has_role => {
            ctx.host.remove_member_role(guild, user, role).await?;
        }
        _ => {}
    }
    Ok(Outcome::Handled)
}

/// Tag handler: grant the conduct roles when a member reacts to the code of
/// conduct. Fires on ADD only; existing members and repeat acceptances are
/// no-ops.
pub async fn accept_coc(
    deps: Arc<Deps>,
    _arg: String,
    kind: ReactionEventKind,
    ctx: Arc<EventCtx>,
) -> HandlerResult {
    if kind != ReactionEventKind::Add {
        return Ok(Outcome::NotApplicable);
    }
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let Some(guild_cfg) = deps.config.guild(guild) else {
        return Ok(Outcome::NotApplicable);
    };
    let conduct: Vec<RoleId> = guild_cfg.conduct_roles.iter().copied().map(RoleId::new).collect();
    let Some(first_conduct) = conduct.first().copied() else {
        return Ok(Outcome::NotApplicable);
    };

    let held = ctx.host.member_roles(guild, ctx.user.id).await?;
    let member_role = guild_cfg.member_role.map(RoleId::new);
    if member_role.is_some_and(|r| held.contains(&r)) || held.contains(&first_conduct) {
        return Ok(Outcome::Handled);
    }
    for role in conduct {
        ctx.host.add_member_role(guild, ctx.user.id, role).await?;
    }
    Ok(Outcome::Handled)
}
