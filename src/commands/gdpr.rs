//! GDPR commands. Both spin up the worker session so the long history scan
//! runs on its own gateway connection, then shut it down again.

use std::sync::Arc;

use serenity::model::id::UserId;
use tracing::error;

use super::Deps;
use crate::bulk::DELETE_COOLDOWN;
use crate::compliance;
use crate::dispatch::{EventCtx, HandlerResult, Invocation, Outcome};
use crate::reply::ReplySink;
use crate::worker::WorkerSession;

/// `gdpr <userid>`: export everything the user wrote or was mentioned in.
pub async fn gdpr_export(
    deps: Arc<Deps>,
    inv: Invocation,
    ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let Some(target) = parse_target(&inv) else {
        sink.send("Usage: gdpr <userid>").await?;
        return Ok(Outcome::Handled);
    };

    sink.send("Booting up worker...").await?;
    let worker = match WorkerSession::connect(&deps.worker_token).await {
        Ok(worker) => worker,
        Err(e) => {
            error!(target: "gdpr", error = %e, "worker session failed to start");
            sink.send("Could not start the compliance worker.").await?;
            return Ok(Outcome::Handled);
        }
    };
    let result = compliance::export_user_data(worker.host.as_ref(), guild, target, sink.as_ref()).await;
    worker.shutdown().await;
    result?;
    Ok(Outcome::Handled)
}

/// `gdprdelete <userid>`: erase every message the user authored.
pub async fn gdpr_erase(
    deps: Arc<Deps>,
    inv: Invocation,
    ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    let Some(guild) = ctx.guild_id() else {
        return Ok(Outcome::NotApplicable);
    };
    let Some(target) = parse_target(&inv) else {
        sink.send("Usage: gdprdelete <userid>").await?;
        return Ok(Outcome::Handled);
    };

    sink.send("Booting up worker...").await?;
    let worker = match WorkerSession::connect(&deps.worker_token).await {
        Ok(worker) => worker,
        Err(e) => {
            error!(target: "gdpr", error = %e, "worker session failed to start");
            sink.send("Could not start the compliance worker.").await?;
            return Ok(Outcome::Handled);
        }
    };
    let result = compliance::erase_user_data(
        worker.host.as_ref(),
        guild,
        target,
        sink.as_ref(),
        DELETE_COOLDOWN,
    )
    .await;
    worker.shutdown().await;
    result?;
    Ok(Outcome::Handled)
}

fn parse_target(inv: &Invocation) -> Option<UserId> {
    let raw = inv.args.first()?.parse::<u64>().ok()?;
    (raw != 0).then(|| UserId::new(raw))
}
