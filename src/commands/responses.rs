//! Passive textual reactions to non-command chatter.

use std::sync::Arc;

use crate::dispatch::{EventCtx, HandlerResult, Outcome, TriggerMatch};
use crate::reply::ReplySink;

pub async fn good_bot(
    _matched: TriggerMatch,
    _ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    sink.send("Thank you!").await?;
    Ok(Outcome::Handled)
}

pub async fn bad_bot(
    _matched: TriggerMatch,
    _ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    sink.send("I'm doing my best.").await?;
    Ok(Outcome::Handled)
}
