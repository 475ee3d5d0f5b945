use std::sync::Arc;

use crate::dispatch::{EventCtx, HandlerResult, Invocation, Outcome};
use crate::reply::ReplySink;

pub async fn ping(
    _inv: Invocation,
    _ctx: Arc<EventCtx>,
    sink: Arc<dyn ReplySink>,
) -> HandlerResult {
    sink.send("Pong").await?;
    Ok(Outcome::Handled)
}
