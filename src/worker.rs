//! The auxiliary gateway session compliance scans run under. Long history
//! walks happen on a second single-threaded event loop with its own identity,
//! so the primary loop stays responsive. Lifecycle is explicit: connect,
//! wait for ready, run the operation, shut down.

use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::gateway::ShardManager;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::prelude::*;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::host::SerenityHost;

/// How long to wait for the gateway to report the session ready. A token
/// that fails authentication never fires `ready` at all.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

struct ReadyNotifier {
    ready: Arc<Notify>,
}

#[async_trait]
impl EventHandler for ReadyNotifier {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(target: "worker", user = %ready.user.name, "worker session ready");
        self.ready.notify_one();
    }
}

pub struct WorkerSession {
    pub host: Arc<SerenityHost>,
    shard_manager: Arc<ShardManager>,
    task: JoinHandle<()>,
}

impl WorkerSession {
    /// Connect a second client under the worker token and wait until the
    /// gateway reports it ready.
    pub async fn connect(token: &str) -> Result<Self, serenity::Error> {
        let ready = Arc::new(Notify::new());
        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES;
        let mut client = Client::builder(token, intents)
            .event_handler(ReadyNotifier {
                ready: Arc::clone(&ready),
            })
            .await?;

        let host = Arc::new(SerenityHost::new(client.http.clone()));
        let shard_manager = client.shard_manager.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(target: "worker", error = %e, "worker session ended with error");
            }
        });
        // notify_one stores a permit, so this is safe even if ready fired
        // before we got here.
        if !wait_ready(&ready, READY_TIMEOUT).await {
            error!(target: "worker", "worker session never became ready");
            shard_manager.shutdown_all().await;
            let _ = task.await;
            return Err(serenity::Error::Other("worker session never became ready"));
        }
        Ok(Self {
            host,
            shard_manager,
            task,
        })
    }

    pub async fn shutdown(self) {
        self.shard_manager.shutdown_all().await;
        let _ = self.task.await;
    }
}

async fn wait_ready(ready: &Notify, limit: Duration) -> bool {
    tokio::time::timeout(limit, ready.notified()).await.is_ok()
}
