use std::env;
use std::sync::Arc;

use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use custodian_bot::commands::{self, Deps};
use custodian_bot::config::BotConfig;
use custodian_bot::dispatch::Dispatcher;
use custodian_bot::handler::Handler;
use custodian_bot::store::{PgReactableStore, ReactableStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = env::var("DISCORD_TOKEN")?;
    let worker_token = env::var("WORKER_TOKEN")?;
    let database_url = env::var("DATABASE_URL")?;
    let config_path = env::var("BOT_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    let mut config = BotConfig::load(&config_path)?;
    if env::var("BOT_DEBUG").is_ok() {
        config.debug = true;
    }
    let config = Arc::new(config);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    let store = PgReactableStore::new(pool);
    store.migrate().await?;
    let store: Arc<dyn ReactableStore> = Arc::new(store);

    let deps = Arc::new(Deps {
        config: Arc::clone(&config),
        store: Arc::clone(&store),
        worker_token,
    });
    // Registration errors (duplicate names, bad trigger patterns) abort here.
    let registry = commands::build_registry(deps)?;
    let dispatcher = Arc::new(Dispatcher::new(registry, store, config.prefix.clone()));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(config, dispatcher))
        .await?;

    info!(target: "main", "starting gateway client");
    client.start().await?;
    Ok(())
}
