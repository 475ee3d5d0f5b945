//! Business handlers and the startup registry wiring. All registration
//! happens here, once, before the gateway client starts; a duplicate name in
//! any namespace aborts startup.

pub mod gdpr;
pub mod ping;
pub mod responses;
pub mod roles;

use std::sync::Arc;

use crate::config::BotConfig;
use crate::dispatch::Outcome;
use crate::errors::RegistryError;
use crate::registry::{command_fn, reaction_fn, tag_fn, Registry, RegistryBuilder, Restrictions};
use crate::store::ReactableStore;

/// Shared dependencies handed to handlers at registration time.
pub struct Deps {
    pub config: Arc<BotConfig>,
    pub store: Arc<dyn ReactableStore>,
    pub worker_token: String,
}

pub fn build_registry(deps: Arc<Deps>) -> Result<Registry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    let management: Restrictions = Some(deps.config.management_guilds());

    builder.command("ping", None, "Ping", command_fn(ping::ping))?;

    {
        let deps = Arc::clone(&deps);
        builder.command(
            "regenroles",
            management.clone(),
            "Regenerate the roles text",
            command_fn(move |inv, ctx, sink| {
                roles::regenroles(Arc::clone(&deps), inv, ctx, sink)
            }),
        )?;
    }
    {
        let deps = Arc::clone(&deps);
        builder.command(
            "addrolereactable",
            management.clone(),
            "Allow reactions on a message to assign a role. \
             Usage: 'addrolereactable <messageid> <roleid>' in the channel containing the message.",
            command_fn(move |inv, ctx, sink| {
                roles::addrolereactable(Arc::clone(&deps), inv, ctx, sink)
            }),
        )?;
    }
    {
        let deps = Arc::clone(&deps);
        builder.command(
            "gdpr",
            management.clone(),
            "Compile GDPR data on a user. Usage: 'gdpr <userid>'.",
            command_fn(move |inv, ctx, sink| {
                gdpr::gdpr_export(Arc::clone(&deps), inv, ctx, sink)
            }),
        )?;
    }
    {
        let deps = Arc::clone(&deps);
        builder.command(
            "gdprdelete",
            management.clone(),
            "Delete all messages sent by a user. Usage: 'gdprdelete <userid>'.",
            command_fn(move |inv, ctx, sink| {
                gdpr::gdpr_erase(Arc::clone(&deps), inv, ctx, sink)
            }),
        )?;
    }

    builder.literal_reaction(
        "good bot",
        None,
        Some("Gratitude is always appreciated"),
        reaction_fn(responses::good_bot),
    )?;
    builder.pattern_reaction(r"\bbad bot\b", None, None, reaction_fn(responses::bad_bot))?;

    builder.tag_reactable("toggle_role", management.clone(), tag_fn(roles::toggle_role))?;
    {
        let deps = Arc::clone(&deps);
        builder.tag_reactable(
            "accept_coc",
            management,
            tag_fn(move |arg, kind, ctx| roles::accept_coc(Arc::clone(&deps), arg, kind, ctx)),
        )?;
    }

    // Help renders whatever was registered above, so it goes last.
    let mut help_text = builder.render_help();
    help_text.push_str("**help**: Show this message\n");
    builder.command(
        "help",
        None,
        "Show this message",
        command_fn(move |_inv, _ctx, sink| {
            let text = help_text.clone();
            async move {
                sink.send(&text).await?;
                Ok(Outcome::Handled)
            }
        }),
    )?;

    Ok(builder.build())
}
