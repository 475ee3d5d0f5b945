//! The three handler namespaces: prefix commands, passive textual reactions,
//! and tag-reactables. All maps are built once at startup and never mutated
//! afterwards; the dispatcher holds them behind an immutable handle.
//!
//! A name registered as a command and the same name registered as a
//! tag-reactable are unrelated entries. Duplicate registration within one
//! namespace is a startup error.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use regex::{Regex, RegexBuilder};
use serenity::model::id::GuildId;

use crate::dispatch::{EventCtx, HandlerResult, Invocation, ReactionEventKind, TriggerMatch};
use crate::errors::RegistryError;
use crate::reply::ReplySink;

pub type CommandFn = Arc<
    dyn Fn(Invocation, Arc<EventCtx>, Arc<dyn ReplySink>) -> BoxFuture<'static, HandlerResult>
        + Send
        + Sync,
>;
pub type ReactionFn = Arc<
    dyn Fn(TriggerMatch, Arc<EventCtx>, Arc<dyn ReplySink>) -> BoxFuture<'static, HandlerResult>
        + Send
        + Sync,
>;
pub type TagReactableFn = Arc<
    dyn Fn(String, ReactionEventKind, Arc<EventCtx>) -> BoxFuture<'static, HandlerResult>
        + Send
        + Sync,
>;

/// Guild ids allowed to invoke a handler. `None` means everywhere.
pub type Restrictions = Option<HashSet<GuildId>>;

/// Permission holds when the entry is unrestricted or the current guild is a
/// member of its restriction set.
pub fn has_permission(guild: Option<GuildId>, restrictions: &Restrictions) -> bool {
    match restrictions {
        None => true,
        Some(set) => guild.map(|g| set.contains(&g)).unwrap_or(false),
    }
}

pub struct CommandEntry {
    pub handler: CommandFn,
    pub restrictions: Restrictions,
    pub help: Option<String>,
}

pub struct ReactionEntry {
    pub handler: ReactionFn,
    pub restrictions: Restrictions,
    pub help: Option<String>,
}

pub struct TagReactableEntry {
    pub handler: TagReactableFn,
    pub restrictions: Restrictions,
}

pub struct Registry {
    commands: HashMap<String, CommandEntry>,
    // Registration order matters for both lists: first match wins.
    literal_reactions: Vec<(String, ReactionEntry)>,
    pattern_reactions: Vec<(Regex, ReactionEntry)>,
    tag_reactables: HashMap<String, TagReactableEntry>,
}

impl Registry {
    pub fn resolve_command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// First passive trigger matching `text`. Literal triggers are checked
    /// before patterns; within each pass, registration order decides.
    pub fn resolve_reaction(&self, text: &str) -> Option<(String, &ReactionEntry)> {
        let lowered = text.to_lowercase();
        for (literal, entry) in &self.literal_reactions {
            if lowered.contains(literal.as_str()) {
                return Some((literal.clone(), entry));
            }
        }
        for (pattern, entry) in &self.pattern_reactions {
            if pattern.is_match(text) {
                return Some((pattern.as_str().to_string(), entry));
            }
        }
        None
    }

    pub fn resolve_tag_reactable(&self, name: &str) -> Option<&TagReactableEntry> {
        self.tag_reactables.get(name)
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    commands: HashMap<String, CommandEntry>,
    literal_reactions: Vec<(String, ReactionEntry)>,
    pattern_reactions: Vec<(Regex, ReactionEntry)>,
    tag_reactables: HashMap<String, TagReactableEntry>,
    help_order: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(
        &mut self,
        name: &str,
        restrictions: Restrictions,
        help: &str,
        handler: CommandFn,
    ) -> Result<&mut Self, RegistryError> {
        if self.commands.contains_key(name) {
            return Err(RegistryError::Duplicate {
                kind: "command",
                name: name.to_string(),
            });
        }
        self.help_order.push((name.to_string(), help.to_string()));
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                handler,
                restrictions,
                help: Some(help.to_string()),
            },
        );
        Ok(self)
    }

    /// Case-insensitive substring trigger.
    pub fn literal_reaction(
        &mut self,
        trigger: &str,
        restrictions: Restrictions,
        help: Option<&str>,
        handler: ReactionFn,
    ) -> Result<&mut Self, RegistryError> {
        let key = trigger.to_lowercase();
        if self.literal_reactions.iter().any(|(t, _)| *t == key) {
            return Err(RegistryError::Duplicate {
                kind: "reaction",
                name: trigger.to_string(),
            });
        }
        self.literal_reactions.push((
            key,
            ReactionEntry {
                handler,
                restrictions,
                help: help.map(str::to_string),
            },
        ));
        Ok(self)
    }

    /// Case-insensitive regular-expression trigger; checked only after every
    /// literal trigger has failed to match.
    pub fn pattern_reaction(
        &mut self,
        pattern: &str,
        restrictions: Restrictions,
        help: Option<&str>,
        handler: ReactionFn,
    ) -> Result<&mut Self, RegistryError> {
        if self.pattern_reactions.iter().any(|(p, _)| p.as_str() == pattern) {
            return Err(RegistryError::Duplicate {
                kind: "reaction",
                name: pattern.to_string(),
            });
        }
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RegistryError::BadPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        self.pattern_reactions.push((
            compiled,
            ReactionEntry {
                handler,
                restrictions,
                help: help.map(str::to_string),
            },
        ));
        Ok(self)
    }

    pub fn tag_reactable(
        &mut self,
        name: &str,
        restrictions: Restrictions,
        handler: TagReactableFn,
    ) -> Result<&mut Self, RegistryError> {
        if self.tag_reactables.contains_key(name) {
            return Err(RegistryError::Duplicate {
                kind: "tag-reactable",
                name: name.to_string(),
            });
        }
        self.tag_reactables.insert(
            name.to_string(),
            TagReactableEntry {
                handler,
                restrictions,
            },
        );
        Ok(self)
    }

    /// Help text for every command registered so far, in registration order.
    pub fn render_help(&self) -> String {
        let mut out = String::new();
        for (name, help) in &self.help_order {
            out.push_str(&format!("**{name}**: {help}\n"));
        }
        out
    }

    pub fn build(self) -> Registry {
        Registry {
            commands: self.commands,
            literal_reactions: self.literal_reactions,
            pattern_reactions: self.pattern_reactions,
            tag_reactables: self.tag_reactables,
        }
    }
}

/// Adapt a plain async fn into the boxed command-handler shape.
pub fn command_fn<F, Fut>(f: F) -> CommandFn
where
    F: Fn(Invocation, Arc<EventCtx>, Arc<dyn ReplySink>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(
        move |inv, ctx, sink| -> BoxFuture<'static, HandlerResult> { Box::pin(f(inv, ctx, sink)) },
    )
}

pub fn reaction_fn<F, Fut>(f: F) -> ReactionFn
where
    F: Fn(TriggerMatch, Arc<EventCtx>, Arc<dyn ReplySink>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(
        move |matched, ctx, sink| -> BoxFuture<'static, HandlerResult> {
            Box::pin(f(matched, ctx, sink))
        },
    )
}

pub fn tag_fn<F, Fut>(f: F) -> TagReactableFn
where
    F: Fn(String, ReactionEventKind, Arc<EventCtx>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(
        move |arg, kind, ctx| -> BoxFuture<'static, HandlerResult> { Box::pin(f(arg, kind, ctx)) },
    )
}
