//! Bot configuration. Secrets come from the environment (`.env` via dotenv,
//! as in `main.rs`); per-guild settings live in a TOML file so they can change
//! without a rebuild.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serenity::model::id::{ChannelId, GuildId, RoleId};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// In debug mode only `debug_channels` are processed.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub debug_channels: Vec<u64>,
    #[serde(default)]
    pub guilds: Vec<GuildConfig>,
}

fn default_prefix() -> String {
    "!".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildConfig {
    pub name: String,
    pub id: u64,
    /// Message edit/delete audit embeds are posted here.
    pub log_channel: Option<u64>,
    /// The channel `regenroles` rebuilds.
    pub roles_channel: Option<u64>,
    /// Roles whose holders may invoke commands at all.
    #[serde(default)]
    pub approved_roles: Vec<u64>,
    /// Roles granted by the accept_coc reactable.
    #[serde(default)]
    pub conduct_roles: Vec<u64>,
    /// Full members are skipped by accept_coc.
    pub member_role: Option<u64>,
    /// Whether management commands (regenroles, gdpr, ...) may run here.
    #[serde(default)]
    pub management: bool,
    /// Layout of the roles channel: headers interleaved with reactable lines.
    #[serde(default)]
    pub role_list: Vec<RoleListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleListEntry {
    Role { role: u64, text: String },
    Header { header: String },
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn guild(&self, id: GuildId) -> Option<&GuildConfig> {
        self.guilds.iter().find(|g| g.id == id.get())
    }

    /// Guilds where management commands are allowed to run.
    pub fn management_guilds(&self) -> HashSet<GuildId> {
        self.guilds
            .iter()
            .filter(|g| g.management)
            .map(|g| GuildId::new(g.id))
            .collect()
    }

    pub fn is_debug_channel(&self, channel: ChannelId) -> bool {
        self.debug_channels.contains(&channel.get())
    }

    pub fn log_channel(&self, guild: GuildId) -> Option<ChannelId> {
        self.guild(guild)
            .and_then(|g| g.log_channel)
            .map(ChannelId::new)
    }
}

impl GuildConfig {
    pub fn approved_role_ids(&self) -> Vec<RoleId> {
        self.approved_roles.iter().copied().map(RoleId::new).collect()
    }
}
