//! Error types for each seam of the bot. Nothing here is fatal to the
//! process; the event handler logs and moves on.

use thiserror::Error;

/// Failures talking to the chat service.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("missing permissions: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("host api error: {0}")]
    Api(String),
}

impl From<serenity::Error> for HostError {
    fn from(e: serenity::Error) -> Self {
        use serenity::http::{HttpError, StatusCode};
        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &e {
            if resp.status_code == StatusCode::FORBIDDEN {
                return HostError::Forbidden(resp.error.message.clone());
            }
            if resp.status_code == StatusCode::NOT_FOUND {
                return HostError::NotFound(resp.error.message.clone());
            }
        }
        HostError::Api(e.to_string())
    }
}

/// Failures in the reactable repository.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("repository error: {0}")]
    Repository(#[from] sqlx::Error),
}

/// Startup-time registration problems. These abort startup on purpose.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate {kind} registration: {name}")]
    Duplicate { kind: &'static str, name: String },
    #[error("invalid trigger pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// What a handler reports upward when it cannot finish.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
