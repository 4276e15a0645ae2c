use serde::Serialize;
use shared::domain::ItemId;
use thiserror::Error;

/// Failure reported by an adapter call. These are the only errors that reach
/// `ConsoleState::last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not authorized: {0}")]
    Authorization(String),
}

impl AdapterError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn kind(&self) -> ConsoleErrorKind {
        match self {
            AdapterError::Network(_) => ConsoleErrorKind::Network,
            AdapterError::Authorization(_) => ConsoleErrorKind::Authorization,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.kind() == ConsoleErrorKind::Authorization
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status)
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN =>
            {
                AdapterError::Authorization(value.to_string())
            }
            _ => AdapterError::Network(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleErrorKind {
    Network,
    Authorization,
}

/// A second mutation was attempted while the first is still unconfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("item {item_id} already has an unconfirmed change")]
pub struct ConflictError {
    pub item_id: ItemId,
}
