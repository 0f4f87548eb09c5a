use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::event::ForgeEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum NetforgeError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Derivation invariant violated: {0}")]
    Invariant(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for NetforgeError {
    fn from(src: toml::de::Error) -> NetforgeError {
        NetforgeError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for NetforgeError {
    fn from(src: toml::ser::Error) -> NetforgeError {
        NetforgeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<io::Error> for NetforgeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => NetforgeError::NotFound(format!("{x}")),
            _ => NetforgeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<TokioSendError<ForgeEvent>> for NetforgeError {
    fn from(x: TokioSendError<ForgeEvent>) -> Self {
        NetforgeError::Io(format!(
            "Channel update send Error, could not transmit derived change event {:?}",
            x.0
        ))
    }
}
