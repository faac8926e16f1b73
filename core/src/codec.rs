use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::{ServerMsg, SERVER_MSG_KINDS};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("message has no type tag")]
    MissingType,
    #[error("unknown message type {0:?}")]
    UnknownType(String),
    #[error("malformed room state: {0}")]
    MalformedSnapshot(#[source] serde_json::Error),
    #[error("malformed {kind} message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Errors that should be shown to the player rather than only logged.
    pub fn is_advisory(&self) -> bool {
        matches!(self, CodecError::MalformedSnapshot(_))
    }
}

pub fn encode<T>(value: &T) -> Result<String, CodecError>
where
    T: Serialize,
{
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T>(text: &str) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(text)?)
}

/// Decodes one inbound frame, telling malformed snapshots apart from other
/// failures so the caller can skip them without dropping the channel.
pub fn decode_server_msg(text: &str) -> Result<ServerMsg, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?
        .to_string();
    if !SERVER_MSG_KINDS.contains(&kind.as_str()) {
        return Err(CodecError::UnknownType(kind));
    }
    serde_json::from_value::<ServerMsg>(value).map_err(|source| {
        if kind == "state" {
            CodecError::MalformedSnapshot(source)
        } else {
            CodecError::Malformed { kind, source }
        }
    })
}
