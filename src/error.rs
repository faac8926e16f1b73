use commonsfish_core::{CodecError, CredentialError, RoomCodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported origin scheme {0:?}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    RoomCode(#[from] RoomCodeError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("websocket: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("not connected to the room")]
    NotConnected,
    #[error("client task has stopped")]
    Stopped,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
