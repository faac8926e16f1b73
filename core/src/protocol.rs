use serde::{Deserialize, Serialize};

use crate::snapshot::{PlayerId, RoomSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Join { room_code: String, name: String },
    Observe { room_code: String, pin: String },
    Submit { harvest: u64 },
}

impl ClientMsg {
    pub fn is_handshake(&self) -> bool {
        matches!(self, ClientMsg::Join { .. } | ClientMsg::Observe { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    Joined {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    Observing {
        #[serde(default)]
        room_code: Option<String>,
    },
    State { state: RoomSnapshot },
    Error { message: String },
}

pub const SERVER_MSG_KINDS: &[&str] = &["joined", "observing", "state", "error"];

pub fn server_msg_kind(msg: &ServerMsg) -> &'static str {
    match msg {
        ServerMsg::Joined { .. } => "joined",
        ServerMsg::Observing { .. } => "observing",
        ServerMsg::State { .. } => "state",
        ServerMsg::Error { .. } => "error",
    }
}
