pub mod codec;
pub mod harvest;
pub mod protocol;
pub mod room_code;
pub mod snapshot;
pub mod tokens;

pub use codec::{decode, decode_server_msg, encode, CodecError};
pub use harvest::{quote, HarvestQuote, MAX_VISIBLE_TOKENS};
pub use protocol::{server_msg_kind, ClientMsg, ServerMsg};
pub use room_code::{
    parse_display_name, parse_observer_pin, CredentialError, RoomCode,
    RoomCodeError,
};
pub use snapshot::{PlayerId, PlayerInfo, RoomSnapshot, RoundResults, ScoreboardRow};
pub use tokens::{default_zones, resolve_zone, Board, Category, Rect, Token, TokenId, Zone};
