use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Player identity as assigned by the room coordinator.
///
/// The coordinator may send ids as JSON strings or integers; both are kept
/// as their string form so they compare equal to `totals` keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawPlayerId", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<PlayerId> for String {
    fn from(value: PlayerId) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlayerId {
    Text(String),
    Number(i64),
}

impl From<RawPlayerId> for PlayerId {
    fn from(raw: RawPlayerId) -> Self {
        match raw {
            RawPlayerId::Text(text) => PlayerId(text),
            RawPlayerId::Number(number) => PlayerId(number.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundResults {
    #[serde(default)]
    pub stock_before: Option<u64>,
    #[serde(default)]
    pub harvested_total: u64,
    #[serde(default)]
    pub remaining: Option<i64>,
    #[serde(default)]
    pub next_stock: Option<u64>,
    #[serde(default)]
    pub collapse: bool,
    #[serde(default)]
    pub collapse_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardRow {
    pub name: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default, deserialize_with = "season_map")]
    pub by_round: BTreeMap<u32, u64>,
    #[serde(default)]
    pub seasons_survived: u32,
}

// Season keys arrive as JSON object keys, so they are always strings.
fn season_map<'de, D>(deserializer: D) -> Result<BTreeMap<u32, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(season, harvest)| {
            season
                .trim()
                .parse::<u32>()
                .map(|season| (season, harvest))
                .map_err(D::Error::custom)
        })
        .collect()
}

/// Authoritative room state. Always delivered whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_code: String,
    pub round_num: u32,
    pub rounds_total: u32,
    pub stock: u64,
    pub max_harvest_per_player: u64,
    pub started: bool,
    pub finished: bool,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
    #[serde(default)]
    pub submitted: BTreeSet<PlayerId>,
    #[serde(default)]
    pub last_round_results: Option<RoundResults>,
    #[serde(default)]
    pub totals: BTreeMap<PlayerId, u64>,
    #[serde(default)]
    pub scoreboard: Vec<ScoreboardRow>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub collapse_round: Option<u32>,
    #[serde(default)]
    pub seasons_completed: u32,
}

impl RoomSnapshot {
    /// True while players may still sort and submit this round.
    pub fn is_live(&self) -> bool {
        self.started && !self.finished
    }

    pub fn is_overfished(&self) -> bool {
        self.stock == 0
    }

    pub fn has_submitted(&self, player_id: &PlayerId) -> bool {
        self.submitted.contains(player_id)
    }

    pub fn player_name(&self, player_id: &PlayerId) -> Option<&str> {
        self.players
            .iter()
            .find(|player| &player.player_id == player_id)
            .map(|player| player.name.as_str())
    }
}
