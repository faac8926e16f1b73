use std::convert::Infallible;
use std::fmt;

use commonsfish_core::{RoomSnapshot, ScoreboardRow};
use tracing::{debug, info};

use crate::connection::{CommandOutput, RoomConsumer};
use crate::view::{results_panel, ResultsPanel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverStatus {
    Waiting,
    InProgress,
    Finished,
}

impl ObserverStatus {
    pub fn of(snapshot: &RoomSnapshot) -> Self {
        if snapshot.finished {
            ObserverStatus::Finished
        } else if snapshot.is_live() {
            ObserverStatus::InProgress
        } else {
            ObserverStatus::Waiting
        }
    }
}

impl fmt::Display for ObserverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObserverStatus::Waiting => "Waiting to start.",
            ObserverStatus::InProgress => "Room in progress.",
            ObserverStatus::Finished => "Room finished.",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_code: String,
    pub status: ObserverStatus,
    pub round_num: u32,
    pub rounds_total: u32,
    pub stock: u64,
    pub seasons_completed: u32,
    pub collapse_round: Option<u32>,
    pub app_version: Option<String>,
    pub last_season: Option<ResultsPanel>,
}

impl RoomSummary {
    pub fn from_snapshot(snapshot: &RoomSnapshot) -> Self {
        Self {
            room_code: snapshot.room_code.clone(),
            status: ObserverStatus::of(snapshot),
            round_num: snapshot.round_num,
            rounds_total: snapshot.rounds_total,
            stock: snapshot.stock,
            seasons_completed: snapshot.seasons_completed,
            collapse_round: snapshot.collapse_round,
            app_version: snapshot.app_version.clone(),
            last_season: results_panel(snapshot),
        }
    }
}

impl fmt::Display for RoomSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Room {} | season {}/{} | stock {} | seasons completed {} | {}",
            self.room_code,
            self.round_num,
            self.rounds_total,
            self.stock,
            self.seasons_completed,
            self.status
        )?;
        if let Some(round) = self.collapse_round {
            write!(f, " | collapsed in season {round}")?;
        }
        if let Some(panel) = &self.last_season {
            write!(f, "\n{panel}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreboardLine {
    pub name: String,
    pub total: u64,
    pub seasons_survived: u32,
    /// One entry per completed season, in order.
    pub seasons: Vec<u64>,
}

impl ScoreboardLine {
    pub fn from_row(row: &ScoreboardRow, seasons_completed: u32) -> Self {
        let seasons = (1..=seasons_completed)
            .map(|season| row.by_round.get(&season).copied().unwrap_or(0))
            .collect();
        Self {
            name: row.name.clone(),
            total: row.total,
            seasons_survived: row.seasons_survived,
            seasons,
        }
    }
}

impl fmt::Display for ScoreboardLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: total {}", self.name, self.total)?;
        for (idx, harvest) in self.seasons.iter().enumerate() {
            write!(f, " | S{} {harvest}", idx + 1)?;
        }
        write!(f, " | survived {}", self.seasons_survived)
    }
}

pub fn scoreboard_lines(snapshot: &RoomSnapshot) -> Vec<ScoreboardLine> {
    snapshot
        .scoreboard
        .iter()
        .map(|row| ScoreboardLine::from_row(row, snapshot.seasons_completed))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObserverEvent {
    Updated {
        new_season: bool,
        summary: RoomSummary,
        scoreboard: Vec<ScoreboardLine>,
    },
}

/// Read-only consumer: keeps the latest snapshot and re-renders the
/// aggregate view from it. No token board, never sends after the handshake.
#[derive(Clone, Debug, Default)]
pub struct ObserverConsumer {
    snapshot: Option<RoomSnapshot>,
    last_round_seen: Option<u32>,
}

impl ObserverConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn summary(&self) -> Option<RoomSummary> {
        self.snapshot.as_ref().map(RoomSummary::from_snapshot)
    }
}

impl RoomConsumer for ObserverConsumer {
    type Command = Infallible;
    type Event = ObserverEvent;

    fn consume(&mut self, snapshot: RoomSnapshot) -> Option<ObserverEvent> {
        let new_season = self.last_round_seen != Some(snapshot.round_num);
        self.last_round_seen = Some(snapshot.round_num);
        if new_season {
            info!(
                round_num = snapshot.round_num,
                stock = snapshot.stock,
                "observer season changed"
            );
        } else {
            debug!(round_num = snapshot.round_num, "observer update");
        }
        let summary = RoomSummary::from_snapshot(&snapshot);
        let scoreboard = scoreboard_lines(&snapshot);
        self.snapshot = Some(snapshot);
        Some(ObserverEvent::Updated {
            new_season,
            summary,
            scoreboard,
        })
    }

    fn command(&mut self, command: Infallible, _online: bool) -> CommandOutput<ObserverEvent> {
        match command {}
    }
}
