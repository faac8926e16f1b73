use std::fmt;

use commonsfish_core::{HarvestQuote, PlayerId, RoomSnapshot, Token, Zone};

use crate::session::SessionState;
use crate::submission::SubmissionState;

pub const DEFAULT_COLLAPSE_MESSAGE: &str = "There are no fish left in the pond.";
pub const SUBMITTED_MARK: &str = "\u{2713}";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLine {
    WaitingForRoom,
    WaitingForPlayers,
    SortAndSubmit,
    Submitted,
    Overfished,
    Finished,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusLine::WaitingForRoom => "Connecting to the room...",
            StatusLine::WaitingForPlayers => "Waiting for players...",
            StatusLine::SortAndSubmit => "Sort fish into the matching net, then submit.",
            StatusLine::Submitted => "Submitted. Waiting for the pond to resolve...",
            StatusLine::Overfished => "Overfished: there are no fish left in the pond.",
            StatusLine::Finished => "Finished.",
        };
        f.write_str(text)
    }
}

pub fn player_status(snapshot: Option<&RoomSnapshot>, state: SubmissionState) -> StatusLine {
    let Some(snapshot) = snapshot else {
        return StatusLine::WaitingForRoom;
    };
    if !snapshot.started {
        StatusLine::WaitingForPlayers
    } else if snapshot.finished || state == SubmissionState::Finished {
        StatusLine::Finished
    } else if matches!(state, SubmissionState::Locked { .. }) {
        StatusLine::Submitted
    } else if snapshot.is_overfished() {
        StatusLine::Overfished
    } else {
        StatusLine::SortAndSubmit
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub submitted: bool,
}

pub fn roster(snapshot: &RoomSnapshot) -> Vec<RosterEntry> {
    snapshot
        .players
        .iter()
        .map(|player| RosterEntry {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            submitted: snapshot.has_submitted(&player.player_id),
        })
        .collect()
}

pub fn roster_line(entries: &[RosterEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.submitted {
                format!("{} {SUBMITTED_MARK}", entry.name)
            } else {
                entry.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultsPanel {
    Season {
        stock_before: Option<u64>,
        harvested_total: u64,
        remaining: Option<i64>,
        next_stock: Option<u64>,
    },
    Collapse {
        message: String,
    },
}

pub fn results_panel(snapshot: &RoomSnapshot) -> Option<ResultsPanel> {
    let results = snapshot.last_round_results.as_ref()?;
    if results.collapse {
        let message = results
            .collapse_message
            .clone()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COLLAPSE_MESSAGE.to_string());
        return Some(ResultsPanel::Collapse { message });
    }
    Some(ResultsPanel::Season {
        stock_before: results.stock_before,
        harvested_total: results.harvested_total,
        remaining: results.remaining,
        next_stock: results.next_stock,
    })
}

impl fmt::Display for ResultsPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultsPanel::Collapse { message } => write!(f, "Overfished. {message}"),
            ResultsPanel::Season {
                stock_before,
                harvested_total,
                remaining,
                next_stock,
            } => {
                write!(f, "Last season:")?;
                if let Some(stock_before) = stock_before {
                    write!(f, " stock before {stock_before},")?;
                }
                write!(f, " harvested {harvested_total}")?;
                if let Some(remaining) = remaining {
                    write!(f, ", remaining {remaining}")?;
                }
                if let Some(next_stock) = next_stock {
                    write!(f, ", next stock {next_stock}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: String,
    pub total: u64,
}

/// Totals sorted high to low. Unknown ids fall back to the raw id.
pub fn leaderboard(snapshot: &RoomSnapshot) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<(PlayerId, String, u64)> = snapshot
        .totals
        .iter()
        .map(|(player_id, total)| {
            let name = snapshot
                .player_name(player_id)
                .map(str::to_string)
                .unwrap_or_else(|| player_id.to_string());
            (player_id.clone(), name, *total)
        })
        .collect();
    entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (player_id, name, total))| LeaderboardEntry {
            rank: idx + 1,
            player_id,
            name,
            total,
        })
        .collect()
}

/// Owned copy of what the rendering layer needs after any change.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub room_code: Option<String>,
    pub round_num: Option<u32>,
    pub rounds_total: Option<u32>,
    pub stock: Option<u64>,
    pub max_harvest_per_player: Option<u64>,
    pub status: StatusLine,
    pub submission: SubmissionState,
    pub tokens: Vec<Token>,
    pub zones: Vec<Zone>,
    pub quote: HarvestQuote,
    pub roster: Vec<RosterEntry>,
    pub results: Option<ResultsPanel>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl SessionView {
    pub fn capture(session: &SessionState) -> Self {
        let snapshot = session.snapshot();
        let submission = session.submission_state();
        let finished = snapshot.is_some_and(|snapshot| snapshot.finished);
        Self {
            room_code: snapshot.map(|snapshot| snapshot.room_code.clone()),
            round_num: snapshot.map(|snapshot| snapshot.round_num),
            rounds_total: snapshot.map(|snapshot| snapshot.rounds_total),
            stock: snapshot.map(|snapshot| snapshot.stock),
            max_harvest_per_player: snapshot.map(|snapshot| snapshot.max_harvest_per_player),
            status: player_status(snapshot, submission),
            submission,
            tokens: session.board().tokens().to_vec(),
            zones: session.board().zones().to_vec(),
            quote: session.quote(),
            roster: snapshot.map(roster).unwrap_or_default(),
            results: snapshot.and_then(results_panel),
            leaderboard: if finished {
                snapshot.map(leaderboard).unwrap_or_default()
            } else {
                Vec::new()
            },
        }
    }

    pub fn can_submit(&self) -> bool {
        self.status == StatusLine::SortAndSubmit
    }
}
