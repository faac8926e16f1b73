pub mod config;
pub mod connection;
pub mod error;
pub mod input;
pub mod observer;
pub mod round_sync;
pub mod session;
pub mod submission;
pub mod view;

pub use config::{channel_url_for_origin, ClientConfig};
pub use connection::{
    CommandOutput, ConnectionEvent, ConnectionHandle, ConnectionManager, EventReceiver, Handshake,
    LinkState, RoomConsumer,
};
pub use error::{ClientError, Result};
pub use input::{DragOutcome, PointerEvent, PointerId, PointerPhase};
pub use observer::{ObserverConsumer, ObserverEvent, ObserverStatus, RoomSummary, ScoreboardLine};
pub use round_sync::{
    apply_snapshot, classify_round, PlayerCommand, PlayerEvent, RoundDecision, RoundSynchronizer,
    SyncOutcome,
};
pub use session::{SessionState, Submission};
pub use submission::{SubmissionMachine, SubmissionState, SubmitRejection};
pub use view::{
    leaderboard, player_status, results_panel, roster, roster_line, LeaderboardEntry,
    ResultsPanel, RosterEntry, SessionView, StatusLine,
};
