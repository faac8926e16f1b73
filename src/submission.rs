use commonsfish_core::{ClientMsg, RoomSnapshot};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    AwaitingStart,
    Active,
    Locked { round_num: u32 },
    Finished,
}

impl SubmissionState {
    pub fn label(self) -> &'static str {
        match self {
            SubmissionState::AwaitingStart => "awaiting_start",
            SubmissionState::Active => "active",
            SubmissionState::Locked { .. } => "locked",
            SubmissionState::Finished => "finished",
        }
    }
}

/// Local input errors. These never reach the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("no room state received yet")]
    NoSnapshot,
    #[error("the room has not started")]
    NotStarted,
    #[error("already submitted for round {round_num}")]
    AlreadySubmitted { round_num: u32 },
    #[error("the room is finished")]
    Finished,
    #[error("the pond is overfished")]
    Overfished,
    #[error("not connected to the room")]
    Offline,
}

/// Lock lifecycle between "may sort and submit" and "waiting for the round
/// to resolve". The only place a `submit` message is built.
#[derive(Clone, Debug)]
pub struct SubmissionMachine {
    state: SubmissionState,
}

impl SubmissionMachine {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::AwaitingStart,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, SubmissionState::Locked { .. })
    }

    pub fn accepts_input(&self) -> bool {
        self.state == SubmissionState::Active
    }

    /// A new round arrived. This is the only way out of `Locked`.
    pub fn on_round_boundary(&mut self, snapshot: &RoomSnapshot, already_submitted: bool) {
        let next = if self.state == SubmissionState::Finished || snapshot.finished {
            SubmissionState::Finished
        } else if !snapshot.started {
            SubmissionState::AwaitingStart
        } else if already_submitted {
            SubmissionState::Locked {
                round_num: snapshot.round_num,
            }
        } else {
            SubmissionState::Active
        };
        self.transition(next, "round boundary");
    }

    /// Same round as before. May start or finish the room, never unlocks.
    pub fn on_in_round(&mut self, snapshot: &RoomSnapshot) {
        let next = match self.state {
            SubmissionState::Finished => SubmissionState::Finished,
            _ if snapshot.finished => SubmissionState::Finished,
            SubmissionState::AwaitingStart if snapshot.started => SubmissionState::Active,
            current => current,
        };
        self.transition(next, "in-round update");
    }

    /// Checks every gate without changing state.
    pub fn check(&self, snapshot: Option<&RoomSnapshot>, online: bool) -> Result<(), SubmitRejection> {
        match self.state {
            SubmissionState::Finished => return Err(SubmitRejection::Finished),
            SubmissionState::Locked { round_num } => {
                return Err(SubmitRejection::AlreadySubmitted { round_num })
            }
            SubmissionState::AwaitingStart => return Err(SubmitRejection::NotStarted),
            SubmissionState::Active => {}
        }
        let snapshot = snapshot.ok_or(SubmitRejection::NoSnapshot)?;
        if snapshot.finished {
            return Err(SubmitRejection::Finished);
        }
        if !snapshot.started {
            return Err(SubmitRejection::NotStarted);
        }
        if snapshot.is_overfished() {
            return Err(SubmitRejection::Overfished);
        }
        if !online {
            return Err(SubmitRejection::Offline);
        }
        Ok(())
    }

    /// Locks for the snapshot's round and returns the message to send.
    pub fn submit(
        &mut self,
        snapshot: Option<&RoomSnapshot>,
        harvest: u64,
        online: bool,
    ) -> Result<ClientMsg, SubmitRejection> {
        self.check(snapshot, online)?;
        let round_num = snapshot.map(|snapshot| snapshot.round_num).unwrap_or_default();
        self.transition(SubmissionState::Locked { round_num }, "submit");
        Ok(ClientMsg::Submit { harvest })
    }

    /// Undoes a lock whose `submit` never reached the coordinator.
    pub fn rollback(&mut self, round_num: u32) -> bool {
        if self.state != (SubmissionState::Locked { round_num }) {
            return false;
        }
        self.transition(SubmissionState::Active, "submit not delivered");
        true
    }

    fn transition(&mut self, next: SubmissionState, cause: &str) {
        if next == self.state {
            debug!(state = self.state.label(), cause, "submission state unchanged");
            return;
        }
        info!(
            from = self.state.label(),
            to = next.label(),
            cause,
            "submission state changed"
        );
        self.state = next;
    }
}

impl Default for SubmissionMachine {
    fn default() -> Self {
        Self::new()
    }
}
