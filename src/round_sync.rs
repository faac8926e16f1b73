use commonsfish_core::{Board, ClientMsg, PlayerId, RoomSnapshot, TokenId};
use tracing::{debug, info, warn};

use crate::connection::{CommandOutput, RoomConsumer};
use crate::input::{DragOutcome, PointerEvent};
use crate::session::SessionState;
use crate::submission::{SubmissionState, SubmitRejection};
use crate::view::SessionView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundDecision {
    /// First snapshot, or a round number different from the last one
    /// rendered. `previous` is that last round.
    Boundary { previous: Option<u32> },
    InRound,
}

pub fn classify_round(last_rendered: Option<u32>, round_num: u32) -> RoundDecision {
    match last_rendered {
        Some(previous) if previous == round_num => RoundDecision::InRound,
        previous => RoundDecision::Boundary { previous },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub round_num: u32,
    pub decision: RoundDecision,
    pub before: SubmissionState,
    pub after: SubmissionState,
    /// Tokens spawned, set only when the board was rebuilt.
    pub spawned: Option<usize>,
}

impl SyncOutcome {
    pub fn is_boundary(&self) -> bool {
        matches!(self.decision, RoundDecision::Boundary { .. })
    }

    pub fn unlocked(&self) -> bool {
        matches!(self.before, SubmissionState::Locked { .. })
            && !matches!(self.after, SubmissionState::Locked { .. })
    }
}

/// Stores the snapshot, then either rebuilds the board for a new round or
/// leaves local placements alone for an update within the same round.
pub fn apply_snapshot(session: &mut SessionState, snapshot: RoomSnapshot) -> SyncOutcome {
    let round_num = snapshot.round_num;
    let decision = classify_round(session.last_round_rendered, round_num);
    let before = session.submission.state();
    let snapshot: &RoomSnapshot = session.snapshot.insert(snapshot);

    let mut spawned = None;
    match decision {
        RoundDecision::Boundary { previous } => {
            if previous.is_some_and(|previous| previous > round_num) {
                warn!(previous, round_num, "round number went backwards");
            }
            session.last_round_rendered = Some(round_num);
            session.drag.clear();
            session.unsent = None;
            let count = session
                .board
                .reset(snapshot.stock, snapshot.max_harvest_per_player);
            spawned = Some(count);
            let already_submitted = session
                .player_id
                .as_ref()
                .is_some_and(|player_id| snapshot.has_submitted(player_id));
            session
                .submission
                .on_round_boundary(snapshot, already_submitted);
            info!(
                round_num,
                stock = snapshot.stock,
                spawned = count,
                token_value = session.board.token_value(),
                "round started"
            );
        }
        RoundDecision::InRound => {
            session.submission.on_in_round(snapshot);
            debug!(round_num, submitted = snapshot.submitted.len(), "in-round update");
        }
    }

    if !session.accepts_input() {
        session.cancel_drag();
    }

    SyncOutcome {
        round_num,
        decision,
        before,
        after: session.submission.state(),
        spawned,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerCommand {
    Pointer(PointerEvent),
    /// Drop a token directly at a position.
    Place { token: TokenId, pos: (f32, f32) },
    Submit,
    /// Advance token drift by this many 60 Hz frames.
    Tick { steps: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    Synced {
        outcome: SyncOutcome,
        view: SessionView,
    },
    Input {
        outcome: DragOutcome,
        view: SessionView,
    },
    Submitted {
        harvest: u64,
        round_num: u32,
        removed: usize,
        view: SessionView,
    },
    SubmitRejected {
        reason: SubmitRejection,
    },
    Ticked(SessionView),
}

/// Player-side consumer: owns the session across reconnects.
#[derive(Clone, Debug)]
pub struct RoundSynchronizer {
    session: SessionState,
}

impl RoundSynchronizer {
    pub fn new(board: Board) -> Self {
        Self {
            session: SessionState::new(board),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn into_session(self) -> SessionState {
        self.session
    }

    pub fn view(&self) -> SessionView {
        SessionView::capture(&self.session)
    }

    pub fn apply(&mut self, snapshot: RoomSnapshot) -> SyncOutcome {
        apply_snapshot(&mut self.session, snapshot)
    }
}

impl RoomConsumer for RoundSynchronizer {
    type Command = PlayerCommand;
    type Event = PlayerEvent;

    fn acknowledged(&mut self, player_id: Option<PlayerId>) {
        self.session.set_player_id(player_id);
    }

    fn consume(&mut self, snapshot: RoomSnapshot) -> Option<PlayerEvent> {
        let outcome = self.apply(snapshot);
        Some(PlayerEvent::Synced {
            outcome,
            view: self.view(),
        })
    }

    fn command(&mut self, command: PlayerCommand, online: bool) -> CommandOutput<PlayerEvent> {
        match command {
            PlayerCommand::Pointer(event) => {
                let outcome = self.session.pointer(event);
                CommandOutput::event(PlayerEvent::Input {
                    outcome,
                    view: self.view(),
                })
            }
            PlayerCommand::Place { token, pos } => {
                let outcome = self.session.place(token, pos);
                CommandOutput::event(PlayerEvent::Input {
                    outcome,
                    view: self.view(),
                })
            }
            PlayerCommand::Submit => match self.session.submit(online) {
                Ok(submission) => CommandOutput {
                    outbound: Some(submission.message),
                    event: Some(PlayerEvent::Submitted {
                        harvest: submission.harvest,
                        round_num: submission.round_num,
                        removed: submission.removed,
                        view: self.view(),
                    }),
                },
                Err(reason) => {
                    debug!(%reason, "submit rejected");
                    CommandOutput::event(PlayerEvent::SubmitRejected { reason })
                }
            },
            PlayerCommand::Tick { steps } => {
                if self.session.tick(steps) {
                    CommandOutput::event(PlayerEvent::Ticked(self.view()))
                } else {
                    CommandOutput::none()
                }
            }
        }
    }

    fn outbound_failed(&mut self, message: ClientMsg) -> Option<PlayerEvent> {
        match message {
            ClientMsg::Submit { .. } if self.session.submit_failed() => {
                Some(PlayerEvent::SubmitRejected {
                    reason: SubmitRejection::Offline,
                })
            }
            _ => None,
        }
    }

    fn transport_lost(&mut self) -> Option<PlayerEvent> {
        let outcome = self.session.cancel_drag()?;
        Some(PlayerEvent::Input {
            outcome,
            view: self.view(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonsfish_core::default_zones;

    use crate::input::PointerPhase;

    fn session() -> SessionState {
        SessionState::new(Board::with_seed(default_zones(), 7))
    }

    fn snapshot(round_num: u32) -> RoomSnapshot {
        RoomSnapshot {
            room_code: "POND".to_string(),
            round_num,
            rounds_total: 5,
            stock: 100,
            max_harvest_per_player: 10,
            started: true,
            finished: false,
            players: Vec::new(),
            submitted: Default::default(),
            last_round_results: None,
            totals: Default::default(),
            scoreboard: Vec::new(),
            app_version: None,
            collapse_round: None,
            seasons_completed: round_num.saturating_sub(1),
        }
    }

    /// Drops a token into the zone matching its category.
    fn sort_token(session: &mut SessionState, token: TokenId) {
        let category = session.board().token(token).expect("token").category;
        let target = session
            .board()
            .zones()
            .iter()
            .find(|zone| zone.category == category)
            .expect("zone")
            .rect
            .center();
        assert!(matches!(
            session.place(token, target),
            DragOutcome::Dropped { zone: Some(_), .. }
        ));
    }

    #[test]
    fn classify_treats_first_and_changed_rounds_as_boundaries() {
        assert_eq!(
            classify_round(None, 1),
            RoundDecision::Boundary { previous: None }
        );
        assert_eq!(classify_round(Some(1), 1), RoundDecision::InRound);
        assert_eq!(
            classify_round(Some(1), 2),
            RoundDecision::Boundary { previous: Some(1) }
        );
        assert_eq!(
            classify_round(Some(3), 2),
            RoundDecision::Boundary { previous: Some(3) }
        );
    }

    #[test]
    fn repeated_round_keeps_local_placements() {
        let mut session = session();
        let first = apply_snapshot(&mut session, snapshot(1));
        assert!(first.is_boundary());
        assert_eq!(first.spawned, Some(10));
        sort_token(&mut session, 0);
        sort_token(&mut session, 1);

        let mut update = snapshot(1);
        update.submitted.insert(PlayerId::new("other"));
        let second = apply_snapshot(&mut session, update);
        assert_eq!(second.decision, RoundDecision::InRound);
        assert_eq!(second.spawned, None);
        assert_eq!(session.quote().correct, 2);

        let third = apply_snapshot(&mut session, snapshot(2));
        assert_eq!(third.decision, RoundDecision::Boundary { previous: Some(1) });
        assert_eq!(session.quote().correct, 0);
        assert_eq!(session.last_round_rendered(), Some(2));
    }

    #[test]
    fn lock_holds_until_the_next_round() {
        let mut session = session();
        session.set_player_id(Some(PlayerId::new("me")));
        apply_snapshot(&mut session, snapshot(1));
        for token in 0..6 {
            sort_token(&mut session, token);
        }
        let submission = session.submit(true).expect("submit");
        assert_eq!(submission.message, ClientMsg::Submit { harvest: 10 });
        assert_eq!(submission.quote.pending, 24);
        assert_eq!(submission.removed, 6);
        assert_eq!(session.submission_state(), SubmissionState::Locked { round_num: 1 });

        let mut update = snapshot(1);
        update.submitted.insert(PlayerId::new("me"));
        let outcome = apply_snapshot(&mut session, update);
        assert!(!outcome.unlocked());
        assert!(!session.tick(1.0));
        assert_eq!(
            session.submit(true).map(|submission| submission.harvest),
            Err(SubmitRejection::AlreadySubmitted { round_num: 1 })
        );

        let next = apply_snapshot(&mut session, snapshot(2));
        assert!(next.unlocked());
        assert_eq!(session.submission_state(), SubmissionState::Active);
        assert_eq!(session.board().len(), 10);
    }

    #[test]
    fn boundary_listing_our_submission_locks_immediately() {
        let mut session = session();
        session.set_player_id(Some(PlayerId::new("me")));
        let mut snap = snapshot(4);
        snap.submitted.insert(PlayerId::new("me"));
        let outcome = apply_snapshot(&mut session, snap);
        assert_eq!(outcome.after, SubmissionState::Locked { round_num: 4 });
        assert!(!session.accepts_input());
    }

    #[test]
    fn round_regression_is_still_a_boundary() {
        let mut session = session();
        apply_snapshot(&mut session, snapshot(3));
        let outcome = apply_snapshot(&mut session, snapshot(2));
        assert_eq!(outcome.decision, RoundDecision::Boundary { previous: Some(3) });
        assert_eq!(outcome.spawned, Some(10));
    }

    #[test]
    fn finishing_mid_drag_drops_the_gesture() {
        let mut session = session();
        apply_snapshot(&mut session, snapshot(1));
        let start = session.board().token(0).expect("token").pos;
        assert_eq!(
            session.pointer(PointerEvent::new(PointerPhase::Down, start.0, start.1)),
            DragOutcome::Started { token: 0 }
        );
        let net = session.board().zones()[0].rect.center();
        session.pointer(PointerEvent::new(PointerPhase::Move, net.0, net.1));
        let mut finished = snapshot(1);
        finished.finished = true;
        let outcome = apply_snapshot(&mut session, finished);
        assert_eq!(outcome.after, SubmissionState::Finished);
        assert_eq!(session.held_token(), None);
        assert_eq!(session.board().token(0).expect("token").zone, Some(0));
        assert_eq!(session.quote().correct, 1);
    }

    #[test]
    fn undelivered_submit_is_forgotten_at_the_next_round() {
        let mut sync = RoundSynchronizer::new(Board::with_seed(default_zones(), 4));
        sync.consume(snapshot(1));
        sort_token(&mut sync.session, 0);
        let output = sync.command(PlayerCommand::Submit, true);
        let message = output.outbound.expect("submit message");
        sync.consume(snapshot(2));

        assert_eq!(sync.outbound_failed(message), None);
        assert_eq!(sync.session().submission_state(), SubmissionState::Active);
        assert_eq!(sync.session().quote().correct, 0);
    }

    #[test]
    fn consumer_survives_a_dropped_transport() {
        let mut sync = RoundSynchronizer::new(Board::with_seed(default_zones(), 11));
        sync.acknowledged(Some(PlayerId::new("me")));
        sync.consume(snapshot(1));
        sort_token(&mut sync.session, 0);
        let output = sync.command(PlayerCommand::Submit, true);
        assert_eq!(output.outbound, Some(ClientMsg::Submit { harvest: 4 }));

        assert_eq!(sync.transport_lost(), None);
        let mut replay = snapshot(1);
        replay.submitted.insert(PlayerId::new("me"));
        sync.consume(replay);
        assert_eq!(
            sync.session().submission_state(),
            SubmissionState::Locked { round_num: 1 }
        );

        let offline = sync.command(PlayerCommand::Submit, false);
        assert_eq!(offline.outbound, None);
    }
}
