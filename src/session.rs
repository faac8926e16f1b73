use commonsfish_core::harvest::{clamp_harvest, quote};
use commonsfish_core::{Board, ClientMsg, HarvestQuote, PlayerId, RoomSnapshot, Token, TokenId};
use tracing::{debug, info};

use crate::input::{DragGesture, DragOutcome, DragTracker, PointerEvent, PointerPhase};
use crate::submission::{SubmissionMachine, SubmissionState, SubmitRejection};

/// A submit that went through: the message to send plus what it removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub message: ClientMsg,
    pub round_num: u32,
    pub harvest: u64,
    pub quote: HarvestQuote,
    pub removed: usize,
}

/// Everything one connected player client knows. Survives reconnects; only
/// the transport is rebuilt.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub(crate) snapshot: Option<RoomSnapshot>,
    pub(crate) last_round_rendered: Option<u32>,
    pub(crate) submission: SubmissionMachine,
    pub(crate) board: Board,
    pub(crate) drag: DragTracker,
    pub(crate) player_id: Option<PlayerId>,
    /// Tokens taken by the last submit, kept until it is known to be sent.
    pub(crate) unsent: Option<(u32, Vec<Token>)>,
}

impl SessionState {
    pub fn new(board: Board) -> Self {
        Self {
            snapshot: None,
            last_round_rendered: None,
            submission: SubmissionMachine::new(),
            board,
            drag: DragTracker::new(),
            player_id: None,
            unsent: None,
        }
    }

    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_round_rendered(&self) -> Option<u32> {
        self.last_round_rendered
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission.state()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        self.player_id.as_ref()
    }

    pub fn set_player_id(&mut self, player_id: Option<PlayerId>) {
        if player_id.is_some() {
            self.player_id = player_id;
        }
    }

    pub fn held_token(&self) -> Option<TokenId> {
        self.drag.held_token()
    }

    /// Current catch, recomputed from the board every time.
    pub fn quote(&self) -> HarvestQuote {
        quote(&self.board)
    }

    pub fn accepts_input(&self) -> bool {
        self.submission.accepts_input()
            && self
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| !snapshot.is_overfished())
    }

    pub fn pointer(&mut self, event: PointerEvent) -> DragOutcome {
        let pos = event.pos();
        match event.phase {
            PointerPhase::Down => {
                if self.drag.active().is_some() {
                    return DragOutcome::Ignored;
                }
                if !self.accepts_input() {
                    return DragOutcome::Rejected;
                }
                let Some(token) = self.board.hit_test(pos) else {
                    return DragOutcome::Missed;
                };
                self.drag.begin(token, event.pointer, pos);
                debug!(token, "drag started");
                DragOutcome::Started { token }
            }
            PointerPhase::Move => match self.drag.update(event.pointer, pos) {
                Some(token) => {
                    self.board.move_token(token, pos);
                    DragOutcome::Moved { token }
                }
                None => DragOutcome::Ignored,
            },
            PointerPhase::Up => {
                if self.drag.update(event.pointer, pos).is_none() {
                    return DragOutcome::Ignored;
                }
                match self.drag.finish(event.pointer) {
                    Some(gesture) => self.drop_gesture(gesture),
                    None => DragOutcome::Ignored,
                }
            }
            PointerPhase::Leave => self.cancel_drag().unwrap_or(DragOutcome::Ignored),
        }
    }

    /// Direct drop without a gesture, subject to the same input gate.
    pub fn place(&mut self, token: TokenId, pos: (f32, f32)) -> DragOutcome {
        if !self.accepts_input() {
            return DragOutcome::Rejected;
        }
        if self.drag.held_token() == Some(token) {
            self.drag.clear();
        }
        match self.board.place(token, pos) {
            Some(zone) => DragOutcome::Dropped { token, zone },
            None => DragOutcome::Ignored,
        }
    }

    /// Finalizes an in-flight drag at its last known position.
    pub fn cancel_drag(&mut self) -> Option<DragOutcome> {
        let gesture = self.drag.cancel()?;
        Some(self.drop_gesture(gesture))
    }

    fn drop_gesture(&mut self, gesture: DragGesture) -> DragOutcome {
        let zone = self.board.place(gesture.token, gesture.last_pos).flatten();
        debug!(token = gesture.token, zone = ?zone, "drag finished");
        DragOutcome::Dropped {
            token: gesture.token,
            zone,
        }
    }

    /// Advances token drift. Frozen while waiting for the round to resolve.
    pub fn tick(&mut self, steps: f32) -> bool {
        if self.submission.is_locked() {
            return false;
        }
        self.board.tick(steps, self.drag.held_token());
        true
    }

    /// Locks the round, removes the harvested tokens and returns the
    /// message to send. Rejections leave the session untouched.
    pub fn submit(&mut self, online: bool) -> Result<Submission, SubmitRejection> {
        self.submission.check(self.snapshot.as_ref(), online)?;
        self.cancel_drag();
        let quote = self.quote();
        let (round_num, max_harvest) = self
            .snapshot
            .as_ref()
            .map(|snapshot| (snapshot.round_num, snapshot.max_harvest_per_player))
            .ok_or(SubmitRejection::NoSnapshot)?;
        let harvest = clamp_harvest(quote.pending, max_harvest);
        let message = self
            .submission
            .submit(self.snapshot.as_ref(), harvest, online)?;
        let taken = self.board.take_sorted();
        let removed = taken.len();
        self.unsent = Some((round_num, taken));
        info!(
            round_num,
            harvest,
            pending = quote.pending,
            removed,
            "harvest submitted"
        );
        Ok(Submission {
            message,
            round_num,
            harvest,
            quote,
            removed,
        })
    }

    /// Reverts the last submit after its message failed to go out: the round
    /// unlocks and the harvested tokens return to their nets.
    pub fn submit_failed(&mut self) -> bool {
        let Some((round_num, tokens)) = self.unsent.take() else {
            return false;
        };
        if !self.submission.rollback(round_num) {
            return false;
        }
        let restored = tokens.len();
        self.board.restore(tokens);
        info!(round_num, restored, "submit not delivered, round unlocked");
        true
    }
}
