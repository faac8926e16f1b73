use commonsfish_core::tokens::ZoneIndex;
use commonsfish_core::TokenId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointerId(pub i32);

impl PointerId {
    pub const MOUSE: PointerId = PointerId(1);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// Pointer left the interactive surface.
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub pointer: PointerId,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            pointer: PointerId::MOUSE,
            x,
            y,
        }
    }

    pub fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGesture {
    pub token: TokenId,
    pub pointer: PointerId,
    pub last_pos: (f32, f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    Started { token: TokenId },
    Moved { token: TokenId },
    Dropped { token: TokenId, zone: Option<ZoneIndex> },
    /// Pointer down on empty water.
    Missed,
    /// Board input is closed (locked, finished, not started, overfished).
    Rejected,
    /// Event for a pointer that holds nothing.
    Ignored,
}

/// Tracks the single in-flight drag. One pointer at a time; a second
/// pointer going down while a drag is active is ignored.
#[derive(Clone, Debug, Default)]
pub struct DragTracker {
    active: Option<DragGesture>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn active(&self) -> Option<DragGesture> {
        self.active
    }

    pub fn held_token(&self) -> Option<TokenId> {
        self.active.map(|gesture| gesture.token)
    }

    pub fn begin(&mut self, token: TokenId, pointer: PointerId, pos: (f32, f32)) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(DragGesture {
            token,
            pointer,
            last_pos: pos,
        });
        true
    }

    pub fn update(&mut self, pointer: PointerId, pos: (f32, f32)) -> Option<TokenId> {
        let gesture = self.active.as_mut()?;
        if gesture.pointer != pointer {
            return None;
        }
        gesture.last_pos = pos;
        Some(gesture.token)
    }

    /// Ends the drag for `pointer`, if it owns one.
    pub fn finish(&mut self, pointer: PointerId) -> Option<DragGesture> {
        match self.active {
            Some(gesture) if gesture.pointer == pointer => self.active.take(),
            _ => None,
        }
    }

    /// Ends whatever drag is in flight regardless of pointer.
    pub fn cancel(&mut self) -> Option<DragGesture> {
        self.active.take()
    }

    /// Forgets the drag without finalizing it (board was respawned).
    pub fn clear(&mut self) {
        self.active = None;
    }
}
