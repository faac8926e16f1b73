use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::harvest::{spawn_count, token_value};

pub const TOKEN_RADIUS: f32 = 16.0;
pub const HIT_SLOP_PX: f32 = 2.0;

pub const GRID_COLS: usize = 10;
pub const GRID_ORIGIN: (f32, f32) = (70.0, 70.0);
pub const GRID_SPACING: f32 = 55.0;

pub const DRIFT_SPEED_MAX: f32 = 0.3;
pub const POND_BOUNDS: Rect = Rect::new(30.0, 40.0, 530.0, 340.0);

pub const ZONE_SLOT_INSET: (f32, f32) = (40.0, 55.0);
pub const ZONE_SLOT_SPACING: f32 = 28.0;
pub const ZONE_SLOT_COLS: u32 = 6;
pub const ZONE_SLOT_ROWS: u32 = 2;

pub type TokenId = u32;
pub type ZoneIndex = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Red,
    Blue,
}

impl Category {
    /// Spawned tokens alternate red and blue, starting with red.
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Category::Red
        } else {
            Category::Blue
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Red => "red",
            Category::Blue => "blue",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Edges count as inside.
    pub fn contains(&self, pos: (f32, f32)) -> bool {
        pos.0 >= self.x && pos.0 <= self.x + self.w && pos.1 >= self.y && pos.1 <= self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub category: Category,
    pub rect: Rect,
}

impl Zone {
    pub fn new(name: impl Into<String>, category: Category, rect: Rect) -> Self {
        Self {
            name: name.into(),
            category,
            rect,
        }
    }

    /// Resting spot for a token dropped into this zone.
    pub fn slot_for(&self, token_id: TokenId) -> (f32, f32) {
        let col = token_id % ZONE_SLOT_COLS;
        let row = (token_id % (ZONE_SLOT_COLS * ZONE_SLOT_ROWS)) / ZONE_SLOT_COLS;
        (
            self.rect.x + ZONE_SLOT_INSET.0 + col as f32 * ZONE_SLOT_SPACING,
            self.rect.y + ZONE_SLOT_INSET.1 + row as f32 * ZONE_SLOT_SPACING,
        )
    }
}

pub fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Red Net", Category::Red, Rect::new(610.0, 90.0, 220.0, 130.0)),
        Zone::new("Blue Net", Category::Blue, Rect::new(610.0, 250.0, 220.0, 130.0)),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub pos: (f32, f32),
    pub radius: f32,
    pub category: Category,
    pub zone: Option<ZoneIndex>,
    pub velocity: (f32, f32),
}

impl Token {
    pub fn in_zone(&self) -> bool {
        self.zone.is_some()
    }

    fn hit(&self, pos: (f32, f32)) -> bool {
        distance_2d(self.pos, pos) <= self.radius + HIT_SLOP_PX
    }
}

pub fn distance_2d(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Zone whose bounds contain `pos`. Overlaps go to the zone with the
/// nearest center; exact ties go to the earlier zone.
pub fn resolve_zone(zones: &[Zone], pos: (f32, f32)) -> Option<ZoneIndex> {
    let mut best: Option<(ZoneIndex, f32)> = None;
    for (idx, zone) in zones.iter().enumerate() {
        if !zone.rect.contains(pos) {
            continue;
        }
        let dist = distance_2d(pos, zone.rect.center());
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// The local sorting board: spawned tokens plus the target zones.
#[derive(Clone, Debug)]
pub struct Board {
    tokens: Vec<Token>,
    zones: Vec<Zone>,
    token_value: u64,
    rng: StdRng,
}

impl Board {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self::with_seed(zones, rand::rng().random())
    }

    pub fn with_seed(zones: Vec<Zone>, seed: u64) -> Self {
        Self {
            tokens: Vec::new(),
            zones,
            token_value: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Respawns the board for a new round and returns the token count.
    pub fn reset(&mut self, stock: u64, max_harvest_per_player: u64) -> usize {
        self.token_value = token_value(stock);
        let spawn = spawn_count(stock, max_harvest_per_player);
        self.tokens.clear();
        self.tokens.reserve(spawn);
        for index in 0..spawn {
            let col = (index % GRID_COLS) as f32;
            let row = (index / GRID_COLS) as f32;
            let velocity = (
                self.rng.random_range(-DRIFT_SPEED_MAX..=DRIFT_SPEED_MAX),
                self.rng.random_range(-DRIFT_SPEED_MAX..=DRIFT_SPEED_MAX),
            );
            self.tokens.push(Token {
                id: index as TokenId,
                pos: (
                    GRID_ORIGIN.0 + col * GRID_SPACING,
                    GRID_ORIGIN.1 + row * GRID_SPACING,
                ),
                radius: TOKEN_RADIUS,
                category: Category::for_index(index),
                zone: None,
                velocity,
            });
        }
        spawn
    }

    /// Drops a token at `pos` and recomputes its zone. A token that lands in
    /// a zone snaps to that zone's slot. Returns `None` for unknown ids.
    pub fn place(&mut self, id: TokenId, pos: (f32, f32)) -> Option<Option<ZoneIndex>> {
        let zone = resolve_zone(&self.zones, pos);
        let slot = zone
            .and_then(|idx| self.zones.get(idx))
            .map(|zone| zone.slot_for(id));
        let token = self.tokens.iter_mut().find(|token| token.id == id)?;
        token.zone = zone;
        token.pos = slot.unwrap_or(pos);
        Some(zone)
    }

    /// Moves a token without touching its zone membership (mid-drag).
    pub fn move_token(&mut self, id: TokenId, pos: (f32, f32)) -> bool {
        match self.tokens.iter_mut().find(|token| token.id == id) {
            Some(token) => {
                token.pos = pos;
                true
            }
            None => false,
        }
    }

    /// Takes out every token the predicate accepts and returns them.
    pub fn remove_matching<F>(&mut self, mut predicate: F) -> Vec<Token>
    where
        F: FnMut(&Token, Option<&Zone>) -> bool,
    {
        let zones = &self.zones;
        let (removed, kept): (Vec<Token>, Vec<Token>) = self
            .tokens
            .drain(..)
            .partition(|token| predicate(token, token.zone.and_then(|idx| zones.get(idx))));
        self.tokens = kept;
        removed
    }

    /// Takes out every correctly sorted token; used as the harvest visual.
    pub fn take_sorted(&mut self) -> Vec<Token> {
        self.remove_matching(|token, zone| zone.is_some_and(|zone| zone.category == token.category))
    }

    pub fn remove_sorted(&mut self) -> usize {
        self.take_sorted().len()
    }

    /// Puts taken tokens back in spawn order.
    pub fn restore(&mut self, tokens: Vec<Token>) {
        self.tokens.extend(tokens);
        self.tokens.sort_by_key(|token| token.id);
    }

    pub fn is_correctly_sorted(&self, token: &Token) -> bool {
        token
            .zone
            .and_then(|idx| self.zones.get(idx))
            .is_some_and(|zone| zone.category == token.category)
    }

    pub fn correctly_sorted_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| self.is_correctly_sorted(token))
            .count()
    }

    /// Topmost token under `pos`; later tokens are drawn above earlier ones.
    pub fn hit_test(&self, pos: (f32, f32)) -> Option<TokenId> {
        self.tokens
            .iter()
            .rev()
            .find(|token| token.hit(pos))
            .map(|token| token.id)
    }

    /// Advances drift by `steps` frames. Tokens in a zone and the held token
    /// stay put.
    pub fn tick(&mut self, steps: f32, held: Option<TokenId>) {
        if steps <= 0.0 {
            return;
        }
        let bounds = POND_BOUNDS;
        for token in &mut self.tokens {
            if token.in_zone() || Some(token.id) == held {
                continue;
            }
            token.pos.0 += token.velocity.0 * steps;
            token.pos.1 += token.velocity.1 * steps;
            if token.pos.0 < bounds.x || token.pos.0 > bounds.x + bounds.w {
                token.velocity.0 = -token.velocity.0;
                token.pos.0 = token.pos.0.clamp(bounds.x, bounds.x + bounds.w);
            }
            if token.pos.1 < bounds.y || token.pos.1 > bounds.y + bounds.h {
                token.velocity.1 = -token.velocity.1;
                token.pos.1 = token.pos.1.clamp(bounds.y, bounds.y + bounds.h);
            }
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|token| token.id == id)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn token_value(&self) -> u64 {
        self.token_value
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(default_zones())
    }
}
