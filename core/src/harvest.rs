use serde::{Deserialize, Serialize};

use crate::tokens::Board;

/// Upper bound on tokens shown for a round, however large the stock is.
pub const MAX_VISIBLE_TOKENS: u64 = 30;

pub fn display_count(stock: u64) -> u64 {
    stock.min(MAX_VISIBLE_TOKENS)
}

/// Face value of one token: the slice of the real stock it stands for.
pub fn token_value(stock: u64) -> u64 {
    let shown = display_count(stock).max(1);
    stock.div_ceil(shown).max(1)
}

pub fn spawn_count(stock: u64, max_harvest_per_player: u64) -> usize {
    let count = display_count(stock).min(max_harvest_per_player);
    usize::try_from(count).unwrap_or(usize::MAX)
}

pub fn pending_harvest(correct: usize, token_value: u64) -> u64 {
    (correct as u64).saturating_mul(token_value)
}

/// Client-side clamp applied before sending. The coordinator clamps again
/// and its value is the one that counts.
pub fn clamp_harvest(value: u64, max_harvest_per_player: u64) -> u64 {
    value.min(max_harvest_per_player)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HarvestQuote {
    pub correct: usize,
    pub token_value: u64,
    pub pending: u64,
}

pub fn quote(board: &Board) -> HarvestQuote {
    let correct = board.correctly_sorted_count();
    let token_value = board.token_value();
    HarvestQuote {
        correct,
        token_value,
        pending: pending_harvest(correct, token_value),
    }
}
