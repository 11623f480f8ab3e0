//! Dice for battle rolls.
//!
//! Game logic only sees the `Dice` trait so tests can script exact rolls.

/// Source of uniform integer rolls.
pub trait Dice {
    /// Uniform integer in `0..bound`. `bound` must be non-zero.
    fn roll(&mut self, bound: u32) -> u32;

    /// True with probability `percent / 100`.
    fn chance(&mut self, percent: u32) -> bool {
        self.roll(100) < percent
    }
}

/// 64-bit LCG (Knuth MMIX constants). Same seed, same battle.
#[derive(Clone, Debug)]
pub struct Lcg {
    seed: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the wall clock. Good enough for cosmetic variety.
    pub fn from_time(now_ms: f64) -> Self {
        Self::new(now_ms.to_bits() ^ 0x9E37_79B9_7F4A_7C15)
    }
}

impl Dice for Lcg {
    fn roll(&mut self, bound: u32) -> u32 {
        self.seed = self
            .seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.seed >> 33) % bound.max(1) as u64) as u32
    }
}

/// Replays a fixed list of rolls, cycling when exhausted. Values are reduced
/// modulo the requested bound.
#[cfg(test)]
pub struct ScriptedDice {
    rolls: Vec<u32>,
    pos: usize,
}

#[cfg(test)]
impl ScriptedDice {
    pub fn new(rolls: &[u32]) -> Self {
        Self {
            rolls: rolls.to_vec(),
            pos: 0,
        }
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn roll(&mut self, bound: u32) -> u32 {
        let r = self.rolls[self.pos % self.rolls.len()];
        self.pos += 1;
        r % bound.max(1)
    }
}
