//! Offline progress: gems credited for time spent away.
//!
//! Both formulas are flat rates. Offline battle ignores each warrior's
//! actual enemy and stats; it is an approximation, not a replay.

use crate::config::{OFFLINE_ATTACKS_PER_SEC, OFFLINE_EFFICIENCY, OFFLINE_GOLD_PER_ATTACK};

/// Whole seconds between `since_ms` and `now_ms`. Never negative.
pub fn elapsed_seconds(since_ms: i64, now_ms: i64) -> u64 {
    (now_ms.saturating_sub(since_ms).max(0) / 1000) as u64
}

/// Passive mining while away: one payout per miner per second.
pub fn offline_mining_gems(elapsed_secs: u64, auto_miner_level: u32, auto_miner_power: u32) -> u64 {
    elapsed_secs
        .saturating_mul(auto_miner_level as u64)
        .saturating_mul(auto_miner_power as u64)
}

/// What the army earned while the page was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfflineBattle {
    pub attacks: u64,
    pub gems: u64,
}

/// `attacks = elapsed × 5 × warriors`, `gems = floor(attacks × 15 × 0.5)`.
pub fn offline_battle(elapsed_secs: u64, warrior_count: u32) -> OfflineBattle {
    let attacks = elapsed_secs
        .saturating_mul(OFFLINE_ATTACKS_PER_SEC)
        .saturating_mul(warrior_count as u64);
    let (num, den) = OFFLINE_EFFICIENCY;
    let gems = attacks
        .saturating_mul(OFFLINE_GOLD_PER_ATTACK)
        .saturating_mul(num)
        / den;
    OfflineBattle { attacks, gems }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_floors_to_seconds() {
        assert_eq!(elapsed_seconds(0, 999), 0);
        assert_eq!(elapsed_seconds(0, 1000), 1);
        assert_eq!(elapsed_seconds(500, 10_499), 9);
    }

    #[test]
    fn elapsed_never_negative() {
        assert_eq!(elapsed_seconds(10_000, 0), 0);
    }

    #[test]
    fn mining_three_miners_ten_seconds() {
        assert_eq!(offline_mining_gems(10, 3, 1), 30);
    }

    #[test]
    fn mining_without_miners_earns_nothing() {
        assert_eq!(offline_mining_gems(3600, 0, 1), 0);
    }

    #[test]
    fn battle_two_warriors_ten_seconds() {
        let r = offline_battle(10, 2);
        assert_eq!(r.attacks, 100);
        assert_eq!(r.gems, 750);
    }

    #[test]
    fn battle_rounds_down_half_gems() {
        // 5 attacks * 15 * 0.5 = 37.5
        let r = offline_battle(1, 1);
        assert_eq!(r.attacks, 5);
        assert_eq!(r.gems, 37);
    }

    #[test]
    fn battle_without_warriors_earns_nothing() {
        assert_eq!(offline_battle(100, 0), OfflineBattle { attacks: 0, gems: 0 });
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_battle_gems_match_float_formula(secs in 0u64..1_000_000, warriors in 0u32..1000) {
            let r = offline_battle(secs, warriors);
            let expected = ((secs * 5 * warriors as u64) as f64 * 15.0 * 0.5).floor() as u64;
            prop_assert_eq!(r.gems, expected);
        }

        #[test]
        fn prop_mining_linear_in_time(secs in 0u64..1_000_000, level in 0u32..1000) {
            prop_assert_eq!(
                offline_mining_gems(secs * 2, level, 1),
                2 * offline_mining_gems(secs, level, 1)
            );
        }
    }
}
