//! Upgrade shop. Prices are derived from the current level so they survive
//! reloads and agree across tabs.

use crate::state::PlayerState;
use crate::store::{KeyValueStore, StateStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeKind {
    /// +1 click power.
    Clicker,
    /// +1 passive miner.
    AutoMiner,
    /// +5 click power.
    SuperClicker,
}

impl UpgradeKind {
    pub fn all() -> &'static [UpgradeKind] {
        &[
            UpgradeKind::Clicker,
            UpgradeKind::AutoMiner,
            UpgradeKind::SuperClicker,
        ]
    }

    /// Page-side identifier (`data-type` on the upgrade card).
    pub fn id(&self) -> &'static str {
        match self {
            UpgradeKind::Clicker => "clicker",
            UpgradeKind::AutoMiner => "auto",
            UpgradeKind::SuperClicker => "super-clicker",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpgradeKind::Clicker => "Clicker",
            UpgradeKind::AutoMiner => "Auto Miner",
            UpgradeKind::SuperClicker => "Super Clicker",
        }
    }

    /// Price of the first purchase.
    pub fn base_cost(&self) -> u64 {
        match self {
            UpgradeKind::Clicker => 10,
            UpgradeKind::AutoMiner => 50,
            UpgradeKind::SuperClicker => 200,
        }
    }

    /// Price growth per purchase as `num / den`.
    fn growth(&self) -> (u64, u64) {
        match self {
            UpgradeKind::Clicker | UpgradeKind::AutoMiner => (3, 2),
            UpgradeKind::SuperClicker => (2, 1),
        }
    }

    /// Times this upgrade has been bought.
    pub fn level(&self, state: &PlayerState) -> u32 {
        match self {
            UpgradeKind::Clicker => state.clicker_level,
            UpgradeKind::AutoMiner => state.auto_miner_level,
            UpgradeKind::SuperClicker => state.super_clicker_level,
        }
    }

    /// Price after `level` purchases: the base cost floored through the
    /// growth factor once per purchase.
    pub fn cost_at(&self, level: u32) -> u64 {
        let (num, den) = self.growth();
        let mut cost = self.base_cost();
        for _ in 0..level {
            let next = cost.saturating_mul(num) / den;
            if next == cost || next == u64::MAX {
                return u64::MAX;
            }
            cost = next;
        }
        cost
    }

    pub fn cost(&self, state: &PlayerState) -> u64 {
        self.cost_at(self.level(state))
    }

    fn apply(&self, state: &mut PlayerState) {
        match self {
            UpgradeKind::Clicker => {
                state.click_power = state.click_power.saturating_add(1);
                state.clicker_level += 1;
            }
            UpgradeKind::AutoMiner => {
                state.auto_miner_level += 1;
            }
            UpgradeKind::SuperClicker => {
                state.click_power = state.click_power.saturating_add(5);
                state.super_clicker_level += 1;
            }
        }
    }
}

/// Try to buy an upgrade. Returns the new level, or `None` when the player
/// cannot afford it (state untouched).
pub fn buy<S: KeyValueStore>(
    store: &mut StateStore<S>,
    kind: UpgradeKind,
    now_ms: i64,
) -> Option<u32> {
    let cost = kind.cost(store.state());
    if !store.spend_gems(cost, now_ms) {
        return None;
    }
    let state = store.state_mut();
    kind.apply(state);
    Some(kind.level(state))
}
