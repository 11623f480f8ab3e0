//! Player and battle state definitions.

use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_AUTO_MINER_POWER, DEFAULT_CLICK_POWER, DEFAULT_KINGDOM_NAME, ENEMY_START_GOLD,
    ENEMY_START_HP, ENEMY_START_LEVEL, WARRIOR_START_HP, WARRIOR_START_STRENGTH,
};

/// The shared player record, replicated across tabs.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub gem_count: u64,
    /// Gems per manual click (always >= 1).
    pub click_power: u64,
    pub clicker_level: u32,
    pub auto_miner_level: u32,
    /// Gems per miner per second.
    pub auto_miner_power: u32,
    pub super_clicker_level: u32,
    /// Recruited warriors; mirrors the roster length.
    pub my_army: u32,
    pub kingdom_name: String,
    /// Logical clock (ms) used for last-write-wins between tabs.
    pub last_update: i64,
}

impl PlayerState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            gem_count: 0,
            click_power: DEFAULT_CLICK_POWER,
            clicker_level: 0,
            auto_miner_level: 0,
            auto_miner_power: DEFAULT_AUTO_MINER_POWER,
            super_clicker_level: 0,
            my_army: 0,
            kingdom_name: DEFAULT_KINGDOM_NAME.into(),
            last_update: now_ms,
        }
    }

    /// Advance the logical clock for a local mutation. Strictly increasing
    /// even if the wall clock stalls or steps back.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_update = now_ms.max(self.last_update.saturating_add(1));
    }

    /// Passive income per second.
    pub fn gems_per_second(&self) -> u64 {
        self.auto_miner_level as u64 * self.auto_miner_power as u64
    }
}

/// Where a warrior's fight stands after the latest transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BattlePhase {
    /// Freshly recruited or loaded, no attack yet.
    #[default]
    Idle,
    /// Mid-attack (only observable inside a transition).
    Attacking,
    /// The enemy survived and struck back.
    EnemyCountering,
    /// The enemy fell; a stronger one took its place.
    EnemyDefeated,
}

/// One recruited warrior and the enemy it is paired with.
///
/// Field names serialize in the `warriorData` camelCase layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warrior {
    #[serde(rename = "playerHP")]
    pub player_hp: u32,
    #[serde(rename = "playerMaxHP")]
    pub player_max_hp: u32,
    pub player_strength: u32,
    #[serde(rename = "enemyHP")]
    pub enemy_hp: u32,
    #[serde(rename = "enemyMaxHP")]
    pub enemy_max_hp: u32,
    pub enemy_gold: u64,
    pub enemy_level: u32,
    pub current_enemy: String,
    #[serde(skip)]
    pub phase: BattlePhase,
}

impl Warrior {
    /// Starting stats for a fresh recruit facing `enemy`.
    pub fn recruit(enemy: &str) -> Self {
        Self {
            player_hp: WARRIOR_START_HP,
            player_max_hp: WARRIOR_START_HP,
            player_strength: WARRIOR_START_STRENGTH,
            enemy_hp: ENEMY_START_HP,
            enemy_max_hp: ENEMY_START_HP,
            enemy_gold: ENEMY_START_GOLD,
            enemy_level: ENEMY_START_LEVEL,
            current_enemy: enemy.to_string(),
            phase: BattlePhase::Idle,
        }
    }

    /// Pull HP back into `[0, max]` and fix impossible levels. Applied to
    /// anything read from storage.
    pub fn sanitize(&mut self) {
        self.player_max_hp = self.player_max_hp.max(1);
        self.player_hp = self.player_hp.min(self.player_max_hp);
        self.enemy_max_hp = self.enemy_max_hp.max(1);
        self.enemy_hp = self.enemy_hp.min(self.enemy_max_hp);
        self.enemy_level = self.enemy_level.max(1);
    }
}

/// The player's warriors. Ids are 1-based and contiguous: warrior `id`
/// lives at index `id - 1`. Warriors are only ever appended.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Roster {
    warriors: Vec<Warrior>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_warriors(warriors: Vec<Warrior>) -> Self {
        Self { warriors }
    }

    /// Append a warrior and return its id.
    pub fn push(&mut self, warrior: Warrior) -> u32 {
        self.warriors.push(warrior);
        self.warriors.len() as u32
    }

    pub fn get(&self, id: u32) -> Option<&Warrior> {
        let idx = (id as usize).checked_sub(1)?;
        self.warriors.get(idx)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Warrior> {
        let idx = (id as usize).checked_sub(1)?;
        self.warriors.get_mut(idx)
    }

    pub fn len(&self) -> u32 {
        self.warriors.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.warriors.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u32> {
        1..=self.len()
    }

    /// `(id, warrior)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Warrior)> {
        self.warriors
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u32 + 1, w))
    }
}
