//! Battle resolution: pure functions over a warrior and the dice.
//!
//! One attack tick: the warrior strikes (20% chance of double damage). A
//! defeated enemy pays out its gold and is replaced by a stronger one;
//! otherwise the enemy strikes back for 5..=14. A warrior knocked to 0 HP
//! is revived at full health on the spot.

use serde::Serialize;

use crate::config::{
    COUNTER_MIN, COUNTER_SPREAD, CRIT_CHANCE_PERCENT, CRIT_MULTIPLIER, ENEMY_HP_PER_LEVEL,
    ENEMY_NAMES, GOLD_MIN, GOLD_SPREAD, WARRIOR_COST,
};
use crate::rng::Dice;
use crate::state::{BattlePhase, Roster, Warrior};
use crate::store::{KeyValueStore, StateStore};

/// What one attack tick did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    pub damage: u32,
    pub critical: bool,
    /// Gold awarded when the enemy fell this tick.
    pub gold: Option<u64>,
    /// Damage taken from the enemy's counterattack.
    pub counter_damage: Option<u32>,
    pub revived: bool,
}

pub fn roll_enemy_name<D: Dice + ?Sized>(dice: &mut D) -> &'static str {
    ENEMY_NAMES[dice.roll(ENEMY_NAMES.len() as u32) as usize]
}

/// Resolve one attack by `warrior` against its enemy.
pub fn attack<D: Dice + ?Sized>(warrior: &mut Warrior, dice: &mut D) -> AttackOutcome {
    warrior.phase = BattlePhase::Attacking;

    let critical = dice.chance(CRIT_CHANCE_PERCENT);
    let damage = if critical {
        warrior.player_strength.saturating_mul(CRIT_MULTIPLIER)
    } else {
        warrior.player_strength
    };
    warrior.enemy_hp = warrior.enemy_hp.saturating_sub(damage);

    if warrior.enemy_hp == 0 {
        let gold = warrior.enemy_gold;
        level_up_enemy(warrior, dice);
        warrior.phase = BattlePhase::EnemyDefeated;
        return AttackOutcome {
            damage,
            critical,
            gold: Some(gold),
            counter_damage: None,
            revived: false,
        };
    }

    let (counter, revived) = enemy_counter(warrior, dice);
    warrior.phase = BattlePhase::EnemyCountering;
    AttackOutcome {
        damage,
        critical,
        gold: None,
        counter_damage: Some(counter),
        revived,
    }
}

/// The enemy strikes back. Returns `(damage, revived)`.
pub fn enemy_counter<D: Dice + ?Sized>(warrior: &mut Warrior, dice: &mut D) -> (u32, bool) {
    let damage = COUNTER_MIN + dice.roll(COUNTER_SPREAD);
    warrior.player_hp = warrior.player_hp.saturating_sub(damage);
    if warrior.player_hp == 0 {
        warrior.player_hp = warrior.player_max_hp;
        return (damage, true);
    }
    (damage, false)
}

/// Replace a defeated enemy with the next level's.
pub fn level_up_enemy<D: Dice + ?Sized>(warrior: &mut Warrior, dice: &mut D) {
    warrior.enemy_level = warrior.enemy_level.saturating_add(1);
    warrior.enemy_max_hp = warrior.enemy_max_hp.saturating_add(ENEMY_HP_PER_LEVEL);
    warrior.enemy_hp = warrior.enemy_max_hp;
    warrior.enemy_gold = (GOLD_MIN + dice.roll(GOLD_SPREAD) as u64) * warrior.enemy_level as u64;
    warrior.current_enemy = roll_enemy_name(dice).to_string();
}

/// Pay for and enlist a new warrior. Returns its id, or `None` (and changes
/// nothing) when the player cannot afford one.
pub fn recruit<S: KeyValueStore, D: Dice + ?Sized>(
    store: &mut StateStore<S>,
    roster: &mut Roster,
    dice: &mut D,
    now_ms: i64,
) -> Option<u32> {
    if !store.spend_gems(WARRIOR_COST, now_ms) {
        return None;
    }
    let state = store.state_mut();
    state.my_army = state.my_army.saturating_add(1);
    Some(roster.push(Warrior::recruit(roll_enemy_name(dice))))
}

/// Attack with warrior `id` and credit any gold. `None` for unknown ids.
pub fn attack_with<S: KeyValueStore, D: Dice + ?Sized>(
    store: &mut StateStore<S>,
    roster: &mut Roster,
    id: u32,
    dice: &mut D,
    now_ms: i64,
) -> Option<AttackOutcome> {
    let warrior = roster.get_mut(id)?;
    let outcome = attack(warrior, dice);
    if let Some(gold) = outcome.gold {
        store.add_gems(gold, now_ms);
    }
    Some(outcome)
}
