//! Balance constants and runtime tunables.
//!
//! Constants are the numbers the game rules are written against. `GameConfig`
//! holds the knobs a host may want to change (task periods, channel name).

// ── Player defaults ─────────────────────────────────────────────
pub const DEFAULT_CLICK_POWER: u64 = 1;
pub const DEFAULT_AUTO_MINER_POWER: u32 = 1;
pub const DEFAULT_KINGDOM_NAME: &str = "My Kingdom";

// ── Recruitment ─────────────────────────────────────────────────
pub const WARRIOR_COST: u64 = 100;
pub const WARRIOR_START_HP: u32 = 120;
pub const WARRIOR_START_STRENGTH: u32 = 15;
pub const ENEMY_START_HP: u32 = 50;
pub const ENEMY_START_GOLD: u64 = 15;
pub const ENEMY_START_LEVEL: u32 = 1;

pub const ENEMY_NAMES: [&str; 4] = ["Goblin", "Orc", "Troll", "Dark Knight"];

// ── Battle rolls ────────────────────────────────────────────────
/// Critical hit chance in percent.
pub const CRIT_CHANCE_PERCENT: u32 = 20;
pub const CRIT_MULTIPLIER: u32 = 2;
/// Enemy counter damage is `COUNTER_MIN + roll(COUNTER_SPREAD)`, i.e. 5..=14.
pub const COUNTER_MIN: u32 = 5;
pub const COUNTER_SPREAD: u32 = 10;
/// Reward after level-up is `(GOLD_MIN + roll(GOLD_SPREAD)) * level`.
pub const GOLD_MIN: u64 = 10;
pub const GOLD_SPREAD: u32 = 20;
pub const ENEMY_HP_PER_LEVEL: u32 = 10;

// ── Offline catch-up ────────────────────────────────────────────
pub const OFFLINE_ATTACKS_PER_SEC: u64 = 5;
pub const OFFLINE_GOLD_PER_ATTACK: u64 = 15;
/// Offline battle efficiency as a fraction `num / den` (50%).
pub const OFFLINE_EFFICIENCY: (u64, u64) = (1, 2);

// ── Notices ─────────────────────────────────────────────────────
pub const NOTICE_CAPACITY: usize = 50;

pub const THEMES: [&str; 5] = ["theme1", "theme2", "theme3", "theme4", "theme5"];
pub const DEFAULT_THEME: &str = "theme1";

/// Runtime tunables. `GameConfig::default()` matches the shipped game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// BroadcastChannel name shared by every tab.
    pub channel_name: String,
    /// Passive mining period.
    pub miner_period_ms: f64,
    /// Auto-battle attack period.
    pub battle_period_ms: f64,
    /// How often `lastBattleTime` is re-stamped while auto-battle runs.
    pub battle_stamp_period_ms: f64,
    /// Largest wall-clock delta a single scheduler update will consume.
    pub max_frame_delta_ms: f64,
    /// Interval of the browser timer that drives the scheduler.
    pub driver_interval_ms: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            channel_name: "clicker-game-sync".into(),
            miner_period_ms: 1000.0,
            battle_period_ms: 200.0,
            battle_stamp_period_ms: 5000.0,
            max_frame_delta_ms: 1000.0,
            driver_interval_ms: 50,
        }
    }
}
