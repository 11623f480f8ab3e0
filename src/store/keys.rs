//! localStorage のキー一覧。ゲームが読み書きするキーはすべてここに置く。

pub const PLAYER_GEMS: &str = "playerGems";
pub const CLICK_POWER: &str = "clickPower";
pub const CLICKER_LEVEL: &str = "clickerLevel";
pub const AUTO_MINER_LEVEL: &str = "autoMinerLevel";
pub const AUTO_MINER_POWER: &str = "autoMinerPower";
pub const SUPER_CLICKER_LEVEL: &str = "superClickerLevel";
pub const MY_ARMY: &str = "myArmy";
pub const KINGDOM_NAME: &str = "kingdomName";
pub const LAST_UPDATE: &str = "lastUpdate";

pub const AUTO_ATTACK_ACTIVE: &str = "autoAttackActive";
pub const LAST_BATTLE_TIME: &str = "lastBattleTime";
pub const WARRIOR_DATA: &str = "warriorData";
pub const WARRIOR_COUNT: &str = "warriorCount";
pub const SELECTED_THEME: &str = "selectedTheme";

/// `PlayerState` を構成するキー。他タブでどれかが変わったら、
/// ローカルのコピーは古くなっている。
pub const PLAYER_KEYS: [&str; 9] = [
    PLAYER_GEMS,
    CLICK_POWER,
    CLICKER_LEVEL,
    AUTO_MINER_LEVEL,
    AUTO_MINER_POWER,
    SUPER_CLICKER_LEVEL,
    MY_ARMY,
    KINGDOM_NAME,
    LAST_UPDATE,
];

pub fn is_player_key(key: &str) -> bool {
    PLAYER_KEYS.contains(&key)
}
