//! State Store: 正となる `PlayerState` と、その永続化形式。
//!
//! ## 保存方針
//!
//! - 各フィールドは文字列として個別のキーに保存する（[`keys`] 参照）。
//! - 読み込みは失敗しない。欠損・null・壊れた値はフィールドのデフォルト値で補完する。
//! - 書き込みも呼び出し側には失敗を返さない。ストレージエラーはログに出し、
//!   メモリ上の状態をそのまま正とする。

pub mod keys;
#[cfg(target_arch = "wasm32")]
pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use crate::config::{
    DEFAULT_AUTO_MINER_POWER, DEFAULT_CLICK_POWER, DEFAULT_KINGDOM_NAME, DEFAULT_THEME, THEMES,
};
use crate::console;
use crate::error::StorageError;
use crate::state::{PlayerState, Roster, Warrior};

/// `window.localStorage` と同じ形の文字列 KV ストア。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// `parseInt(raw, 10)` と同じ規則で先頭の `[符号] 数字列` を読む。
/// 先頭の空白は読み飛ばし、数字以降は無視する。数字がなければ `None`。
/// 桁あふれは飽和させる。
fn leading_digits(raw: &str) -> Option<(bool, u64)> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let mut value: u64 = 0;
    for b in digits[..end].bytes() {
        value = value
            .saturating_mul(10)
            .saturating_add((b - b'0') as u64);
    }
    Some((negative, value))
}

/// 符号付きの `parseInt(raw, 10)`。`i64` の範囲で飽和する。
pub fn parse_int(raw: &str) -> Option<i64> {
    let (negative, value) = leading_digits(raw)?;
    let value = value.min(i64::MAX as u64) as i64;
    Some(if negative { -value } else { value })
}

/// 個数用の `parseInt(raw, 10)`。負数は 0 として読む。
/// `u64` の全範囲を保つので、`save` が書いた値はそのまま読み戻せる。
pub fn parse_count(raw: &str) -> Option<u64> {
    let (negative, value) = leading_digits(raw)?;
    Some(if negative { 0 } else { value })
}

/// 現在の `PlayerState` と、その保存先ストレージを保持する。
pub struct StateStore<S> {
    storage: S,
    state: PlayerState,
}

impl<S: KeyValueStore> StateStore<S> {
    /// `storage` を包み、現在の状態を読み込む。
    pub fn open(storage: S, now_ms: i64) -> Self {
        let state = read_state(&storage, now_ms);
        Self { storage, state }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PlayerState {
        &mut self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 全フィールドをストレージから読み直し、メモリ上のコピーを置き換える。
    pub fn load(&mut self, now_ms: i64) -> &PlayerState {
        self.state = read_state(&self.storage, now_ms);
        &self.state
    }

    /// 全フィールドを保存する。エラーはログに出すだけで返さない。
    pub fn save(&mut self) {
        if let Err(e) = self.try_save() {
            console::warn(&format!("failed to save player state: {e}"));
        }
    }

    /// 全フィールドを保存する。最初のストレージエラーで中断する。
    pub fn try_save(&mut self) -> Result<(), StorageError> {
        let s = &self.state;
        let fields = [
            (keys::PLAYER_GEMS, s.gem_count.to_string()),
            (keys::CLICK_POWER, s.click_power.to_string()),
            (keys::CLICKER_LEVEL, s.clicker_level.to_string()),
            (keys::AUTO_MINER_LEVEL, s.auto_miner_level.to_string()),
            (keys::AUTO_MINER_POWER, s.auto_miner_power.to_string()),
            (keys::SUPER_CLICKER_LEVEL, s.super_clicker_level.to_string()),
            (keys::MY_ARMY, s.my_army.to_string()),
            (keys::KINGDOM_NAME, s.kingdom_name.clone()),
            (keys::LAST_UPDATE, s.last_update.to_string()),
        ];
        for (key, value) in &fields {
            self.storage.set(key, value)?;
        }
        Ok(())
    }

    /// ジェムを加算する。常に成功する。
    pub fn add_gems(&mut self, amount: u64, now_ms: i64) {
        self.state.gem_count = self.state.gem_count.saturating_add(amount);
        self.state.touch(now_ms);
    }

    /// 残高が `amount` 以上のときだけ減算する。足りなければ何も変更しない。
    pub fn spend_gems(&mut self, amount: u64, now_ms: i64) -> bool {
        if self.state.gem_count < amount {
            return false;
        }
        self.state.gem_count -= amount;
        self.state.touch(now_ms);
        true
    }

    // ── Roster ──────────────────────────────────────────────────

    /// 戦士 `1..=warriorCount` を読み込む。最初に欠けた ID で打ち切るので、
    /// 結果の ID は常に連番になる。壊れたデータは削除し、次の保存は空の
    /// ロスターから始まる。
    pub fn load_roster(&mut self) -> Roster {
        let count = match self.read_number(keys::WARRIOR_COUNT) {
            Some(n) if n > 0 => n as u32,
            _ => return Roster::new(),
        };
        let raw = match self.read_raw(keys::WARRIOR_DATA) {
            Some(r) => r,
            None => return Roster::new(),
        };
        let mut by_id: BTreeMap<u32, Warrior> = match serde_json::from_str(&raw) {
            Ok(m) => m,
            Err(e) => {
                console::warn(&format!("warrior data is corrupt, starting fresh: {e}"));
                self.discard_roster();
                return Roster::new();
            }
        };

        let mut warriors = Vec::with_capacity(count as usize);
        for id in 1..=count {
            match by_id.remove(&id) {
                Some(mut w) => {
                    w.sanitize();
                    warriors.push(w);
                }
                None => {
                    console::warn(&format!(
                        "warrior {id} missing from saved roster, keeping {} warriors",
                        warriors.len()
                    ));
                    break;
                }
            }
        }
        Roster::from_warriors(warriors)
    }

    fn discard_roster(&mut self) {
        for key in [keys::WARRIOR_DATA, keys::WARRIOR_COUNT] {
            if let Err(e) = self.storage.remove(key) {
                console::warn(&format!("failed to remove {key}: {e}"));
            }
        }
    }

    pub fn save_roster(&mut self, roster: &Roster) {
        if let Err(e) = self.try_save_roster(roster) {
            console::warn(&format!("failed to save warriors: {e}"));
        }
    }

    pub fn try_save_roster(&mut self, roster: &Roster) -> Result<(), StorageError> {
        let by_id: BTreeMap<u32, &Warrior> = roster.iter().collect();
        let json = serde_json::to_string(&by_id).map_err(|e| StorageError::Encode {
            key: keys::WARRIOR_DATA,
            reason: e.to_string(),
        })?;
        self.storage.set(keys::WARRIOR_DATA, &json)?;
        self.storage
            .set(keys::WARRIOR_COUNT, &roster.len().to_string())
    }

    // ── Settings ────────────────────────────────────────────────

    pub fn auto_attack_active(&self) -> bool {
        self.read_raw(keys::AUTO_ATTACK_ACTIVE).as_deref() == Some("true")
    }

    pub fn set_auto_attack_active(&mut self, active: bool) {
        self.write(keys::AUTO_ATTACK_ACTIVE, if active { "true" } else { "false" });
    }

    /// 未設定、または正のタイムスタンプでなければ `None`。
    pub fn last_battle_time(&self) -> Option<i64> {
        self.read_number(keys::LAST_BATTLE_TIME).filter(|t| *t > 0)
    }

    pub fn set_last_battle_time(&mut self, now_ms: i64) {
        self.write(keys::LAST_BATTLE_TIME, &now_ms.to_string());
    }

    /// 選択中のテーマ。未知の値はデフォルトに戻す。
    pub fn theme(&self) -> String {
        match self.read_raw(keys::SELECTED_THEME) {
            Some(t) if THEMES.contains(&t.as_str()) => t,
            _ => DEFAULT_THEME.to_string(),
        }
    }

    /// 未知のテーマなら false を返し、何も書き込まない。
    pub fn set_theme(&mut self, theme: &str) -> bool {
        if !THEMES.contains(&theme) {
            return false;
        }
        self.write(keys::SELECTED_THEME, theme);
        true
    }

    // ── Raw access ──────────────────────────────────────────────

    fn read_raw(&self, key: &str) -> Option<String> {
        read_raw(&self.storage, key)
    }

    fn read_number(&self, key: &str) -> Option<i64> {
        self.read_raw(key).as_deref().and_then(parse_int)
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            console::warn(&format!("failed to write {key}: {e}"));
        }
    }
}

fn read_raw<S: KeyValueStore>(storage: &S, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(v) => v,
        Err(e) => {
            console::warn(&format!("failed to read {key}: {e}"));
            None
        }
    }
}

/// `PlayerState` を読む。使えない値はデフォルトで置き換える。
fn read_state<S: KeyValueStore>(storage: &S, now_ms: i64) -> PlayerState {
    let number = |key: &str| read_raw(storage, key).as_deref().and_then(parse_int);
    let count = |key: &str| read_raw(storage, key).as_deref().and_then(parse_count);
    let level = |key: &str| number(key).map_or(0, |n| n.clamp(0, u32::MAX as i64) as u32);

    PlayerState {
        gem_count: count(keys::PLAYER_GEMS).unwrap_or(0),
        click_power: count(keys::CLICK_POWER)
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_CLICK_POWER),
        clicker_level: level(keys::CLICKER_LEVEL),
        auto_miner_level: level(keys::AUTO_MINER_LEVEL),
        auto_miner_power: number(keys::AUTO_MINER_POWER)
            .filter(|n| *n >= 1)
            .map_or(DEFAULT_AUTO_MINER_POWER, |n| n.min(u32::MAX as i64) as u32),
        super_clicker_level: level(keys::SUPER_CLICKER_LEVEL),
        my_army: level(keys::MY_ARMY),
        kingdom_name: read_raw(storage, keys::KINGDOM_NAME)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_KINGDOM_NAME.to_string()),
        last_update: number(keys::LAST_UPDATE)
            .filter(|n| *n > 0)
            .unwrap_or(now_ms),
    }
}
