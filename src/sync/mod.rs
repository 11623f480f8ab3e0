//! Cross-tab synchronization.
//!
//! Every local change is broadcast as a full snapshot. Incoming snapshots go
//! through one merge rule, last-write-wins on `lastUpdate`, so replaying the
//! same snapshot twice only changes state once. When no broadcast transport
//! exists the page falls back to `storage` events, which only name the
//! changed key, so the fallback is a full reload.

pub mod bus;
#[cfg(target_arch = "wasm32")]
pub mod channel;

use serde::{Deserialize, Serialize};

use crate::console;
use crate::error::SyncError;
use crate::state::PlayerState;
use crate::store::{keys, KeyValueStore, StateStore};

/// Message discriminator on the wire.
pub const STATE_UPDATE: &str = "state-update";

/// The replicated part of `PlayerState`, in wire field names.
///
/// `kingdomName` and `lastUpdate` are optional because older pages omit
/// them; this crate always sends both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub gem_count: u64,
    pub click_power: u64,
    pub clicker_level: u32,
    pub auto_miner_level: u32,
    pub super_clicker_level: u32,
    pub my_army: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

impl Snapshot {
    pub fn of(state: &PlayerState) -> Self {
        Self {
            gem_count: state.gem_count,
            click_power: state.click_power,
            clicker_level: state.clicker_level,
            auto_miner_level: state.auto_miner_level,
            super_clicker_level: state.super_clicker_level,
            my_army: state.my_army,
            kingdom_name: Some(state.kingdom_name.clone()),
            last_update: Some(state.last_update),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Encode as a flat `{ type: "state-update", ... }` message.
pub fn encode(snapshot: &Snapshot) -> Result<String, SyncError> {
    serde_json::to_string(&Envelope {
        kind: STATE_UPDATE,
        snapshot,
    })
    .map_err(|e| SyncError::Encode(e.to_string()))
}

/// Decode a `state-update` message, flat or with the fields nested under
/// `data`. Anything else is `None`.
pub fn decode(raw: &str) -> Option<Snapshot> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if value.get("type")?.as_str()? != STATE_UPDATE {
        return None;
    }
    let body = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };
    serde_json::from_value(body).ok()
}

/// Result of offering a snapshot to the local state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Remote was newer; local state now matches it.
    Applied,
    /// Remote clock not ahead of ours; discarded.
    Stale,
    /// Remote carried no clock, so it cannot be ordered; discarded.
    Unordered,
}

/// The one merge rule: overwrite iff `snapshot.lastUpdate > local.lastUpdate`.
pub fn merge(local: &mut PlayerState, snapshot: &Snapshot) -> MergeOutcome {
    let remote_clock = match snapshot.last_update {
        Some(ts) => ts,
        None => return MergeOutcome::Unordered,
    };
    if remote_clock <= local.last_update {
        return MergeOutcome::Stale;
    }

    local.gem_count = snapshot.gem_count;
    local.click_power = snapshot.click_power.max(1);
    local.clicker_level = snapshot.clicker_level;
    local.auto_miner_level = snapshot.auto_miner_level;
    local.super_clicker_level = snapshot.super_clicker_level;
    local.my_army = snapshot.my_army;
    if let Some(name) = snapshot.kingdom_name.as_deref().filter(|n| !n.is_empty()) {
        local.kingdom_name = name.to_string();
    }
    local.last_update = remote_clock;
    MergeOutcome::Applied
}

/// A fire-and-forget channel to every other open instance.
pub trait Transport {
    /// Post to all other subscribers. The sender never receives its own post.
    fn post(&self, message: &str) -> Result<(), SyncError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, message: &str) -> Result<(), SyncError> {
        (**self).post(message)
    }
}

/// Sends local snapshots and merges remote ones.
pub struct SyncBroadcaster<T> {
    transport: Option<T>,
}

impl<T: Transport> SyncBroadcaster<T> {
    /// `None` means the platform has no broadcast channel; the storage-event
    /// fallback takes over.
    pub fn new(transport: Option<T>) -> Self {
        Self { transport }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Best effort: failures are logged and swallowed.
    pub fn broadcast(&self, state: &PlayerState) {
        let Some(transport) = &self.transport else {
            return;
        };
        let result = encode(&Snapshot::of(state)).and_then(|msg| transport.post(&msg));
        if let Err(e) = result {
            console::warn(&format!("broadcast dropped: {e}"));
        }
    }

    /// Merge a raw inbound message. An applied snapshot is persisted but not
    /// rebroadcast. `None` for messages that are not state updates.
    pub fn receive<S: KeyValueStore>(
        &self,
        store: &mut StateStore<S>,
        raw: &str,
    ) -> Option<MergeOutcome> {
        let snapshot = decode(raw)?;
        let outcome = merge(store.state_mut(), &snapshot);
        match outcome {
            MergeOutcome::Applied => store.save(),
            MergeOutcome::Unordered => {
                console::log("ignoring snapshot without lastUpdate");
            }
            MergeOutcome::Stale => {}
        }
        Some(outcome)
    }

    /// Storage-event fallback. `key` is `None` when storage was cleared.
    /// Returns true when the state was reloaded.
    pub fn storage_changed<S: KeyValueStore>(
        &self,
        store: &mut StateStore<S>,
        key: Option<&str>,
        now_ms: i64,
    ) -> bool {
        if self.is_connected() {
            return false;
        }
        let relevant = key.map_or(true, keys::is_player_key);
        if relevant {
            store.load(now_ms);
        }
        relevant
    }
}
