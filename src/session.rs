//! One page load's worth of game: the state store, the sync broadcaster,
//! the roster and the scheduler, wired together.
//!
//! UI handlers call the operations here. Every operation that changes
//! `PlayerState` persists it and broadcasts a snapshot before returning, so
//! other tabs see the change without the caller doing anything.

use std::collections::VecDeque;

use serde::Serialize;

use crate::battle::{self, AttackOutcome};
use crate::config::{GameConfig, NOTICE_CAPACITY, WARRIOR_COST};
use crate::console;
use crate::idle::{self, OfflineBattle};
use crate::rng::{Dice, Lcg};
use crate::shop::{self, UpgradeKind};
use crate::state::{PlayerState, Roster};
use crate::store::{KeyValueStore, StateStore};
use crate::sync::{MergeOutcome, SyncBroadcaster, Transport};
use crate::time::{Clock, Scheduler, SystemClock, Task};

/// Which page this session belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Clicker,
    Battle,
}

impl View {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clicker" => Some(View::Clicker),
            "battle" => Some(View::Battle),
            _ => None,
        }
    }
}

/// A user-facing message (the page shows these as toasts).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub text: String,
    pub is_important: bool,
}

/// Time and randomness, injected so tests can drive both.
pub struct Env {
    pub clock: Box<dyn Clock>,
    pub dice: Box<dyn Dice>,
}

impl Env {
    pub fn system() -> Self {
        let clock = SystemClock;
        let dice = Lcg::from_time(clock.now_ms());
        Self {
            clock: Box::new(clock),
            dice: Box::new(dice),
        }
    }
}

/// What `resume` credited for the time the page was closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResumeReport {
    pub mined: u64,
    pub battle: Option<OfflineBattle>,
}

pub struct Session<S, T> {
    view: View,
    store: StateStore<S>,
    sync: SyncBroadcaster<T>,
    roster: Roster,
    scheduler: Scheduler,
    env: Env,
    notices: VecDeque<Notice>,
}

impl<S: KeyValueStore, T: Transport> Session<S, T> {
    /// Load state and start passive mining. Offline progress is applied
    /// separately by `resume`, once the page is ready to show notices.
    pub fn new(view: View, storage: S, transport: Option<T>, env: Env, config: &GameConfig) -> Self {
        let now = env.clock.now_ms();
        let mut store = StateStore::open(storage, now as i64);
        let roster = store.load_roster();

        let mut scheduler = Scheduler::new(config.max_frame_delta_ms);
        scheduler.register(Task::Miner, config.miner_period_ms);
        scheduler.register(Task::AutoBattle, config.battle_period_ms);
        scheduler.register(Task::BattleStamp, config.battle_stamp_period_ms);
        scheduler.start(Task::Miner);
        scheduler.update(now);

        let sync = SyncBroadcaster::new(transport);
        if !sync.is_connected() {
            console::log("no broadcast channel, syncing through storage events");
        }

        Self {
            view,
            store,
            sync,
            roster,
            scheduler,
            env,
            notices: VecDeque::new(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn state(&self) -> &PlayerState {
        self.store.state()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn is_auto_battle_running(&self) -> bool {
        self.scheduler.is_running(Task::AutoBattle)
    }

    pub fn upgrade_cost(&self, kind: UpgradeKind) -> u64 {
        kind.cost(self.store.state())
    }

    pub fn theme(&self) -> String {
        self.store.theme()
    }

    /// Take all pending notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Credit offline progress and pick auto-battle back up if it was on.
    pub fn resume(&mut self) -> ResumeReport {
        let now = self.now();
        let mut report = ResumeReport::default();

        let state = self.store.state();
        let away = idle::elapsed_seconds(state.last_update, now);
        report.mined = idle::offline_mining_gems(away, state.auto_miner_level, state.auto_miner_power);
        if report.mined > 0 {
            self.store.add_gems(report.mined, now);
            self.commit();
        }

        if self.view == View::Battle && self.store.auto_attack_active() {
            let since = self.store.last_battle_time().unwrap_or(now);
            let away = idle::elapsed_seconds(since, now);
            if away > 0 && !self.roster.is_empty() {
                let earned = idle::offline_battle(away, self.roster.len());
                if earned.gems > 0 {
                    self.store.add_gems(earned.gems, now);
                    self.commit();
                    self.notify(
                        format!("Warriors earned {} gems while you were away!", earned.gems),
                        true,
                    );
                }
                report.battle = Some(earned);
            }
            self.store.set_last_battle_time(now);

            if !self.roster.is_empty() {
                self.scheduler.start(Task::AutoBattle);
                self.scheduler.start(Task::BattleStamp);
            }
        }
        report
    }

    /// Drive the scheduler to the current time. Returns true when state
    /// changed and the page should repaint.
    pub fn tick(&mut self) -> bool {
        let now = self.now();
        let mut player_changed = false;
        let mut roster_changed = false;

        for (task, fires) in self.scheduler.update(now as f64) {
            match task {
                Task::Miner => {
                    let gems = self
                        .store
                        .state()
                        .gems_per_second()
                        .saturating_mul(fires as u64);
                    if gems > 0 {
                        self.store.add_gems(gems, now);
                        player_changed = true;
                    }
                }
                Task::AutoBattle => {
                    for _ in 0..fires {
                        for id in self.roster.ids() {
                            let out = battle::attack_with(
                                &mut self.store,
                                &mut self.roster,
                                id,
                                self.env.dice.as_mut(),
                                now,
                            );
                            if out.is_some_and(|o| o.gold.is_some()) {
                                player_changed = true;
                            }
                        }
                    }
                    roster_changed |= !self.roster.is_empty();
                }
                Task::BattleStamp => self.store.set_last_battle_time(now),
            }
        }

        if roster_changed {
            self.store.save_roster(&self.roster);
        }
        if player_changed {
            self.commit();
        }
        player_changed || roster_changed
    }

    // ── Player actions ──────────────────────────────────────────

    /// Manual click on the gem. Returns the gems granted.
    pub fn click(&mut self) -> u64 {
        let now = self.now();
        let power = self.store.state().click_power;
        self.store.add_gems(power, now);
        self.commit();
        power
    }

    pub fn buy_upgrade(&mut self, kind: UpgradeKind) -> bool {
        let now = self.now();
        match shop::buy(&mut self.store, kind, now) {
            Some(level) => {
                self.commit();
                self.notify(format!("{} level {} purchased!", kind.name(), level), false);
                true
            }
            None => {
                self.notify("Not enough gems!".into(), false);
                false
            }
        }
    }

    /// Recruit a warrior. Returns its id.
    pub fn recruit(&mut self) -> Option<u32> {
        let now = self.now();
        let id = battle::recruit(&mut self.store, &mut self.roster, self.env.dice.as_mut(), now);
        match id {
            Some(_) => {
                self.store.save_roster(&self.roster);
                self.commit();
                self.notify("Warrior added to your army!".into(), false);
            }
            None => {
                self.notify(format!("Not enough gems! Need {WARRIOR_COST} gems."), false);
            }
        }
        id
    }

    /// Manual attack by warrior `id`.
    pub fn attack(&mut self, id: u32) -> Option<AttackOutcome> {
        let now = self.now();
        let out = battle::attack_with(
            &mut self.store,
            &mut self.roster,
            id,
            self.env.dice.as_mut(),
            now,
        )?;
        self.store.save_roster(&self.roster);
        if out.gold.is_some() {
            self.commit();
        }
        Some(out)
    }

    /// Flip auto-battle. Returns whether it is now running.
    pub fn toggle_auto_battle(&mut self) -> bool {
        if self.is_auto_battle_running() {
            self.scheduler.stop(Task::AutoBattle);
            self.scheduler.stop(Task::BattleStamp);
            self.store.set_auto_attack_active(false);
            self.notify("Auto Attack stopped".into(), false);
            return false;
        }
        if self.roster.is_empty() {
            self.notify("Add warriors first!".into(), false);
            return false;
        }
        let now = self.now();
        self.store.set_auto_attack_active(true);
        self.store.set_last_battle_time(now);
        self.scheduler.start(Task::AutoBattle);
        self.scheduler.start(Task::BattleStamp);
        self.notify(
            "Auto Attack activated - Warriors will fight even when you leave!".into(),
            false,
        );
        true
    }

    /// Rename the kingdom. Blank names are ignored.
    pub fn set_kingdom_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let now = self.now();
        let state = self.store.state_mut();
        state.kingdom_name = name.to_string();
        state.touch(now);
        self.commit();
        true
    }

    pub fn set_theme(&mut self, theme: &str) -> bool {
        self.store.set_theme(theme)
    }

    // ── Inbound sync ────────────────────────────────────────────

    /// A message from another tab. Returns true when local state changed.
    pub fn receive(&mut self, raw: &str) -> bool {
        let applied = self.sync.receive(&mut self.store, raw) == Some(MergeOutcome::Applied);
        if applied {
            self.refresh_roster();
        }
        applied
    }

    /// A `storage` event from another tab (`key` is `None` on clear).
    /// Only acted on when there is no broadcast channel.
    pub fn storage_changed(&mut self, key: Option<&str>) -> bool {
        let now = self.now();
        let reloaded = self.sync.storage_changed(&mut self.store, key, now);
        if reloaded {
            self.refresh_roster();
        }
        reloaded
    }

    // ── Internals ───────────────────────────────────────────────

    fn now(&self) -> i64 {
        self.env.clock.now_ms() as i64
    }

    fn commit(&mut self) {
        self.store.save();
        self.sync.broadcast(self.store.state());
    }

    /// Another tab recruited: pick up the warriors it saved.
    fn refresh_roster(&mut self) {
        if self.store.state().my_army <= self.roster.len() {
            return;
        }
        let saved = self.store.load_roster();
        if saved.len() > self.roster.len() {
            self.roster = saved;
        }
    }

    fn notify(&mut self, text: String, is_important: bool) {
        self.notices.push_back(Notice { text, is_important });
        if self.notices.len() > NOTICE_CAPACITY {
            self.notices.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedDice;
    use crate::store::keys;
    use crate::store::memory::MemoryStorage;
    use crate::sync::bus::{BusPort, LocalBus};
    use crate::time::ManualClock;

    const T0: f64 = 1_700_000_000_000.0;

    fn env(clock: &ManualClock, rolls: &[u32]) -> Env {
        Env {
            clock: Box::new(clock.clone()),
            dice: Box::new(ScriptedDice::new(rolls)),
        }
    }

    fn session(view: View, storage: MemoryStorage, clock: &ManualClock) -> Session<MemoryStorage, BusPort> {
        Session::new(view, storage, None, env(clock, &[99]), &GameConfig::default())
    }

    fn seeded(pairs: &[(&str, &str)]) -> MemoryStorage {
        let mut s = MemoryStorage::new();
        for (k, v) in pairs {
            s.set(k, v).unwrap();
        }
        s
    }

    #[test]
    fn click_adds_click_power_and_persists() {
        let clock = ManualClock::new(T0);
        let storage = MemoryStorage::new();
        let mut s = session(View::Clicker, storage.clone(), &clock);
        assert_eq!(s.click(), 1);
        assert_eq!(s.state().gem_count, 1);
        assert_eq!(storage.get(keys::PLAYER_GEMS).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn buy_upgrade_reports_notice() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Clicker, seeded(&[(keys::PLAYER_GEMS, "10")]), &clock);
        assert!(s.buy_upgrade(UpgradeKind::Clicker));
        assert_eq!(s.state().click_power, 2);
        assert!(!s.buy_upgrade(UpgradeKind::Clicker));
        let notices = s.drain_notices();
        assert_eq!(notices[0].text, "Clicker level 1 purchased!");
        assert_eq!(notices[1].text, "Not enough gems!");
        assert!(s.drain_notices().is_empty());
    }

    #[test]
    fn miner_task_pays_every_second() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Clicker, seeded(&[(keys::AUTO_MINER_LEVEL, "3")]), &clock);
        clock.advance(999.0);
        assert!(!s.tick());
        clock.advance(1.0);
        assert!(s.tick());
        assert_eq!(s.state().gem_count, 3);
    }

    #[test]
    fn resume_credits_offline_mining() {
        let clock = ManualClock::new(T0);
        let t = (T0 as i64 - 10_000).to_string();
        let storage = seeded(&[(keys::AUTO_MINER_LEVEL, "3"), (keys::LAST_UPDATE, &t)]);
        let mut s = session(View::Clicker, storage, &clock);
        let report = s.resume();
        assert_eq!(report.mined, 30);
        assert_eq!(s.state().gem_count, 30);
        assert_eq!(s.state().last_update, T0 as i64);
    }

    #[test]
    fn resume_credits_offline_battle() {
        let clock = ManualClock::new(T0);
        let storage = MemoryStorage::new();
        {
            let mut s = session(View::Battle, storage.clone(), &clock);
            s.store.add_gems(200, T0 as i64);
            s.recruit();
            s.recruit();
            assert!(s.toggle_auto_battle());
        }

        clock.advance(10_000.0);
        let mut s = session(View::Battle, storage, &clock);
        let report = s.resume();
        assert_eq!(report.battle, Some(OfflineBattle { attacks: 100, gems: 750 }));
        assert_eq!(s.state().gem_count, 750);
        assert!(s.is_auto_battle_running());
        let notices = s.drain_notices();
        assert_eq!(notices[0].text, "Warriors earned 750 gems while you were away!");
        assert!(notices[0].is_important);
    }

    #[test]
    fn zero_last_battle_time_credits_nothing() {
        let clock = ManualClock::new(T0);
        let storage = MemoryStorage::new();
        {
            let mut s = session(View::Battle, storage.clone(), &clock);
            s.store.add_gems(100, T0 as i64);
            s.recruit();
            assert!(s.toggle_auto_battle());
        }
        storage.clone().set(keys::LAST_BATTLE_TIME, "0").unwrap();

        clock.advance(10_000.0);
        let mut s = session(View::Battle, storage.clone(), &clock);
        let report = s.resume();
        assert_eq!(report.battle, None);
        assert_eq!(s.state().gem_count, 0);
        assert!(s.drain_notices().is_empty());
        assert!(s.is_auto_battle_running());
        assert_eq!(
            storage.get(keys::LAST_BATTLE_TIME).unwrap(),
            Some((T0 as i64 + 10_000).to_string())
        );
    }

    #[test]
    fn clicker_view_skips_offline_battle() {
        let clock = ManualClock::new(T0);
        let t = (T0 as i64 - 10_000).to_string();
        let storage = seeded(&[(keys::AUTO_ATTACK_ACTIVE, "true"), (keys::LAST_BATTLE_TIME, &t)]);
        let mut s = session(View::Clicker, storage, &clock);
        assert_eq!(s.resume().battle, None);
        assert!(!s.is_auto_battle_running());
    }

    #[test]
    fn recruit_exactly_once_with_hundred_gems() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Battle, seeded(&[(keys::PLAYER_GEMS, "100")]), &clock);
        assert_eq!(s.recruit(), Some(1));
        assert_eq!(s.recruit(), None);
        assert_eq!(s.state().gem_count, 0);
        assert_eq!(s.state().my_army, 1);
        assert_eq!(s.roster().len(), 1);
        let w = s.roster().get(1).unwrap();
        assert_eq!((w.player_hp, w.player_max_hp), (120, 120));
        let texts: Vec<_> = s.drain_notices().into_iter().map(|n| n.text).collect();
        assert_eq!(
            texts,
            vec!["Warrior added to your army!", "Not enough gems! Need 100 gems."]
        );
    }

    #[test]
    fn recruit_persists_roster() {
        let clock = ManualClock::new(T0);
        let storage = seeded(&[(keys::PLAYER_GEMS, "100")]);
        let mut s = session(View::Battle, storage.clone(), &clock);
        s.recruit();
        let reopened = session(View::Battle, storage, &clock);
        assert_eq!(reopened.roster().len(), 1);
    }

    #[test]
    fn auto_battle_needs_warriors() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Battle, MemoryStorage::new(), &clock);
        assert!(!s.toggle_auto_battle());
        assert_eq!(s.drain_notices()[0].text, "Add warriors first!");
    }

    #[test]
    fn auto_battle_attacks_every_200ms_and_stops() {
        let clock = ManualClock::new(T0);
        let storage = seeded(&[(keys::PLAYER_GEMS, "100")]);
        let mut s = session(View::Battle, storage.clone(), &clock);
        s.recruit();
        assert!(s.toggle_auto_battle());
        assert_eq!(storage.get(keys::AUTO_ATTACK_ACTIVE).unwrap().as_deref(), Some("true"));

        clock.advance(200.0);
        assert!(s.tick());
        // no crit (roll 99), counter 5 + 99 % 10 = 14
        assert_eq!(s.roster().get(1).unwrap().enemy_hp, 35);
        assert_eq!(s.roster().get(1).unwrap().player_hp, 106);

        assert!(!s.toggle_auto_battle());
        assert_eq!(storage.get(keys::AUTO_ATTACK_ACTIVE).unwrap().as_deref(), Some("false"));
        clock.advance(1000.0);
        s.tick();
        assert_eq!(s.roster().get(1).unwrap().enemy_hp, 35);
    }

    #[test]
    fn battle_stamp_refreshes_last_battle_time() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Battle, seeded(&[(keys::PLAYER_GEMS, "100")]), &clock);
        s.recruit();
        s.toggle_auto_battle();
        for _ in 0..5 {
            clock.advance(1000.0);
            s.tick();
        }
        assert_eq!(s.store().last_battle_time(), Some(T0 as i64 + 5000));
    }

    #[test]
    fn kingdom_name_is_trimmed_and_blank_ignored() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Clicker, MemoryStorage::new(), &clock);
        assert!(!s.set_kingdom_name("   "));
        assert_eq!(s.state().kingdom_name, "My Kingdom");
        assert!(s.set_kingdom_name("  Gemhold "));
        assert_eq!(s.state().kingdom_name, "Gemhold");
    }

    #[test]
    fn theme_selection_persists() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Clicker, MemoryStorage::new(), &clock);
        assert!(s.set_theme("theme4"));
        assert!(!s.set_theme("plaid"));
        assert_eq!(s.theme(), "theme4");
    }

    #[test]
    fn notices_are_bounded() {
        let clock = ManualClock::new(T0);
        let mut s = session(View::Clicker, MemoryStorage::new(), &clock);
        for _ in 0..60 {
            s.buy_upgrade(UpgradeKind::SuperClicker);
        }
        assert_eq!(s.drain_notices().len(), NOTICE_CAPACITY);
    }

    #[test]
    fn changes_are_broadcast() {
        let clock = ManualClock::new(T0);
        let bus = LocalBus::new();
        let other = bus.subscribe();
        let mut s = Session::new(
            View::Clicker,
            MemoryStorage::new(),
            Some(bus.subscribe()),
            env(&clock, &[0]),
            &GameConfig::default(),
        );
        s.click();
        let inbox = other.drain();
        assert_eq!(inbox.len(), 1);
        assert_eq!(crate::sync::decode(&inbox[0]).unwrap().gem_count, 1);
    }

    #[test]
    fn receive_picks_up_remote_recruits() {
        let clock = ManualClock::new(T0);
        let storage = seeded(&[(keys::PLAYER_GEMS, "100")]);
        let mut battle_tab = session(View::Battle, storage.clone(), &clock);
        let mut clicker_tab = session(View::Clicker, storage, &clock);

        clock.advance(1.0);
        battle_tab.recruit();
        let msg = crate::sync::encode(&crate::sync::Snapshot::of(battle_tab.state())).unwrap();
        assert!(clicker_tab.receive(&msg));
        assert_eq!(clicker_tab.state().my_army, 1);
        assert_eq!(clicker_tab.roster().len(), 1);
        assert!(!clicker_tab.receive(&msg));
    }

    #[test]
    fn view_names() {
        assert_eq!(View::from_name("battle"), Some(View::Battle));
        assert_eq!(View::from_name("clicker"), Some(View::Clicker));
        assert_eq!(View::from_name("shop"), None);
    }
}
