//! Several sessions sharing one storage and one bus, the way tabs of the
//! same browser profile do.

use std::rc::Rc;

use gem_kingdom::config::GameConfig;
use gem_kingdom::error::SyncError;
use gem_kingdom::rng::Lcg;
use gem_kingdom::session::{Env, Session, View};
use gem_kingdom::shop::UpgradeKind;
use gem_kingdom::store::keys;
use gem_kingdom::store::memory::MemoryStorage;
use gem_kingdom::store::KeyValueStore;
use gem_kingdom::sync::bus::{BusPort, LocalBus};
use gem_kingdom::sync::Transport;
use gem_kingdom::time::ManualClock;

const T0: f64 = 1_700_000_000_000.0;

/// A port the test can also read from.
struct Tap(Rc<BusPort>);

impl Transport for Tap {
    fn post(&self, message: &str) -> Result<(), SyncError> {
        self.0.post(message)
    }
}

struct Tab {
    session: Session<MemoryStorage, Tap>,
    port: Rc<BusPort>,
}

fn open(view: View, bus: &LocalBus, storage: &MemoryStorage, clock: &ManualClock, seed: u64) -> Tab {
    let port = Rc::new(bus.subscribe());
    let env = Env {
        clock: Box::new(clock.clone()),
        dice: Box::new(Lcg::new(seed)),
    };
    let session = Session::new(
        view,
        storage.clone(),
        Some(Tap(port.clone())),
        env,
        &GameConfig::default(),
    );
    Tab { session, port }
}

/// Deliver every pending message. Returns how many were applied.
fn pump(tabs: &mut [&mut Tab]) -> usize {
    let mut applied = 0;
    loop {
        let mut delivered = 0;
        for tab in tabs.iter_mut() {
            for msg in tab.port.drain() {
                delivered += 1;
                if tab.session.receive(&msg) {
                    applied += 1;
                }
            }
        }
        if delivered == 0 {
            return applied;
        }
    }
}

fn seeded(gems: &str) -> MemoryStorage {
    let mut s = MemoryStorage::new();
    s.set(keys::PLAYER_GEMS, gems).unwrap();
    s
}

#[test]
fn clicks_in_one_tab_reach_the_other() {
    let bus = LocalBus::new();
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let mut a = open(View::Clicker, &bus, &storage, &clock, 1);
    let mut b = open(View::Clicker, &bus, &storage, &clock, 2);

    for _ in 0..3 {
        a.session.click();
    }
    assert_eq!(pump(&mut [&mut a, &mut b]), 3);
    assert_eq!(b.session.state().gem_count, 3);
    assert_eq!(b.session.state(), a.session.state());
}

#[test]
fn upgrade_propagates_and_converges() {
    let bus = LocalBus::new();
    let storage = seeded("10");
    let clock = ManualClock::new(T0);
    let mut a = open(View::Clicker, &bus, &storage, &clock, 1);
    let mut b = open(View::Clicker, &bus, &storage, &clock, 2);

    clock.advance(5.0);
    assert!(b.session.buy_upgrade(UpgradeKind::Clicker));
    pump(&mut [&mut a, &mut b]);

    assert_eq!(a.session.state().click_power, 2);
    assert_eq!(a.session.state().gem_count, 0);
    assert_eq!(a.session.upgrade_cost(UpgradeKind::Clicker), 15);

    clock.advance(5.0);
    a.session.click();
    pump(&mut [&mut a, &mut b]);
    assert_eq!(b.session.state().gem_count, 2);
}

#[test]
fn replayed_message_is_applied_once() {
    let bus = LocalBus::new();
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let mut a = open(View::Clicker, &bus, &storage, &clock, 1);
    let mut b = open(View::Clicker, &bus, &storage, &clock, 2);

    a.session.click();
    let inbox = b.port.drain();
    assert_eq!(inbox.len(), 1);
    assert!(b.session.receive(&inbox[0]));
    let after = b.session.state().clone();
    assert!(!b.session.receive(&inbox[0]));
    assert_eq!(*b.session.state(), after);
}

#[test]
fn older_write_loses_to_newer_local_state() {
    let bus = LocalBus::new();
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let mut a = open(View::Clicker, &bus, &storage, &clock, 1);
    let mut b = open(View::Clicker, &bus, &storage, &clock, 2);

    clock.advance(10.0);
    a.session.click();
    clock.advance(10.0);
    b.session.set_kingdom_name("Later");
    pump(&mut [&mut a, &mut b]);

    assert_eq!(a.session.state().kingdom_name, "Later");
    assert_eq!(b.session.state().kingdom_name, "Later");
    assert_eq!(a.session.state(), b.session.state());
}

#[test]
fn recruit_in_battle_tab_shows_up_in_clicker_tab() {
    let bus = LocalBus::new();
    let storage = seeded("250");
    let clock = ManualClock::new(T0);
    let mut battle = open(View::Battle, &bus, &storage, &clock, 7);
    let mut clicker = open(View::Clicker, &bus, &storage, &clock, 8);

    clock.advance(1.0);
    assert_eq!(battle.session.recruit(), Some(1));
    assert_eq!(battle.session.recruit(), Some(2));
    pump(&mut [&mut battle, &mut clicker]);

    assert_eq!(clicker.session.state().my_army, 2);
    assert_eq!(clicker.session.state().gem_count, 50);
    assert_eq!(clicker.session.roster().len(), 2);
}

#[test]
fn auto_battle_gold_reaches_other_tab() {
    let bus = LocalBus::new();
    let storage = seeded("100");
    let clock = ManualClock::new(T0);
    let mut battle = open(View::Battle, &bus, &storage, &clock, 3);
    let mut clicker = open(View::Clicker, &bus, &storage, &clock, 4);

    battle.session.recruit();
    assert!(battle.session.toggle_auto_battle());
    // A fresh enemy has 50 HP and the warrior hits for at least 15, so four
    // attacks always kill it.
    for _ in 0..4 {
        clock.advance(200.0);
        battle.session.tick();
    }
    assert!(battle.session.state().gem_count > 0);
    pump(&mut [&mut battle, &mut clicker]);
    assert_eq!(
        clicker.session.state().gem_count,
        battle.session.state().gem_count
    );
}

#[test]
fn storage_events_sync_without_a_channel() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let env = |seed| Env {
        clock: Box::new(clock.clone()),
        dice: Box::new(Lcg::new(seed)),
    };
    let config = GameConfig::default();
    let mut a: Session<_, Tap> = Session::new(View::Clicker, storage.clone(), None, env(1), &config);
    let mut b: Session<_, Tap> = Session::new(View::Clicker, storage.clone(), None, env(2), &config);

    a.click();
    a.click();
    assert!(!b.storage_changed(Some(keys::SELECTED_THEME)));
    assert_eq!(b.state().gem_count, 0);
    assert!(b.storage_changed(Some(keys::PLAYER_GEMS)));
    assert_eq!(b.state().gem_count, 2);
}

#[test]
fn reopening_the_page_restores_progress() {
    let bus = LocalBus::new();
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    {
        let mut tab = open(View::Clicker, &bus, &storage, &clock, 1);
        tab.session.click();
        tab.session.set_kingdom_name("Gemhold");
    }
    clock.advance(60_000.0);
    let mut tab = open(View::Clicker, &bus, &storage, &clock, 1);
    tab.session.resume();
    assert_eq!(tab.session.state().gem_count, 1);
    assert_eq!(tab.session.state().kingdom_name, "Gemhold");
}
