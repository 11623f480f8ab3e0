//! Wall clock and the cooperative task scheduler.
//!
//! A single browser interval calls `Scheduler::update` with the current
//! timestamp. Each periodic task owns a fixed-step accumulator, so a task
//! fires a whole number of times per update regardless of the driver's
//! jitter, and game logic stays deterministic and testable.

use std::cell::Cell;
use std::rc::Rc;

/// Millisecond wall clock (Unix epoch).
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Real time. Uses `Date.now()` on wasm32, where `SystemTime::now()` panics.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Periodic work the game runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// Passive mining, one payout per period.
    Miner,
    /// One attack per warrior per period.
    AutoBattle,
    /// Re-stamps `lastBattleTime` while auto-battle runs.
    BattleStamp,
}

/// Fixed-step accumulator for one task.
#[derive(Clone, Debug)]
struct Ticker {
    period_ms: f64,
    accumulator: f64,
    total_ticks: u64,
}

impl Ticker {
    fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(1.0),
            accumulator: 0.0,
            total_ticks: 0,
        }
    }

    fn advance(&mut self, delta_ms: f64) -> u32 {
        self.accumulator += delta_ms;
        let ticks = (self.accumulator / self.period_ms) as u32;
        self.accumulator -= ticks as f64 * self.period_ms;
        self.total_ticks += ticks as u64;
        ticks
    }
}

struct Slot {
    task: Task,
    ticker: Ticker,
    running: bool,
}

/// Cooperative scheduler: one clock, many fixed-period tasks, each with an
/// explicit start/stop lifecycle.
pub struct Scheduler {
    slots: Vec<Slot>,
    /// Clamp for a single update, so a throttled tab cannot burst.
    max_delta_ms: f64,
    /// Timestamp of the last update (ms), None before the first update.
    last_timestamp: Option<f64>,
}

impl Scheduler {
    pub fn new(max_delta_ms: f64) -> Self {
        Self {
            slots: Vec::new(),
            max_delta_ms,
            last_timestamp: None,
        }
    }

    /// Register a task. Registering an existing task replaces its period.
    /// Tasks start stopped.
    pub fn register(&mut self, task: Task, period_ms: f64) {
        self.slots.retain(|s| s.task != task);
        self.slots.push(Slot {
            task,
            ticker: Ticker::new(period_ms),
            running: false,
        });
    }

    /// Start a task. Its first firing comes one full period from now.
    pub fn start(&mut self, task: Task) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.task == task) {
            if !slot.running {
                slot.running = true;
                slot.ticker.accumulator = 0.0;
            }
        }
    }

    /// Stop a task immediately; pending partial periods are dropped.
    pub fn stop(&mut self, task: Task) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.task == task) {
            slot.running = false;
            slot.ticker.accumulator = 0.0;
        }
    }

    pub fn is_running(&self, task: Task) -> bool {
        self.slots.iter().any(|s| s.task == task && s.running)
    }

    /// Total firings of a task since it was registered.
    pub fn total_ticks(&self, task: Task) -> u64 {
        self.slots
            .iter()
            .find(|s| s.task == task)
            .map_or(0, |s| s.ticker.total_ticks)
    }

    /// Feed a wall-clock timestamp. Returns how many times each running task
    /// fires, in registration order. The first call only records the time.
    pub fn update(&mut self, now_ms: f64) -> Vec<(Task, u32)> {
        let delta = match self.last_timestamp {
            Some(prev) => (now_ms - prev).clamp(0.0, self.max_delta_ms),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.slots
            .iter_mut()
            .filter(|s| s.running)
            .filter_map(|s| {
                let n = s.ticker.advance(delta);
                (n > 0).then_some((s.task, n))
            })
            .collect()
    }
}
