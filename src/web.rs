//! Browser entry point: the `GemKingdom` class a page script constructs.
//!
//! Owns the event wiring (channel messages, `storage` events and the single
//! interval that drives the scheduler). The page registers `onChange` and
//! repaints from `snapshot()` / `warriors()` / `notices()`.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MessageEvent, StorageEvent};

use crate::config::GameConfig;
use crate::console;
use crate::session::{Env, Session, View};
use crate::shop::UpgradeKind;
use crate::state::Warrior;
use crate::store::local::LocalStorage;
use crate::store::memory::MemoryStorage;
use crate::store::KeyValueStore;
use crate::sync::channel::BroadcastTransport;
use crate::sync::Snapshot;

type WebSession = Session<Box<dyn KeyValueStore>, BroadcastTransport>;

struct Shared {
    session: RefCell<WebSession>,
    on_change: RefCell<Option<js_sys::Function>>,
}

impl Shared {
    fn changed(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(f) = callback {
            if let Err(e) = f.call0(&JsValue::NULL) {
                console::warn(&format!("onChange threw: {e:?}"));
            }
        }
    }
}

#[derive(Serialize)]
struct WarriorView<'a> {
    id: u32,
    #[serde(flatten)]
    warrior: &'a Warrior,
}

/// Plain JS value through JSON, matching the wire format.
fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|s| js_sys::JSON::parse(&s).ok())
        .unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub struct GemKingdom {
    shared: Rc<Shared>,
    window: web_sys::Window,
    channel: Option<web_sys::BroadcastChannel>,
    interval: i32,
    on_storage: Closure<dyn FnMut(StorageEvent)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_interval: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl GemKingdom {
    /// `view` is `"clicker"` or `"battle"`.
    #[wasm_bindgen(constructor)]
    pub fn new(view: &str) -> Result<GemKingdom, JsValue> {
        console_error_panic_hook::set_once();

        let view = View::from_name(view)
            .ok_or_else(|| JsValue::from_str("view must be \"clicker\" or \"battle\""))?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let config = GameConfig::default();

        let storage: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(s) => Box::new(s),
            Err(e) => {
                console::warn(&format!("{e}; progress will not persist"));
                Box::new(MemoryStorage::new())
            }
        };
        let transport = match BroadcastTransport::open(&config.channel_name) {
            Ok(t) => Some(t),
            Err(e) => {
                console::log(&e.to_string());
                None
            }
        };
        let channel = transport.as_ref().map(|t| t.channel().clone());

        let mut session = Session::new(view, storage, transport, Env::system(), &config);
        session.resume();

        let shared = Rc::new(Shared {
            session: RefCell::new(session),
            on_change: RefCell::new(None),
        });

        let on_message = Closure::wrap(Box::new({
            let shared = shared.clone();
            move |event: MessageEvent| {
                let Ok(raw) = js_sys::JSON::stringify(&event.data()) else {
                    return;
                };
                let changed = shared.session.borrow_mut().receive(&String::from(raw));
                if changed {
                    shared.changed();
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        if let Some(ch) = &channel {
            ch.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        }

        let on_storage = Closure::wrap(Box::new({
            let shared = shared.clone();
            move |event: StorageEvent| {
                let key = event.key();
                let changed = shared.session.borrow_mut().storage_changed(key.as_deref());
                if changed {
                    shared.changed();
                }
            }
        }) as Box<dyn FnMut(StorageEvent)>);
        window.add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())?;

        let on_interval = Closure::wrap(Box::new({
            let shared = shared.clone();
            move || {
                let changed = shared.session.borrow_mut().tick();
                if changed {
                    shared.changed();
                }
            }
        }) as Box<dyn FnMut()>);
        let interval = window.set_interval_with_callback_and_timeout_and_arguments_0(
            on_interval.as_ref().unchecked_ref(),
            config.driver_interval_ms,
        )?;

        Ok(GemKingdom {
            shared,
            window,
            channel,
            interval,
            on_storage,
            _on_message: on_message,
            _on_interval: on_interval,
        })
    }

    /// Called after any change that should trigger a repaint.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) {
        *self.shared.on_change.borrow_mut() = Some(callback);
    }

    // ── Reads ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> JsValue {
        to_js(&Snapshot::of(self.shared.session.borrow().state()))
    }

    #[wasm_bindgen(js_name = gemsPerSecond)]
    pub fn gems_per_second(&self) -> f64 {
        self.shared.session.borrow().state().gems_per_second() as f64
    }

    pub fn warriors(&self) -> JsValue {
        let session = self.shared.session.borrow();
        let views: Vec<_> = session
            .roster()
            .iter()
            .map(|(id, warrior)| WarriorView { id, warrior })
            .collect();
        to_js(&views)
    }

    /// Pending notices, oldest first. Each call drains the queue.
    pub fn notices(&self) -> JsValue {
        to_js(&self.shared.session.borrow_mut().drain_notices())
    }

    #[wasm_bindgen(js_name = upgradeCost)]
    pub fn upgrade_cost(&self, id: &str) -> Option<f64> {
        let kind = UpgradeKind::from_id(id)?;
        Some(self.shared.session.borrow().upgrade_cost(kind) as f64)
    }

    #[wasm_bindgen(js_name = isAutoBattleRunning)]
    pub fn is_auto_battle_running(&self) -> bool {
        self.shared.session.borrow().is_auto_battle_running()
    }

    pub fn theme(&self) -> String {
        self.shared.session.borrow().theme()
    }

    // ── Actions ─────────────────────────────────────────────────

    pub fn click(&self) -> f64 {
        let gained = self.shared.session.borrow_mut().click();
        self.shared.changed();
        gained as f64
    }

    #[wasm_bindgen(js_name = buyUpgrade)]
    pub fn buy_upgrade(&self, id: &str) -> bool {
        let Some(kind) = UpgradeKind::from_id(id) else {
            console::warn(&format!("unknown upgrade {id:?}"));
            return false;
        };
        let bought = self.shared.session.borrow_mut().buy_upgrade(kind);
        self.shared.changed();
        bought
    }

    pub fn recruit(&self) -> Option<u32> {
        let id = self.shared.session.borrow_mut().recruit();
        self.shared.changed();
        id
    }

    /// Attack outcome as a plain object, or `null` for an unknown id.
    pub fn attack(&self, id: u32) -> JsValue {
        let outcome = self.shared.session.borrow_mut().attack(id);
        match outcome {
            Some(o) => {
                self.shared.changed();
                to_js(&o)
            }
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = toggleAutoBattle)]
    pub fn toggle_auto_battle(&self) -> bool {
        let running = self.shared.session.borrow_mut().toggle_auto_battle();
        self.shared.changed();
        running
    }

    #[wasm_bindgen(js_name = setKingdomName)]
    pub fn set_kingdom_name(&self, name: &str) -> bool {
        let renamed = self.shared.session.borrow_mut().set_kingdom_name(name);
        if renamed {
            self.shared.changed();
        }
        renamed
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&self, theme: &str) -> bool {
        self.shared.session.borrow_mut().set_theme(theme)
    }
}

impl Drop for GemKingdom {
    fn drop(&mut self) {
        self.window.clear_interval_with_handle(self.interval);
        let _ = self
            .window
            .remove_event_listener_with_callback("storage", self.on_storage.as_ref().unchecked_ref());
        if let Some(ch) = &self.channel {
            ch.set_onmessage(None);
        }
    }
}
