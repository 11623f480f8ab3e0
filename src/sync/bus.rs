//! In-process broadcast bus with `BroadcastChannel` semantics: a post reaches
//! every other open port, never the sender, in send order.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::Transport;
use crate::error::SyncError;

#[derive(Default)]
struct BusInner {
    next_id: usize,
    inboxes: Vec<(usize, VecDeque<String>)>,
}

/// A named channel shared by several ports. Clones share the channel.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Rc<RefCell<BusInner>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new port, like `new BroadcastChannel(name)` in another tab.
    pub fn subscribe(&self) -> BusPort {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.inboxes.push((id, VecDeque::new()));
        BusPort {
            id,
            bus: self.clone(),
            closed: Cell::new(false),
        }
    }
}

/// One subscriber's end of a `LocalBus`.
pub struct BusPort {
    id: usize,
    bus: LocalBus,
    closed: Cell<bool>,
}

impl BusPort {
    /// Take every message delivered to this port so far.
    pub fn drain(&self) -> Vec<String> {
        let mut inner = self.bus.inner.borrow_mut();
        inner
            .inboxes
            .iter_mut()
            .find(|(id, _)| *id == self.id)
            .map(|(_, inbox)| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Stop sending and receiving. Later posts fail.
    pub fn close(&self) {
        self.closed.set(true);
        self.bus
            .inner
            .borrow_mut()
            .inboxes
            .retain(|(id, _)| *id != self.id);
    }
}

impl Transport for BusPort {
    fn post(&self, message: &str) -> Result<(), SyncError> {
        if self.closed.get() {
            return Err(SyncError::Post("port is closed".into()));
        }
        let mut inner = self.bus.inner.borrow_mut();
        for (id, inbox) in inner.inboxes.iter_mut() {
            if *id != self.id {
                inbox.push_back(message.to_string());
            }
        }
        Ok(())
    }
}

impl Drop for BusPort {
    fn drop(&mut self) {
        if !self.closed.get() {
            self.close();
        }
    }
}
