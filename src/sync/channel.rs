//! `BroadcastChannel` transport. WASM only.
//!
//! Messages travel as plain JS objects so pages that speak the same schema
//! without this crate can still read them.

use super::Transport;
use crate::error::SyncError;

pub struct BroadcastTransport {
    channel: web_sys::BroadcastChannel,
}

impl BroadcastTransport {
    /// Fails on browsers without `BroadcastChannel`.
    pub fn open(name: &str) -> Result<Self, SyncError> {
        let channel = web_sys::BroadcastChannel::new(name).map_err(|_| SyncError::Unavailable)?;
        Ok(Self { channel })
    }

    /// The underlying channel, for attaching the `onmessage` handler.
    pub fn channel(&self) -> &web_sys::BroadcastChannel {
        &self.channel
    }
}

impl Transport for BroadcastTransport {
    fn post(&self, message: &str) -> Result<(), SyncError> {
        let value =
            js_sys::JSON::parse(message).map_err(|e| SyncError::Encode(format!("{e:?}")))?;
        self.channel
            .post_message(&value)
            .map_err(|e| SyncError::Post(format!("{e:?}")))
    }
}

impl Drop for BroadcastTransport {
    fn drop(&mut self) {
        self.channel.close();
    }
}
