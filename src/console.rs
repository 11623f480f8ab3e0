//! Browser console logging.
//!
//! On wasm32 these forward to `console.log` / `console.warn`. Elsewhere
//! (unit tests, native hosts) they compile to nothing, since `web_sys`
//! console calls panic outside a browser.

#[cfg(target_arch = "wasm32")]
pub fn log(msg: &str) {
    web_sys::console::log_1(&format!("Gem Kingdom: {msg}").into());
}

#[cfg(target_arch = "wasm32")]
pub fn warn(msg: &str) {
    web_sys::console::warn_1(&format!("Gem Kingdom: {msg}").into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(_msg: &str) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(_msg: &str) {}
