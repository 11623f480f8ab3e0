//! Gem Kingdom: an idle gem clicker with an auto-battler, kept in sync
//! across browser tabs.
//!
//! Game logic is plain Rust and runs natively under `cargo test`; only the
//! `web` module and the browser-backed storage/transport need wasm32.

pub mod battle;
pub mod config;
pub mod console;
pub mod error;
pub mod idle;
pub mod rng;
pub mod session;
pub mod shop;
pub mod state;
pub mod store;
pub mod sync;
pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;
