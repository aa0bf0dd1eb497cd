//! castframe - a terminal frame showing recent Farcaster casts.
//!
//! The library is split so the binary and the integration tests share it.

pub mod app;
pub mod config;
pub mod feeds;
pub mod logging;
pub mod session;
pub mod terminal;
pub mod ui;
