/**
 * An adaptive quiz engine for drilling Korean vocabulary.
 *
 * The engine proper (`tracker`, `scorer`, `pool` and `session`) is pure in-memory
 * logic. Storage, retries, the JSON request boundary and the terminal interface are
 * layered on top of it.
 */
#[macro_use]
pub mod iohelper;

pub mod answer;
pub mod api;
pub mod common;
pub mod config;
pub mod logging;
pub mod persistence;
pub mod pool;
pub mod retry;
pub mod scorer;
pub mod session;
pub mod tracker;
pub mod ui;
pub mod vocab;
