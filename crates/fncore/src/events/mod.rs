// crates/fncore/src/events/mod.rs

mod base;

pub use base::{ConsoleEvent, EventBus};
