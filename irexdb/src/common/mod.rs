//! Common types, constants and helpers shared by every other module.

mod constants;
mod event_bus;
mod sort_order;
mod util;
mod value;

pub use constants::*;
pub use event_bus::*;
pub use sort_order::*;
pub(crate) use util::{current_runtime, spawn_callback, Scheduler};
pub use util::{atomic, current_time_millis, Atomic, ReadExecutor, WriteExecutor};
pub use value::*;
