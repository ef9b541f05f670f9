//! State management and events.

mod container;
mod events;

pub use container::{ClientState, StateContainer};
pub use events::{AtvEvent, ErrorCode, EventBus};
