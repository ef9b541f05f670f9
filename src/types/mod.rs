//! Core data types shared across the pairing engine, remote session, and
//! controller façade.

mod device;
mod keycode;

pub use device::{TVDevice, DEFAULT_CONTROL_PORT, PAIRING_PORT};
pub use keycode::KeyCode;
