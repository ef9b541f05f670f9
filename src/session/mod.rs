//! The persistent remote-control session: configure/activate handshake,
//! key-command injection, and the ping/pong liveness loop.

pub mod messages;
mod remote;

pub use messages::DeviceInfo;
pub use remote::RemoteSession;
