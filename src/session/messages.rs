//! Envelope construction and frame dispatch for the persistent
//! remote-control session: `RemoteConfigure`, `RemoteSetActive`,
//! `RemoteKeyInject`, and the ping/pong liveness exchange.

use crate::wire::{Decoder, Encoder, WireType};

pub const FIELD_KEY_INJECT: u32 = 2;
pub const FIELD_CONFIGURE: u32 = 7;
pub const FIELD_SET_ACTIVE: u32 = 8;
pub const FIELD_PING: u32 = 10;
pub const FIELD_PONG: u32 = 11;
pub const FIELD_REMOTE_START: u32 = 40;

const REMOTE_CONFIGURE_CODE1: u64 = 622;
const REMOTE_SET_ACTIVE_CODE: u64 = 622;
const KEY_DIRECTION_SHORT: u64 = 3;

/// Device identity strings announced in `RemoteConfigure`.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// `DeviceInfo.model`.
    pub model: String,
    /// `DeviceInfo.vendor`.
    pub vendor: String,
    /// `DeviceInfo.package_id`.
    pub package_id: String,
}

/// Build the `RemoteConfigure` message: `field 7 = {1:622, 2:DeviceInfo}`.
#[must_use]
pub fn remote_configure(info: &DeviceInfo) -> Vec<u8> {
    let mut device_info = Encoder::new();
    device_info
        .add_string(1, &info.model)
        .add_string(2, &info.vendor)
        .add_varint(3, 1)
        .add_string(4, "1.0.0")
        .add_string(5, &info.package_id);

    let mut configure = Encoder::new();
    configure.add_varint(1, REMOTE_CONFIGURE_CODE1).add_message(2, &device_info);

    let mut envelope = Encoder::new();
    envelope.add_message(FIELD_CONFIGURE, &configure);
    envelope.into_bytes()
}

/// Build the `RemoteSetActive` message: `field 8 = {1:622}`.
#[must_use]
pub fn remote_set_active() -> Vec<u8> {
    let mut set_active = Encoder::new();
    set_active.add_varint(1, REMOTE_SET_ACTIVE_CODE);

    let mut envelope = Encoder::new();
    envelope.add_message(FIELD_SET_ACTIVE, &set_active);
    envelope.into_bytes()
}

/// Build a `RemoteKeyInject` message for a short key press:
/// `field 2 = {1:key_code, 2:direction=3}`.
#[must_use]
pub fn remote_key_inject(key_code: u32) -> Vec<u8> {
    let mut key_inject = Encoder::new();
    key_inject.add_varint(1, u64::from(key_code)).add_varint(2, KEY_DIRECTION_SHORT);

    let mut envelope = Encoder::new();
    envelope.add_message(FIELD_KEY_INJECT, &key_inject);
    envelope.into_bytes()
}

/// Build a pong reply: `field 11 = {1:val}`, echoing the ping's value.
#[must_use]
pub fn pong(val: u64) -> Vec<u8> {
    let mut pong_payload = Encoder::new();
    pong_payload.add_varint(1, val);

    let mut envelope = Encoder::new();
    envelope.add_message(FIELD_PONG, &pong_payload);
    envelope.into_bytes()
}

/// A decoded top-level frame from the remote-control session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFrame {
    /// `RemoteConfigure` acknowledgement; nothing to act on.
    ConfigureResponse,
    /// `RemoteSetActive` acknowledgement; nothing to act on.
    SetActiveResponse,
    /// Liveness ping; the session must reply with a pong carrying the same
    /// value.
    Ping {
        val: u64,
    },
    /// `RemoteStart`; nothing to act on.
    RemoteStart,
    /// Any other top-level field; ignored.
    Unknown,
}

/// Parse one top-level frame, dispatching on its field number per the
/// receive table (configure/set-active/remote-start are acked and ignored;
/// ping must be answered; everything else is skipped).
#[must_use]
pub fn parse_frame(bytes: &[u8]) -> Option<RemoteFrame> {
    let mut decoder = Decoder::new(bytes);
    while let Some(tag) = decoder.read_tag() {
        let (field, wire_type) = tag.ok()?;
        match (field, wire_type) {
            (FIELD_CONFIGURE, WireType::LengthDelimited) => {
                decoder.read_length_delimited()?;
                return Some(RemoteFrame::ConfigureResponse);
            }
            (FIELD_SET_ACTIVE, WireType::LengthDelimited) => {
                decoder.read_length_delimited()?;
                return Some(RemoteFrame::SetActiveResponse);
            }
            (FIELD_PING, WireType::LengthDelimited) => {
                let body = decoder.read_length_delimited()?;
                return Some(RemoteFrame::Ping { val: parse_ping_value(body)? });
            }
            (FIELD_REMOTE_START, WireType::LengthDelimited) => {
                decoder.read_length_delimited()?;
                return Some(RemoteFrame::RemoteStart);
            }
            (_, wt) => decoder.skip(wt)?,
        }
    }
    Some(RemoteFrame::Unknown)
}

fn parse_ping_value(body: &[u8]) -> Option<u64> {
    let mut decoder = Decoder::new(body);
    while let Some(tag) = decoder.read_tag() {
        let (field, wire_type) = tag.ok()?;
        if field == 1 && wire_type == WireType::Varint {
            return decoder.read_varint();
        }
        decoder.skip(wire_type)?;
    }
    Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trips_to_pong() {
        let mut ping_payload = Encoder::new();
        ping_payload.add_varint(1, 42);
        let mut envelope = Encoder::new();
        envelope.add_message(FIELD_PING, &ping_payload);

        let frame = parse_frame(&envelope.into_bytes()).unwrap();
        assert_eq!(frame, RemoteFrame::Ping { val: 42 });

        let pong_bytes = pong(42);
        let mut decoder = Decoder::new(&pong_bytes);
        let (field, _) = decoder.read_tag().unwrap().unwrap();
        assert_eq!(field, FIELD_PONG);
    }

    #[test]
    fn configure_contains_device_info() {
        let info = DeviceInfo {
            model: "Pixel".to_string(),
            vendor: "Google".to_string(),
            package_id: "com.example.atvremote".to_string(),
        };
        let bytes = remote_configure(&info);
        let frame = parse_frame(&bytes).unwrap();
        assert_eq!(frame, RemoteFrame::ConfigureResponse);
    }

    #[test]
    fn unknown_field_is_skipped() {
        let mut envelope = Encoder::new();
        envelope.add_varint(99, 7);
        let frame = parse_frame(&envelope.into_bytes()).unwrap();
        assert_eq!(frame, RemoteFrame::Unknown);
    }
}
