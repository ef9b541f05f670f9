//! `PairingMessage` envelope construction and parsing.
//!
//! Every pairing message is wrapped in an envelope carrying
//! `1:varint protocol_version`, `2:varint status`, plus exactly one payload
//! field. The envelope shape used here is the newer layout (protocol
//! version, then status, then payload) — see the pairing engine's module
//! docs for why the older field ordering is not used.

use crate::wire::{Decoder, Encoder, WireType};

const PROTOCOL_VERSION: u64 = 2;
const STATUS_OK: u64 = 200;

const FIELD_PROTOCOL_VERSION: u32 = 1;
const FIELD_STATUS: u32 = 2;

const FIELD_PAIRING_REQUEST: u32 = 10;
const FIELD_PAIRING_OPTION: u32 = 20;
const FIELD_PAIRING_CONFIGURATION: u32 = 30;
const FIELD_PAIRING_SECRET: u32 = 40;

const ENCODING_HEXADECIMAL: u64 = 3;
const ENCODING_SYMBOL_LENGTH: u64 = 6;

fn envelope_header(out: &mut Encoder) {
    out.add_varint(FIELD_PROTOCOL_VERSION, PROTOCOL_VERSION);
    out.add_varint(FIELD_STATUS, STATUS_OK);
}

/// Build a `PairingRequest` envelope: `{1:service_name="atvremote", 2:client_name}`.
#[must_use]
pub fn pairing_request(client_name: &str) -> Vec<u8> {
    let mut payload = Encoder::new();
    payload.add_string(1, "atvremote").add_string(2, client_name);

    let mut envelope = Encoder::new();
    envelope_header(&mut envelope);
    envelope.add_message(FIELD_PAIRING_REQUEST, &payload);
    envelope.into_bytes()
}

/// Build a `PairingOption` envelope, always negotiating HEXADECIMAL/6 for
/// both input and output encodings (the only encoding this protocol ever
/// uses in practice).
#[must_use]
pub fn pairing_option() -> Vec<u8> {
    let mut encoding = Encoder::new();
    encoding.add_varint(1, ENCODING_HEXADECIMAL).add_varint(2, ENCODING_SYMBOL_LENGTH);

    let mut payload = Encoder::new();
    payload
        .add_message(1, &encoding)
        .add_message(2, &encoding)
        .add_varint(3, 1); // preferred_role

    let mut envelope = Encoder::new();
    envelope_header(&mut envelope);
    envelope.add_message(FIELD_PAIRING_OPTION, &payload);
    envelope.into_bytes()
}

/// Build a `PairingSecret` envelope: `{1:bytes secret}`.
#[must_use]
pub fn pairing_secret(secret: &[u8; 32]) -> Vec<u8> {
    let mut payload = Encoder::new();
    payload.add_bytes(1, secret);

    let mut envelope = Encoder::new();
    envelope_header(&mut envelope);
    envelope.add_message(FIELD_PAIRING_SECRET, &payload);
    envelope.into_bytes()
}

/// A parsed `PairingMessage` envelope: the fields the client needs to act
/// on, without decoding payload contents the client never inspects.
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    /// Status code; `200` is success, anything else is a rejection.
    pub status: u64,
    /// `true` if a `PairingConfiguration` (field 30) payload was present —
    /// the signal to prompt the user for the on-screen code.
    pub has_configuration: bool,
    /// The negotiated encoding type from a received `PairingOption`, if one
    /// was present (field 20). `None` if no `PairingOption` payload was sent.
    pub option_encoding: Option<u64>,
}

/// Parse a top-level `PairingMessage` envelope received from the peer.
///
/// Unknown fields (including wire types this codec doesn't otherwise use)
/// are skipped per the wire codec's framing contract; malformed tags abort
/// parsing and return `None`.
#[must_use]
pub fn parse_envelope(bytes: &[u8]) -> Option<ParsedEnvelope> {
    let mut status = STATUS_OK;
    let mut has_configuration = false;
    let mut option_encoding = None;

    let mut decoder = Decoder::new(bytes);
    while let Some(tag) = decoder.read_tag() {
        let (field, wire_type) = tag.ok()?;
        match (field, wire_type) {
            (FIELD_STATUS, WireType::Varint) => status = decoder.read_varint()?,
            (FIELD_PAIRING_CONFIGURATION, WireType::LengthDelimited) => {
                decoder.read_length_delimited()?;
                has_configuration = true;
            }
            (FIELD_PAIRING_OPTION, WireType::LengthDelimited) => {
                let body = decoder.read_length_delimited()?;
                option_encoding = parse_option_encoding(body);
            }
            (_, wt) => decoder.skip(wt)?,
        }
    }

    Some(ParsedEnvelope {
        status,
        has_configuration,
        option_encoding,
    })
}

/// Pull the `type` field out of the first `Encoding` sub-message inside a
/// `PairingOption` payload, used to detect a server selecting a non-hex
/// encoding (surfaced by the engine as `InvalidResponse`, never inferred).
fn parse_option_encoding(body: &[u8]) -> Option<u64> {
    let mut decoder = Decoder::new(body);
    while let Some(tag) = decoder.read_tag() {
        let (field, wire_type) = tag.ok()?;
        if field == 1 && wire_type == WireType::LengthDelimited {
            let encoding_body = decoder.read_length_delimited()?;
            let mut enc_decoder = Decoder::new(encoding_body);
            while let Some(enc_tag) = enc_decoder.read_tag() {
                let (enc_field, enc_wt) = enc_tag.ok()?;
                if enc_field == 1 && enc_wt == WireType::Varint {
                    return enc_decoder.read_varint();
                }
                enc_decoder.skip(enc_wt)?;
            }
            return None;
        }
        decoder.skip(wire_type)?;
    }
    None
}
