//! Hand-rolled protobuf-style wire codec: varints, tag/length framing, and
//! length-prefixed message extraction from a growing byte stream.
//!
//! There is no external protobuf schema dependency here; the wire format is
//! implemented directly against the handful of message shapes the pairing
//! and remote-control protocols use.

use crate::error::CodecError;

/// Protobuf wire types this codec understands on receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Varint-encoded integer.
    Varint,
    /// 64-bit fixed value.
    Fixed64,
    /// Length-delimited bytes (strings, sub-messages, bytes).
    LengthDelimited,
    /// 32-bit fixed value.
    Fixed32,
}

impl WireType {
    const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    const fn as_byte(self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::Fixed32 => 5,
        }
    }
}

/// Encode a `u64` as a little-endian base-128 varint, MSB = continuation bit.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from the front of `buf`, returning the value and the
/// number of bytes consumed, or `None` if the buffer doesn't yet contain a
/// complete varint (truncated input, not an error).
#[must_use]
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i >= 10 {
            return None;
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Attempt to pull one length-prefixed message off the front of `buf`.
///
/// Returns `Some(message)` and removes the consumed bytes (length prefix +
/// payload) from `buf` on success. Returns `None` and leaves `buf` untouched
/// if the buffer doesn't yet hold a complete frame.
#[must_use]
pub fn extract_message(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (len, header_len) = decode_varint(buf)?;
    let len = len as usize;
    if buf.len() < header_len + len {
        return None;
    }
    let message: Vec<u8> = buf[header_len..header_len + len].to_vec();
    buf.drain(..header_len + len);
    Some(message)
}

/// Prefix `payload` with its varint-encoded length, ready to write to the wire.
#[must_use]
pub fn frame_message(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    encode_varint(payload.len() as u64, &mut out);
    out.extend_from_slice(payload);
    out
}

const fn tag(field: u32, wire_type: WireType) -> u64 {
    (u64::from(field) << 3) | wire_type.as_byte() as u64
}

/// Appends fields to a protobuf-style message body in call order.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Start a new, empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a varint field.
    pub fn add_varint(&mut self, field: u32, value: u64) -> &mut Self {
        encode_varint(tag(field, WireType::Varint), &mut self.buf);
        encode_varint(value, &mut self.buf);
        self
    }

    /// Append a boolean field (encoded as a 0/1 varint).
    pub fn add_bool(&mut self, field: u32, value: bool) -> &mut Self {
        self.add_varint(field, u64::from(value))
    }

    /// Append a length-delimited byte field.
    pub fn add_length_delimited(&mut self, field: u32, bytes: &[u8]) -> &mut Self {
        encode_varint(tag(field, WireType::LengthDelimited), &mut self.buf);
        encode_varint(bytes.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a UTF-8 string field.
    pub fn add_string(&mut self, field: u32, value: &str) -> &mut Self {
        self.add_length_delimited(field, value.as_bytes())
    }

    /// Append raw bytes as a length-delimited field (alias of
    /// [`add_length_delimited`](Self::add_length_delimited) for call-site clarity).
    pub fn add_bytes(&mut self, field: u32, bytes: &[u8]) -> &mut Self {
        self.add_length_delimited(field, bytes)
    }

    /// Append a nested message built by a sub-encoder.
    pub fn add_message(&mut self, field: u32, sub: &Encoder) -> &mut Self {
        self.add_length_delimited(field, &sub.buf)
    }

    /// Consume the encoder, returning the concatenated field bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Borrow the bytes encoded so far without consuming the encoder.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Reads fields out of a protobuf-style message body in wire order.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Wrap a message body for field-by-field decoding.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// True once every byte of the message has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read the next field's tag, splitting it into `(field_number, wire_type)`.
    ///
    /// Returns `None` when the buffer is exhausted. Returns `Err` if the tag's
    /// wire type isn't one of varint/fixed64/length-delimited/fixed32.
    pub fn read_tag(&mut self) -> Option<Result<(u32, WireType), CodecError>> {
        if self.is_empty() {
            return None;
        }
        let (raw_tag, n) = decode_varint(&self.buf[self.pos..])?;
        self.pos += n;
        let wire_byte = (raw_tag & 0x07) as u8;
        let field = (raw_tag >> 3) as u32;
        match WireType::from_byte(wire_byte) {
            Some(wt) => Some(Ok((field, wt))),
            None => Some(Err(CodecError::UnsupportedWireType(wire_byte))),
        }
    }

    /// Read a varint-encoded value at the current position.
    #[must_use]
    pub fn read_varint(&mut self) -> Option<u64> {
        let (value, n) = decode_varint(&self.buf[self.pos..])?;
        self.pos += n;
        Some(value)
    }

    /// Read a length-delimited field's payload at the current position.
    #[must_use]
    pub fn read_length_delimited(&mut self) -> Option<&'a [u8]> {
        let (len, n) = decode_varint(&self.buf[self.pos..])?;
        let len = len as usize;
        let start = self.pos + n;
        let end = start.checked_add(len)?;
        if end > self.buf.len() {
            return None;
        }
        self.pos = end;
        Some(&self.buf[start..end])
    }

    /// Skip exactly one field's payload of the given wire type.
    #[must_use]
    pub fn skip(&mut self, wire_type: WireType) -> Option<()> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                if self.pos + 8 > self.buf.len() {
                    return None;
                }
                self.pos += 8;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::Fixed32 => {
                if self.pos + 4 > self.buf.len() {
                    return None;
                }
                self.pos += 4;
            }
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_vectors() {
        let mut out = Vec::new();
        encode_varint(300, &mut out);
        assert_eq!(out, vec![0xAC, 0x02]);

        let mut out = Vec::new();
        encode_varint(0, &mut out);
        assert_eq!(out, vec![0x00]);

        let mut out = Vec::new();
        encode_varint(127, &mut out);
        assert_eq!(out, vec![0x7F]);

        let mut out = Vec::new();
        encode_varint(128, &mut out);
        assert_eq!(out, vec![0x80, 0x01]);
    }

    #[test]
    fn varint_round_trip_samples() {
        for &u in &[0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            encode_varint(u, &mut out);
            assert!(out.len() <= 10);
            let (decoded, n) = decode_varint(&out).unwrap();
            assert_eq!(decoded, u);
            assert_eq!(n, out.len());
        }
    }

    #[test]
    fn truncated_varint_is_none() {
        assert_eq!(decode_varint(&[0x80, 0x80, 0x80]), None);
        assert_eq!(decode_varint(&[]), None);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn varint_round_trip(u in any::<u64>()) {
            let mut out = Vec::new();
            encode_varint(u, &mut out);
            prop_assert!(out.len() <= 10);
            let (decoded, consumed) = decode_varint(&out).unwrap();
            prop_assert_eq!(decoded, u);
            prop_assert_eq!(consumed, out.len());
        }

        #[test]
        fn frame_round_trip_arbitrary_payload(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            tail in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut buf = frame_message(&payload);
            buf.extend_from_slice(&tail);
            let extracted = extract_message(&mut buf);
            prop_assert_eq!(extracted, Some(payload));
            prop_assert_eq!(buf, tail);
        }

        #[test]
        fn partial_frame_leaves_buffer_untouched(
            payload in proptest::collection::vec(any::<u8>(), 1..64),
            missing in 1usize..8,
        ) {
            let mut framed = frame_message(&payload);
            let cut = framed.len().saturating_sub(missing.min(framed.len()));
            framed.truncate(cut);
            let before = framed.clone();
            if extract_message(&mut framed).is_none() {
                prop_assert_eq!(framed, before);
            }
        }
    }

    #[test]
    fn frame_extraction_scenario() {
        let mut buf = vec![0x05, b'h', b'e', b'l', b'l', b'o', 0x03, b'a', b'b'];
        let first = extract_message(&mut buf).unwrap();
        assert_eq!(first, b"hello");
        assert_eq!(buf, vec![0x03, b'a', b'b']);

        let second = extract_message(&mut buf);
        assert_eq!(second, None);
        assert_eq!(buf, vec![0x03, b'a', b'b']);
    }

    #[test]
    fn frame_round_trip() {
        let payload = b"arbitrary payload bytes".to_vec();
        let mut framed = frame_message(&payload);
        framed.extend_from_slice(b"rest");
        let extracted = extract_message(&mut framed).unwrap();
        assert_eq!(extracted, payload);
        assert_eq!(framed, b"rest");
    }

    #[test]
    fn empty_buffer_is_none() {
        let mut buf = Vec::new();
        assert_eq!(extract_message(&mut buf), None);
    }

    #[test]
    fn key_inject_up_vector() {
        // S3: key_code=19 (UP), direction=3 (SHORT press).
        let mut payload = Encoder::new();
        payload.add_varint(1, 19).add_varint(2, 3);
        assert_eq!(payload.as_bytes(), &[0x08, 0x13, 0x10, 0x03]);

        let mut envelope = Encoder::new();
        envelope.add_message(2, &payload);
        assert_eq!(envelope.as_bytes(), &[0x12, 0x04, 0x08, 0x13, 0x10, 0x03]);

        let framed = frame_message(envelope.as_bytes());
        assert_eq!(framed, vec![0x06, 0x12, 0x04, 0x08, 0x13, 0x10, 0x03]);
    }

    #[test]
    fn decoder_reads_fields_back() {
        let mut enc = Encoder::new();
        enc.add_varint(1, 622).add_string(2, "hello");
        let bytes = enc.into_bytes();

        let mut dec = Decoder::new(&bytes);
        let (field, wt) = dec.read_tag().unwrap().unwrap();
        assert_eq!(field, 1);
        assert_eq!(wt, WireType::Varint);
        assert_eq!(dec.read_varint(), Some(622));

        let (field, wt) = dec.read_tag().unwrap().unwrap();
        assert_eq!(field, 2);
        assert_eq!(wt, WireType::LengthDelimited);
        assert_eq!(dec.read_length_delimited(), Some(b"hello".as_slice()));

        assert!(dec.is_empty());
        assert!(dec.read_tag().is_none());
    }

    #[test]
    fn decoder_skips_unknown_fields() {
        let mut enc = Encoder::new();
        enc.add_varint(99, 42).add_varint(1, 7);
        let bytes = enc.into_bytes();

        let mut dec = Decoder::new(&bytes);
        let (field, wt) = dec.read_tag().unwrap().unwrap();
        assert_eq!(field, 99);
        dec.skip(wt).unwrap();

        let (field, wt) = dec.read_tag().unwrap().unwrap();
        assert_eq!(field, 1);
        assert_eq!(wt, WireType::Varint);
        assert_eq!(dec.read_varint(), Some(7));
    }
}
