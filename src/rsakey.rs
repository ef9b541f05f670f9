//! PKCS#1 `RSAPublicKey` parsing: extracts the modulus and exponent byte
//! strings that feed the pairing secret computation (§4.4 of the protocol).
//!
//! The output must be byte-exact with what the peer computes, so unlike a
//! general-purpose DER reader this strips the modulus's leading zero-padding
//! byte (used only to keep the INTEGER's sign bit clear) but leaves the
//! exponent untouched.

use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

use crate::der::{self, Reader};
use crate::error::DerError;

/// `(modulus_bytes, exponent_bytes)` extracted from a PKCS#1 `RSAPublicKey`.
pub type RsaPublicKeyParts = (Vec<u8>, Vec<u8>);

/// Parse a PKCS#1 `RSAPublicKey ::= SEQUENCE { INTEGER modulus, INTEGER publicExponent }`.
///
/// # Errors
///
/// Returns a [`DerError`] if the buffer isn't a well-formed PKCS#1
/// `RSAPublicKey` SEQUENCE of two INTEGERs.
pub fn parse_pkcs1_public_key(der: &[u8]) -> Result<RsaPublicKeyParts, DerError> {
    let mut outer = Reader::new(der);
    let body = outer.expect_tlv(0x30)?;

    let mut reader = Reader::new(body);
    let modulus = reader.expect_tlv(0x02)?;
    let exponent = reader.expect_tlv(0x02)?;

    Ok((strip_integer_padding(modulus), exponent.to_vec()))
}

/// Strip leading `0x00` padding bytes introduced by DER's INTEGER sign-bit
/// rule, keeping at least one byte.
fn strip_integer_padding(bytes: &[u8]) -> Vec<u8> {
    let mut i = 0;
    while bytes.len() - i > 1 && bytes[i] == 0x00 {
        i += 1;
    }
    bytes[i..].to_vec()
}

/// Build the PKCS#1 `RSAPublicKey` DER encoding of `key`, the inverse
/// operation used when embedding a public key into a certificate or when
/// transferring a public key to a peer.
#[must_use]
pub fn to_pkcs1_public_key_der(key: &RsaPublicKey) -> Vec<u8> {
    let mut content = Vec::new();
    der::integer(&key.n().to_bytes_be(), &mut content);
    der::integer(&key.e().to_bytes_be(), &mut content);
    let mut out = Vec::new();
    der::sequence(&content, &mut out);
    out
}
