//! Assembles the v3 self-signed X.509 certificate described by this
//! protocol's identity store, on top of the primitives in the parent module.

use rand::RngCore;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::Sha256;

use super::{bit_string, context_tag, integer, integer_u64, null, oid, sequence, set, utc_time, utf8_string, Reader};
use crate::error::DerError;

const OID_SHA256_WITH_RSA: [u32; 7] = [1, 2, 840, 113_549, 1, 1, 11];
const OID_RSA_ENCRYPTION: [u32; 7] = [1, 2, 840, 113_549, 1, 1, 1];
const OID_COMMON_NAME: [u32; 4] = [2, 5, 4, 3];
const OID_BASIC_CONSTRAINTS: [u32; 4] = [2, 5, 29, 19];

const COMMON_NAME: &str = "atvremote";
const CERT_VALIDITY_YEARS: i64 = 10;

/// Build a PKCS#1 `RSAPublicKey ::= SEQUENCE { INTEGER modulus, INTEGER publicExponent }`.
fn pkcs1_public_key_der(key: &impl PublicKeyParts) -> Vec<u8> {
    let mut content = Vec::new();
    integer(&key.n().to_bytes_be(), &mut content);
    integer(&key.e().to_bytes_be(), &mut content);
    let mut out = Vec::new();
    sequence(&content, &mut out);
    out
}

fn algorithm_identifier(components: &[u32; 7]) -> Vec<u8> {
    let mut content = Vec::new();
    oid(components, &mut content);
    null(&mut content);
    let mut out = Vec::new();
    sequence(&content, &mut out);
    out
}

fn relative_distinguished_name(cn: &str) -> Vec<u8> {
    let mut cn_attr = Vec::new();
    oid(&OID_COMMON_NAME, &mut cn_attr);
    utf8_string(cn, &mut cn_attr);
    let mut attr_seq = Vec::new();
    sequence(&cn_attr, &mut attr_seq);
    let mut rdn_set = Vec::new();
    set(&attr_seq, &mut rdn_set);
    let mut out = Vec::new();
    sequence(&rdn_set, &mut out);
    out
}

/// Format a `time::OffsetDateTime`-free UTC timestamp (seconds since epoch)
/// as `YYMMDDHHMMSSZ`. Implemented without a calendar crate dependency since
/// the only consumer is this certificate builder.
fn format_utc_time(unix_seconds: i64) -> String {
    let days_since_epoch = unix_seconds.div_euclid(86_400);
    let secs_of_day = unix_seconds.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days_since_epoch);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    let yy = (year % 100 + 100) % 100;
    format!("{yy:02}{month:02}{day:02}{hour:02}{minute:02}{second:02}Z")
}

/// Howard Hinnant's `civil_from_days` algorithm: days since the Unix epoch to
/// a proleptic Gregorian `(year, month, day)`.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365; // [0, 399]
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// Build a DER-encoded, self-signed v3 X.509 certificate for `key`.
///
/// `now_unix_seconds` is the current time (seconds since the Unix epoch),
/// passed in explicitly rather than sampled internally so certificate
/// generation is deterministic and testable.
///
/// # Errors
///
/// Returns [`DerError::SigningFailed`] if the RSASSA-PKCS1-v1.5-SHA256
/// signature over the TBS bytes could not be produced.
pub fn build_self_signed_certificate(key: &RsaPrivateKey, now_unix_seconds: i64) -> Result<Vec<u8>, DerError> {
    let tbs = build_tbs_certificate(key, now_unix_seconds);

    let signing_key = SigningKey::<Sha256>::new(key.clone());
    let signature = signing_key.try_sign(&tbs).map_err(|e| DerError::SigningFailed(e.to_string()))?;

    let mut cert_content = Vec::new();
    cert_content.extend_from_slice(&tbs);
    cert_content.extend_from_slice(&algorithm_identifier(&OID_SHA256_WITH_RSA));
    bit_string(&signature.to_bytes(), &mut cert_content);

    let mut out = Vec::new();
    sequence(&cert_content, &mut out);
    Ok(out)
}

fn build_tbs_certificate(key: &RsaPrivateKey, now_unix_seconds: i64) -> Vec<u8> {
    let mut version_inner = Vec::new();
    integer_u64(2, &mut version_inner); // v3
    let mut version = Vec::new();
    context_tag(0, &version_inner, &mut version);

    let mut serial_bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut serial_bytes);
    serial_bytes[0] &= 0x7F; // keep it a positive INTEGER
    let mut serial = Vec::new();
    integer(&serial_bytes, &mut serial);

    let signature_alg = algorithm_identifier(&OID_SHA256_WITH_RSA);
    let issuer = relative_distinguished_name(COMMON_NAME);
    let subject = relative_distinguished_name(COMMON_NAME);

    let not_before = format_utc_time(now_unix_seconds);
    let not_after = format_utc_time(now_unix_seconds + CERT_VALIDITY_YEARS * 365 * 86_400);
    let mut validity_inner = Vec::new();
    utc_time(&not_before, &mut validity_inner);
    utc_time(&not_after, &mut validity_inner);
    let mut validity = Vec::new();
    sequence(&validity_inner, &mut validity);

    let mut spki_inner = Vec::new();
    spki_inner.extend_from_slice(&algorithm_identifier(&OID_RSA_ENCRYPTION));
    bit_string(&pkcs1_public_key_der(key), &mut spki_inner);
    let mut spki = Vec::new();
    sequence(&spki_inner, &mut spki);

    let extensions = build_basic_constraints_extension();
    let mut extensions_seq = Vec::new();
    sequence(&extensions, &mut extensions_seq);
    let mut extensions_tagged = Vec::new();
    context_tag(3, &extensions_seq, &mut extensions_tagged);

    let mut tbs_inner = Vec::new();
    tbs_inner.extend_from_slice(&version);
    tbs_inner.extend_from_slice(&serial);
    tbs_inner.extend_from_slice(&signature_alg);
    tbs_inner.extend_from_slice(&issuer);
    tbs_inner.extend_from_slice(&validity);
    tbs_inner.extend_from_slice(&subject);
    tbs_inner.extend_from_slice(&spki);
    tbs_inner.extend_from_slice(&extensions_tagged);

    let mut tbs = Vec::new();
    sequence(&tbs_inner, &mut tbs);
    tbs
}

fn build_basic_constraints_extension() -> Vec<u8> {
    let mut ca_true = Vec::new();
    // BOOLEAN TRUE, hand-encoded: tag 0x01, length 1, value 0xFF.
    ca_true.push(0x01);
    ca_true.push(0x01);
    ca_true.push(0xFF);
    let mut ext_value_inner = Vec::new();
    sequence(&ca_true, &mut ext_value_inner);
    let mut ext_value = Vec::new();
    // extnValue is itself an OCTET STRING wrapping the DER above.
    ext_value.push(0x04);
    super::encode_length(ext_value_inner.len(), &mut ext_value);
    ext_value.extend_from_slice(&ext_value_inner);

    let mut ext_inner = Vec::new();
    oid(&OID_BASIC_CONSTRAINTS, &mut ext_inner);
    // critical = TRUE
    ext_inner.push(0x01);
    ext_inner.push(0x01);
    ext_inner.push(0xFF);
    ext_inner.extend_from_slice(&ext_value);

    let mut extension = Vec::new();
    sequence(&ext_inner, &mut extension);
    extension
}

/// A handful of fields pulled back out of a certificate this builder
/// produced, enough to validate the testable properties in the
/// specification without a full general-purpose X.509 parser.
#[derive(Debug)]
pub struct ParsedCertificate {
    /// X.509 version number (3 for a v3 certificate).
    pub version: u8,
    /// Positive serial number.
    pub serial: Vec<u8>,
    /// `true` if Basic Constraints is present, critical, and `cA = TRUE`.
    pub basic_constraints_ca: bool,
    /// The certificate's embedded `subjectPublicKeyInfo`'s PKCS#1 public key, DER-encoded.
    pub public_key_der: Vec<u8>,
    /// The TBS certificate bytes (what the signature was computed over).
    pub tbs_der: Vec<u8>,
    /// Raw signature bytes (unwrapped from the outer BIT STRING).
    pub signature: Vec<u8>,
}

/// Parse a certificate produced by [`build_self_signed_certificate`], acting
/// as the "independent X.509 parser" the specification's testable
/// properties call for.
///
/// # Errors
///
/// Returns a [`DerError`] if the buffer doesn't match the expected v3
/// certificate shape this builder emits.
pub fn parse_certificate(der: &[u8]) -> Result<ParsedCertificate, DerError> {
    let mut outer = Reader::new(der);
    let cert_body = outer.expect_tlv(0x30)?;

    let mut cert = Reader::new(cert_body);
    let tbs_start = cert.remaining();
    let tbs_body = cert.expect_tlv(0x30)?;
    let tbs_der = {
        let consumed = tbs_start.len() - cert.remaining().len();
        tbs_start[..consumed].to_vec()
    };

    // signatureAlgorithm, skipped (already known/fixed by this builder).
    cert.expect_tlv(0x30)?;
    let sig_bit_string = cert.expect_tlv(0x03)?;
    let signature = sig_bit_string.get(1..).ok_or(DerError::UnexpectedEof)?.to_vec();

    let mut tbs = Reader::new(tbs_body);
    let version_content = tbs.expect_tlv(0xA0)?;
    let mut version_reader = Reader::new(version_content);
    let version_int = version_reader.expect_tlv(0x02)?;
    let version = *version_int.last().ok_or(DerError::UnexpectedEof)? + 1;

    let serial = tbs.expect_tlv(0x02)?.to_vec();

    tbs.expect_tlv(0x30)?; // signature algorithm (inside TBS)
    tbs.expect_tlv(0x30)?; // issuer
    tbs.expect_tlv(0x30)?; // validity
    tbs.expect_tlv(0x30)?; // subject
    let spki = tbs.expect_tlv(0x30)?;
    let mut spki_reader = Reader::new(spki);
    spki_reader.expect_tlv(0x30)?; // algorithm
    let pub_key_bit_string = spki_reader.expect_tlv(0x03)?;
    let public_key_der = pub_key_bit_string.get(1..).ok_or(DerError::UnexpectedEof)?.to_vec();

    let extensions_tagged = tbs.expect_tlv(0xA3)?;
    let mut ext_tag_reader = Reader::new(extensions_tagged);
    let extensions_seq = ext_tag_reader.expect_tlv(0x30)?;
    let mut ext_seq_reader = Reader::new(extensions_seq);
    let basic_constraints_ext = ext_seq_reader.expect_tlv(0x30)?;
    let mut bc_reader = Reader::new(basic_constraints_ext);
    bc_reader.expect_tlv(0x06)?; // OID
    let critical = bc_reader.expect_tlv(0x01)?;
    let basic_constraints_ca = critical == [0xFF];

    Ok(ParsedCertificate {
        version,
        serial,
        basic_constraints_ca,
        public_key_der,
        tbs_der,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::VerifyingKey;
    use rsa::signature::Verifier;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::rngs::OsRng;
        RsaPrivateKey::new(&mut rng, 2048).expect("key generation")
    }

    #[test]
    fn certificate_parses_as_v3_with_expected_fields() {
        let key = test_key();
        let der = build_self_signed_certificate(&key, 1_700_000_000).unwrap();
        let parsed = parse_certificate(&der).unwrap();

        assert_eq!(parsed.version, 3);
        assert!(parsed.basic_constraints_ca);
        assert!(!parsed.serial.is_empty());
        assert_eq!(parsed.serial[0] & 0x80, 0, "serial must be a positive INTEGER");
    }

    #[test]
    fn self_signed_signature_verifies() {
        let key = test_key();
        let der = build_self_signed_certificate(&key, 1_700_000_000).unwrap();
        let parsed = parse_certificate(&der).unwrap();

        let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
        let signature = rsa::pkcs1v15::Signature::try_from(parsed.signature.as_slice()).unwrap();
        verifying_key.verify(&parsed.tbs_der, &signature).expect("self-signature must verify");
    }

    #[test]
    fn utc_time_formats_known_instant() {
        // 2023-11-14T22:13:20Z
        assert_eq!(format_utc_time(1_700_000_000), "231114221320Z");
    }
}
