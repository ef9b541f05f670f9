//! Computes the SHA-256 pairing secret over both peers' RSA public-key
//! components and the on-screen PIN, including the local check-byte
//! rejection of a mistyped PIN before anything is sent.

use sha2::{Digest, Sha256};

use crate::error::AtvError;

/// Normalize and validate a PIN as shown on the TV: uppercase, ASCII-space
/// stripped, hex digits only, even length, at least 2 characters; then split
/// it into byte pairs.
///
/// # Errors
///
/// Returns [`AtvError::InvalidResponse`] if the PIN doesn't meet those
/// constraints.
pub fn parse_pin(pin: &str) -> Result<Vec<u8>, AtvError> {
    let normalized: String = pin.chars().filter(|c| !c.is_ascii_whitespace()).collect::<String>().to_ascii_uppercase();

    if normalized.len() < 2 || normalized.len() % 2 != 0 {
        return Err(AtvError::InvalidResponse(format!(
            "PIN must have an even length of at least 2 hex digits, got {}",
            normalized.len()
        )));
    }
    if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AtvError::InvalidResponse("PIN must be hexadecimal".to_string()));
    }

    normalized
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let hex = std::str::from_utf8(pair).expect("ASCII hex digits are valid UTF-8");
            u8::from_str_radix(hex, 16).map_err(|_| AtvError::InvalidResponse("PIN contains invalid hex byte".to_string()))
        })
        .collect()
}

/// Compute the 32-byte pairing secret:
/// `SHA-256(client_mod ‖ client_exp ‖ server_mod ‖ server_exp ‖ code_bytes)`,
/// then enforce the check byte (`code_bytes[0] == secret[0]`) before
/// returning, so a wrong PIN never reaches the wire.
///
/// # Errors
///
/// Returns [`AtvError::SecretMismatch`] if the check byte doesn't match.
pub fn compute_checked_secret(
    client_mod: &[u8],
    client_exp: &[u8],
    server_mod: &[u8],
    server_exp: &[u8],
    code_bytes: &[u8],
) -> Result<[u8; 32], AtvError> {
    let mut hasher = Sha256::new();
    hasher.update(client_mod);
    hasher.update(client_exp);
    hasher.update(server_mod);
    hasher.update(server_exp);
    hasher.update(code_bytes);
    let secret: [u8; 32] = hasher.finalize().into();

    let expected_check_byte = code_bytes.first().copied().ok_or(AtvError::SecretMismatch)?;
    if secret[0] != expected_check_byte {
        return Err(AtvError::SecretMismatch);
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_and_whitespace() {
        assert_eq!(parse_pin("a1 b2").unwrap(), vec![0xA1, 0xB2]);
    }

    #[test]
    fn rejects_odd_length() {
        assert!(parse_pin("A1B").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(parse_pin("ZZ11").is_err());
    }

    #[test]
    fn rejects_too_short() {
        assert!(parse_pin("A").is_err());
    }

    #[test]
    fn s4_pin_check_vector() {
        // S4: client_mod=0x01, client_exp=[0x01,0x00,0x01], server_mod=0x02,
        // server_exp=[0x01,0x00,0x01], PIN "A1B2" -> code_bytes=[0xA1,0xB2].
        let code_bytes = parse_pin("A1B2").unwrap();
        let hash_input: Vec<u8> = [&[0x01][..], &[0x01, 0x00, 0x01], &[0x02], &[0x01, 0x00, 0x01], &code_bytes].concat();
        let expected_first_byte = Sha256::digest(&hash_input)[0];

        if expected_first_byte == 0xA1 {
            let secret =
                compute_checked_secret(&[0x01], &[0x01, 0x00, 0x01], &[0x02], &[0x01, 0x00, 0x01], &code_bytes).unwrap();
            assert_eq!(secret[0], 0xA1);
        } else {
            let result = compute_checked_secret(&[0x01], &[0x01, 0x00, 0x01], &[0x02], &[0x01, 0x00, 0x01], &code_bytes);
            assert!(matches!(result, Err(AtvError::SecretMismatch)));
        }
    }

    #[test]
    fn wrong_pin_is_rejected_locally_with_high_probability() {
        let client_mod = [0xAB; 32];
        let client_exp = [0x01, 0x00, 0x01];
        let server_mod = [0xCD; 32];
        let server_exp = [0x01, 0x00, 0x01];

        let mut rejected = 0;
        let mut accepted = 0;
        for byte in 0u8..=255 {
            let code_bytes = vec![byte, 0x00];
            match compute_checked_secret(&client_mod, &client_exp, &server_mod, &server_exp, &code_bytes) {
                Ok(secret) => {
                    accepted += 1;
                    assert_eq!(secret[0], byte);
                }
                Err(AtvError::SecretMismatch) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        // Exactly one PIN value should match for a fixed pair of certs.
        assert_eq!(accepted, 1);
        assert_eq!(rejected, 255);
    }
}
