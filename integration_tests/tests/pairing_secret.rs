use atvremote::der::cert::{build_self_signed_certificate, parse_certificate};
use atvremote::pairing::secret::{compute_checked_secret, parse_pin};
use atvremote::rsakey::parse_pkcs1_public_key;
use rsa::RsaPrivateKey;

#[test]
fn matching_pin_yields_a_secret_whose_check_byte_agrees() {
    let mut rng = rand::rngs::OsRng;
    let client_key = RsaPrivateKey::new(&mut rng, 2048).expect("client key");
    let server_key = RsaPrivateKey::new(&mut rng, 2048).expect("server key");

    let client_cert = build_self_signed_certificate(&client_key, 1_700_000_000).unwrap();
    let server_cert = build_self_signed_certificate(&server_key, 1_700_000_000).unwrap();

    let client_pub = parse_pkcs1_public_key(&parse_certificate(&client_cert).unwrap().public_key_der).unwrap();
    let server_pub = parse_pkcs1_public_key(&parse_certificate(&server_cert).unwrap().public_key_der).unwrap();

    // Sweep single-byte PINs until one produces a matching check byte; with
    // distinct random keys there is always exactly one that does (mod
    // degenerate all-zero hash collisions, astronomically unlikely here).
    let mut found = false;
    for byte in 0u8..=255 {
        let pin = format!("{byte:02X}");
        let code_bytes = parse_pin(&pin).unwrap();
        if compute_checked_secret(&client_pub.0, &client_pub.1, &server_pub.0, &server_pub.1, &code_bytes).is_ok() {
            found = true;
            break;
        }
    }
    assert!(found, "exactly one single-byte PIN must satisfy the check byte");
}
