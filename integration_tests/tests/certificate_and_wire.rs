use atvremote::der::cert::{build_self_signed_certificate, parse_certificate};
use rsa::RsaPrivateKey;

#[test]
fn self_signed_certificate_round_trips_through_parser() {
    let mut rng = rand::rngs::OsRng;
    let key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");

    let cert_der = build_self_signed_certificate(&key, 1_700_000_000).expect("build certificate");
    let parsed = parse_certificate(&cert_der).expect("parse certificate");

    assert_eq!(parsed.version, 3, "this builder always emits X.509 v3");
    assert!(parsed.basic_constraints_ca);
    assert!(!parsed.public_key_der.is_empty());
}
