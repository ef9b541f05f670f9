use atvremote::{FileBackend, IdentityStore};

#[test]
fn identity_persists_across_file_backend_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let cert_first = {
        let backend = FileBackend::new(dir.path()).expect("open file backend");
        let mut store = IdentityStore::open(Box::new(backend)).expect("open identity store");
        let identity = store.get_or_create_identity().expect("identity");
        identity.certificate_der().to_vec()
    };

    let cert_second = {
        let backend = FileBackend::new(dir.path()).expect("reopen file backend");
        let mut store = IdentityStore::open(Box::new(backend)).expect("reopen identity store");
        let identity = store.get_or_create_identity().expect("identity");
        identity.certificate_der().to_vec()
    };

    assert_eq!(cert_first, cert_second, "identity must survive a process restart");
}
