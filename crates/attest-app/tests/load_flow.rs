//! Integration tests for the sign / export / load flow.
//!
//! Real `SQLite` (in-memory), real encrypted keychain files in temp
//! directories, real Ed25519 operations. No mocking.

use attest_app::db;
use attest_app::loader::{handle_load, LoadOutcome, Loader};
use attest_app::secure_store::EncryptedStore;
use attest_app::trust_store::TrustStore;
use attest_crypto::{keystore, Identity};
use attest_protocol::{wire, Payload, SignedMessage};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

fn test_store() -> TrustStore {
    TrustStore::new(db::open_db(":memory:").expect("in-memory SQLite"))
}

fn keychain_identity(dir: &std::path::Path) -> Identity {
    let store = EncryptedStore::open(&dir.join("keychain.bin"), "test-pass").unwrap();
    keystore::get_or_create(&store).unwrap()
}

// ── Round-trip ───────────────────────────────────────────────────────

#[test]
fn signed_message_verifies_against_exported_key() {
    let dir = tempfile::TempDir::new().unwrap();
    let identity = keychain_identity(dir.path());
    let store = test_store();

    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let text = "the eagle has landed";
    let wire_form = SignedMessage::create(&identity, text).to_wire();

    match handle_load(&store, &wire_form) {
        LoadOutcome::Verified {
            message,
            timestamp_ms,
            matched_keys,
        } => {
            assert_eq!(message, text);
            assert!(timestamp_ms.is_some());
            assert_eq!(matched_keys, vec![identity.public_key_b64().unwrap()]);
        }
        other => panic!("expected Verified, got {other:?}"),
    }
}

#[test]
fn identity_survives_keychain_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = keychain_identity(dir.path());
    let second = keychain_identity(dir.path());

    assert_eq!(
        first.public_key_b64().unwrap(),
        second.public_key_b64().unwrap()
    );
}

// ── Negative verification ────────────────────────────────────────────

#[test]
fn untrusted_signer_is_rejected() {
    let store = test_store();
    let signer = Identity::generate(0);
    let bystander = Identity::generate(0);

    store.add(&bystander.public_key_b64().unwrap()).unwrap();

    let wire_form = SignedMessage::create(&signer, "hi").to_wire();
    assert!(matches!(
        handle_load(&store, &wire_form),
        LoadOutcome::VerificationFailed
    ));
}

#[test]
fn empty_trust_store_never_verifies() {
    let store = test_store();
    let signer = Identity::generate(0);

    let wire_form = SignedMessage::create(&signer, "hi").to_wire();
    assert!(matches!(
        handle_load(&store, &wire_form),
        LoadOutcome::VerificationFailed
    ));
}

// ── Tamper sensitivity ───────────────────────────────────────────────

#[test]
fn flipped_signature_bit_fails_verification() {
    let store = test_store();
    let identity = Identity::generate(0);
    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let mut msg = SignedMessage::create(&identity, "wire me the funds");
    msg.signature[10] ^= 0x01;

    let tampered = wire::serialize(&msg.payload, &msg.signature);
    assert!(matches!(
        handle_load(&store, &tampered),
        LoadOutcome::VerificationFailed
    ));
}

#[test]
fn flipped_payload_bit_fails_verification() {
    let store = test_store();
    let identity = Identity::generate(0);
    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let mut msg = SignedMessage::create(&identity, "wire me the funds");
    let last = msg.payload.len() - 1;
    msg.payload[last] ^= 0x40;

    let tampered = wire::serialize(&msg.payload, &msg.signature);
    assert!(matches!(
        handle_load(&store, &tampered),
        LoadOutcome::VerificationFailed
    ));
}

// ── Key import ───────────────────────────────────────────────────────

#[test]
fn importing_a_key_twice_keeps_one_row() {
    let store = test_store();
    let identity = Identity::generate(0);
    let exported = identity.public_key_b64().unwrap();

    match handle_load(&store, &exported) {
        LoadOutcome::Imported {
            already_trusted, ..
        } => assert!(!already_trusted),
        other => panic!("expected Imported, got {other:?}"),
    }
    match handle_load(&store, &exported) {
        LoadOutcome::Imported {
            already_trusted, ..
        } => assert!(already_trusted),
        other => panic!("expected Imported, got {other:?}"),
    }

    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn import_then_verify_end_to_end() {
    let store = test_store();
    let identity = Identity::generate(0);

    assert!(matches!(
        handle_load(&store, &identity.public_key_b64().unwrap()),
        LoadOutcome::Imported { .. }
    ));

    let wire_form = SignedMessage::create(&identity, "now you trust me").to_wire();
    assert!(matches!(
        handle_load(&store, &wire_form),
        LoadOutcome::Verified { .. }
    ));
}

#[test]
fn decodable_base64_that_is_not_a_key_is_invalid_format() {
    // "MTIzNDU2" decodes to "123456": one segment, not an SPKI document.
    assert!(matches!(
        handle_load(&test_store(), "MTIzNDU2"),
        LoadOutcome::InvalidFormat { .. }
    ));
}

// ── Input classification edges ───────────────────────────────────────

#[test]
fn whitespace_riddled_wire_form_still_verifies() {
    let store = test_store();
    let identity = Identity::generate(0);
    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let wire_form = SignedMessage::create(&identity, "hello").to_wire();
    let mut noisy = String::new();
    for (i, c) in wire_form.chars().enumerate() {
        noisy.push(c);
        if i % 5 == 0 {
            noisy.push('\n');
        }
        if i % 7 == 0 {
            noisy.push(' ');
        }
    }

    assert!(matches!(
        handle_load(&store, &noisy),
        LoadOutcome::Verified { .. }
    ));
}

#[test]
fn non_base64_before_colon_is_invalid_encoding() {
    assert!(matches!(
        handle_load(&test_store(), "!!!garbage:AAAA"),
        LoadOutcome::InvalidEncoding { .. }
    ));
}

#[test]
fn three_colon_segments_are_invalid_format() {
    assert!(matches!(
        handle_load(&test_store(), "AAAA:BBBB:CCCC"),
        LoadOutcome::InvalidFormat { .. }
    ));
}

#[test]
fn foreign_payload_still_verifies_with_lossy_display() {
    // A payload that skips the canonical "v1 <ms> <text>" structure still
    // verifies (the bytes are authoritative) and displays as-is.
    let store = test_store();
    let identity = Identity::generate(0);
    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let payload = b"Sun Jul 05 2026 untagged message".to_vec();
    let signature = identity.sign(&payload).to_bytes().to_vec();
    let wire_form = wire::serialize(&payload, &signature);

    match handle_load(&store, &wire_form) {
        LoadOutcome::Verified {
            message,
            timestamp_ms,
            ..
        } => {
            assert_eq!(message, "Sun Jul 05 2026 untagged message");
            assert_eq!(timestamp_ms, None);
        }
        other => panic!("expected Verified, got {other:?}"),
    }
}

#[test]
fn matched_keys_reports_the_full_set_of_validators() {
    // Two distinct trusted keys, one signer: exactly the signer's key comes
    // back, and duplicate rows cannot inflate the result.
    let store = test_store();
    let signer = Identity::generate(0);
    let bystander = Identity::generate(0);
    let canonical = signer.public_key_b64().unwrap();

    store.add(&bystander.public_key_b64().unwrap()).unwrap();
    store.add(&canonical).unwrap();
    assert!(!store.add(&canonical).unwrap());

    let wire_form = SignedMessage::create(&signer, "hi").to_wire();
    match handle_load(&store, &wire_form) {
        LoadOutcome::Verified { matched_keys, .. } => {
            assert_eq!(matched_keys, vec![canonical]);
        }
        other => panic!("expected Verified, got {other:?}"),
    }
}

// ── Worker ───────────────────────────────────────────────────────────

#[tokio::test]
async fn loader_worker_reports_back_on_completion() {
    let store = test_store();
    let identity = Identity::generate(0);
    store.add(&identity.public_key_b64().unwrap()).unwrap();

    let loader = Loader::spawn(store);

    let wire_form = SignedMessage::create(&identity, "over the channel").to_wire();
    match loader.load(wire_form).await {
        LoadOutcome::Verified { message, .. } => assert_eq!(message, "over the channel"),
        other => panic!("expected Verified, got {other:?}"),
    }

    // Import through the same worker.
    let newcomer = Identity::generate(0);
    assert!(matches!(
        loader.load(newcomer.public_key_b64().unwrap()).await,
        LoadOutcome::Imported { .. }
    ));
}

#[tokio::test]
async fn loader_outcomes_serialize_for_the_surface() {
    let loader = Loader::spawn(test_store());

    let outcome = loader.load("AAAA:BBBB:CCCC".into()).await;
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["type"], "invalidFormat");
}

// ── Wire/payload sanity used by the flows above ──────────────────────

#[test]
fn exported_key_is_bare_base64_spki() {
    let identity = Identity::generate(0);
    let exported = identity.public_key_b64().unwrap();

    assert!(!exported.contains(':'));
    let der = BASE64.decode(&exported).unwrap();
    assert!(Identity::decode_public_key(&der).is_ok());
}

#[test]
fn payload_carries_capture_time_not_verify_time() {
    let payload = Payload::from_parts(1_000, "old message");
    let decoded = Payload::from_bytes(&payload.to_bytes()).unwrap();
    assert_eq!(decoded.timestamp_ms, 1_000);
}
