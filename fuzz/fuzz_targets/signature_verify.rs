#![no_main]

use daysince_access::{SignatureVerifier, TrustedPublicKey};
use ed25519_dalek::SigningKey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let verifier = SignatureVerifier::new(TrustedPublicKey::from(
        SigningKey::from_bytes(&[5; 32]).verifying_key(),
    ));
    let (timestamp, rest) = data.split_at(data.len().min(10));
    let (signature, body) = rest.split_at(rest.len().min(128));
    let timestamp = String::from_utf8_lossy(timestamp);
    let signature = String::from_utf8_lossy(signature);
    assert!(!verifier.verify(&timestamp, body, &signature));
});
