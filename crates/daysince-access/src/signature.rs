use anyhow::{anyhow, Context, Result};
use ed25519_dalek::{Signature, VerifyingKey};
use tracing::debug;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const PUBLIC_KEY_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Ed25519 key of the trusted interaction dispatcher, parsed once at startup.
pub struct TrustedPublicKey(VerifyingKey);

impl TrustedPublicKey {
    /// Parses a hex-encoded 32-byte Ed25519 public key.
    pub fn from_hex(raw: &str) -> Result<Self> {
        let bytes = decode_hex_fixed::<PUBLIC_KEY_LENGTH>("public key", raw)?;
        let key = VerifyingKey::from_bytes(&bytes)
            .context("failed to decode ed25519 public key bytes")?;
        Ok(Self(key))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl From<VerifyingKey> for TrustedPublicKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key)
    }
}

#[derive(Debug, Clone)]
/// Checks detached signatures over `timestamp || body` against the trusted key.
pub struct SignatureVerifier {
    public_key: TrustedPublicKey,
}

impl SignatureVerifier {
    pub fn new(public_key: TrustedPublicKey) -> Self {
        Self { public_key }
    }

    /// Returns true only when `signature_hex` is a valid signature of the
    /// concatenated timestamp and raw body. Malformed input is treated as invalid.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        match verify_ed25519_signature(
            self.public_key.verifying_key(),
            &signature_message_bytes(timestamp, body),
            signature_hex,
        ) {
            Ok(()) => true,
            Err(error) => {
                debug!(%error, "interaction signature rejected");
                false
            }
        }
    }
}

/// Bytes covered by the dispatcher's signature.
pub fn signature_message_bytes(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    message
}

fn verify_ed25519_signature(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_hex: &str,
) -> Result<()> {
    let signature_bytes = decode_hex_fixed::<SIGNATURE_LENGTH>("signature", signature_hex)?;
    let signature = Signature::from_bytes(&signature_bytes);
    verifying_key
        .verify_strict(message, &signature)
        .map_err(|error| anyhow!("invalid ed25519 signature: {error}"))
}

fn decode_hex_fixed<const N: usize>(label: &str, raw: &str) -> Result<[u8; N]> {
    let decoded =
        hex::decode(raw.trim()).with_context(|| format!("{label} must be hex encoded"))?;
    decoded
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("{label} must decode to {N} bytes, got {}", bytes.len()))
}
