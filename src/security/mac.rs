//! HMAC-SHA256 signing for credential payloads.
//!
//! The signature authenticates the canonical serialization of a QR payload
//! under the server secret. Verification decodes the presented hex tag and
//! compares it in constant time, so a forged signature cannot be narrowed
//! down byte by byte through response timing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::secret::GateSecret;

type HmacSha256 = Hmac<Sha256>;

fn raw_mac(secret: &GateSecret, bytes: &[u8]) -> [u8; 32] {
    // Per RFC 2104, HMAC accepts keys of any size; new_from_slice only
    // fails for InvalidLength, which cannot happen with a &[u8] key.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(bytes);

    let mut output = [0u8; 32];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Sign canonical payload bytes, returning the hex-encoded tag that goes
/// into the `signature` field.
pub fn sign(secret: &GateSecret, bytes: &[u8]) -> String {
    hex::encode(raw_mac(secret, bytes))
}

/// Verify a hex-encoded tag against canonical payload bytes.
///
/// Undecodable hex is simply an invalid signature; length mismatches and
/// byte mismatches are rejected through the same constant-time path.
pub fn verify(secret: &GateSecret, bytes: &[u8], signature_hex: &str) -> bool {
    let Ok(presented) = hex::decode(signature_hex) else {
        return false;
    };
    let expected = raw_mac(secret, bytes);
    presented.ct_eq(&expected).into()
}
