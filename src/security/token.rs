use rand::rngs::OsRng;
use rand::RngCore;

/// Raw entropy per token. 32 CSPRNG bytes; hex-encoded to 64 chars.
const TOKEN_BYTES: usize = 32;

/// Mint an opaque credential token.
///
/// Tokens are pure OS randomness, never derived from ticket, event, or
/// owner identifiers, so holding every public identifier in the system
/// still gives an attacker nothing to construct one from. The binding of a
/// token to its ticket lives only in the server-side token record.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
