//! Credential security primitives: the signing secret, token generation,
//! MAC signing/verification, and expiry computation. Shared by the issuer
//! and the redemption engine.

pub mod mac;
pub mod secret;
pub mod token;

pub use mac::{sign, verify};
pub use secret::GateSecret;
pub use token::generate_token;

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Compute a credential expiry from the server clock.
///
/// Truncated to whole seconds so the RFC 3339 form that gets signed is
/// deterministic. Expiry is always judged against the verifying server's
/// clock; nothing a client reports ever enters this computation.
pub fn expiry_after(window: Duration) -> DateTime<Utc> {
    (Utc::now() + window).trunc_subsecs(0)
}
