use std::fmt;

/// Server-held signing secret for credential MACs.
///
/// Held as an explicit dependency of the issuer and verifier rather than a
/// process global, so tests can run with their own key material. Never
/// leaves the server; anyone without it can neither mint a valid token nor
/// forge a payload signature.
pub struct GateSecret(Vec<u8>);

impl GateSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for GateSecret {
    fn drop(&mut self) {
        // Zeroize on drop
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for GateSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GateSecret(..)")
    }
}
