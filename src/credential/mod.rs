//! Credential issuance: payload shape, signing, and QR rendering.

pub mod issuer;
pub mod payload;
pub mod qr;

pub use issuer::{CredentialIssuer, IssueError, IssuedCredential};
pub use payload::{QrPayload, PAYLOAD_TYPE};
