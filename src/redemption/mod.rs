//! The redemption engine: parses scanned payloads, authenticates them, and
//! atomically consumes them.

pub mod verifier;

pub use verifier::{Admission, GateVerifier, ScanRejection};
