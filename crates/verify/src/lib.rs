//! Host-side verification of signatures produced by the signing device
//!
//! Verification is intentionally independent of the driver stack: it takes
//! raw byte material (public keys and signatures exactly as the device
//! returns them) and answers whether the signature is valid for a message.
//! A `Ok(false)` is a definite mismatch; malformed key or signature bytes
//! are reported as errors, never as a silent mismatch.

pub mod ed25519;
mod error;
pub mod secp256k1;

pub use error::VerifyError;
