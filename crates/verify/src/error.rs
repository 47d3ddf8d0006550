//! Verification error types

/// Errors raised while parsing verification inputs
///
/// A verification mismatch is not an error; these cover inputs that could
/// not be interpreted at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The public key bytes do not encode a valid point
    #[error("malformed public key: {0}")]
    MalformedPublicKey(&'static str),

    /// The signature bytes could not be parsed
    #[error("malformed signature: {0}")]
    MalformedSignature(&'static str),
}
