//! ed25519 verification

use ed25519_dalek::{Signature, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};

use crate::error::VerifyError;

/// Derive the 32-byte public key from a 64-byte expanded private key buffer
///
/// Only the first 32 bytes (the seed) are used; the trailing half of the
/// buffer is ignored.
pub fn derive_public_key(private_key: &[u8; 64]) -> [u8; 32] {
    let mut seed = [0u8; SECRET_KEY_LENGTH];
    seed.copy_from_slice(&private_key[..SECRET_KEY_LENGTH]);
    SigningKey::from_bytes(&seed).verifying_key().to_bytes()
}

/// Verify an ed25519 signature over `message`
///
/// `public_key` must be 32 bytes, `signature` 64 bytes, both exactly as the
/// device returns them. Uses strict verification, which rejects the
/// malleable encodings the relaxed rules allow.
pub fn verify(message: &[u8], public_key: &[u8], signature: &[u8]) -> Result<bool, VerifyError> {
    let key_bytes: &[u8; 32] = public_key
        .try_into()
        .map_err(|_| VerifyError::MalformedPublicKey("expected 32 bytes"))?;
    let key = VerifyingKey::from_bytes(key_bytes)
        .map_err(|_| VerifyError::MalformedPublicKey("not a valid curve point"))?;

    let sig_bytes: &[u8; 64] = signature
        .try_into()
        .map_err(|_| VerifyError::MalformedSignature("expected 64 bytes"))?;
    let sig = Signature::from_bytes(sig_bytes);

    Ok(key.verify_strict(message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::Signer;

    use super::*;

    #[test]
    fn valid_signature_verifies() {
        let signing = SigningKey::from_bytes(&[5u8; 32]);
        let public = signing.verifying_key().to_bytes();
        let sig = signing.sign(b"attested message");
        assert_eq!(
            verify(b"attested message", &public, &sig.to_bytes()),
            Ok(true)
        );
    }

    #[test]
    fn wrong_message_is_a_mismatch() {
        let signing = SigningKey::from_bytes(&[5u8; 32]);
        let public = signing.verifying_key().to_bytes();
        let sig = signing.sign(b"attested message");
        assert_eq!(verify(b"another message", &public, &sig.to_bytes()), Ok(false));
    }

    #[test]
    fn derive_uses_only_the_seed_half() {
        let mut buffer = [0u8; 64];
        buffer[..32].copy_from_slice(&[5u8; 32]);
        buffer[32..].copy_from_slice(&[0xaa; 32]);
        let expected = SigningKey::from_bytes(&[5u8; 32]).verifying_key().to_bytes();
        assert_eq!(derive_public_key(&buffer), expected);
    }

    #[test]
    fn short_key_is_an_error() {
        let result = verify(b"message", &[0u8; 31], &[0u8; 64]);
        assert!(matches!(result, Err(VerifyError::MalformedPublicKey(_))));
    }

    #[test]
    fn short_signature_is_an_error() {
        let signing = SigningKey::from_bytes(&[5u8; 32]);
        let public = signing.verifying_key().to_bytes();
        let result = verify(b"message", &public, &[0u8; 63]);
        assert!(matches!(result, Err(VerifyError::MalformedSignature(_))));
    }
}
