//! secp256k1 / ECDSA verification

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature, VerifyingKey};

use crate::error::VerifyError;

/// Verify an ECDSA signature over `message`
///
/// `public_key` is the 65-byte uncompressed SEC1 encoding returned by the
/// device (a compressed encoding is accepted too); `signature` is
/// DER-encoded. The message is hashed with SHA-256 before verification,
/// matching what the device signs.
pub fn verify(message: &[u8], public_key: &[u8], signature: &[u8]) -> Result<bool, VerifyError> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|_| VerifyError::MalformedPublicKey("not a valid SEC1 point encoding"))?;
    let sig = Signature::from_der(signature)
        .map_err(|_| VerifyError::MalformedSignature("not valid ASN.1 DER"))?;

    // Accept high-s signatures from the device.
    let sig = sig.normalize_s().unwrap_or(sig);

    Ok(key.verify(message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::signature::Signer;
    use k256::ecdsa::SigningKey;

    use super::*;

    fn keypair() -> (SigningKey, Vec<u8>) {
        let signing = SigningKey::from_bytes(&[7u8; 32].into()).unwrap();
        let public = signing
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        (signing, public)
    }

    #[test]
    fn valid_signature_verifies() {
        let (signing, public) = keypair();
        let message = b"message to sign";
        let sig: Signature = signing.sign(message);
        assert_eq!(verify(message, &public, sig.to_der().as_bytes()), Ok(true));
    }

    #[test]
    fn wrong_message_is_a_mismatch() {
        let (signing, public) = keypair();
        let sig: Signature = signing.sign(b"message to sign");
        assert_eq!(
            verify(b"a different message", &public, sig.to_der().as_bytes()),
            Ok(false)
        );
    }

    #[test]
    fn wrong_key_is_a_mismatch() {
        let (signing, _) = keypair();
        let other = SigningKey::from_bytes(&[9u8; 32].into()).unwrap();
        let other_pub = other.verifying_key().to_encoded_point(false);
        let sig: Signature = signing.sign(b"message");
        assert_eq!(
            verify(b"message", other_pub.as_bytes(), sig.to_der().as_bytes()),
            Ok(false)
        );
    }

    #[test]
    fn malformed_key_is_an_error_not_a_mismatch() {
        let (signing, _) = keypair();
        let sig: Signature = signing.sign(b"message");
        let result = verify(b"message", &[0u8; 65], sig.to_der().as_bytes());
        assert!(matches!(result, Err(VerifyError::MalformedPublicKey(_))));
    }

    #[test]
    fn malformed_signature_is_an_error() {
        let (_, public) = keypair();
        let result = verify(b"message", &public, &[0x30, 0x01, 0xff]);
        assert!(matches!(result, Err(VerifyError::MalformedSignature(_))));
    }
}
