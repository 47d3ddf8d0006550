//! Typed views of device request and response data

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::Error;

/// Hardening bit of a key path component
pub const HARDENED: u32 = 0x8000_0000;

/// Identity of the firmware build running on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AppId {
    /// Production firmware
    #[display("release")]
    Release,
    /// Test firmware with diagnostics and fixed test keys
    #[display("testing")]
    Testing,
    /// Older test firmware with diagnostics but no test key slots
    #[display("legacy testing")]
    Legacy,
    /// An identity byte this driver does not know
    #[display("unknown (0x{_0:02x})")]
    Unknown(u8),
}

impl AppId {
    pub(crate) const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Release,
            0xFF => Self::Testing,
            0x55 => Self::Legacy,
            other => Self::Unknown(other),
        }
    }

    /// Whether this firmware answers the echo and hash diagnostics
    pub const fn supports_diagnostics(&self) -> bool {
        matches!(self, Self::Testing | Self::Legacy)
    }

    /// Whether this firmware exposes the fixed test key slots
    pub const fn supports_test_slots(&self) -> bool {
        matches!(self, Self::Testing)
    }
}

/// Firmware version reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("{major}.{minor}.{patch} ({app_id})")]
pub struct VersionInfo {
    /// Firmware build identity
    pub app_id: AppId,
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
}

impl VersionInfo {
    pub(crate) fn parse(payload: &[u8]) -> Result<Self, Error> {
        let [app_id, major, minor, patch] = *payload else {
            return Err(Error::Parse("version payload is not 4 bytes"));
        };
        Ok(Self {
            app_id: AppId::from_byte(app_id),
            major,
            minor,
            patch,
        })
    }
}

/// Signature scheme selected for a key operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Curve {
    /// ECDSA over secp256k1, SHA-256 message digest, DER signatures
    #[display("secp256k1")]
    Secp256k1,
    /// Ed25519 with 64-byte signatures
    #[display("ed25519")]
    Ed25519,
}

/// A key path selecting one derived key on the device
///
/// One to ten 32-bit components; the wire encoding is a depth byte
/// followed by each component in little-endian order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Deepest path the firmware accepts
    pub const MAX_DEPTH: usize = 10;

    /// Build a path from raw components (hardening bits included)
    pub fn new(components: Vec<u32>) -> Result<Self, Error> {
        if components.is_empty() {
            return Err(Error::InvalidPath("path needs at least one component"));
        }
        if components.len() > Self::MAX_DEPTH {
            return Err(Error::InvalidPath("path exceeds maximum depth of 10"));
        }
        Ok(Self(components))
    }

    /// The conventional five-component account path, purpose 44
    ///
    /// The first three components are hardened.
    pub fn bip44(coin_type: u32, account: u32, change: u32, index: u32) -> Self {
        Self(vec![
            44 | HARDENED,
            coin_type | HARDENED,
            account | HARDENED,
            change,
            index,
        ])
    }

    /// Path components, hardening bits included
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Wire encoding: depth byte plus little-endian components
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(1 + self.0.len() * 4);
        encoded.push(self.0.len() as u8);
        for component in &self.0 {
            encoded.extend_from_slice(&component.to_le_bytes());
        }
        encoded
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in &self.0 {
            if component & HARDENED != 0 {
                write!(f, "/{}'", component & !HARDENED)?;
            } else {
                write!(f, "/{component}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    /// Parse `m/44'/118'/0'/0/0` (the leading `m/` is optional, `h` works
    /// as the hardening marker too)
    fn from_str(s: &str) -> Result<Self, Error> {
        let trimmed = s.strip_prefix("m/").unwrap_or(s);
        let mut components = Vec::new();
        for part in trimmed.split('/') {
            let (digits, hardened) = match part.strip_suffix(['\'', 'h']) {
                Some(digits) => (digits, HARDENED),
                None => (part, 0),
            };
            let value: u32 = digits
                .parse()
                .map_err(|_| Error::InvalidPath("path component is not a number"))?;
            if value & HARDENED != 0 {
                return Err(Error::InvalidPath("path component out of range"));
            }
            components.push(value | hardened);
        }
        Self::new(components)
    }
}

/// Which key on the device an operation addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySlot {
    /// A key derived from the device seed along a path
    Derived(DerivationPath),
    /// The fixed test key, available on testing firmware only
    Test,
}

/// A public key returned by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    curve: Curve,
    bytes: Bytes,
}

impl PublicKey {
    pub(crate) fn from_payload(curve: Curve, payload: Bytes) -> Result<Self, Error> {
        match curve {
            Curve::Secp256k1 => {
                if payload.len() != 65 || payload[0] != 0x04 {
                    return Err(Error::Parse("expected a 65-byte uncompressed SEC1 key"));
                }
            }
            Curve::Ed25519 => {
                if payload.len() != 32 {
                    return Err(Error::Parse("expected a 32-byte ed25519 key"));
                }
            }
        }
        Ok(Self {
            curve,
            bytes: payload,
        })
    }

    /// The curve this key belongs to
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Raw key bytes as the device returned them
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bytes))
    }
}

/// A signature returned by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    curve: Curve,
    bytes: Bytes,
}

impl Signature {
    pub(crate) fn from_payload(curve: Curve, payload: Bytes) -> Result<Self, Error> {
        match curve {
            Curve::Secp256k1 => {
                // DER SEQUENCE; full parsing is the verifier's job.
                if payload.len() < 8 || payload[0] != 0x30 {
                    return Err(Error::Parse("expected a DER-encoded ECDSA signature"));
                }
            }
            Curve::Ed25519 => {
                if payload.len() != 64 {
                    return Err(Error::Parse("expected a 64-byte ed25519 signature"));
                }
            }
        }
        Ok(Self {
            curve,
            bytes: payload,
        })
    }

    /// The curve this signature was made on
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Raw signature bytes as the device returned them
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_bytes() {
        assert_eq!(AppId::from_byte(0x00), AppId::Release);
        assert_eq!(AppId::from_byte(0xFF), AppId::Testing);
        assert_eq!(AppId::from_byte(0x55), AppId::Legacy);
        assert_eq!(AppId::from_byte(0x42), AppId::Unknown(0x42));
        assert_eq!(AppId::Unknown(0x42).to_string(), "unknown (0x42)");
    }

    #[test]
    fn version_parse_and_display() {
        let version = VersionInfo::parse(&[0xFF, 0, 1, 0]).unwrap();
        assert_eq!(version.app_id, AppId::Testing);
        assert_eq!(version.to_string(), "0.1.0 (testing)");
        assert!(VersionInfo::parse(&[0xFF, 0, 1]).is_err());
    }

    #[test]
    fn path_encoding_is_depth_then_le_components() {
        let path = DerivationPath::new(vec![44, 118, 0]).unwrap();
        let mut expected = vec![3u8];
        expected.extend_from_slice(&44u32.to_le_bytes());
        expected.extend_from_slice(&118u32.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(path.encode(), expected);
    }

    #[test]
    fn path_depth_bounds() {
        assert!(DerivationPath::new(vec![]).is_err());
        assert!(DerivationPath::new(vec![0; 10]).is_ok());
        assert!(DerivationPath::new(vec![0; 11]).is_err());
    }

    #[test]
    fn bip44_hardens_the_first_three() {
        let path = DerivationPath::bip44(118, 0, 0, 5);
        assert_eq!(
            path.components(),
            &[44 | HARDENED, 118 | HARDENED, HARDENED, 0, 5]
        );
        assert_eq!(path.to_string(), "m/44'/118'/0'/0/5");
    }

    #[test]
    fn path_round_trips_through_display() {
        let path = DerivationPath::bip44(118, 2, 0, 7);
        let reparsed: DerivationPath = path.to_string().parse().unwrap();
        assert_eq!(reparsed, path);

        let bare: DerivationPath = "44'/118'/0'/0/0".parse().unwrap();
        assert_eq!(bare, DerivationPath::bip44(118, 0, 0, 0));
    }

    #[test]
    fn path_parse_rejects_garbage() {
        assert!("m/44'/abc".parse::<DerivationPath>().is_err());
        assert!("".parse::<DerivationPath>().is_err());
        assert!("m/2147483648".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn public_key_length_checks() {
        let mut sec1 = vec![0x04u8];
        sec1.extend_from_slice(&[0x11; 64]);
        assert!(PublicKey::from_payload(Curve::Secp256k1, sec1.into()).is_ok());
        assert!(PublicKey::from_payload(Curve::Secp256k1, Bytes::from_static(&[0x04; 33])).is_err());
        assert!(PublicKey::from_payload(Curve::Ed25519, Bytes::from(vec![0u8; 32])).is_ok());
        assert!(PublicKey::from_payload(Curve::Ed25519, Bytes::from(vec![0u8; 31])).is_err());
    }

    #[test]
    fn signature_shape_checks() {
        let der = Bytes::from_static(&[0x30, 0x08, 0x02, 0x02, 0x01, 0x01, 0x02, 0x02, 0x01, 0x01]);
        assert!(Signature::from_payload(Curve::Secp256k1, der).is_ok());
        assert!(Signature::from_payload(Curve::Secp256k1, Bytes::from(vec![0u8; 70])).is_err());
        assert!(Signature::from_payload(Curve::Ed25519, Bytes::from(vec![0u8; 64])).is_ok());
        assert!(Signature::from_payload(Curve::Ed25519, Bytes::from(vec![0u8; 63])).is_err());
    }
}
