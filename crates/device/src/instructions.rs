//! Instruction codes of the device firmware

use crate::types::Curve;

/// Command class understood by the firmware
pub const CLA: u8 = 0x55;

pub(crate) const GET_VERSION: u8 = 0;
pub(crate) const PUBLIC_KEY_SECP256K1: u8 = 1;
pub(crate) const PUBLIC_KEY_ED25519: u8 = 2;
pub(crate) const SIGN_SECP256K1: u8 = 3;
pub(crate) const SIGN_ED25519: u8 = 4;
pub(crate) const HASH: u8 = 100;
pub(crate) const PUBLIC_KEY_SECP256K1_TEST: u8 = 101;
pub(crate) const PUBLIC_KEY_ED25519_TEST: u8 = 102;
pub(crate) const SIGN_SECP256K1_TEST: u8 = 103;
pub(crate) const SIGN_ED25519_TEST: u8 = 104;
pub(crate) const ECHO: u8 = 200;

/// Instruction code of a public-key request
pub(crate) const fn public_key_ins(curve: Curve, test_slot: bool) -> u8 {
    match (curve, test_slot) {
        (Curve::Secp256k1, false) => PUBLIC_KEY_SECP256K1,
        (Curve::Ed25519, false) => PUBLIC_KEY_ED25519,
        (Curve::Secp256k1, true) => PUBLIC_KEY_SECP256K1_TEST,
        (Curve::Ed25519, true) => PUBLIC_KEY_ED25519_TEST,
    }
}

/// Instruction code of a signing request
pub(crate) const fn sign_ins(curve: Curve, test_slot: bool) -> u8 {
    match (curve, test_slot) {
        (Curve::Secp256k1, false) => SIGN_SECP256K1,
        (Curve::Ed25519, false) => SIGN_ED25519,
        (Curve::Secp256k1, true) => SIGN_SECP256K1_TEST,
        (Curve::Ed25519, true) => SIGN_ED25519_TEST,
    }
}
