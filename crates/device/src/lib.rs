//! High-level driver for the keyfob signing device
//!
//! A [`Session`] owns a chunk transport and exposes the device's
//! operations as typed methods: version query, key-path public keys,
//! signing, and the diagnostics only test firmware answers. The session
//! checks the firmware identity before sending test-only instructions so
//! an unsupported request fails on the host with a clear error instead of
//! a bare status word.
//!
//! Commands are strictly sequential; a session never pipelines, which the
//! `&mut self` receivers make structural.

mod error;
mod instructions;
mod session;
mod types;

pub use error::{Error, Result};
pub use instructions::CLA;
pub use session::Session;
pub use types::{
    AppId, Curve, DerivationPath, KeySlot, PublicKey, Signature, VersionInfo, HARDENED,
};
