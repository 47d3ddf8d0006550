//! USB HID transport and discovery for the keyfob signing device
//!
//! This crate binds the abstract chunk channel of `keyfob-apdu` to real
//! hardware: it enumerates USB HID interfaces, selects the first compatible
//! signing device, and moves 64-byte chunks as HID reports.
//!
//! Discovery policy is first-match; when no compatible device is present
//! the error carries the full candidate listing for diagnostics.

mod config;
mod discovery;
mod error;
mod transport;

pub use config::HidConfig;
pub use discovery::{CandidateDevice, DeviceManager, SIGNER_USAGE_PAGE, SIGNER_VENDOR_ID};
pub use error::HidError;
pub use transport::HidTransport;
