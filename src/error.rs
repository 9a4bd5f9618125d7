//! Error types for the usbtemp crate.

use std::time::Duration;
use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while enumerating or opening the USB device.
    #[error("USB I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No device with the expected vendor/product identifiers is attached.
    #[error("temperature sensor device not found")]
    DeviceNotFound,

    /// A control transfer failed (timeout, stall, or disconnect mid-transfer).
    #[error("control transfer failed: {context}")]
    Transport {
        /// Description of the transfer failure.
        context: String,
    },

    /// The device replied with fewer or more bytes than the message requires.
    #[error("reply length mismatch: expected {expected} bytes, got {actual}")]
    ProtocolMismatch {
        /// The reply length the message layout requires.
        expected: usize,
        /// The length actually received.
        actual: usize,
    },

    /// The external attribute namespace rejected creation of an attribute.
    #[error("attribute namespace rejected {name:?}")]
    Exposure {
        /// The attribute name that was rejected.
        name: String,
    },

    /// The requested probe ordinal is not present in the current snapshot.
    #[error("probe not found: ordinal {ordinal}")]
    ProbeNotFound {
        /// The ordinal that was requested.
        ordinal: u8,
    },

    /// A bounded rescan wait elapsed before the device reported completion.
    #[error("rescan did not complete within {deadline:?}")]
    RescanTimeout {
        /// The configured wait bound.
        deadline: Duration,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
