//! Wire message layouts.
//!
//! All replies are fixed-size packed little-endian structures; field order
//! and widths are part of the vendor wire contract.

use bytes::Buf;

use crate::error::{Error, Result};

/// Flags value marking a probe slot as populated.
pub const SLOT_POPULATED: u8 = 0x01;

/// Rescan-status answer meaning the scan has completed.
pub const RESCAN_DONE: u8 = 23;

/// Reply to a short-status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortStatus {
    /// Firmware version, high byte.
    pub version_high: u8,
    /// Firmware version, low byte.
    pub version_low: u8,
    /// Device uptime tick at the time of the reply.
    pub timestamp: u32,
    /// Physical probe-slot capacity. An upper bound; not every slot is
    /// necessarily populated.
    pub supported_probes: u8,
}

impl ShortStatus {
    /// Wire size in bytes (one trailing padding byte included).
    pub const SIZE: usize = 8;

    /// Parse a short-status reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMismatch`] if `data` is not exactly
    /// [`ShortStatus::SIZE`] bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::ProtocolMismatch {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let version_high = buf.get_u8();
        let version_low = buf.get_u8();
        let timestamp = buf.get_u32_le();
        let supported_probes = buf.get_u8();
        // trailing padding byte ignored

        Ok(Self {
            version_high,
            version_low,
            timestamp,
            supported_probes,
        })
    }
}

/// One entry of a long-status reply: the state of a single probe slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeStatus {
    /// Probe serial number.
    pub serial: [u8; 6],
    /// Probe type byte.
    pub probe_type: u8,
    /// Slot flags; [`SLOT_POPULATED`] marks the slot as occupied.
    pub flags: u8,
    /// Raw temperature sample, low byte first.
    pub temperature: [u8; 2],
    /// Device uptime tick of the sample.
    pub timestamp: u32,
}

impl ProbeStatus {
    /// Wire size in bytes (two trailing padding bytes included).
    pub const SIZE: usize = 16;

    /// Parse a single slot entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMismatch`] if `data` is shorter than
    /// [`ProbeStatus::SIZE`] bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::ProtocolMismatch {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let mut serial = [0u8; 6];
        buf.copy_to_slice(&mut serial);
        let probe_type = buf.get_u8();
        let flags = buf.get_u8();
        let temperature = [buf.get_u8(), buf.get_u8()];
        let timestamp = buf.get_u32_le();
        // two trailing padding bytes ignored

        Ok(Self {
            serial,
            probe_type,
            flags,
            temperature,
            timestamp,
        })
    }

    /// Parse a full long-status reply of `capacity` slot entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMismatch`] if `data` is not exactly
    /// `capacity * ProbeStatus::SIZE` bytes.
    pub fn parse_slots(data: &[u8], capacity: u8) -> Result<Vec<Self>> {
        let expected = Self::SIZE * capacity as usize;
        if data.len() != expected {
            return Err(Error::ProtocolMismatch {
                expected,
                actual: data.len(),
            });
        }

        data.chunks_exact(Self::SIZE).map(Self::parse).collect()
    }

    /// Whether this slot has a probe plugged in.
    pub fn is_populated(&self) -> bool {
        self.flags == SLOT_POPULATED
    }
}

/// Reply to a rescan trigger or rescan-status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RescanReply {
    /// Raw answer byte; [`RESCAN_DONE`] means the scan has completed.
    pub answer: u8,
}

impl RescanReply {
    /// Wire size in bytes.
    pub const SIZE: usize = 1;

    /// Parse a rescan reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMismatch`] if `data` is empty.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::ProtocolMismatch {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        Ok(Self { answer: data[0] })
    }

    /// Whether the device reports the rescan as complete.
    ///
    /// Anything other than [`RESCAN_DONE`] means "not yet".
    pub fn is_done(&self) -> bool {
        self.answer == RESCAN_DONE
    }
}
