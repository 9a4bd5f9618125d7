//! # usbtemp
//!
//! A Rust driver library for multi-probe USB temperature sensors speaking
//! a small vendor control-transfer protocol.
//!
//! The device reports a fixed number of physical probe slots; probes can
//! be plugged and unplugged while the device stays attached. This crate
//! discovers the populated slots, exposes each live probe as an
//! individually addressable attribute in a host attribute namespace, and
//! keeps that attribute set in step with the hardware across hot rescans.
//!
//! ## Features
//!
//! - **Probe Discovery**: enumerate populated slots and assign session
//!   ordinals
//! - **Fresh Readings**: every attribute read performs a full device
//!   round trip, nothing is cached
//! - **Hot Rescan**: tear down and rebuild the probe attribute set while
//!   reads are in flight
//! - **Device Reset**: best-effort reset via the restart control
//! - **Pluggable Transport**: the USB control pipe sits behind a small
//!   trait, so the whole stack runs against test fakes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use usbtemp::{AttachConfig, Attachment, AttributeKind, Result, UsbDeviceHandle};
//!
//! # struct MyNamespace;
//! # impl usbtemp::AttributeNamespace for MyNamespace {
//! #     fn expose(&self, _: &str, _: AttributeKind) -> Result<usbtemp::AttributeToken> {
//! #         Ok(usbtemp::AttributeToken(0))
//! #     }
//! #     fn withdraw(&self, _: &usbtemp::AttributeToken, _: &str) {}
//! # }
//! fn main() -> Result<()> {
//!     let device = UsbDeviceHandle::open()?;
//!     let attachment = Attachment::attach(device, MyNamespace, AttachConfig::default())?;
//!
//!     for probe in attachment.snapshot().probes() {
//!         let text = attachment.read_attribute(AttributeKind::ProbeRead {
//!             ordinal: probe.ordinal,
//!         });
//!         println!("probe{}: {}", probe.ordinal, text.trim());
//!     }
//!
//!     attachment.detach();
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! The core is synchronous and blocking; there is no internal scheduler.
//! Attribute reads and writes run on whatever thread the namespace layer
//! invokes them from. One rescan runs at a time per attachment; reads
//! that race a rescan observe either the pre-rescan or post-rescan probe
//! set, never a torn mix.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod attachment;
pub mod attributes;
pub mod data;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transport;

#[doc(hidden)]
pub mod testing;

// Re-exports for convenience
pub use attachment::{AttachConfig, Attachment};
pub use attributes::{
    probe_attr_name, AttributeKind, AttributeNamespace, AttributeSet, AttributeToken,
    ControlKind, RESCAN_ATTR, RESTART_ATTR,
};
pub use data::TemperatureReading;
pub use error::{Error, Result};
pub use protocol::{ProbeStatus, ProtocolClient, RescanReply, ShortStatus};
pub use registry::{
    DiscoverOptions, DiscoveryPhase, Probe, ProbeRegistry, Snapshot, RESCAN_POLL_INTERVAL,
};
pub use transport::{ControlTransport, UsbDeviceHandle, PRODUCT_ID, VENDOR_ID};
