//! Protocol module for the vendor control-transfer command set.
//!
//! This module contains:
//! - Wire message layouts and parsing
//! - The synchronous protocol client

pub mod client;
pub mod messages;

pub use client::ProtocolClient;
pub use messages::{ProbeStatus, RescanReply, ShortStatus};
