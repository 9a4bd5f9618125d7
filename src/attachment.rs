//! Per-device attachment: discovery, attribute routing, rescan, detach.
//!
//! One [`Attachment`] owns one device's probe snapshot and attribute set.
//! Multiple attachments are fully independent. The external namespace
//! layer calls [`Attachment::read_attribute`] and
//! [`Attachment::write_attribute`] from whatever threads it likes; a
//! rescan serializes with other rescans but per-probe reads outside the
//! replacement window proceed concurrently.

use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::attributes::{AttributeKind, AttributeNamespace, AttributeSet, ControlKind};
use crate::data::TemperatureReading;
use crate::error::{Error, Result};
use crate::protocol::ProtocolClient;
use crate::registry::{DiscoverOptions, ProbeRegistry, Snapshot, RESCAN_POLL_INTERVAL};
use crate::transport::ControlTransport;

/// Attachment tuning knobs.
#[derive(Debug, Clone)]
pub struct AttachConfig {
    /// Sleep between rescan-completion polls during a live rescan.
    pub rescan_poll_interval: Duration,
    /// Optional bound on any rescan-completion wait. `None` (the default)
    /// matches the original driver and waits indefinitely on a device
    /// that never reports completion.
    pub rescan_deadline: Option<Duration>,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            rescan_poll_interval: RESCAN_POLL_INTERVAL,
            rescan_deadline: None,
        }
    }
}

/// Snapshot and attribute set, swapped together under one lock.
struct Shared {
    snapshot: Snapshot,
    attributes: AttributeSet,
}

/// One attached device: its transport, its attribute set, and the
/// discovery machine that keeps them in step.
pub struct Attachment<T: ControlTransport, N: AttributeNamespace> {
    transport: T,
    namespace: N,
    config: AttachConfig,
    shared: RwLock<Shared>,
    registry: Mutex<ProbeRegistry>,
}

impl<T: ControlTransport, N: AttributeNamespace> Attachment<T, N> {
    /// Attach to a device: run attach-time discovery and expose the
    /// initial attribute set.
    ///
    /// Attach-time discovery busy-polls the rescan status (no competing
    /// traffic exists yet) and does not send a rescan trigger; the device
    /// scans on its own at power-up.
    ///
    /// # Errors
    ///
    /// Returns the discovery error if the device cannot be enumerated; no
    /// attributes are exposed in that case.
    pub fn attach(transport: T, namespace: N, config: AttachConfig) -> Result<Self> {
        let mut registry = ProbeRegistry::new();
        let snapshot = {
            let client = ProtocolClient::new(&transport);
            let mut options = DiscoverOptions::attach();
            options.deadline = config.rescan_deadline;
            registry.discover(&client, &options)?
        };
        info!(probes = snapshot.probe_count(), "device attached");

        let attributes = AttributeSet::install_initial(&namespace, &snapshot);
        Ok(Self {
            transport,
            namespace,
            config,
            shared: RwLock::new(Shared {
                snapshot,
                attributes,
            }),
            registry: Mutex::new(registry),
        })
    }

    /// Handle a read of an exposed attribute, returning its text content.
    ///
    /// Internal errors never surface through the text interface: a failed
    /// probe read renders as empty text and is logged only.
    pub fn read_attribute(&self, kind: AttributeKind) -> String {
        match kind {
            AttributeKind::Control(ControlKind::Rescan) => {
                let client = ProtocolClient::new(&self.transport);
                if client.query_rescan_status() {
                    "scan done\n".to_string()
                } else {
                    "scan not done\n".to_string()
                }
            }
            AttributeKind::Control(ControlKind::Restart) => String::new(),
            AttributeKind::ProbeRead { ordinal } => {
                self.read_probe(ordinal).unwrap_or_else(|e| {
                    warn!(ordinal, "probe read failed: {e}");
                    String::new()
                })
            }
        }
    }

    /// Handle a write to an exposed attribute.
    ///
    /// Writes to per-probe attributes are accepted and ignored. A rescan
    /// write runs a full rescan cycle; a restart write resets the device
    /// best-effort. Returns the number of bytes accepted (always all of
    /// them).
    pub fn write_attribute(&self, kind: AttributeKind, data: &[u8]) -> usize {
        match kind {
            AttributeKind::ProbeRead { .. } => {}
            AttributeKind::Control(ControlKind::Rescan) => self.rescan(),
            AttributeKind::Control(ControlKind::Restart) => {
                ProtocolClient::new(&self.transport).reset_device();
            }
        }
        data.len()
    }

    /// Run one rescan cycle: trigger, wait, enumerate, swap attributes.
    ///
    /// Only one rescan runs at a time per attachment. If discovery fails
    /// the previous snapshot and attribute set stay authoritative. On
    /// success the old per-probe attributes are fully removed before the
    /// new ones appear; reads landing in that window fail cleanly.
    pub fn rescan(&self) {
        let mut registry = self.registry.lock();
        let new_snapshot = {
            let client = ProtocolClient::new(&self.transport);
            let mut options = DiscoverOptions::rescan();
            options.poll_interval = self.config.rescan_poll_interval;
            options.deadline = self.config.rescan_deadline;
            registry.discover(&client, &options)
        };

        match new_snapshot {
            Ok(snapshot) => {
                let mut shared = self.shared.write();
                shared.attributes.replace(&self.namespace, &snapshot);
                shared.snapshot = snapshot;
                info!(probes = shared.snapshot.probe_count(), "rescan complete");
            }
            Err(e) => warn!("rescan failed, keeping previous probe set: {e}"),
        }
    }

    /// Detach from the device, withdrawing every exposed attribute.
    pub fn detach(self) {
        let Shared { attributes, .. } = self.shared.into_inner();
        attributes.teardown(&self.namespace);
        info!("device detached");
    }

    /// Number of probes in the current snapshot.
    pub fn probe_count(&self) -> usize {
        self.shared.read().snapshot.probe_count()
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.read().snapshot.clone()
    }

    /// Readings are never cached: each read re-queries the device and
    /// decodes the ordinal-th populated slot of the fresh slot table. The
    /// state read-lock is held across the round trip so a concurrent
    /// rescan cannot reassign the ordinal mid-read.
    fn read_probe(&self, ordinal: u8) -> Result<String> {
        let shared = self.shared.read();
        if !shared.snapshot.contains(ordinal) {
            return Err(Error::ProbeNotFound { ordinal });
        }

        let client = ProtocolClient::new(&self.transport);
        let status = client.query_short_status()?;
        let slots = client.query_long_status(status.supported_probes)?;
        let slot = slots
            .iter()
            .filter(|s| s.is_populated())
            .nth(ordinal as usize)
            .ok_or(Error::ProbeNotFound { ordinal })?;

        let reading = TemperatureReading::decode(slot.temperature[0], slot.temperature[1]);
        Ok(format!("{reading}\n"))
    }
}
