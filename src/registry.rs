//! Probe discovery and the rescan state machine.
//!
//! Discovery runs `Idle -> AwaitingRescan -> Enumerating -> Ready`: wait
//! for the device to finish scanning its slots, then read the slot table
//! and assign each populated slot a session ordinal.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::messages::ProbeStatus;
use crate::protocol::ProtocolClient;
use crate::transport::ControlTransport;

/// Poll interval used between rescan-status queries during a live rescan.
///
/// Attach-time discovery polls without sleeping; a live rescan throttles so
/// the polling does not saturate the device's microcontroller.
pub const RESCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A populated probe slot found during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Probe {
    /// 0-based position among populated slots; stable for the session,
    /// reassigned on every rescan.
    pub ordinal: u8,
    /// Physical slot index in the device's probe table.
    pub slot: usize,
    /// Probe serial number as reported in the slot entry.
    pub serial: [u8; 6],
    /// Probe type byte.
    pub probe_type: u8,
}

/// Immutable result of one discovery/rescan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    probes: Vec<Probe>,
    capacity: u8,
}

impl Snapshot {
    /// Build a snapshot from a long-status slot table.
    ///
    /// Ordinals are assigned in slot order: the first populated slot gets
    /// ordinal 0 and so on. Serial and type bytes play no part in the
    /// assignment.
    pub fn from_slots(capacity: u8, slots: &[ProbeStatus]) -> Self {
        let probes = slots
            .iter()
            .enumerate()
            .filter(|(_, status)| status.is_populated())
            .enumerate()
            .map(|(ordinal, (slot, status))| Probe {
                ordinal: ordinal as u8,
                slot,
                serial: status.serial,
                probe_type: status.probe_type,
            })
            .collect();
        Self { probes, capacity }
    }

    /// An empty snapshot (no probes, zero capacity).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of probes found in this cycle.
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// All probes in ordinal order.
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Look up a probe by its session ordinal.
    pub fn probe(&self, ordinal: u8) -> Option<&Probe> {
        self.probes.get(ordinal as usize)
    }

    /// Whether the given ordinal exists in this snapshot.
    pub fn contains(&self, ordinal: u8) -> bool {
        (ordinal as usize) < self.probes.len()
    }

    /// The slot capacity the device reported for this cycle.
    pub fn capacity(&self) -> u8 {
        self.capacity
    }
}

/// State of the discovery machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryPhase {
    /// No discovery in progress.
    #[default]
    Idle,
    /// Polling the device for rescan completion.
    AwaitingRescan,
    /// Reading capacity and the slot table.
    Enumerating,
    /// The last cycle completed and produced a snapshot.
    Ready,
}

/// Parameters for one discovery cycle.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Send a best-effort rescan trigger before polling. Attach-time
    /// discovery skips the trigger and only waits; a live rescan sends it.
    pub trigger_rescan: bool,
    /// Sleep between completion polls. `Duration::ZERO` busy-polls, which
    /// is only acceptable at attach time when no other traffic competes.
    pub poll_interval: Duration,
    /// Optional bound on the completion wait. `None` matches the device's
    /// observed driver behavior and blocks indefinitely if the device
    /// never reports completion.
    pub deadline: Option<Duration>,
}

impl DiscoverOptions {
    /// Attach-time discovery: no trigger, busy-poll, unbounded.
    pub fn attach() -> Self {
        Self {
            trigger_rescan: false,
            poll_interval: Duration::ZERO,
            deadline: None,
        }
    }

    /// Live rescan: trigger first, throttled poll, unbounded.
    pub fn rescan() -> Self {
        Self {
            trigger_rescan: true,
            poll_interval: RESCAN_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// Runs the discovery/rescan state machine.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    phase: DiscoveryPhase,
}

impl ProbeRegistry {
    /// Create a registry in the `Idle` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase of the machine.
    pub fn phase(&self) -> DiscoveryPhase {
        self.phase
    }

    /// Run one full discovery cycle and produce a snapshot.
    ///
    /// On failure the machine returns to `Idle` and the caller's previous
    /// snapshot, if any, stays authoritative; discovery errors are never
    /// retried here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RescanTimeout`] if a configured deadline elapses,
    /// or any error from the capacity/slot-table queries.
    pub fn discover<T: ControlTransport + ?Sized>(
        &mut self,
        client: &ProtocolClient<'_, T>,
        options: &DiscoverOptions,
    ) -> Result<Snapshot> {
        self.phase = DiscoveryPhase::AwaitingRescan;
        if options.trigger_rescan {
            client.request_rescan();
        }

        if let Err(e) = await_rescan(client, options.poll_interval, options.deadline) {
            self.phase = DiscoveryPhase::Idle;
            return Err(e);
        }

        self.phase = DiscoveryPhase::Enumerating;
        match enumerate(client) {
            Ok(snapshot) => {
                self.phase = DiscoveryPhase::Ready;
                info!(probes = snapshot.probe_count(), "discovery complete");
                Ok(snapshot)
            }
            Err(e) => {
                self.phase = DiscoveryPhase::Idle;
                warn!("discovery failed: {e}");
                Err(e)
            }
        }
    }
}

/// Poll the device until it reports rescan completion.
///
/// Errors from the status query read as "not done"; only a configured
/// deadline ends the wait early.
fn await_rescan<T: ControlTransport + ?Sized>(
    client: &ProtocolClient<'_, T>,
    poll_interval: Duration,
    deadline: Option<Duration>,
) -> Result<()> {
    let started = Instant::now();
    loop {
        if client.query_rescan_status() {
            debug!("device reports rescan complete");
            return Ok(());
        }
        if let Some(deadline) = deadline {
            if started.elapsed() >= deadline {
                return Err(Error::RescanTimeout { deadline });
            }
        }
        if !poll_interval.is_zero() {
            thread::sleep(poll_interval);
        }
    }
}

/// Read capacity and the slot table, building the new snapshot.
fn enumerate<T: ControlTransport + ?Sized>(
    client: &ProtocolClient<'_, T>,
) -> Result<Snapshot> {
    let status = client.query_short_status()?;
    let slots = client.query_long_status(status.supported_probes)?;
    let snapshot = Snapshot::from_slots(status.supported_probes, &slots);
    debug!(
        capacity = status.supported_probes,
        populated = snapshot.probe_count(),
        "slot table read"
    );
    Ok(snapshot)
}
