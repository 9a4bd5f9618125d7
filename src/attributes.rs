//! Attribute lifecycle management.
//!
//! Keeps the externally exposed attribute set in step with the latest
//! probe snapshot: two device-level control attributes plus one read
//! attribute per probe ordinal. The set is exclusively owned by one
//! attachment; every exposure is paired with exactly one withdrawal.

use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::Snapshot;

/// Name of the rescan control attribute.
pub const RESCAN_ATTR: &str = "temp_rescan";

/// Name of the restart control attribute.
pub const RESTART_ATTR: &str = "temp_restart";

/// Name of the read attribute for a probe ordinal.
pub fn probe_attr_name(ordinal: u8) -> String {
    format!("probe{ordinal}")
}

/// Which device-level control an attribute is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Triggers a probe rescan on write; reports scan state on read.
    Rescan,
    /// Resets the device on write.
    Restart,
}

/// Dispatch tag carried by every exposed attribute.
///
/// A probe attribute carries its ordinal as captured state from creation,
/// so a read never has to recover it from the attribute's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// One of the two device-level controls.
    Control(ControlKind),
    /// Read-only temperature attribute for one probe.
    ProbeRead {
        /// The probe's session ordinal.
        ordinal: u8,
    },
}

/// Opaque handle the external namespace returns for an exposed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeToken(pub u64);

/// The external attribute-namespace collaborator.
///
/// The namespace creates named readable/writable attributes and routes
/// reads and writes back to the attachment together with the
/// [`AttributeKind`] given at creation time.
pub trait AttributeNamespace: Send + Sync {
    /// Create a named attribute.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Exposure`] if the namespace rejects the
    /// creation.
    fn expose(&self, name: &str, kind: AttributeKind) -> Result<AttributeToken>;

    /// Remove a previously exposed attribute.
    fn withdraw(&self, token: &AttributeToken, name: &str);
}

impl<N: AttributeNamespace + ?Sized> AttributeNamespace for &N {
    fn expose(&self, name: &str, kind: AttributeKind) -> Result<AttributeToken> {
        (**self).expose(name, kind)
    }

    fn withdraw(&self, token: &AttributeToken, name: &str) {
        (**self).withdraw(token, name)
    }
}

impl<N: AttributeNamespace + ?Sized> AttributeNamespace for std::sync::Arc<N> {
    fn expose(&self, name: &str, kind: AttributeKind) -> Result<AttributeToken> {
        (**self).expose(name, kind)
    }

    fn withdraw(&self, token: &AttributeToken, name: &str) {
        (**self).withdraw(token, name)
    }
}

/// One installed attribute.
#[derive(Debug)]
struct Attribute {
    name: String,
    token: AttributeToken,
}

/// The set of attributes exposed for one attachment.
///
/// Slot 0 is the rescan control, slot 1 the restart control, slots 2..
/// the per-probe attributes in ordinal order. A slot holds `None` when its
/// exposure was rejected; teardown skips such slots.
#[derive(Debug, Default)]
pub struct AttributeSet {
    entries: Vec<Option<Attribute>>,
}

impl AttributeSet {
    /// Slots reserved for the two control attributes.
    const CONTROL_SLOTS: usize = 2;

    /// Expose the initial attribute set for a fresh snapshot.
    ///
    /// A rejected exposure is isolated: it is logged, its slot records
    /// `None`, and the remaining attributes are still installed.
    pub fn install_initial<N: AttributeNamespace + ?Sized>(
        namespace: &N,
        snapshot: &Snapshot,
    ) -> Self {
        let mut set = Self {
            entries: vec![None, None],
        };
        set.install_probes(namespace, snapshot);
        set.entries[0] = expose_one(
            namespace,
            RESCAN_ATTR.to_string(),
            AttributeKind::Control(ControlKind::Rescan),
        );
        set.entries[1] = expose_one(
            namespace,
            RESTART_ATTR.to_string(),
            AttributeKind::Control(ControlKind::Restart),
        );
        set
    }

    /// Swap the per-probe attributes for a new snapshot.
    ///
    /// Every current per-probe attribute is withdrawn before any new one
    /// is installed. The control attributes are carried over untouched;
    /// external references to them stay valid across rescans.
    pub fn replace<N: AttributeNamespace + ?Sized>(
        &mut self,
        namespace: &N,
        snapshot: &Snapshot,
    ) {
        for entry in self.entries.drain(Self::CONTROL_SLOTS..) {
            withdraw_one(namespace, entry);
        }
        self.install_probes(namespace, snapshot);
    }

    /// Withdraw every attribute, controls included.
    pub fn teardown<N: AttributeNamespace + ?Sized>(mut self, namespace: &N) {
        for entry in self.entries.drain(Self::CONTROL_SLOTS..) {
            withdraw_one(namespace, entry);
        }
        for entry in self.entries.drain(..) {
            withdraw_one(namespace, entry);
        }
    }

    /// Total number of attribute slots, `None` placeholders included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of per-probe slots.
    pub fn probe_count(&self) -> usize {
        self.entries.len() - Self::CONTROL_SLOTS
    }

    fn install_probes<N: AttributeNamespace + ?Sized>(
        &mut self,
        namespace: &N,
        snapshot: &Snapshot,
    ) {
        for probe in snapshot.probes() {
            let entry = expose_one(
                namespace,
                probe_attr_name(probe.ordinal),
                AttributeKind::ProbeRead {
                    ordinal: probe.ordinal,
                },
            );
            self.entries.push(entry);
        }
    }
}

fn expose_one<N: AttributeNamespace + ?Sized>(
    namespace: &N,
    name: String,
    kind: AttributeKind,
) -> Option<Attribute> {
    match namespace.expose(&name, kind) {
        Ok(token) => {
            debug!(name = %name, "attribute exposed");
            Some(Attribute { name, token })
        }
        Err(e) => {
            warn!("failed to expose attribute: {e}");
            None
        }
    }
}

fn withdraw_one<N: AttributeNamespace + ?Sized>(namespace: &N, entry: Option<Attribute>) {
    if let Some(attr) = entry {
        namespace.withdraw(&attr.token, &attr.name);
        debug!(name = %attr.name, "attribute withdrawn");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::ProbeStatus;
    use crate::testing::{FakeNamespace, NamespaceEvent};
    use pretty_assertions::assert_eq;

    fn snapshot(populated: &[bool]) -> Snapshot {
        let slots: Vec<_> = populated
            .iter()
            .map(|&p| ProbeStatus {
                serial: [0; 6],
                probe_type: 0,
                flags: if p { 0x01 } else { 0x00 },
                temperature: [0, 0],
                timestamp: 0,
            })
            .collect();
        Snapshot::from_slots(populated.len() as u8, &slots)
    }

    #[test]
    fn test_install_exposes_probes_plus_controls() {
        let ns = FakeNamespace::new();
        let set = AttributeSet::install_initial(&ns, &snapshot(&[true, false, true]));

        assert_eq!(set.len(), 4); // 2 probes + 2 controls
        assert_eq!(set.probe_count(), 2);

        let mut names = ns.active_names();
        names.sort();
        assert_eq!(names, vec!["probe0", "probe1", RESCAN_ATTR, RESTART_ATTR]);
    }

    #[test]
    fn test_rejected_exposure_leaves_placeholder() {
        let ns = FakeNamespace::new();
        ns.reject("probe1");

        let set = AttributeSet::install_initial(&ns, &snapshot(&[true, true, true]));

        // the slot count still matches probe_count + 2
        assert_eq!(set.len(), 5);
        let mut names = ns.active_names();
        names.sort();
        assert_eq!(names, vec!["probe0", "probe2", RESCAN_ATTR, RESTART_ATTR]);

        // teardown must skip the placeholder without panicking
        set.teardown(&ns);
        assert!(ns.active_names().is_empty());
    }

    #[test]
    fn test_replace_preserves_controls() {
        let ns = FakeNamespace::new();
        let mut set = AttributeSet::install_initial(&ns, &snapshot(&[true, true, true]));
        assert_eq!(set.probe_count(), 3);

        set.replace(&ns, &snapshot(&[true]));
        assert_eq!(set.probe_count(), 1);
        assert_eq!(set.len(), 3);

        let mut names = ns.active_names();
        names.sort();
        assert_eq!(names, vec!["probe0", RESCAN_ATTR, RESTART_ATTR]);

        // the controls were never withdrawn or re-exposed
        for event in ns.events() {
            match event {
                NamespaceEvent::Withdrawn(name) => {
                    assert!(name.starts_with("probe"), "control withdrawn: {name}")
                }
                NamespaceEvent::Exposed(_) => {}
            }
        }
        let control_exposures = ns
            .events()
            .iter()
            .filter(|e| matches!(e, NamespaceEvent::Exposed(n) if n == RESCAN_ATTR))
            .count();
        assert_eq!(control_exposures, 1);
    }

    #[test]
    fn test_replace_removes_before_installing() {
        let ns = FakeNamespace::new();
        let mut set = AttributeSet::install_initial(&ns, &snapshot(&[true, true]));

        set.replace(&ns, &snapshot(&[true, true]));

        // relative order in the event log: both withdrawals precede both
        // fresh exposures
        let events: Vec<_> = ns
            .events()
            .into_iter()
            .filter(|e| {
                matches!(e, NamespaceEvent::Withdrawn(n) | NamespaceEvent::Exposed(n) if n.starts_with("probe"))
            })
            .collect();
        assert_eq!(
            events[2..],
            vec![
                NamespaceEvent::Withdrawn("probe0".into()),
                NamespaceEvent::Withdrawn("probe1".into()),
                NamespaceEvent::Exposed("probe0".into()),
                NamespaceEvent::Exposed("probe1".into()),
            ]
        );

        set.teardown(&ns);
        assert!(ns.active_names().is_empty());
    }

    #[test]
    fn test_teardown_withdraws_everything_once() {
        let ns = FakeNamespace::new();
        let set = AttributeSet::install_initial(&ns, &snapshot(&[true]));
        set.teardown(&ns);

        assert!(ns.active_names().is_empty());
        let withdrawals = ns
            .events()
            .iter()
            .filter(|e| matches!(e, NamespaceEvent::Withdrawn(_)))
            .count();
        assert_eq!(withdrawals, 3);
    }
}
