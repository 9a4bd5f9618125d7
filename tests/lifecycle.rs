//! End-to-end attachment lifecycle against fake transport and namespace.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use usbtemp::testing::{FakeNamespace, FakeTransport};
use usbtemp::{AttachConfig, Attachment, AttributeKind, ControlKind};

const REQ_SHORT: u8 = 1;
const REQ_RESCAN: u8 = 2;
const REQ_LONG: u8 = 3;
const RESCAN_DONE: u8 = 23;

fn short_status_bytes(supported: u8) -> Vec<u8> {
    let mut data = vec![0u8; 8];
    data[6] = supported;
    data
}

fn slot_bytes(populated: bool, temp: [u8; 2]) -> [u8; 16] {
    let mut data = [0u8; 16];
    data[7] = if populated { 0x01 } else { 0x00 };
    data[8] = temp[0];
    data[9] = temp[1];
    data
}

fn slot_table(slots: &[(bool, [u8; 2])]) -> Vec<u8> {
    let mut table = Vec::new();
    for &(populated, temp) in slots {
        table.extend_from_slice(&slot_bytes(populated, temp));
    }
    table
}

/// Responder for a device whose slot table can be swapped between cycles.
fn swappable_device(transport: &FakeTransport, tables: Vec<Vec<(bool, [u8; 2])>>) {
    let mut tables = tables.into_iter();
    let mut current = tables.next().expect("at least one table");
    transport.set_responder(move |request, value| match (request, value) {
        // a trigger write swaps in the next slot table
        (REQ_RESCAN, 0) => {
            if let Some(next) = tables.next() {
                current = next;
            }
            Ok(vec![0])
        }
        (REQ_RESCAN, 1) => Ok(vec![RESCAN_DONE]),
        (REQ_SHORT, _) => Ok(short_status_bytes(current.len() as u8)),
        (REQ_LONG, _) => Ok(slot_table(&current)),
        other => Err(format!("unexpected request {other:?}")),
    });
}

fn fast_config() -> AttachConfig {
    AttachConfig {
        rescan_poll_interval: Duration::ZERO,
        rescan_deadline: Some(Duration::from_secs(1)),
    }
}

#[test]
fn attach_read_rescan_detach() {
    let transport = FakeTransport::new();
    // cycle 1: probes in slots 0, 2, 3; cycle 2: only slot 1
    swappable_device(
        &transport,
        vec![
            vec![
                (true, [0x00, 0x01]),
                (false, [0, 0]),
                (true, [0x68, 0x01]),
                (true, [0x00, 0x00]),
            ],
            vec![(false, [0, 0]), (true, [0x00, 0x01])],
        ],
    );

    let ns = FakeNamespace::new();
    let attachment = Attachment::attach(&transport, &ns, fast_config()).unwrap();

    // three probes plus the two controls
    assert_eq!(attachment.probe_count(), 3);
    let mut names = ns.active_names();
    names.sort();
    assert_eq!(
        names,
        vec!["probe0", "probe1", "probe2", "temp_rescan", "temp_restart"]
    );

    // ordinals map to populated slots in order
    let slots: Vec<_> = attachment.snapshot().probes().iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![0, 2, 3]);

    // fresh reads, decoded through the reference formula
    assert_eq!(
        attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 0 }),
        "16.4096\n"
    );
    assert_eq!(
        attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 1 }),
        "22.7920\n"
    );
    assert_eq!(
        attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 2 }),
        "0.0\n"
    );

    // hot rescan shrinks the set to one probe
    attachment.write_attribute(AttributeKind::Control(ControlKind::Rescan), b"1");
    assert_eq!(attachment.probe_count(), 1);
    let mut names = ns.active_names();
    names.sort();
    assert_eq!(names, vec!["probe0", "temp_rescan", "temp_restart"]);

    // the surviving ordinal reads the newly populated slot
    assert_eq!(
        attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 0 }),
        "16.4096\n"
    );

    // the old ordinal 2 is gone and must fail cleanly as empty text
    assert_eq!(
        attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 2 }),
        ""
    );

    attachment.detach();
    assert!(ns.active_names().is_empty());
}

#[test]
fn reads_race_rescan_without_torn_state() {
    let transport = Arc::new(FakeTransport::new());
    swappable_device(
        &transport,
        vec![
            vec![(true, [0x00, 0x01]), (true, [0x00, 0x01])],
            vec![(true, [0x00, 0x01])],
            vec![(true, [0x00, 0x01]), (true, [0x00, 0x01])],
        ],
    );

    let ns = Arc::new(FakeNamespace::new());
    let attachment = Arc::new(
        Attachment::attach(Arc::clone(&transport), Arc::clone(&ns), fast_config()).unwrap(),
    );

    let reader = {
        let attachment = Arc::clone(&attachment);
        thread::spawn(move || {
            for _ in 0..200 {
                let text = attachment.read_attribute(AttributeKind::ProbeRead { ordinal: 1 });
                // either a valid reading from some cycle or a clean miss
                assert!(text == "16.4096\n" || text.is_empty(), "torn read: {text:?}");
            }
        })
    };

    for _ in 0..2 {
        attachment.write_attribute(AttributeKind::Control(ControlKind::Rescan), b"1");
    }
    reader.join().unwrap();

    let attachment = Arc::try_unwrap(attachment)
        .unwrap_or_else(|_| panic!("attachment still shared"));
    attachment.detach();
    assert!(ns.active_names().is_empty());
}

#[test]
fn failed_attach_exposes_nothing() {
    let transport = FakeTransport::new();
    // scan completes but the capacity query dies
    transport.push_reply(vec![RESCAN_DONE]);
    transport.push_error("device unplugged");

    let ns = FakeNamespace::new();
    let result = Attachment::attach(&transport, &ns, fast_config());
    assert!(result.is_err());
    assert!(ns.active_names().is_empty());
}
