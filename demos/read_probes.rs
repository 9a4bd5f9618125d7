//! Basic example: attach to the sensor and read every probe once
//!
//! Run with: cargo run --example read_probes

use std::sync::atomic::{AtomicU64, Ordering};

use usbtemp::{
    AttachConfig, Attachment, AttributeKind, AttributeNamespace, AttributeToken, Result,
    UsbDeviceHandle,
};

/// Minimal namespace that just logs attribute creation and removal.
#[derive(Default)]
struct PrintNamespace {
    next_token: AtomicU64,
}

impl AttributeNamespace for PrintNamespace {
    fn expose(&self, name: &str, _kind: AttributeKind) -> Result<AttributeToken> {
        println!("  exposed attribute: {name}");
        Ok(AttributeToken(self.next_token.fetch_add(1, Ordering::SeqCst)))
    }

    fn withdraw(&self, _token: &AttributeToken, name: &str) {
        println!("  withdrawn attribute: {name}");
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("usbtemp=debug".parse().unwrap()),
        )
        .init();

    println!("Opening temperature sensor...");
    let device = UsbDeviceHandle::open()?;

    let attachment = Attachment::attach(device, PrintNamespace::default(), AttachConfig::default())?;
    println!("Attached with {} probe(s)\n", attachment.probe_count());

    for probe in attachment.snapshot().probes() {
        let text = attachment.read_attribute(AttributeKind::ProbeRead {
            ordinal: probe.ordinal,
        });
        println!(
            "probe{} (slot {}, serial {:02X?}): {}",
            probe.ordinal,
            probe.slot,
            probe.serial,
            text.trim()
        );
    }

    attachment.detach();
    Ok(())
}
