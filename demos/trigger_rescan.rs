//! Example: trigger a hot rescan and report the new probe count
//!
//! Plug or unplug a probe before running this. The rescan throttles its
//! completion polling to 250 ms, so expect a short wait.
//!
//! Run with: cargo run --example trigger_rescan

use std::sync::atomic::{AtomicU64, Ordering};

use usbtemp::{
    AttachConfig, Attachment, AttributeKind, AttributeNamespace, AttributeToken, ControlKind,
    Result, UsbDeviceHandle,
};

#[derive(Default)]
struct QuietNamespace {
    next_token: AtomicU64,
}

impl AttributeNamespace for QuietNamespace {
    fn expose(&self, _name: &str, _kind: AttributeKind) -> Result<AttributeToken> {
        Ok(AttributeToken(self.next_token.fetch_add(1, Ordering::SeqCst)))
    }

    fn withdraw(&self, _token: &AttributeToken, _name: &str) {}
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("usbtemp=debug".parse().unwrap()),
        )
        .init();

    let device = UsbDeviceHandle::open()?;
    let attachment = Attachment::attach(device, QuietNamespace::default(), AttachConfig::default())?;
    println!("Attached with {} probe(s)", attachment.probe_count());

    println!("Triggering rescan...");
    attachment.write_attribute(AttributeKind::Control(ControlKind::Rescan), b"1");
    println!(
        "Rescan finished: {}",
        attachment
            .read_attribute(AttributeKind::Control(ControlKind::Rescan))
            .trim()
    );
    println!("Now {} probe(s)", attachment.probe_count());

    attachment.detach();
    Ok(())
}
