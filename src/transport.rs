//! USB control-pipe transport.
//!
//! The device speaks a vendor protocol over its default control endpoint
//! only, so the whole transport boundary is a single blocking vendor
//! control-IN call. Everything above this trait is transport-agnostic,
//! which is also what the tests fake.

use std::time::Duration;

use nusb::transfer::{Control, ControlType, Recipient};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// USB vendor ID the sensor enumerates with.
pub const VENDOR_ID: u16 = 0x16c0;

/// USB product ID the sensor enumerates with.
pub const PRODUCT_ID: u16 = 0x05dc;

/// Blocking vendor control-IN channel to an attached device.
///
/// One call performs exactly one control transfer (request type `0xC0`:
/// device-to-host, vendor, device recipient) and returns the number of
/// bytes the device answered with, or [`Error::Transport`] on any failed
/// transfer including timeouts.
pub trait ControlTransport: Send + Sync {
    /// Issue a vendor control-IN transfer and read the reply into `buf`.
    fn control_in(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize>;
}

impl<T: ControlTransport + ?Sized> ControlTransport for &T {
    fn control_in(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        (**self).control_in(request, value, index, buf, timeout)
    }
}

impl<T: ControlTransport + ?Sized> ControlTransport for std::sync::Arc<T> {
    fn control_in(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        (**self).control_in(request, value, index, buf, timeout)
    }
}

/// Handle to a physically attached sensor, backed by `nusb`.
pub struct UsbDeviceHandle {
    device: nusb::Device,
}

impl UsbDeviceHandle {
    /// Find the first attached sensor and open it.
    ///
    /// Scans the bus for [`VENDOR_ID`]/[`PRODUCT_ID`] and opens the first
    /// match. Multiple attached sensors are independent; call
    /// [`UsbDeviceHandle::open_all`] to get every one of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no sensor is attached, or an
    /// I/O error if the device cannot be opened.
    pub fn open() -> Result<Self> {
        let info = nusb::list_devices()?
            .find(|d| d.vendor_id() == VENDOR_ID && d.product_id() == PRODUCT_ID)
            .ok_or(Error::DeviceNotFound)?;

        info!(
            bus = info.bus_number(),
            address = info.device_address(),
            "found temperature sensor"
        );

        let device = info.open()?;
        Ok(Self { device })
    }

    /// Open every attached sensor.
    pub fn open_all() -> Result<Vec<Self>> {
        let mut handles = Vec::new();
        for info in nusb::list_devices()? {
            if info.vendor_id() != VENDOR_ID || info.product_id() != PRODUCT_ID {
                continue;
            }
            debug!(
                bus = info.bus_number(),
                address = info.device_address(),
                "opening temperature sensor"
            );
            handles.push(Self {
                device: info.open()?,
            });
        }
        Ok(handles)
    }
}

impl ControlTransport for UsbDeviceHandle {
    fn control_in(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.device
            .control_in_blocking(
                Control {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                },
                buf,
                timeout,
            )
            .map_err(|e| Error::Transport {
                context: e.to_string(),
            })
    }
}
