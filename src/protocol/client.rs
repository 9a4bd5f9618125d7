//! Protocol client for the vendor control-transfer command set.
//!
//! Each operation performs exactly one control transfer with a fixed
//! per-call timeout and never retries; retry policy belongs to the caller.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::messages::{ProbeStatus, RescanReply, ShortStatus};
use crate::transport::ControlTransport;

/// Request code: short status.
pub const REQUEST_SHORT_STATUS: u8 = 1;
/// Request code: rescan trigger / rescan status.
pub const REQUEST_RESCAN: u8 = 2;
/// Request code: long status.
pub const REQUEST_LONG_STATUS: u8 = 3;
/// Request code: device reset.
pub const REQUEST_RESET: u8 = 4;

/// Value field selecting the rescan-status variant of request 2.
pub const VALUE_RESCAN_STATUS: u16 = 0x0001;

/// Timeout for status, trigger, and reset transfers.
pub const STATUS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for a single rescan-status poll. Kept short because the call
/// sits in a polling loop and must not eat the full status budget.
pub const RESCAN_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Client for the vendor command set, borrowing the control pipe for the
/// duration of each call.
pub struct ProtocolClient<'d, T: ControlTransport + ?Sized> {
    transport: &'d T,
}

impl<'d, T: ControlTransport + ?Sized> ProtocolClient<'d, T> {
    /// Create a client over the given transport.
    pub fn new(transport: &'d T) -> Self {
        Self { transport }
    }

    /// Query the short device status (firmware version, slot capacity).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on a failed transfer and
    /// [`crate::Error::ProtocolMismatch`] on a malformed reply. The
    /// reported capacity must not be trusted on failure.
    pub fn query_short_status(&self) -> Result<ShortStatus> {
        let mut buf = [0u8; ShortStatus::SIZE];
        let n = self.transport.control_in(
            REQUEST_SHORT_STATUS,
            0,
            0,
            &mut buf,
            STATUS_TIMEOUT,
        )?;
        ShortStatus::parse(&buf[..n])
    }

    /// Ask the device to rescan its probe slots.
    ///
    /// Best-effort trigger: the reply is logged and discarded, and a failed
    /// transfer is logged rather than propagated. Completion is observed
    /// separately via [`ProtocolClient::query_rescan_status`].
    pub fn request_rescan(&self) {
        let mut buf = [0u8; RescanReply::SIZE];
        match self
            .transport
            .control_in(REQUEST_RESCAN, 0, 0, &mut buf, STATUS_TIMEOUT)
        {
            Ok(n) => match RescanReply::parse(&buf[..n]) {
                Ok(reply) => debug!(answer = reply.answer, "rescan triggered"),
                Err(e) => warn!("rescan trigger reply malformed: {e}"),
            },
            Err(e) => warn!("rescan trigger failed: {e}"),
        }
    }

    /// Check whether the device has finished its probe rescan.
    ///
    /// Returns `true` only if the device answers with the completion
    /// sentinel. Transport errors and any other answer are `false`; the
    /// polling loop cannot distinguish "not finished" from "unreachable".
    pub fn query_rescan_status(&self) -> bool {
        let mut buf = [0u8; RescanReply::SIZE];
        match self.transport.control_in(
            REQUEST_RESCAN,
            VALUE_RESCAN_STATUS,
            0,
            &mut buf,
            RESCAN_POLL_TIMEOUT,
        ) {
            Ok(n) => RescanReply::parse(&buf[..n]).map_or(false, |r| r.is_done()),
            Err(e) => {
                debug!("rescan status poll failed: {e}");
                false
            }
        }
    }

    /// Query the full slot table, `capacity` entries long.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on a failed transfer and
    /// [`crate::Error::ProtocolMismatch`] if the reply is not exactly
    /// `capacity` slot entries.
    pub fn query_long_status(&self, capacity: u8) -> Result<Vec<ProbeStatus>> {
        let mut buf = vec![0u8; ProbeStatus::SIZE * capacity as usize];
        let n = self.transport.control_in(
            REQUEST_LONG_STATUS,
            0,
            0,
            &mut buf,
            STATUS_TIMEOUT,
        )?;
        ProbeStatus::parse_slots(&buf[..n], capacity)
    }

    /// Reset the device.
    ///
    /// The device is expected to drop off the bus and re-enumerate, so the
    /// result is logged and never treated as fatal.
    pub fn reset_device(&self) {
        let mut buf = [0u8; RescanReply::SIZE];
        match self
            .transport
            .control_in(REQUEST_RESET, 0, 0, &mut buf, STATUS_TIMEOUT)
        {
            Ok(_) => debug!("device reset issued"),
            Err(e) => warn!("device reset failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::FakeTransport;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_status_request_shape() {
        let transport = FakeTransport::new();
        transport.push_reply(vec![0x01, 0x00, 0, 0, 0, 0, 4, 0]);

        let client = ProtocolClient::new(&transport);
        let status = client.query_short_status().unwrap();
        assert_eq!(status.supported_probes, 4);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request, REQUEST_SHORT_STATUS);
        assert_eq!(calls[0].value, 0);
        assert_eq!(calls[0].index, 0);
        assert_eq!(calls[0].timeout, STATUS_TIMEOUT);
    }

    #[test]
    fn test_short_status_transport_error() {
        let transport = FakeTransport::new();
        transport.push_error("pipe stalled");

        let client = ProtocolClient::new(&transport);
        match client.query_short_status() {
            Err(Error::Transport { context }) => assert_eq!(context, "pipe stalled"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rescan_status_polls_with_short_timeout() {
        let transport = FakeTransport::new();
        transport.push_reply(vec![5]);
        transport.push_reply(vec![23]);

        let client = ProtocolClient::new(&transport);
        assert!(!client.query_rescan_status());
        assert!(client.query_rescan_status());

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            assert_eq!(call.request, REQUEST_RESCAN);
            assert_eq!(call.value, VALUE_RESCAN_STATUS);
            assert_eq!(call.timeout, RESCAN_POLL_TIMEOUT);
        }
    }

    #[test]
    fn test_rescan_status_error_reads_as_not_done() {
        let transport = FakeTransport::new();
        transport.push_error("timed out");

        let client = ProtocolClient::new(&transport);
        assert!(!client.query_rescan_status());
    }

    #[test]
    fn test_long_status_requests_capacity_bytes() {
        let transport = FakeTransport::new();
        transport.push_reply(vec![0u8; ProbeStatus::SIZE * 2]);

        let client = ProtocolClient::new(&transport);
        let slots = client.query_long_status(2).unwrap();
        assert_eq!(slots.len(), 2);

        let calls = transport.calls();
        assert_eq!(calls[0].request, REQUEST_LONG_STATUS);
        assert_eq!(calls[0].buf_len, ProbeStatus::SIZE * 2);
    }

    #[test]
    fn test_long_status_short_reply_is_mismatch() {
        let transport = FakeTransport::new();
        transport.push_reply(vec![0u8; ProbeStatus::SIZE]);

        let client = ProtocolClient::new(&transport);
        assert!(matches!(
            client.query_long_status(2),
            Err(Error::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn test_trigger_and_reset_swallow_errors() {
        let transport = FakeTransport::new();
        transport.push_error("gone");
        transport.push_error("gone");

        let client = ProtocolClient::new(&transport);
        client.request_rescan();
        client.reset_device();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].request, REQUEST_RESCAN);
        assert_eq!(calls[0].value, 0);
        assert_eq!(calls[1].request, REQUEST_RESET);
    }
}
