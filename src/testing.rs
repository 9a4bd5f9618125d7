//! Test doubles for the transport and namespace seams.
//!
//! Not part of the public API; used by the crate's own unit and
//! integration tests.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::attributes::{AttributeKind, AttributeNamespace, AttributeToken};
use crate::error::{Error, Result};
use crate::transport::ControlTransport;

/// One recorded control transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Request code sent.
    pub request: u8,
    /// Value field sent.
    pub value: u16,
    /// Index field sent.
    pub index: u16,
    /// Size of the reply buffer offered by the caller.
    pub buf_len: usize,
    /// Timeout the caller allowed.
    pub timeout: Duration,
}

type Step = std::result::Result<Vec<u8>, String>;
type Responder = Box<dyn FnMut(u8, u16) -> Step + Send>;

/// Scripted [`ControlTransport`] fake.
///
/// Replies are served from a FIFO script first; once the script is
/// exhausted an optional responder closure answers by request code. An
/// unscripted call fails the transfer.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Step>>,
    responder: Mutex<Option<Responder>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl FakeTransport {
    /// Create an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, data: Vec<u8>) {
        self.script.lock().push_back(Ok(data));
    }

    /// Queue a failed transfer.
    pub fn push_error(&self, context: &str) {
        self.script.lock().push_back(Err(context.to_string()));
    }

    /// Answer unscripted calls with `f(request, value)`.
    pub fn set_responder(
        &self,
        f: impl FnMut(u8, u16) -> std::result::Result<Vec<u8>, String> + Send + 'static,
    ) {
        *self.responder.lock() = Some(Box::new(f));
    }

    /// All transfers issued so far.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().clone()
    }
}

impl ControlTransport for FakeTransport {
    fn control_in(
        &self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.calls.lock().push(CallRecord {
            request,
            value,
            index,
            buf_len: buf.len(),
            timeout,
        });

        let step = self.script.lock().pop_front();
        let step = match step {
            Some(step) => step,
            None => match self.responder.lock().as_mut() {
                Some(f) => f(request, value),
                None => Err("unscripted transfer".to_string()),
            },
        };

        match step {
            Ok(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Err(context) => Err(Error::Transport { context }),
        }
    }
}

/// One recorded namespace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEvent {
    /// An attribute was exposed under this name.
    Exposed(String),
    /// An attribute was withdrawn under this name.
    Withdrawn(String),
}

/// Recording [`AttributeNamespace`] fake.
///
/// Tracks the live attribute set (panicking on duplicate names, which the
/// lifecycle manager must never produce) and can be told to reject
/// specific names.
#[derive(Default)]
pub struct FakeNamespace {
    inner: Mutex<FakeNamespaceInner>,
}

#[derive(Default)]
struct FakeNamespaceInner {
    next_token: u64,
    active: Vec<(u64, String)>,
    rejected: Vec<String>,
    events: Vec<NamespaceEvent>,
}

impl FakeNamespace {
    /// Create an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject future exposures of `name`.
    pub fn reject(&self, name: &str) {
        self.inner.lock().rejected.push(name.to_string());
    }

    /// Names currently exposed, in creation order.
    pub fn active_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .active
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Full expose/withdraw history.
    pub fn events(&self) -> Vec<NamespaceEvent> {
        self.inner.lock().events.clone()
    }
}

impl AttributeNamespace for FakeNamespace {
    fn expose(&self, name: &str, _kind: AttributeKind) -> Result<AttributeToken> {
        let mut inner = self.inner.lock();
        if inner.rejected.iter().any(|r| r == name) {
            return Err(Error::Exposure {
                name: name.to_string(),
            });
        }
        assert!(
            !inner.active.iter().any(|(_, n)| n == name),
            "duplicate attribute name {name:?}"
        );

        let token = inner.next_token;
        inner.next_token += 1;
        inner.active.push((token, name.to_string()));
        inner.events.push(NamespaceEvent::Exposed(name.to_string()));
        Ok(AttributeToken(token))
    }

    fn withdraw(&self, token: &AttributeToken, name: &str) {
        let mut inner = self.inner.lock();
        let pos = inner
            .active
            .iter()
            .position(|(t, _)| *t == token.0)
            .unwrap_or_else(|| panic!("withdraw of unknown token for {name:?}"));
        inner.active.remove(pos);
        inner
            .events
            .push(NamespaceEvent::Withdrawn(name.to_string()));
    }
}
