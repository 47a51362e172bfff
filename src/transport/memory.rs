//! In-memory [`Transport`] for development and testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RecipientKind, Transport, TransportError};
use crate::config::PostboxConfig;
use crate::envelope::{AddressSpec, AttachmentSpec};

/// Recording transport backed by shared in-memory state.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// [`PostOffice`](crate::PostOffice) transport factory hands out another.
/// Not durable; nothing leaves the process.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    config: Option<PostboxConfig>,
    username: Option<String>,
    staged: StagedState,
    sent: Vec<SentMessage>,
    failures: VecDeque<TransportError>,
    closed: bool,
}

/// Adapter state staged for the next transmit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedState {
    pub from: Option<AddressSpec>,
    pub subject: String,
    pub body: String,
    pub priority_level: Option<u8>,
    pub headers: Vec<(String, String)>,
    pub to: Vec<AddressSpec>,
    pub cc: Vec<AddressSpec>,
    pub bcc: Vec<AddressSpec>,
    pub reply_to: Vec<AddressSpec>,
    pub attachments: Vec<AttachmentSpec>,
}

/// One message accepted by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub username: Option<String>,
    pub from: AddressSpec,
    pub subject: String,
    pub body: String,
    pub priority_level: Option<u8>,
    pub headers: Vec<(String, String)>,
    pub to: Vec<AddressSpec>,
    pub cc: Vec<AddressSpec>,
    pub bcc: Vec<AddressSpec>,
    pub reply_to: Vec<AddressSpec>,
    pub attachments: Vec<AttachmentSpec>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Snapshot of the currently staged (un-reset) adapter state.
    pub fn staged(&self) -> StagedState {
        self.state().staged.clone()
    }

    /// The configuration last applied through `configure`, if any.
    pub fn config(&self) -> Option<PostboxConfig> {
        self.state().config.clone()
    }

    /// Script the next transmit to fail with the given adapter code.
    ///
    /// Queued failures are consumed in order, one per transmit.
    pub fn fail_next(&self, code: u16, message: impl Into<String>) {
        self.state()
            .failures
            .push_back(TransportError::with_code(code, message));
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory transport lock poisoned")
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn configure(&mut self, config: &PostboxConfig) {
        self.state().config = Some(config.clone());
    }

    fn set_credentials(&mut self, username: &str, _password: &str) {
        self.state().username = Some(username.to_string());
    }

    fn set_from(&mut self, from: &AddressSpec) -> Result<(), TransportError> {
        self.state().staged.from = Some(from.clone());
        Ok(())
    }

    fn set_priority(&mut self, level: u8, headers: &[(&str, &str)]) {
        let mut state = self.state();
        state.staged.priority_level = Some(level);
        state.staged.headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
    }

    fn set_subject(&mut self, subject: &str) {
        self.state().staged.subject = subject.to_string();
    }

    fn set_body(&mut self, body: &str) {
        self.state().staged.body = body.to_string();
    }

    fn add_recipient(
        &mut self,
        kind: RecipientKind,
        spec: &AddressSpec,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        let list = match kind {
            RecipientKind::To => &mut state.staged.to,
            RecipientKind::Cc => &mut state.staged.cc,
            RecipientKind::Bcc => &mut state.staged.bcc,
            RecipientKind::ReplyTo => &mut state.staged.reply_to,
        };
        list.push(spec.clone());
        Ok(())
    }

    fn add_attachment(&mut self, spec: &AttachmentSpec) -> Result<(), TransportError> {
        self.state().staged.attachments.push(spec.clone());
        Ok(())
    }

    async fn transmit(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        let from = state
            .staged
            .from
            .clone()
            .ok_or_else(|| TransportError::message("no from address staged"))?;

        let message = SentMessage {
            username: state.username.clone(),
            from,
            subject: state.staged.subject.clone(),
            body: state.staged.body.clone(),
            priority_level: state.staged.priority_level,
            headers: state.staged.headers.clone(),
            to: state.staged.to.clone(),
            cc: state.staged.cc.clone(),
            bcc: state.staged.bcc.clone(),
            reply_to: state.staged.reply_to.clone(),
            attachments: state.staged.attachments.clone(),
        };
        state.sent.push(message);
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.state();
        state.staged.to.clear();
        state.staged.cc.clear();
        state.staged.bcc.clear();
        state.staged.reply_to.clear();
        state.staged.attachments.clear();
        state.staged.headers.clear();
        state.staged.priority_level = None;
    }

    fn close(&mut self) {
        self.state().closed = true;
    }
}
