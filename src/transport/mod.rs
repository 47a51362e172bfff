//! Transport adapter seam.
//!
//! A [`Transport`] is a stateful adapter around one mail engine: the sender
//! configures it once, stages one message's fields onto it, transmits, then
//! resets the staged state for the next message. [`SmtpAdapter`] is the
//! production implementation over lettre; [`MemoryTransport`] records
//! everything in memory for development and testing.

mod memory;
mod smtp;

pub use memory::{MemoryTransport, SentMessage, StagedState};
pub use smtp::SmtpAdapter;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PostboxConfig;
use crate::envelope::{AddressSpec, AttachmentSpec};

/// Adapter-level failure code: the message could not be built or addressed.
pub const CODE_MESSAGE: u16 = 0;
/// Adapter-level failure code: the server refused transiently.
pub const CODE_TRANSIENT: u16 = 1;
/// Adapter-level failure code: permanent rejection or a dead connection.
pub const CODE_PERMANENT: u16 = 2;

/// A failure raised by a transport adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub code: u16,
    pub message: String,
}

impl TransportError {
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::with_code(CODE_MESSAGE, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::with_code(CODE_TRANSIENT, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::with_code(CODE_PERMANENT, message)
    }
}

/// Which recipient list an address spec belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
    ReplyTo,
}

/// Stateful adapter around one mail engine.
///
/// Lifecycle per instance: [`configure`](Self::configure) and
/// [`set_credentials`](Self::set_credentials) once, then for each message
/// stage fields with the `set_*`/`add_*` calls, [`transmit`](Self::transmit),
/// and [`reset`](Self::reset). `reset` clears recipients, attachments,
/// custom headers, and reply-tos but keeps the connection open;
/// [`close`](Self::close) drops the connection.
#[async_trait]
pub trait Transport: Send + 'static {
    fn configure(&mut self, config: &PostboxConfig);

    fn set_credentials(&mut self, username: &str, password: &str);

    fn set_from(&mut self, from: &AddressSpec) -> Result<(), TransportError>;

    /// Stage the priority level and its accompanying header pairs.
    fn set_priority(&mut self, level: u8, headers: &[(&str, &str)]);

    fn set_subject(&mut self, subject: &str);

    fn set_body(&mut self, body: &str);

    fn add_recipient(
        &mut self,
        kind: RecipientKind,
        spec: &AddressSpec,
    ) -> Result<(), TransportError>;

    fn add_attachment(&mut self, spec: &AttachmentSpec) -> Result<(), TransportError>;

    /// Transmit the staged message. A failure carries an adapter-level code
    /// from the `CODE_*` space.
    async fn transmit(&mut self) -> Result<(), TransportError>;

    fn reset(&mut self);

    fn close(&mut self);
}
