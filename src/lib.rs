//! SMTP account registry, envelope composition, and send orchestration.
//!
//! This crate is a thin façade over [lettre](https://lettre.rs): a
//! [`PostOffice`] holds named SMTP account configurations and hands out
//! cached [`Postbox`] senders bound to credentials; an [`Envelope`] carries
//! one message's normalized content; sending consumes the envelope and
//! reports the outcome as a [`SendReceipt`] with a small status-code space.
//!
//! # Quick Start
//!
//! ```ignore
//! let office = PostOffice::new();
//! office.register(PostboxConfig::new("smtp.example.com"), "")?;
//!
//! let postbox = office.unlock("user@example.com", "secret", "Orders", "")?;
//!
//! let mut envelope = Envelope::new("Welcome", "<p>Thanks for signing up.</p>");
//! envelope.set_priority(Priority::High);
//! envelope.set_to(("abc@example.com", "ABC"));
//!
//! let receipt = postbox.send(envelope).await;
//! assert!(receipt.is_ok());
//! ```
//!
//! # Environment Variables
//!
//! [`PostboxConfig::from_env`] reads:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `SMTP_HOST` | Yes | SMTP server hostname |
//! | `SMTP_PORT` | No | Port (default: 25) |
//! | `SMTP_FROM` | No | Account-level sender address |
//! | `SMTP_FROM_NAME` | No | Display name for the sender address |
//! | `SMTP_CONTENT_TYPE` | No | Body content type (default: `text/html`) |
//! | `SMTP_AUTH` | No | Authenticate with the server (default: true) |
//! | `SMTP_SECURE` | No | `tls` (default), `ssl`, or `none` |
//! | `SMTP_CHARSET` | No | Body character set (default: `UTF-8`) |
//! | `SMTP_ENCODING` | No | Transfer encoding (default: `base64`) |
//! | `SMTP_TIMEOUT` | No | Connection timeout in seconds (default: 300) |
//! | `SMTP_DEBUG` | No | Transport debug verbosity (default: 0) |

pub mod config;
pub mod envelope;
pub mod postbox;
pub mod transport;

pub use config::{ConfigError, DebugSink, PostboxConfig, TlsMode};
pub use envelope::{
    AddressInput, AddressSpec, AttachmentInput, AttachmentSpec, Envelope, EnvelopeError, Field,
    FieldValue, Priority,
};
pub use postbox::{
    FromSpec, MailError, PostOffice, Postbox, SendReceipt, DEFAULT_POSTBOX, STATUS_MISSING_FROM,
    STATUS_OK, STATUS_UNKNOWN_TRANSPORT,
};
pub use transport::{
    MemoryTransport, RecipientKind, SentMessage, SmtpAdapter, Transport, TransportError,
};
