//! Account registry, sender cache, and send orchestration.
//!
//! # Quick Start
//!
//! ```ignore
//! // 1. Register an account
//! let office = PostOffice::new();
//! office.register(PostboxConfig::new("smtp.example.com"), "")?;
//!
//! // 2. Unlock a sender bound to credentials
//! let postbox = office.unlock("user@example.com", "secret", "Orders", "")?;
//!
//! // 3. Compose and send
//! let mut envelope = Envelope::new("Welcome", "<p>Thanks for signing up.</p>");
//! envelope.set_to(("abc@example.com", "ABC"));
//! let receipt = postbox.send(envelope).await;
//! assert!(receipt.is_ok());
//! ```
//!
//! A send never raises for delivery problems: the outcome comes back as a
//! [`SendReceipt`]. Callers that prefer errors use
//! [`Postbox::try_send`], which turns a non-OK receipt into a [`MailError`].

mod registry;
mod sender;

pub use registry::{PostOffice, DEFAULT_POSTBOX};
pub use sender::{FromSpec, Postbox};

use serde::Serialize;
use thiserror::Error;

use crate::transport::{CODE_MESSAGE, CODE_PERMANENT, CODE_TRANSIENT};

/// Receipt status of an accepted message.
pub const STATUS_OK: u16 = 200;
/// Receipt status when neither the envelope nor the sender has a from address.
pub const STATUS_MISSING_FROM: u16 = 101;
/// Receipt status for adapter error codes outside the mapped table.
pub const STATUS_UNKNOWN_TRANSPORT: u16 = 502;

/// The outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub status_code: u16,
    pub reason: String,
}

impl SendReceipt {
    pub(crate) fn ok() -> Self {
        Self {
            status_code: STATUS_OK,
            reason: "OK".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Error form of a failed send, produced by [`Postbox::try_send`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("send failed with status {status}: {reason}")]
pub struct MailError {
    pub status: u16,
    pub reason: String,
}

/// Fixed mapping from adapter-level error codes to receipt statuses.
pub(crate) fn map_transport_code(code: u16) -> u16 {
    match code {
        CODE_MESSAGE => 100,
        CODE_TRANSIENT => 102,
        CODE_PERMANENT => 500,
        _ => STATUS_UNKNOWN_TRANSPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_through_the_table() {
        assert_eq!(map_transport_code(CODE_MESSAGE), 100);
        assert_eq!(map_transport_code(CODE_TRANSIENT), 102);
        assert_eq!(map_transport_code(CODE_PERMANENT), 500);
    }

    #[test]
    fn unknown_codes_map_to_the_generic_status() {
        assert_eq!(map_transport_code(7), STATUS_UNKNOWN_TRANSPORT);
        assert_eq!(map_transport_code(u16::MAX), STATUS_UNKNOWN_TRANSPORT);
    }
}
