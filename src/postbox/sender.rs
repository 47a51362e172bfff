//! Send orchestration for one SMTP account.

use std::sync::Arc;

use lettre::Address;
use tokio::sync::Mutex;

use super::{map_transport_code, MailError, SendReceipt, STATUS_MISSING_FROM};
use crate::config::PostboxConfig;
use crate::envelope::{AddressSpec, Envelope};
use crate::transport::{RecipientKind, Transport, TransportError};

pub(crate) type TransportFactory = dyn Fn() -> Box<dyn Transport> + Send + Sync;

/// The sender identity supplied at unlock time.
///
/// Free text resolves against the account username: text that parses as an
/// email address becomes the sender address itself; otherwise, when the
/// username is email-shaped and the text is non-blank, the text becomes the
/// display name paired with the username. Blank text means the account has
/// no default sender and every envelope must carry its own from.
#[derive(Debug, Clone)]
pub enum FromSpec {
    Text(String),
    Mailbox(AddressSpec),
}

impl FromSpec {
    pub(crate) fn resolve(self, username: &str) -> Option<AddressSpec> {
        match self {
            FromSpec::Text(text) => {
                if is_email(&text) {
                    Some(AddressSpec::new(text))
                } else if is_email(username) && !text.is_empty() {
                    Some(AddressSpec::named(username, text))
                } else {
                    None
                }
            }
            FromSpec::Mailbox(spec) => Some(spec),
        }
    }
}

impl Default for FromSpec {
    fn default() -> Self {
        FromSpec::Text(String::new())
    }
}

impl From<&str> for FromSpec {
    fn from(text: &str) -> Self {
        FromSpec::Text(text.to_string())
    }
}

impl From<String> for FromSpec {
    fn from(text: String) -> Self {
        FromSpec::Text(text)
    }
}

impl From<(&str, &str)> for FromSpec {
    fn from((address, name): (&str, &str)) -> Self {
        FromSpec::Mailbox(AddressSpec::named(address, name))
    }
}

impl From<AddressSpec> for FromSpec {
    fn from(spec: AddressSpec) -> Self {
        FromSpec::Mailbox(spec)
    }
}

fn is_email(s: &str) -> bool {
    s.parse::<Address>().is_ok()
}

enum SendFault {
    MissingFrom,
    Transport(TransportError),
}

impl From<TransportError> for SendFault {
    fn from(err: TransportError) -> Self {
        SendFault::Transport(err)
    }
}

/// A sender bound to one registered account and credential set.
///
/// The transport is created on first send (configure + credentials), then
/// reused: each send stages one envelope, transmits, and resets the staged
/// state while the connection stays open. An instance-level async lock
/// serializes overlapping sends from shared handles. Dropping the sender
/// closes the transport if one was ever created.
pub struct Postbox {
    id: String,
    username: String,
    password: String,
    default_from: Option<AddressSpec>,
    config: PostboxConfig,
    transport: Mutex<Option<Box<dyn Transport>>>,
    factory: Arc<TransportFactory>,
}

impl Postbox {
    pub(crate) fn new(
        id: String,
        username: String,
        password: String,
        from: FromSpec,
        config: PostboxConfig,
        factory: Arc<TransportFactory>,
    ) -> Self {
        let default_from = from.resolve(&username);
        Self {
            id,
            username,
            password,
            default_from,
            config,
            transport: Mutex::new(None),
            factory,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The sender identity resolved at unlock time, if any.
    pub fn default_from(&self) -> Option<&AddressSpec> {
        self.default_from.as_ref()
    }

    /// Send one envelope, consuming it.
    ///
    /// Delivery problems never raise: the outcome is reported through the
    /// receipt's status code and reason. Missing sender identity is
    /// reported with [`STATUS_MISSING_FROM`] before the transport sees the
    /// message; adapter failures map through the fixed status table.
    pub async fn send(&self, envelope: Envelope) -> SendReceipt {
        let mut slot = self.transport.lock().await;
        let transport = slot.get_or_insert_with(|| {
            let mut transport = (self.factory)();
            transport.configure(&self.config);
            transport.set_credentials(&self.username, &self.password);
            transport
        });

        let outcome =
            apply_and_transmit(transport.as_mut(), &envelope, self.default_from.as_ref()).await;
        transport.reset();
        drop(slot);

        let receipt = match outcome {
            Ok(()) => SendReceipt::ok(),
            Err(SendFault::MissingFrom) => SendReceipt {
                status_code: STATUS_MISSING_FROM,
                reason: "no from address available".to_string(),
            },
            Err(SendFault::Transport(err)) => SendReceipt {
                status_code: map_transport_code(err.code),
                reason: err.message,
            },
        };

        if receipt.is_ok() {
            tracing::info!(id = %self.id, subject = %envelope.subject(), "message transmitted");
        } else {
            tracing::warn!(
                id = %self.id,
                status = receipt.status_code,
                reason = %receipt.reason,
                "message not sent"
            );
        }
        receipt
    }

    /// Like [`send`](Self::send), but a non-OK receipt becomes a [`MailError`].
    pub async fn try_send(&self, envelope: Envelope) -> Result<SendReceipt, MailError> {
        let receipt = self.send(envelope).await;
        if receipt.is_ok() {
            Ok(receipt)
        } else {
            Err(MailError {
                status: receipt.status_code,
                reason: receipt.reason,
            })
        }
    }
}

impl Drop for Postbox {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.transport.try_lock() {
            if let Some(transport) = slot.as_mut() {
                transport.close();
            }
        }
    }
}

async fn apply_and_transmit(
    transport: &mut dyn Transport,
    envelope: &Envelope,
    default_from: Option<&AddressSpec>,
) -> Result<(), SendFault> {
    let from = envelope
        .from()
        .or(default_from)
        .ok_or(SendFault::MissingFrom)?;
    transport.set_from(from)?;

    let priority = envelope.priority();
    let headers = [
        ("X-MSMail-Priority", priority.label()),
        ("Importance", priority.label()),
    ];
    transport.set_priority(priority.level(), &headers);

    transport.set_subject(envelope.subject());
    transport.set_body(envelope.body());

    for spec in envelope.to() {
        transport.add_recipient(RecipientKind::To, spec)?;
    }
    for spec in envelope.cc() {
        transport.add_recipient(RecipientKind::Cc, spec)?;
    }
    for spec in envelope.bcc() {
        transport.add_recipient(RecipientKind::Bcc, spec)?;
    }
    for spec in envelope.reply_to() {
        transport.add_recipient(RecipientKind::ReplyTo, spec)?;
    }
    for spec in envelope.attachments() {
        transport.add_attachment(spec)?;
    }

    transport.transmit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_text_becomes_the_sender_address() {
        let resolved = FromSpec::from("b@x.com").resolve("user");
        assert_eq!(resolved, Some(AddressSpec::new("b@x.com")));
    }

    #[test]
    fn display_text_pairs_with_an_email_username() {
        let resolved = FromSpec::from("Orders").resolve("a@x.com");
        assert_eq!(resolved, Some(AddressSpec::named("a@x.com", "Orders")));
    }

    #[test]
    fn blank_text_resolves_to_no_sender() {
        assert_eq!(FromSpec::from("").resolve("a@x.com"), None);
    }

    #[test]
    fn display_text_without_email_username_resolves_to_no_sender() {
        assert_eq!(FromSpec::from("Orders").resolve("user"), None);
    }

    #[test]
    fn explicit_mailbox_is_used_as_is() {
        let resolved = FromSpec::from(("b@x.com", "B")).resolve("user");
        assert_eq!(resolved, Some(AddressSpec::named("b@x.com", "B")));
    }
}
