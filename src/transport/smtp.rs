//! lettre-backed SMTP transport adapter.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{
    ContentTransferEncoding, ContentType, Header, HeaderName, HeaderValue,
};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{RecipientKind, Transport, TransportError, CODE_MESSAGE, CODE_PERMANENT, CODE_TRANSIENT};
use crate::config::{PostboxConfig, TlsMode};
use crate::envelope::{AddressSpec, AttachmentSpec};

/// Production [`Transport`] over lettre's async SMTP client.
///
/// Message fields are staged in memory and assembled into a lettre
/// [`Message`] at transmit time. The underlying connection pool is created on
/// first transmit and reused until [`close`](Transport::close).
#[derive(Default)]
pub struct SmtpAdapter {
    config: Option<PostboxConfig>,
    credentials: Option<Credentials>,
    connection: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
    subject: String,
    body: String,
    priority_level: Option<u8>,
    headers: Vec<(String, String)>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    attachments: Vec<AttachmentSpec>,
}

impl SmtpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn trace(&self, line: &str) {
        if let Some(config) = &self.config {
            if config.debug > 0 {
                config.debug_sink.emit(line);
            }
        }
    }

    fn ensure_connection(&mut self) -> Result<(), TransportError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let config = self
            .config
            .as_ref()
            .ok_or_else(|| TransportError::permanent("transport used before configure"))?;

        let mut builder = match config.secure {
            TlsMode::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(classify)?,
            TlsMode::Ssl => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host).map_err(classify)?
            }
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout)));

        if let Some(params) = tls_overrides(config)? {
            builder = builder.tls(match config.secure {
                TlsMode::Ssl => Tls::Wrapper(params),
                _ => Tls::Required(params),
            });
        }

        if config.auth {
            if let Some(credentials) = self.credentials.clone() {
                builder = builder.credentials(credentials);
            }
        }

        self.connection = Some(builder.build());
        self.trace(&format!(
            "smtp: connection configured for {}:{}",
            config.host, config.port
        ));
        Ok(())
    }

    async fn build_message(&self) -> Result<Message, TransportError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| TransportError::permanent("transport used before configure"))?;

        let from = self
            .from
            .clone()
            .ok_or_else(|| TransportError::message("no from address staged"))?;

        let mut builder = Message::builder().from(from);
        for mailbox in &self.reply_to {
            builder = builder.reply_to(mailbox.clone());
        }
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.bcc {
            builder = builder.bcc(mailbox.clone());
        }
        builder = builder.subject(self.subject.clone());

        if let Some(level) = self.priority_level {
            builder = builder.header(XPriority(level.to_string()));
        }
        for (name, value) in &self.headers {
            match name.as_str() {
                "X-MSMail-Priority" => builder = builder.header(XMsmailPriority(value.clone())),
                "Importance" => builder = builder.header(Importance(value.clone())),
                other => self.trace(&format!("smtp: dropping unsupported header {other:?}")),
            }
        }

        let content_type = ContentType::parse(&format!(
            "{}; charset={}",
            config.content_type, config.charset
        ))
        .map_err(|e| TransportError::message(format!("invalid content type: {e}")))?;

        let body_part = SinglePart::builder()
            .header(content_type)
            .header(transfer_encoding(&config.encoding))
            .body(self.body.clone());

        let message = if self.attachments.is_empty() {
            builder.singlepart(body_part)
        } else {
            let mut multipart = MultiPart::mixed().singlepart(body_part);
            for spec in &self.attachments {
                multipart = multipart.singlepart(attachment_part(spec).await?);
            }
            builder.multipart(multipart)
        }
        .map_err(|e| TransportError::message(e.to_string()))?;

        Ok(message)
    }
}

#[async_trait]
impl Transport for SmtpAdapter {
    fn configure(&mut self, config: &PostboxConfig) {
        self.config = Some(config.clone());
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some(Credentials::new(username.to_string(), password.to_string()));
    }

    fn set_from(&mut self, from: &AddressSpec) -> Result<(), TransportError> {
        self.from = Some(mailbox(from)?);
        Ok(())
    }

    fn set_priority(&mut self, level: u8, headers: &[(&str, &str)]) {
        self.priority_level = Some(level);
        self.headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
    }

    fn set_subject(&mut self, subject: &str) {
        self.subject = subject.to_string();
    }

    fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
    }

    fn add_recipient(
        &mut self,
        kind: RecipientKind,
        spec: &AddressSpec,
    ) -> Result<(), TransportError> {
        let mailbox = mailbox(spec)?;
        match kind {
            RecipientKind::To => self.to.push(mailbox),
            RecipientKind::Cc => self.cc.push(mailbox),
            RecipientKind::Bcc => self.bcc.push(mailbox),
            RecipientKind::ReplyTo => self.reply_to.push(mailbox),
        }
        Ok(())
    }

    fn add_attachment(&mut self, spec: &AttachmentSpec) -> Result<(), TransportError> {
        // Contents are read at transmit time.
        self.attachments.push(spec.clone());
        Ok(())
    }

    async fn transmit(&mut self) -> Result<(), TransportError> {
        let message = self.build_message().await?;
        self.ensure_connection()?;
        let Some(connection) = self.connection.as_ref() else {
            return Err(TransportError::permanent("smtp connection unavailable"));
        };

        self.trace(&format!(
            "smtp: transmitting to {} recipient(s)",
            self.to.len() + self.cc.len() + self.bcc.len()
        ));

        match connection.send(message).await {
            Ok(response) => {
                self.trace(&format!("smtp: server accepted message ({})", response.code()));
                Ok(())
            }
            Err(e) => {
                let err = classify(e);
                self.trace(&format!("smtp: {}", err.message));
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.to.clear();
        self.cc.clear();
        self.bcc.clear();
        self.reply_to.clear();
        self.attachments.clear();
        self.headers.clear();
        self.priority_level = None;
    }

    fn close(&mut self) {
        if self.connection.take().is_some() {
            self.trace("smtp: connection closed");
        }
    }
}

fn mailbox(spec: &AddressSpec) -> Result<Mailbox, TransportError> {
    let address = spec
        .address
        .parse::<Address>()
        .map_err(|e| TransportError::message(format!("invalid address {:?}: {e}", spec.address)))?;
    let name = spec.name.clone().filter(|name| !name.is_empty());
    Ok(Mailbox::new(name, address))
}

fn tls_overrides(config: &PostboxConfig) -> Result<Option<TlsParameters>, TransportError> {
    let accept_invalid_certs = option_flag(config, "allow_invalid_certs");
    let accept_invalid_hostnames = option_flag(config, "allow_invalid_hostnames");

    if config.secure == TlsMode::None || !(accept_invalid_certs || accept_invalid_hostnames) {
        return Ok(None);
    }

    let params = TlsParameters::builder(config.host.clone())
        .dangerous_accept_invalid_certs(accept_invalid_certs)
        .dangerous_accept_invalid_hostnames(accept_invalid_hostnames)
        .build()
        .map_err(classify)?;
    Ok(Some(params))
}

fn option_flag(config: &PostboxConfig, key: &str) -> bool {
    config
        .options
        .get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

fn transfer_encoding(encoding: &str) -> ContentTransferEncoding {
    match encoding.to_ascii_lowercase().as_str() {
        "7bit" => ContentTransferEncoding::SevenBit,
        "8bit" => ContentTransferEncoding::EightBit,
        "binary" => ContentTransferEncoding::Binary,
        "quoted-printable" => ContentTransferEncoding::QuotedPrintable,
        _ => ContentTransferEncoding::Base64,
    }
}

async fn attachment_part(spec: &AttachmentSpec) -> Result<SinglePart, TransportError> {
    let content = tokio::fs::read(&spec.path)
        .await
        .map_err(|e| TransportError::message(format!("attachment {:?}: {e}", spec.path)))?;
    let filename = spec
        .name
        .clone()
        .unwrap_or_else(|| file_name_of(&spec.path));
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| TransportError::message(format!("attachment content type: {e}")))?;
    Ok(Attachment::new(filename).body(content, content_type))
}

fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn classify(err: lettre::transport::smtp::Error) -> TransportError {
    let code = if err.is_transient() {
        CODE_TRANSIENT
    } else if err.is_permanent() {
        CODE_PERMANENT
    } else if err.is_client() {
        CODE_MESSAGE
    } else {
        // connection, TLS, and timeout failures
        CODE_PERMANENT
    };
    TransportError::with_code(code, err.to_string())
}

#[derive(Clone)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Clone)]
struct XMsmailPriority(String);

impl Header for XMsmailPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-MSMail-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Clone)]
struct Importance(String);

impl Header for Importance {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Importance")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_address_is_a_message_error() {
        let err = mailbox(&AddressSpec::new("not an address")).unwrap_err();
        assert_eq!(err.code, CODE_MESSAGE);
    }

    #[test]
    fn empty_display_name_is_dropped() {
        let mailbox = mailbox(&AddressSpec::named("a@x.com", "")).unwrap();
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn unknown_transfer_encoding_falls_back_to_base64() {
        assert_eq!(
            transfer_encoding("uuencode"),
            ContentTransferEncoding::Base64
        );
        assert_eq!(
            transfer_encoding("Quoted-Printable"),
            ContentTransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn attachment_name_defaults_to_file_name() {
        assert_eq!(file_name_of("/tmp/reports/q3.pdf"), "q3.pdf");
        assert_eq!(file_name_of("plain"), "plain");
    }
}
