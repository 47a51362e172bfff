//! SMTP account configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SMTP configuration requires a host")]
    MissingHost,

    #[error("postbox {0:?} is not registered")]
    NotRegistered(String),

    #[error("invalid environment configuration: {0}")]
    Env(String),
}

/// Connection security for the SMTP session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plaintext connection. Local relays and test servers only.
    None,
    /// STARTTLS upgrade on a plaintext connection.
    #[default]
    Tls,
    /// Implicit TLS from the first byte.
    Ssl,
}

/// Destination for transport debug output.
///
/// Injected through [`PostboxConfig::debug_sink`]; the transport never
/// constructs its own sink. Lines are only produced when
/// [`PostboxConfig::debug`] is non-zero.
#[derive(Clone, Default)]
pub enum DebugSink {
    /// Route through `tracing` at debug level.
    #[default]
    Log,
    /// Write directly to standard error.
    Stderr,
    /// Hand each line to a caller-supplied closure.
    Custom(Arc<dyn Fn(&str) + Send + Sync>),
}

impl DebugSink {
    pub fn emit(&self, line: &str) {
        match self {
            DebugSink::Log => tracing::debug!(target: "postbox::smtp", "{line}"),
            DebugSink::Stderr => eprintln!("{line}"),
            DebugSink::Custom(f) => f(line),
        }
    }
}

impl fmt::Debug for DebugSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugSink::Log => f.write_str("Log"),
            DebugSink::Stderr => f.write_str("Stderr"),
            DebugSink::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Settings for one SMTP account.
///
/// Caller-supplied values win; everything except [`host`](Self::host) falls
/// back to the defaults below. Unrecognized keys in deserialized input are
/// dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct PostboxConfig {
    /// SMTP server hostname. Required; validated at registration.
    #[serde(rename = "smtp_host")]
    pub host: String,

    /// SMTP server port (default: 25).
    #[serde(rename = "smtp_port", default = "default_port")]
    pub port: u16,

    /// Default sender address for accounts without a per-sender from.
    #[serde(rename = "smtp_from", default)]
    pub from: Option<String>,

    /// Display name paired with [`from`](Self::from).
    #[serde(rename = "smtp_from_name", default)]
    pub from_name: Option<String>,

    /// Message body content type (default: `text/html`).
    #[serde(rename = "smtp_content_type", default = "default_content_type")]
    pub content_type: String,

    /// Whether to authenticate with the server (default: true).
    #[serde(rename = "smtp_auth", default = "default_auth")]
    pub auth: bool,

    /// Connection security (default: STARTTLS).
    #[serde(rename = "smtp_secure", default)]
    pub secure: TlsMode,

    /// Body character set (default: `UTF-8`).
    #[serde(rename = "smtp_charset", default = "default_charset")]
    pub charset: String,

    /// Body transfer encoding (default: `base64`).
    #[serde(rename = "smtp_encoding", default = "default_encoding")]
    pub encoding: String,

    /// Opaque transport options, passed through to the adapter.
    ///
    /// The SMTP adapter recognizes `allow_invalid_certs` and
    /// `allow_invalid_hostnames` as booleans.
    #[serde(rename = "smtp_options", default)]
    pub options: HashMap<String, serde_json::Value>,

    /// Connection timeout in seconds (default: 300).
    #[serde(rename = "smtp_timeout", default = "default_timeout")]
    pub timeout: u64,

    /// Debug verbosity; 0 disables transport debug output (default: 0).
    #[serde(rename = "smtp_debug", default)]
    pub debug: u8,

    /// Where transport debug output goes.
    #[serde(skip)]
    pub debug_sink: DebugSink,
}

fn default_port() -> u16 {
    25
}

fn default_content_type() -> String {
    "text/html".to_string()
}

fn default_auth() -> bool {
    true
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_encoding() -> String {
    "base64".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl PostboxConfig {
    /// Create a configuration for `host` with every other field defaulted.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            from: None,
            from_name: None,
            content_type: default_content_type(),
            auth: default_auth(),
            secure: TlsMode::default(),
            charset: default_charset(),
            encoding: default_encoding(),
            options: HashMap::new(),
            timeout: default_timeout(),
            debug: 0,
            debug_sink: DebugSink::default(),
        }
    }

    /// Load a configuration from environment variables.
    ///
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_FROM`, `SMTP_FROM_NAME`,
    /// `SMTP_CONTENT_TYPE`, `SMTP_AUTH`, `SMTP_SECURE`, `SMTP_CHARSET`,
    /// `SMTP_ENCODING`, `SMTP_TIMEOUT`, and `SMTP_DEBUG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: PostboxConfig =
            serde_env::from_env().map_err(|e| ConfigError::Env(e.to_string()))?;

        config.ensure_host()?;
        Ok(config)
    }

    pub(crate) fn ensure_host(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_defaults() {
        let config = PostboxConfig::new("smtp.example.com");

        assert_eq!(config.port, 25);
        assert_eq!(config.content_type, "text/html");
        assert!(config.auth);
        assert_eq!(config.secure, TlsMode::Tls);
        assert_eq!(config.charset, "UTF-8");
        assert_eq!(config.encoding, "base64");
        assert!(config.options.is_empty());
        assert_eq!(config.timeout, 300);
        assert_eq!(config.debug, 0);
    }

    #[test]
    fn deserialize_drops_unknown_keys_and_keeps_overrides() {
        let config: PostboxConfig = serde_json::from_value(serde_json::json!({
            "smtp_host": "smtp.example.com",
            "smtp_port": 587,
            "smtp_secure": "ssl",
            "not_a_setting": "ignored"
        }))
        .unwrap();

        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.secure, TlsMode::Ssl);
        // untouched fields still come from the defaults table
        assert_eq!(config.timeout, 300);
    }

    #[test]
    fn deserialize_without_host_fails() {
        let result: Result<PostboxConfig, _> =
            serde_json::from_value(serde_json::json!({ "smtp_port": 25 }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_host_is_rejected() {
        let config = PostboxConfig::new("   ");
        assert!(matches!(
            config.ensure_host(),
            Err(ConfigError::MissingHost)
        ));
    }
}
