//! Named account registry and the one-sender-per-id worker cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::sender::{FromSpec, Postbox, TransportFactory};
use crate::config::{ConfigError, PostboxConfig};
use crate::transport::{SmtpAdapter, Transport};

/// Id used when callers pass a blank postbox id.
pub const DEFAULT_POSTBOX: &str = "default";

/// Registry of named SMTP accounts and the cache of unlocked senders.
///
/// An explicit state object rather than process-global maps: hold one per
/// application (handles are cheap clones sharing state) and every test can
/// build its own isolated instance. The internal lock guards only map
/// mutation; it is never held while a message transmits.
#[derive(Clone)]
pub struct PostOffice {
    state: Arc<Mutex<Office>>,
    factory: Arc<TransportFactory>,
}

#[derive(Default)]
struct Office {
    configs: HashMap<String, PostboxConfig>,
    workers: HashMap<String, Arc<Postbox>>,
}

impl PostOffice {
    /// A post office whose senders transmit over SMTP.
    pub fn new() -> Self {
        Self::with_transport(|| Box::new(SmtpAdapter::new()))
    }

    /// A post office whose senders use transports built by `factory`.
    ///
    /// The seam for non-network backends:
    ///
    /// ```ignore
    /// let mail = MemoryTransport::new();
    /// let recorder = mail.clone();
    /// let office = PostOffice::with_transport(move || Box::new(recorder.clone()));
    /// ```
    pub fn with_transport<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Transport> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(Office::default())),
            factory: Arc::new(factory),
        }
    }

    /// Validate and store `config` under `id`, replacing any prior
    /// registration for that id wholesale.
    pub fn register(&self, config: PostboxConfig, id: &str) -> Result<(), ConfigError> {
        config.ensure_host()?;
        let id = resolve_id(id);
        tracing::debug!(%id, host = %config.host, "postbox registered");
        self.office().configs.insert(id.to_string(), config);
        Ok(())
    }

    /// Return the cached sender for `id`, constructing one on first unlock.
    ///
    /// Credentials are taken on trust; the email-shape check on `username`
    /// only informs default-from resolution and never rejects. Later unlocks
    /// of a cached id return the existing sender and ignore the credentials
    /// passed to them.
    pub fn unlock(
        &self,
        username: &str,
        password: &str,
        from: impl Into<FromSpec>,
        id: &str,
    ) -> Result<Arc<Postbox>, ConfigError> {
        let id = resolve_id(id);
        let mut office = self.office();

        let config = match office.configs.get(id) {
            Some(config) => config.clone(),
            None => return Err(ConfigError::NotRegistered(id.to_string())),
        };

        if let Some(worker) = office.workers.get(id) {
            return Ok(Arc::clone(worker));
        }

        let postbox = Arc::new(Postbox::new(
            id.to_string(),
            username.to_string(),
            password.to_string(),
            from.into(),
            config,
            Arc::clone(&self.factory),
        ));
        office.workers.insert(id.to_string(), Arc::clone(&postbox));
        Ok(postbox)
    }

    /// Evict the cached sender for `id`; no-op when none is cached.
    ///
    /// The sender's transport closes once the last outstanding handle to it
    /// drops. The registered configuration stays in place.
    pub fn close(&self, id: &str) {
        let id = resolve_id(id);
        if self.office().workers.remove(id).is_some() {
            tracing::debug!(%id, "postbox closed");
        }
    }

    fn office(&self) -> MutexGuard<'_, Office> {
        self.state.lock().expect("post office lock poisoned")
    }
}

impl Default for PostOffice {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_id(id: &str) -> &str {
    if id.trim().is_empty() {
        DEFAULT_POSTBOX
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_fall_back_to_default() {
        assert_eq!(resolve_id(""), DEFAULT_POSTBOX);
        assert_eq!(resolve_id("   "), DEFAULT_POSTBOX);
        assert_eq!(resolve_id("orders"), "orders");
    }
}
