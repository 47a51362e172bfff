use postbox::{
    AddressSpec, ConfigError, Envelope, MemoryTransport, PostOffice, PostboxConfig, TlsMode,
};

fn memory_office() -> (PostOffice, MemoryTransport) {
    let mail = MemoryTransport::new();
    let recorder = mail.clone();
    let office = PostOffice::with_transport(move || Box::new(recorder.clone()));
    (office, mail)
}

#[test]
fn register_requires_a_host() {
    let (office, _) = memory_office();
    let result = office.register(PostboxConfig::new(""), "");

    assert!(matches!(result, Err(ConfigError::MissingHost)));
}

#[test]
fn unlock_of_unregistered_id_fails() {
    let (office, _) = memory_office();
    let result = office.unlock("user", "pw", "", "nowhere");

    assert!(matches!(result, Err(ConfigError::NotRegistered(id)) if id == "nowhere"));
}

#[test]
fn unlock_twice_returns_the_cached_sender() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "")
        .unwrap();

    let first = office.unlock("user", "pw", "", "").unwrap();
    let second = office.unlock("other", "ignored", "", "").unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn close_then_unlock_builds_a_fresh_sender() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "")
        .unwrap();

    let first = office.unlock("user", "pw", "", "").unwrap();
    office.close("");
    let second = office.unlock("user", "pw", "", "").unwrap();

    assert!(!std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn close_of_unknown_id_is_a_no_op() {
    let (office, _) = memory_office();
    office.close("never-registered");
}

#[test]
fn blank_id_means_default() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "  ")
        .unwrap();

    assert!(office.unlock("user", "pw", "", "default").is_ok());
}

#[test]
fn email_from_text_becomes_the_default_sender() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "a")
        .unwrap();

    let postbox = office.unlock("user", "pw", "b@x.com", "a").unwrap();

    assert_eq!(postbox.default_from(), Some(&AddressSpec::new("b@x.com")));
}

#[test]
fn display_text_pairs_with_an_email_username() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "a")
        .unwrap();

    let postbox = office.unlock("a@x.com", "pw", "Display", "a").unwrap();

    assert_eq!(
        postbox.default_from(),
        Some(&AddressSpec::named("a@x.com", "Display"))
    );
}

#[test]
fn blank_from_text_leaves_no_default_sender() {
    let (office, _) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "a")
        .unwrap();

    let postbox = office.unlock("user", "pw", "", "a").unwrap();

    assert_eq!(postbox.default_from(), None);
}

#[tokio::test]
async fn host_only_registration_reaches_the_transport_with_defaults() {
    let (office, mail) = memory_office();
    office
        .register(PostboxConfig::new("smtp.example.com"), "")
        .unwrap();

    let postbox = office.unlock("user@example.com", "pw", "Sender", "").unwrap();
    let mut envelope = Envelope::new("Hi", "Body");
    envelope.set_to("a@x.com");
    assert!(postbox.send(envelope).await.is_ok());

    let config = mail.config().unwrap();
    assert_eq!(config.host, "smtp.example.com");
    assert_eq!(config.port, 25);
    assert_eq!(config.content_type, "text/html");
    assert!(config.auth);
    assert_eq!(config.secure, TlsMode::Tls);
    assert_eq!(config.charset, "UTF-8");
    assert_eq!(config.encoding, "base64");
    assert_eq!(config.timeout, 300);
}

#[tokio::test]
async fn reregistration_overwrites_the_prior_config() {
    let (office, mail) = memory_office();

    let mut first = PostboxConfig::new("smtp.example.com");
    first.port = 2525;
    office.register(first, "").unwrap();

    // A fresh registration starts from the defaults table again; the prior
    // port override does not linger.
    office
        .register(PostboxConfig::new("smtp.other.com"), "")
        .unwrap();

    let postbox = office.unlock("user@example.com", "pw", "Sender", "").unwrap();
    let mut envelope = Envelope::new("Hi", "Body");
    envelope.set_to("a@x.com");
    assert!(postbox.send(envelope).await.is_ok());

    let config = mail.config().unwrap();
    assert_eq!(config.host, "smtp.other.com");
    assert_eq!(config.port, 25);
}
