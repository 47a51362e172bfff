//! Envelope value object: the structured content of one outgoing message.
//!
//! An [`Envelope`] is composed field by field, then handed to a
//! [`Postbox`](crate::Postbox) by value; sending consumes it. Recipient and
//! attachment setters accept a bare value, a single spec, or a list of specs
//! and normalize all three shapes to a list of specs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("unknown envelope field {0:?}")]
    InvalidField(String),

    #[error("unsupported value for envelope field '{0}'")]
    InvalidValue(Field),
}

/// One recipient: an address and an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpec {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AddressSpec {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }
}

/// One attachment: a file path and an optional name shown to the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AttachmentSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    pub fn named(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
        }
    }
}

/// The three input shapes a recipient setter accepts.
///
/// Normalization: a bare address becomes one single-field spec, a flat
/// address/name pair becomes one spec, and a list of specs is kept as-is.
#[derive(Debug, Clone)]
pub enum AddressInput {
    Single(String),
    Entry(AddressSpec),
    Many(Vec<AddressSpec>),
}

impl AddressInput {
    fn normalize(self) -> Vec<AddressSpec> {
        match self {
            AddressInput::Single(address) => vec![AddressSpec::new(address)],
            AddressInput::Entry(spec) => vec![spec],
            AddressInput::Many(specs) => specs,
        }
    }
}

impl From<&str> for AddressInput {
    fn from(address: &str) -> Self {
        AddressInput::Single(address.to_string())
    }
}

impl From<String> for AddressInput {
    fn from(address: String) -> Self {
        AddressInput::Single(address)
    }
}

impl From<(&str, &str)> for AddressInput {
    fn from((address, name): (&str, &str)) -> Self {
        AddressInput::Entry(AddressSpec::named(address, name))
    }
}

impl From<(String, String)> for AddressInput {
    fn from((address, name): (String, String)) -> Self {
        AddressInput::Entry(AddressSpec::named(address, name))
    }
}

impl From<AddressSpec> for AddressInput {
    fn from(spec: AddressSpec) -> Self {
        AddressInput::Entry(spec)
    }
}

impl From<Vec<AddressSpec>> for AddressInput {
    fn from(specs: Vec<AddressSpec>) -> Self {
        AddressInput::Many(specs)
    }
}

/// The three input shapes the attachment setter accepts.
#[derive(Debug, Clone)]
pub enum AttachmentInput {
    Single(String),
    Entry(AttachmentSpec),
    Many(Vec<AttachmentSpec>),
}

impl AttachmentInput {
    fn normalize(self) -> Vec<AttachmentSpec> {
        match self {
            AttachmentInput::Single(path) => vec![AttachmentSpec::new(path)],
            AttachmentInput::Entry(spec) => vec![spec],
            AttachmentInput::Many(specs) => specs,
        }
    }
}

impl From<&str> for AttachmentInput {
    fn from(path: &str) -> Self {
        AttachmentInput::Single(path.to_string())
    }
}

impl From<String> for AttachmentInput {
    fn from(path: String) -> Self {
        AttachmentInput::Single(path)
    }
}

impl From<(&str, &str)> for AttachmentInput {
    fn from((path, name): (&str, &str)) -> Self {
        AttachmentInput::Entry(AttachmentSpec::named(path, name))
    }
}

impl From<AttachmentSpec> for AttachmentInput {
    fn from(spec: AttachmentSpec) -> Self {
        AttachmentInput::Entry(spec)
    }
}

impl From<Vec<AttachmentSpec>> for AttachmentInput {
    fn from(specs: Vec<AttachmentSpec>) -> Self {
        AttachmentInput::Many(specs)
    }
}

/// Delivery priority, carried as headers on the transmitted message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Low => "LOW",
        }
    }

    /// Numeric level for the `X-Priority` header.
    pub(crate) fn level(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Normal => 3,
            Priority::Low => 5,
        }
    }

    /// Label for the `X-MSMail-Priority` and `Importance` headers.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::High => "High",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            "LOW" => Ok(Priority::Low),
            _ => Err(EnvelopeError::InvalidValue(Field::Priority)),
        }
    }
}

/// The closed set of envelope fields, in iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Subject,
    Body,
    Priority,
    From,
    To,
    Cc,
    Bcc,
    ReplyTo,
    Attachment,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Subject,
        Field::Body,
        Field::Priority,
        Field::From,
        Field::To,
        Field::Cc,
        Field::Bcc,
        Field::ReplyTo,
        Field::Attachment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Subject => "subject",
            Field::Body => "body",
            Field::Priority => "priority",
            Field::From => "from",
            Field::To => "to",
            Field::Cc => "cc",
            Field::Bcc => "bcc",
            Field::ReplyTo => "replyto",
            Field::Attachment => "attachment",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| EnvelopeError::InvalidField(s.to_string()))
    }
}

/// A snapshot of one envelope field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Mailbox(AddressSpec),
    Addresses(Vec<AddressSpec>),
    Attachments(Vec<AttachmentSpec>),
    Empty,
}

/// The normalized content of one outgoing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    subject: String,
    body: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<AddressSpec>,
    #[serde(default)]
    to: Vec<AddressSpec>,
    #[serde(default)]
    cc: Vec<AddressSpec>,
    #[serde(default)]
    bcc: Vec<AddressSpec>,
    #[serde(default)]
    reply_to: Vec<AddressSpec>,
    #[serde(default)]
    attachments: Vec<AttachmentSpec>,
}

impl Envelope {
    /// Create an envelope with normal priority and no recipients.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            priority: Priority::default(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Create an envelope with an explicit priority.
    pub fn with_priority(
        subject: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        let mut envelope = Self::new(subject, body);
        envelope.set_priority(priority);
        envelope
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn from(&self) -> Option<&AddressSpec> {
        self.from.as_ref()
    }

    pub fn to(&self) -> &[AddressSpec] {
        &self.to
    }

    pub fn cc(&self) -> &[AddressSpec] {
        &self.cc
    }

    pub fn bcc(&self) -> &[AddressSpec] {
        &self.bcc
    }

    pub fn reply_to(&self) -> &[AddressSpec] {
        &self.reply_to
    }

    pub fn attachments(&self) -> &[AttachmentSpec] {
        &self.attachments
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Set the sender. A list input contributes its first spec.
    pub fn set_from(&mut self, from: impl Into<AddressInput>) {
        self.from = from.into().normalize().into_iter().next();
    }

    pub fn set_to(&mut self, to: impl Into<AddressInput>) {
        self.to = to.into().normalize();
    }

    pub fn set_cc(&mut self, cc: impl Into<AddressInput>) {
        self.cc = cc.into().normalize();
    }

    pub fn set_bcc(&mut self, bcc: impl Into<AddressInput>) {
        self.bcc = bcc.into().normalize();
    }

    pub fn set_reply_to(&mut self, reply_to: impl Into<AddressInput>) {
        self.reply_to = reply_to.into().normalize();
    }

    pub fn set_attachment(&mut self, attachment: impl Into<AttachmentInput>) {
        self.attachments = attachment.into().normalize();
    }

    /// Read one field. Total: absent fields read as [`FieldValue::Empty`].
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Subject => FieldValue::Text(self.subject.clone()),
            Field::Body => FieldValue::Text(self.body.clone()),
            Field::Priority => FieldValue::Text(self.priority.as_str().to_string()),
            Field::From => self
                .from
                .clone()
                .map(FieldValue::Mailbox)
                .unwrap_or(FieldValue::Empty),
            Field::To => FieldValue::Addresses(self.to.clone()),
            Field::Cc => FieldValue::Addresses(self.cc.clone()),
            Field::Bcc => FieldValue::Addresses(self.bcc.clone()),
            Field::ReplyTo => FieldValue::Addresses(self.reply_to.clone()),
            Field::Attachment => FieldValue::Attachments(self.attachments.clone()),
        }
    }

    /// Read one field by name; unknown names read as [`FieldValue::Empty`].
    pub fn get_named(&self, key: &str) -> FieldValue {
        match key.parse::<Field>() {
            Ok(field) => self.get(field),
            Err(_) => FieldValue::Empty,
        }
    }

    /// Write one field, dispatching to the named setter's semantics.
    ///
    /// Text written to a recipient field is a bare-address input; priority
    /// text that doesn't parse leaves the prior priority in place. A value
    /// whose shape doesn't fit the field is rejected. Fields cannot be
    /// unset, only overwritten.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), EnvelopeError> {
        match (field, value) {
            (Field::Subject, FieldValue::Text(text)) => self.set_subject(text),
            (Field::Body, FieldValue::Text(text)) => self.set_body(text),
            (Field::Priority, FieldValue::Text(text)) => {
                if let Ok(priority) = text.parse() {
                    self.set_priority(priority);
                }
            }
            (Field::From, FieldValue::Text(address)) => self.set_from(address),
            (Field::From, FieldValue::Mailbox(spec)) => self.set_from(spec),
            (Field::From, FieldValue::Empty) => self.from = None,
            (Field::To, value) => self.to = address_value(field, value)?,
            (Field::Cc, value) => self.cc = address_value(field, value)?,
            (Field::Bcc, value) => self.bcc = address_value(field, value)?,
            (Field::ReplyTo, value) => self.reply_to = address_value(field, value)?,
            (Field::Attachment, FieldValue::Text(path)) => self.set_attachment(path),
            (Field::Attachment, FieldValue::Attachments(specs)) => self.attachments = specs,
            (field, _) => return Err(EnvelopeError::InvalidValue(field)),
        }
        Ok(())
    }

    /// Write one field by name. Unknown names are a typed error.
    pub fn set_named(&mut self, key: &str, value: FieldValue) -> Result<(), EnvelopeError> {
        self.set(key.parse()?, value)
    }

    /// Iterate every field in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, FieldValue)> + '_ {
        Field::ALL.iter().map(move |field| (*field, self.get(*field)))
    }
}

fn address_value(field: Field, value: FieldValue) -> Result<Vec<AddressSpec>, EnvelopeError> {
    match value {
        FieldValue::Text(address) => Ok(AddressInput::Single(address).normalize()),
        FieldValue::Mailbox(spec) => Ok(AddressInput::Entry(spec).normalize()),
        FieldValue::Addresses(specs) => Ok(specs),
        _ => Err(EnvelopeError::InvalidValue(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_becomes_single_spec() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_to("a@x.com");

        assert_eq!(envelope.to(), &[AddressSpec::new("a@x.com")]);
    }

    #[test]
    fn flat_pair_becomes_single_spec() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_to(("a@x.com", "A"));

        assert_eq!(envelope.to(), &[AddressSpec::named("a@x.com", "A")]);
    }

    #[test]
    fn spec_list_is_stored_unchanged() {
        let specs = vec![
            AddressSpec::named("a@x.com", "A"),
            AddressSpec::named("b@x.com", "B"),
        ];
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_to(specs.clone());

        assert_eq!(envelope.to(), specs.as_slice());
    }

    #[test]
    fn setters_replace_rather_than_append() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_to("a@x.com");
        envelope.set_to("b@x.com");

        assert_eq!(envelope.to(), &[AddressSpec::new("b@x.com")]);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope
            .set(Field::Priority, FieldValue::Text("high".into()))
            .unwrap();

        assert_eq!(envelope.priority(), Priority::High);
    }

    #[test]
    fn bogus_priority_text_keeps_prior_value() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_priority(Priority::Low);
        envelope
            .set(Field::Priority, FieldValue::Text("bogus".into()))
            .unwrap();

        assert_eq!(envelope.priority(), Priority::Low);
    }

    #[test]
    fn unknown_field_name_is_a_typed_error() {
        let mut envelope = Envelope::new("Hi", "Body");
        let err = envelope
            .set_named("stationery", FieldValue::Text("x".into()))
            .unwrap_err();

        assert_eq!(err, EnvelopeError::InvalidField("stationery".into()));
    }

    #[test]
    fn get_named_unknown_reads_empty() {
        let envelope = Envelope::new("Hi", "Body");
        assert_eq!(envelope.get_named("stationery"), FieldValue::Empty);
    }

    #[test]
    fn mismatched_value_shape_is_rejected() {
        let mut envelope = Envelope::new("Hi", "Body");
        let err = envelope
            .set(Field::Subject, FieldValue::Addresses(vec![]))
            .unwrap_err();

        assert_eq!(err, EnvelopeError::InvalidValue(Field::Subject));
    }

    #[test]
    fn text_written_to_recipient_field_is_a_bare_address() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope
            .set(Field::Cc, FieldValue::Text("c@x.com".into()))
            .unwrap();

        assert_eq!(envelope.cc(), &[AddressSpec::new("c@x.com")]);
    }

    #[test]
    fn fields_iterate_in_declaration_order() {
        let envelope = Envelope::new("Hi", "Body");
        let order: Vec<Field> = envelope.fields().map(|(field, _)| field).collect();

        assert_eq!(order.as_slice(), Field::ALL.as_slice());
    }

    #[test]
    fn from_accepts_address_and_pair_forms() {
        let mut envelope = Envelope::new("Hi", "Body");

        envelope.set_from("a@x.com");
        assert_eq!(envelope.from(), Some(&AddressSpec::new("a@x.com")));

        envelope.set_from(("a@x.com", "A"));
        assert_eq!(envelope.from(), Some(&AddressSpec::named("a@x.com", "A")));
    }

    #[test]
    fn envelope_round_trips_through_serde() {
        let mut envelope = Envelope::new("Hi", "Body");
        envelope.set_priority(Priority::High);
        envelope.set_to(("a@x.com", "A"));

        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();

        assert_eq!(back.subject(), "Hi");
        assert_eq!(back.priority(), Priority::High);
        assert_eq!(back.to(), envelope.to());
    }
}
