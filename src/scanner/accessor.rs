//! Reading the identifying fields of a message.
//!
//! The accessor asks the store for every field of the key policy and turns
//! each value into text. A field that is missing or malformed never aborts
//! the folder pass: it degrades to the empty string and a warning naming the
//! field and the message's entry id is logged.

use crate::logging::Logger;
use crate::store::{FieldId, MailStore, MessageHandle, PropertyError, PropertyValue};

use super::fingerprint::FieldValues;
use super::KeyPolicy;

/// Outcome of reading one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    /// Present and well-typed.
    Ok,
    /// Absent from the message.
    Missing,
    /// Present but erroneous.
    Malformed,
}

impl FieldStatus {
    /// Classify the result of a property read.
    #[must_use]
    pub fn classify<T>(result: &Result<T, PropertyError>) -> Self {
        match result {
            Ok(_) => FieldStatus::Ok,
            Err(PropertyError::Missing) => FieldStatus::Missing,
            Err(PropertyError::Malformed(_)) => FieldStatus::Malformed,
        }
    }
}

/// Degradation summary for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldReport {
    /// Fields that were absent.
    pub missing: Vec<FieldId>,
    /// Fields that were present but unreadable.
    pub malformed: Vec<FieldId>,
}

impl FieldReport {
    /// Number of fields that fell back to the empty string.
    #[must_use]
    pub fn degraded(&self) -> usize {
        self.missing.len() + self.malformed.len()
    }
}

/// Convert a property value to the text that gets fingerprinted.
///
/// | Kind | Text |
/// |---|---|
/// | `Text` | as is |
/// | `Utf16` | decoded |
/// | `Time` | RFC 3339, UTC, seconds |
/// | `Integer` | decimal |
/// | `Binary` | lowercase hex |
///
/// # Errors
///
/// Returns [`PropertyError::Malformed`] for UTF-16 data with unpaired surrogates.
pub fn value_to_text(value: PropertyValue) -> Result<String, PropertyError> {
    match value {
        PropertyValue::Text(text) => Ok(text),
        PropertyValue::Utf16(units) => String::from_utf16(&units)
            .map_err(|e| PropertyError::Malformed(format!("invalid UTF-16: {e}"))),
        PropertyValue::Time(time) => {
            Ok(time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        }
        PropertyValue::Integer(n) => Ok(n.to_string()),
        PropertyValue::Binary(bytes) => Ok(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}

/// Reads key-policy fields from open messages.
pub struct MessageAccessor<'a> {
    policy: &'a KeyPolicy,
    logger: &'a dyn Logger,
}

impl<'a> MessageAccessor<'a> {
    /// Create an accessor for `policy`, reporting degradations to `logger`.
    #[must_use]
    pub fn new(policy: &'a KeyPolicy, logger: &'a dyn Logger) -> Self {
        Self { policy, logger }
    }

    /// Read every policy field of `message`, in policy order.
    ///
    /// Missing and malformed fields are replaced by `""` and reported in the
    /// returned [`FieldReport`].
    pub fn read_fields<S: MailStore + ?Sized>(
        &self,
        store: &S,
        message: &MessageHandle,
    ) -> (FieldValues, FieldReport) {
        let mut values = FieldValues::new();
        let mut report = FieldReport::default();

        for &field in self.policy.fields() {
            let result = store.get_property(message, field).and_then(value_to_text);
            let status = FieldStatus::classify(&result);
            match result {
                Ok(text) => values.push(field, text),
                Err(err) => {
                    if status == FieldStatus::Missing {
                        report.missing.push(field);
                    } else {
                        report.malformed.push(field);
                    }
                    self.logger.warn(&format!(
                        "Field {} of message {} unreadable ({}), using empty value",
                        field,
                        store.entry_id(message),
                        err
                    ));
                    values.push(field, String::new());
                }
            }
        }

        (values, report)
    }

    /// Read a single field as text without degrading it.
    ///
    /// # Errors
    ///
    /// Returns the store's [`PropertyError`] or a decoding failure.
    pub fn read_one<S: MailStore + ?Sized>(
        &self,
        store: &S,
        message: &MessageHandle,
        field: FieldId,
    ) -> Result<String, PropertyError> {
        store.get_property(message, field).and_then(value_to_text)
    }
}
