//! Entry model and payload decoding.
//!
//! An entry document is either dictionary content or a redirect naming another key.
//! The decoder turns the field-presence convention of the published JSON into an
//! explicit two-variant type so the client never probes fields itself.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Compact field holding the entry's own key.
const KEY_FIELD: &str = "k";
/// Compact redirect marker.
const REDIRECT_FIELD: &str = "r";
/// Long-form redirect marker emitted by unoptimized builds.
const REDIRECT_FIELD_LONG: &str = "redirect";

/// A decoded entry document.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Dictionary payload
    Content(ContentEntry),
    /// Marker pointing at the key that holds the real content
    Redirect {
        /// Key to resolve instead
        target: String,
    },
}

/// Dictionary payload. Opaque to the lookup layer apart from its key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntry {
    /// Key recorded in the document, if the build wrote one
    #[serde(rename = "k", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// All remaining fields, untouched
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentEntry {
    /// Re-assembles the document as JSON.
    pub fn to_json(&self) -> Value {
        let mut doc = self.fields.clone();
        if let Some(key) = &self.key {
            doc.insert(KEY_FIELD.to_string(), Value::String(key.clone()));
        }
        Value::Object(doc)
    }
}

/// Payload that could not be decoded as an entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct DecodeError {
    /// What is wrong with the payload
    pub reason: String,
}

impl DecodeError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Turns fetched bytes into an [`Entry`].
pub trait EntryDecoder: Send + Sync {
    /// Decodes one payload.
    fn decode(&self, payload: &[u8]) -> Result<Entry, DecodeError>;
}

/// Decoder for the published JSON document shape.
///
/// A redirect document carries a non-empty string under `r` (or `redirect`) and
/// nothing else except, optionally, its own key under `k`. Any object without a
/// redirect marker is content.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEntryDecoder;

impl EntryDecoder for JsonEntryDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Entry, DecodeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| DecodeError::new(format!("invalid JSON: {}", e)))?;

        let Value::Object(mut doc) = value else {
            return Err(DecodeError::new("entry document must be a JSON object"));
        };

        let key = match doc.remove(KEY_FIELD) {
            None => None,
            Some(Value::String(k)) => Some(k),
            Some(_) => return Err(DecodeError::new("entry key must be a string")),
        };

        let redirect = match (doc.remove(REDIRECT_FIELD), doc.remove(REDIRECT_FIELD_LONG)) {
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(DecodeError::new("both redirect markers present"));
            }
            (Some(r), None) | (None, Some(r)) => Some(r),
        };

        match redirect {
            None => Ok(Entry::Content(ContentEntry { key, fields: doc })),
            Some(Value::String(target)) if target.is_empty() => {
                Err(DecodeError::new("redirect target is empty"))
            }
            Some(Value::String(target)) => {
                if !doc.is_empty() {
                    return Err(DecodeError::new(format!(
                        "redirect to {:?} carries content fields",
                        target
                    )));
                }
                Ok(Entry::Redirect { target })
            }
            Some(_) => Err(DecodeError::new("redirect target must be a string")),
        }
    }
}
