use super::{DecodeReason, PayloadTarget};
use std::fmt;

/// A payload that knows how to copy and serialize itself.
///
/// `marshal` must be deterministic and free of I/O; `unmarshal` defaults to
/// feeding the marshalled bytes to the target, which is what makes
/// `unmarshal(marshal(p))` reproduce `p` for its own shape.
pub trait StructuredPayload: fmt::Debug + Send + Sync + 'static {
    /// Independent deep copy.
    fn clone_payload(&self) -> Box<dyn StructuredPayload>;

    fn marshal(&self) -> Vec<u8>;

    fn unmarshal(&self, target: &mut dyn PayloadTarget) -> Result<(), DecodeReason> {
        target.populate(&self.marshal())
    }

    /// Short name used in diagnostics.
    fn kind(&self) -> &'static str {
        "structured"
    }
}

/// Structured payload backed by a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPayload {
    value: serde_json::Value,
}

impl JsonPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Build from any serializable value.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_value(self) -> serde_json::Value {
        self.value
    }
}

impl StructuredPayload for JsonPayload {
    fn clone_payload(&self) -> Box<dyn StructuredPayload> {
        Box::new(self.clone())
    }

    fn marshal(&self) -> Vec<u8> {
        self.value.to_string().into_bytes()
    }

    fn kind(&self) -> &'static str {
        "json"
    }
}
