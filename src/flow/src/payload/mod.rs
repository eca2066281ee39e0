//! Data envelope carried between pipeline stages.
//!
//! A [`Payload`] is one tagged value with the same capability set whatever
//! its representation: it can be cloned into an independent copy, marshalled
//! into bytes and unmarshalled into a caller supplied target. The stage
//! machinery never needs to know which representation it is moving.

mod structured;
mod target;

pub use structured::{JsonPayload, StructuredPayload};
pub use target::{Json, PayloadTarget};

use logger::Logger;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Unit of data moving through the pipeline.
#[derive(Debug)]
pub enum Payload {
    /// Immutable raw bytes
    Raw(Box<[u8]>),
    /// One line of text
    Text(String),
    /// The bytes of one block read from a source
    Binary(Vec<u8>),
    /// Self-describing value with its own marshal/unmarshal behavior
    Structured(Box<dyn StructuredPayload>),
}

/// Why a payload could not populate a target.
#[derive(thiserror::Error, Debug)]
pub enum DecodeReason {
    #[error("invalid utf8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Shape(String),
}

/// Failure to unmarshal a payload. Local to the caller: it never aborts the pipeline.
#[derive(thiserror::Error, Debug)]
#[error("failed to unmarshal {payload} into {target}: {reason}")]
pub struct DecodeError {
    pub target: String,
    pub payload: String,
    #[source]
    pub reason: DecodeReason,
}

impl Payload {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Payload::Raw(bytes.into().into_boxed_slice())
    }

    pub fn text(line: impl Into<String>) -> Self {
        Payload::Text(line.into())
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Payload::Binary(bytes.into())
    }

    pub fn structured(value: impl StructuredPayload) -> Self {
        Payload::Structured(Box::new(value))
    }

    /// Placeholder handed to stages that originate data.
    pub fn empty() -> Self {
        Payload::Raw(Box::default())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(line) => Some(line.as_str()),
            _ => None,
        }
    }

    /// Borrow the bytes of a raw or binary payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Raw(bytes) => Some(&bytes[..]),
            Payload::Binary(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&dyn StructuredPayload> {
        match self {
            Payload::Structured(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Deterministic serialization of the payload's content.
    pub fn marshal(&self) -> Cow<'_, [u8]> {
        match self {
            Payload::Raw(bytes) => Cow::Borrowed(&bytes[..]),
            Payload::Text(line) => Cow::Borrowed(line.as_bytes()),
            Payload::Binary(bytes) => Cow::Borrowed(&bytes[..]),
            Payload::Structured(value) => Cow::Owned(value.marshal()),
        }
    }

    /// Number of marshalled bytes.
    pub fn len(&self) -> usize {
        match self {
            Payload::Raw(bytes) => bytes.len(),
            Payload::Text(line) => line.len(),
            Payload::Binary(bytes) => bytes.len(),
            Payload::Structured(value) => value.marshal().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Populate `target` from this payload.
    pub fn unmarshal(&self, target: &mut dyn PayloadTarget) -> Result<(), DecodeError> {
        let result = match self {
            Payload::Structured(value) => value.unmarshal(target),
            _ => target.populate(&self.marshal()),
        };
        result.map_err(|reason| DecodeError {
            target: target.describe(),
            payload: self.description(),
            reason,
        })
    }

    /// Unmarshal into a fresh `T` through its serde representation.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let mut target = Json::<T>::default();
        self.unmarshal(&mut target)?;
        target.0.ok_or_else(|| DecodeError {
            target: std::any::type_name::<T>().to_string(),
            payload: self.description(),
            reason: DecodeReason::Shape("no value produced".to_string()),
        })
    }

    /// [`Payload::unmarshal`] as called from inside a stage: failures are logged
    /// at debug severity and returned, and never escalate to the abort signal.
    pub fn unmarshal_logged(
        &self,
        target: &mut dyn PayloadTarget,
        logger: &Logger,
    ) -> Result<(), DecodeError> {
        self.unmarshal(target).map_err(|err| {
            logger.debug(format_args!(
                "payload unmarshal failed: target={} payload={:?} reason={}",
                err.target, self, err.reason
            ));
            err
        })
    }

    /// Get a human-readable description
    pub fn description(&self) -> String {
        match self {
            Payload::Raw(bytes) => format!("Raw payload ({} bytes)", bytes.len()),
            Payload::Text(line) => format!("Text payload ({} bytes)", line.len()),
            Payload::Binary(bytes) => format!("Binary payload ({} bytes)", bytes.len()),
            Payload::Structured(value) => format!("Structured payload ({})", value.kind()),
        }
    }
}

/// Deep copy: the clone never shares mutable storage with the original, so a
/// payload fanned out to several stages cannot leak one stage's edits into another.
impl Clone for Payload {
    fn clone(&self) -> Self {
        match self {
            Payload::Raw(bytes) => Payload::Raw(bytes.clone()),
            Payload::Text(line) => Payload::Text(line.clone()),
            Payload::Binary(bytes) => Payload::Binary(bytes.clone()),
            Payload::Structured(value) => Payload::Structured(value.clone_payload()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logger::{Level, Notifier};
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        sensor: String,
        value: i64,
    }

    #[test]
    fn text_roundtrips_into_string() {
        let payload = Payload::text("hello");
        let mut out = String::from("stale");
        payload.unmarshal(&mut out).expect("unmarshal");
        assert_eq!(out, "hello");
        assert_eq!(payload.marshal().as_ref(), b"hello");
    }

    #[test]
    fn binary_clone_is_independent() {
        let original = Payload::binary(vec![1u8, 2, 3]);
        let mut copy = original.clone();
        if let Payload::Binary(bytes) = &mut copy {
            bytes[0] = 42;
            bytes.push(4);
        }
        assert_eq!(original.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(copy.as_bytes(), Some(&[42u8, 2, 3, 4][..]));
    }

    #[test]
    fn structured_clone_is_independent() {
        let original = Payload::structured(JsonPayload::new(json!({"sensor": "a", "value": 1})));
        let copy = original.clone();
        drop(original);
        let reading: Reading = copy.decode().expect("decode");
        assert_eq!(
            reading,
            Reading {
                sensor: "a".into(),
                value: 1
            }
        );
    }

    #[test]
    fn structured_roundtrips_through_its_own_shape() {
        let value = json!({"sensor": "b", "value": 9});
        let payload = Payload::structured(JsonPayload::new(value.clone()));
        let mut target = Json::<serde_json::Value>::default();
        payload.unmarshal(&mut target).expect("unmarshal");
        assert_eq!(target.into_inner(), Some(value));
    }

    #[test]
    fn raw_bytes_decode_as_json() {
        let payload = Payload::raw(br#"{"sensor":"c","value":3}"#.to_vec());
        let reading: Reading = payload.decode().expect("decode");
        assert_eq!(reading.value, 3);
    }

    #[test]
    fn mismatched_shape_is_an_error() {
        let payload = Payload::text("not json");
        let err = payload.decode::<Reading>().unwrap_err();
        assert!(matches!(err.reason, DecodeReason::Json(_)));
        assert!(err.target.contains("Reading"));
        assert!(err.payload.contains("Text payload"));

        let mut block = [0u8; 4];
        let err = Payload::binary(vec![1u8, 2]).unmarshal(&mut block).unwrap_err();
        assert!(matches!(err.reason, DecodeReason::Shape(_)));
    }

    #[test]
    fn invalid_utf8_cannot_become_string() {
        let payload = Payload::binary(vec![0xff, 0xfe]);
        let mut out = String::new();
        let err = payload.unmarshal(&mut out).unwrap_err();
        assert!(matches!(err.reason, DecodeReason::Utf8(_)));
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<(Level, String)>>);

    impl Notifier for Collect {
        fn notify(&self, level: Level, _trace: &[u8], message: &str) {
            self.0.lock().push((level, message.to_string()));
        }
    }

    #[test]
    fn logged_unmarshal_reports_at_debug() {
        let logger = Logger::with_output(std::io::sink());
        let seen = Arc::new(Collect::default());
        logger.set_notifier(seen.clone());

        let payload = Payload::text("{broken");
        let mut target = Json::<Reading>::default();
        assert!(payload.unmarshal_logged(&mut target, &logger).is_err());

        let events = seen.0.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Level::Debug);
        assert!(events[0].1.contains("Reading"));
        assert!(events[0].1.contains("{broken"));
    }

    #[test]
    fn empty_payload_has_no_bytes() {
        let payload = Payload::empty();
        assert!(payload.is_empty());
        assert_eq!(payload.description(), "Raw payload (0 bytes)");
    }
}
