use super::DecodeReason;
use serde::de::DeserializeOwned;

/// Caller supplied destination for [`Payload::unmarshal`](super::Payload::unmarshal).
pub trait PayloadTarget {
    /// Replace the target's content with the value encoded in `bytes`.
    /// On error the target is left unchanged.
    fn populate(&mut self, bytes: &[u8]) -> Result<(), DecodeReason>;

    /// Name used in diagnostics when population fails.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl PayloadTarget for String {
    fn populate(&mut self, bytes: &[u8]) -> Result<(), DecodeReason> {
        let text = std::str::from_utf8(bytes)?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

impl PayloadTarget for Vec<u8> {
    fn populate(&mut self, bytes: &[u8]) -> Result<(), DecodeReason> {
        self.clear();
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Fixed-size blocks: the payload must carry exactly `N` bytes.
impl<const N: usize> PayloadTarget for [u8; N] {
    fn populate(&mut self, bytes: &[u8]) -> Result<(), DecodeReason> {
        if bytes.len() != N {
            return Err(DecodeReason::Shape(format!(
                "expected {} bytes, got {}",
                N,
                bytes.len()
            )));
        }
        self.copy_from_slice(bytes);
        Ok(())
    }
}

/// Target for any serde-deserializable type, decoded from JSON.
#[derive(Debug)]
pub struct Json<T>(pub Option<T>);

impl<T> Json<T> {
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Json(None)
    }
}

impl<T: DeserializeOwned> PayloadTarget for Json<T> {
    fn populate(&mut self, bytes: &[u8]) -> Result<(), DecodeReason> {
        self.0 = Some(serde_json::from_slice(bytes)?);
        Ok(())
    }

    fn describe(&self) -> String {
        std::any::type_name::<T>().to_string()
    }
}
