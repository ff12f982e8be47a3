use serde_json::{Number, Value};
use tracing::debug;

use crate::codec::Es3Codec;
use crate::error::DocumentError;
use crate::format::serialize;
use crate::save::{InputFormat, SaveKind};

/// A loaded save file: its kind plus the order-preserving JSON tree
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDocument {
    kind: SaveKind,
    root: Value,
}

impl SaveDocument {
    pub fn new(kind: SaveKind, root: Value) -> Self {
        Self { kind, root }
    }

    /// Load from raw file contents, picking decode or plain JSON by name
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_bytes_with(&Es3Codec::default(), file_name, bytes)
    }

    pub fn from_bytes_with(
        codec: &Es3Codec,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Self, DocumentError> {
        let kind = SaveKind::from_file_name(file_name);
        let root = match InputFormat::from_file_name(file_name)? {
            InputFormat::Es3 => {
                let text = codec.decode(bytes)?;
                serde_json::from_str(&text)?
            }
            InputFormat::Json => serde_json::from_slice(bytes)?,
        };

        debug!(file_name, kind = kind.label(), "loaded save document");
        Ok(Self { kind, root })
    }

    pub fn from_json_str(kind: SaveKind, text: &str) -> Result<Self, DocumentError> {
        Ok(Self {
            kind,
            root: serde_json::from_str(text)?,
        })
    }

    pub fn kind(&self) -> SaveKind {
        self.kind
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Looks up a dotted path; numeric segments index into arrays
    ///
    /// `playerInfo.value.itemsInInvSlots.3`
    pub fn get(&self, path: &str) -> Result<&Value, DocumentError> {
        self.root
            .pointer(&to_pointer(path))
            .ok_or_else(|| DocumentError::PathNotFound(path.to_string()))
    }

    pub fn get_mut(&mut self, path: &str) -> Result<&mut Value, DocumentError> {
        self.root
            .pointer_mut(&to_pointer(path))
            .ok_or_else(|| DocumentError::PathNotFound(path.to_string()))
    }

    /// Replaces an existing value and returns the old one
    ///
    /// Never creates keys, so the layout of the file stays the same.
    pub fn set(&mut self, path: &str, value: Value) -> Result<Value, DocumentError> {
        let slot = self.get_mut(path)?;
        Ok(std::mem::replace(slot, value))
    }

    /// Replaces a value from user text, keeping the JSON type it had
    ///
    /// Strings take the text as is, numbers and booleans must parse. Only
    /// arrays, objects and nulls accept a JSON literal.
    pub fn set_from_text(&mut self, path: &str, raw: &str) -> Result<Value, DocumentError> {
        let value = coerce_text(path, self.get(path)?, raw)?;
        self.set(path, value)
    }

    /// Text in the engine's own layout
    pub fn to_es3_text(&self) -> String {
        serialize(&self.root)
    }

    /// Encrypted bytes ready to drop into the save folder
    pub fn to_es3(&self, gzip: bool) -> Result<Vec<u8>, DocumentError> {
        self.to_es3_with(&Es3Codec::default(), gzip)
    }

    pub fn to_es3_with(&self, codec: &Es3Codec, gzip: bool) -> Result<Vec<u8>, DocumentError> {
        Ok(codec.encode(&self.to_es3_text(), gzip)?)
    }

    /// Plain 2-space JSON for reading, not for the game
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }
}

fn coerce_text(path: &str, old: &Value, raw: &str) -> Result<Value, DocumentError> {
    let invalid = |expected| DocumentError::InvalidValue {
        path: path.to_string(),
        expected,
        input: raw.to_string(),
    };

    match old {
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Bool(_) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("true or false")),
        },
        Value::Number(n) => parse_number(raw.trim(), n.is_f64()).ok_or_else(|| invalid("a number")),
        Value::Null => {
            Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
        }
        Value::Array(_) | Value::Object(_) => {
            serde_json::from_str(raw).map_err(|_| invalid("a JSON literal"))
        }
    }
}

/// Integer fields stay integers when the text allows it; NaN and infinities
/// are rejected
fn parse_number(raw: &str, was_float: bool) -> Option<Value> {
    if !was_float {
        if let Ok(i) = raw.parse::<i64>() {
            return Some(Value::from(i));
        }
    }
    let f: f64 = raw.parse().ok()?;
    if !f.is_finite() {
        return None;
    }
    Number::from_f64(f).map(Value::Number)
}

/// `a.b.0` -> `/a/b/0` (RFC 6901)
fn to_pointer(path: &str) -> String {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}
