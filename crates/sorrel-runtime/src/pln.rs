//! Registration hooks for the external PLN serialiser.
//!
//! The textual PLN format is owned by an external collaborator; the
//! runtime only holds one registered encoder/decoder pair and routes
//! `.pln` file reads through it. Without a registered codec the
//! operations fail with the serialisation error classes, which `try`
//! does not intercept.

use std::path::Path;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::{Result, RuntimeError};
use crate::value::Value;

/// Encodes a value to PLN text.
pub type PlnEncodeFn = fn(&Value) -> Result<String>;
/// Decodes PLN text to a value.
pub type PlnDecodeFn = fn(&str) -> Result<Value>;

static CODEC: Lazy<RwLock<Option<(PlnEncodeFn, PlnDecodeFn)>>> = Lazy::new(|| RwLock::new(None));

/// Registers the process-wide PLN codec; a later registration replaces an
/// earlier one.
pub fn register_codec(encode: PlnEncodeFn, decode: PlnDecodeFn) {
    if let Ok(mut slot) = CODEC.write() {
        *slot = Some((encode, decode));
    }
}

/// Encodes a value through the registered codec.
pub fn encode(value: &Value) -> Result<String> {
    match CODEC.read().ok().and_then(|slot| *slot) {
        Some((encode, _)) => encode(value),
        None => Err(RuntimeError::serialize("no PLN serialiser registered")),
    }
}

/// Decodes PLN text through the registered codec.
pub fn decode(text: &str) -> Result<Value> {
    match CODEC.read().ok().and_then(|slot| *slot) {
        Some((_, decode)) => decode(text),
        None => Err(RuntimeError::deserialize("no PLN deserialiser registered")),
    }
}

/// Reads and decodes a `.pln` file.
pub fn read_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| RuntimeError::io(format!("cannot read {}: {err}", path.display())))?;
    decode(&text)
}
