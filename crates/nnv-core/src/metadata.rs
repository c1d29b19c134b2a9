//! Vertex metadata and its snapshot payload.
//!
//! # Payload Format
//!
//! ```text
//! [count: u16] ([key len: u8] [key] [value len: u16] [JSON value])*
//! ```
//!
//! Entries are written in key order so equal maps encode to equal bytes.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::wire;

/// Open string-keyed map attached to a vertex. Opaque to the graph.
pub type Metadata = HashMap<String, Value>;

pub(crate) fn encode<W: Write>(w: &mut W, metadata: &Metadata) -> Result<()> {
    let count = u16::try_from(metadata.len())
        .map_err(|_| Error::Metadata(format!("too many entries: {}", metadata.len())))?;
    wire::write_u16(w, count)?;

    let mut keys: Vec<&String> = metadata.keys().collect();
    keys.sort_unstable();
    for key in keys {
        let key_len = u8::try_from(key.len())
            .map_err(|_| Error::Metadata(format!("key longer than 255 bytes: {key}")))?;
        let value = serde_json::to_vec(&metadata[key])
            .map_err(|e| Error::Metadata(format!("{key}: {e}")))?;
        let value_len = u16::try_from(value.len())
            .map_err(|_| Error::Metadata(format!("{key}: value larger than 65535 bytes")))?;

        wire::write_u8(w, key_len)?;
        w.write_all(key.as_bytes())?;
        wire::write_u16(w, value_len)?;
        w.write_all(&value)?;
    }
    Ok(())
}

pub(crate) fn decode<R: Read>(r: &mut R) -> Result<Metadata> {
    let count = wire::read_u16(r)?;
    let mut metadata = Metadata::with_capacity(usize::from(count));
    for _ in 0..count {
        let key_len = wire::read_u8(r)?;
        let mut key = vec![0u8; usize::from(key_len)];
        r.read_exact(&mut key)?;
        let key = String::from_utf8(key)
            .map_err(|_| Error::CorruptData("metadata key is not UTF-8".to_string()))?;

        let value_len = wire::read_u16(r)?;
        let mut value = vec![0u8; usize::from(value_len)];
        r.read_exact(&mut value)?;
        let value: Value = serde_json::from_slice(&value)
            .map_err(|e| Error::CorruptData(format!("metadata value for {key}: {e}")))?;

        if metadata.insert(key, value).is_some() {
            return Err(Error::CorruptData("duplicate metadata key".to_string()));
        }
    }
    Ok(metadata)
}

/// Approximate in-memory payload of a metadata map, in bytes.
#[must_use]
pub fn estimate_size(metadata: &Metadata) -> u64 {
    metadata
        .iter()
        .map(|(key, value)| key.len() as u64 + value_size(value))
        .sum()
}

fn value_size(value: &Value) -> u64 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len() as u64,
        Value::Array(items) => items.iter().map(value_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| k.len() as u64 + value_size(v))
            .sum(),
    }
}
