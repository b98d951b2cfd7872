//! JSON and hex encodings for anything serde can handle.
//!
//! The hex form is hex-encoded compact JSON, convenient for pasting a genome
//! into a terminal or a database column.

use crate::error::{IoError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

fn to_json_pretty<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {e}")))
}

pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }
    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {e}")))
}

pub fn from_hex<T: DeserializeOwned>(hex_str: &str) -> Result<T> {
    let hex_str = hex_str.trim();
    if hex_str.is_empty() {
        return Err(IoError::validation("Empty hex string"));
    }
    let bytes = hex::decode(hex_str)
        .map_err(|e| IoError::validation(format!("Invalid hex encoding: {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| IoError::validation(format!("Invalid UTF-8 in hex: {e}")))?;
    from_json(&json)
}

pub fn write_json_file<T: Serialize, P: AsRef<Path>>(data: &T, path: P) -> Result<()> {
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })
}
