//! Inline media references.
//!
//! Generated artifacts are handed around as `data:` URIs so the store can
//! hold them as plain strings next to ordinary `https://` URLs.

use base64::prelude::*;

use crate::error::GenerationError;

/// Encode `bytes` as a `data:{mime};base64,...` URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Build a data URI from an already base64-encoded payload.
pub fn data_uri_from_base64(mime: &str, base64_data: &str) -> String {
    format!("data:{mime};base64,{base64_data}")
}

/// Split a base64 data URI into its mime type and still-encoded payload.
///
/// Returns `None` for anything that is not a base64 `data:` URI.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Decode a base64 data URI into its mime type and raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), GenerationError> {
    let (mime, payload) = split_data_uri(uri)
        .ok_or_else(|| GenerationError::Media("not a base64 data URI".to_string()))?;
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|e| GenerationError::Media(format!("bad base64 payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}

/// Decode a bare base64 string.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, GenerationError> {
    BASE64_STANDARD
        .decode(data)
        .map_err(|e| GenerationError::Media(format!("bad base64 payload: {e}")))
}
