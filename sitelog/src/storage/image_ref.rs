//! Image references stored on posts
//!
//! A post image is either inline data (a `data:` URI from before the blob
//! store existed), a blob store identifier, or some other legacy value.
//! The kind is decided once when the record is deserialized.

use crate::config::{BLOB_ID_PREFIX, INLINE_IMAGE_PREFIX};
use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One entry of a post's image sequence.
///
/// String entries serialize back to exactly the string they were parsed
/// from. Non-string entries become `Unknown` holding their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ImageRef {
    Inline(InlineImage),
    Blob(String),
    Unknown(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Inline(inline) => inline.as_str(),
            ImageRef::Blob(id) | ImageRef::Unknown(id) => id,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageRef::Inline(_))
    }

    pub fn blob_id(&self) -> Option<&str> {
        match self {
            ImageRef::Blob(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Classify an arbitrary JSON value found where an image was expected
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(raw) => ImageRef::from(raw),
            other => ImageRef::Unknown(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(ImageRef::from_json)
    }
}

impl From<String> for ImageRef {
    fn from(raw: String) -> Self {
        if raw.starts_with(INLINE_IMAGE_PREFIX) {
            ImageRef::Inline(InlineImage { raw })
        } else if raw.starts_with(BLOB_ID_PREFIX) {
            ImageRef::Blob(raw)
        } else {
            ImageRef::Unknown(raw)
        }
    }
}

impl From<&str> for ImageRef {
    fn from(raw: &str) -> Self {
        ImageRef::from(raw.to_string())
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        match image {
            ImageRef::Inline(inline) => inline.raw,
            ImageRef::Blob(id) | ImageRef::Unknown(id) => id,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Inline payloads can be megabytes long
            ImageRef::Inline(inline) => write!(f, "inline {} image", inline.mime_type()),
            ImageRef::Blob(id) | ImageRef::Unknown(id) => f.write_str(id),
        }
    }
}

/// Inline-encoded image, kept as the original `data:` URI text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    raw: String,
}

impl InlineImage {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Media type declared in the URI header, `text/plain` when omitted
    pub fn mime_type(&self) -> &str {
        let header = self.header();
        let mime = header.split(';').next().unwrap_or_default();
        if mime.is_empty() {
            "text/plain"
        } else {
            mime
        }
    }

    /// Decode the payload to raw bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        let body = &self.raw[INLINE_IMAGE_PREFIX.len()..];
        let (header, payload) = body
            .split_once(',')
            .ok_or_else(|| AppError::InvalidImageData("data URI has no payload".to_string()))?;

        if header.ends_with(";base64") {
            let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| AppError::InvalidImageData(format!("bad base64 payload: {}", e)))
        } else {
            percent_decode(payload)
        }
    }

    fn header(&self) -> &str {
        let body = &self.raw[INLINE_IMAGE_PREFIX.len()..];
        body.split_once(',').map(|(header, _)| header).unwrap_or(body)
    }
}

fn percent_decode(payload: &str) -> Result<Vec<u8>> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = payload
                .get(i + 1..i + 3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    AppError::InvalidImageData(format!("bad percent escape at offset {}", i))
                })?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(out)
}
