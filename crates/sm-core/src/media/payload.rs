//! Local image payload domain model
//!
//! Represents the binary content of a locally attached image before it has
//! been confirmed by the remote catalog service.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// MIME type of an image payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MimeType(pub String);

/// MIME types the catalog service accepts for media uploads.
const SUPPORTED_IMAGE_MIMES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

impl MimeType {
    pub fn image_jpeg() -> Self {
        Self("image/jpeg".into())
    }

    pub fn image_png() -> Self {
        Self("image/png".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this MIME type is an accepted image upload type.
    pub fn is_supported_image(&self) -> bool {
        let normalized = self.0.trim().to_ascii_lowercase();
        SUPPORTED_IMAGE_MIMES.contains(&normalized.as_str())
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MimeType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MimeType(s.to_string()))
    }
}

/// Binary content of a locally attached image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    #[serde(
        serialize_with = "serialize_bytes",
        deserialize_with = "deserialize_bytes"
    )]
    content: Bytes,
    pub mime: MimeType,
    pub file_name: Option<String>,
}

impl ImagePayload {
    pub fn new(content: Bytes, mime: MimeType, file_name: Option<String>) -> Self {
        Self {
            content,
            mime,
            file_name,
        }
    }

    pub fn content(&self) -> Bytes {
        self.content.clone()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn serialize_bytes<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bytes(bytes)
}

fn deserialize_bytes<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
    Ok(Bytes::from(bytes))
}
