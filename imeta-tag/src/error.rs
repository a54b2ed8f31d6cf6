//! Error types for imeta-tag
//!
//! Write-path errors (`InvalidContext`, `PayloadTooLarge`, `EncodeIo`) abort a
//! batch, wrapped in `BatchAborted`. Read-path errors (`MalformedPayload`) are
//! reported per image. "No embedded document" is not an error on the read
//! path: decode returns `Ok(None)`.

use crate::tags::TagError;
use thiserror::Error;

/// Result type for metadata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Metadata codec and pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// A required project context field is empty
    #[error("Invalid project context: {field} is required")]
    InvalidContext { field: &'static str },

    /// Serialized document exceeds the comment slot ceiling
    #[error(
        "Metadata is too large ({size} bytes, limit {limit}). \
         Please reduce the amount of observation data."
    )]
    PayloadTooLarge { size: usize, limit: usize },

    /// Tag container could not be written or spliced back into the image
    #[error("Failed to embed metadata in {image}: {source}")]
    EncodeIo {
        image: String,
        #[source]
        source: TagError,
    },

    /// Comment tag looked like JSON but did not parse
    #[error("Embedded metadata in {image} is not valid JSON: {source}")]
    MalformedPayload {
        image: String,
        #[source]
        source: serde_json::Error,
    },

    /// One image failed during a batch; no results are returned
    #[error("Failed to process image \"{name}\" (index {index}): {source}")]
    BatchAborted {
        index: usize,
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Update requested on an image that carries no document
    #[error("No embedded metadata found in {image}")]
    NoDocument { image: String },

    /// Document serialization failed
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}
