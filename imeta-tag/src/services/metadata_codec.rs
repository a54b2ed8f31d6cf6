//! Metadata codec
//!
//! Encodes a document as JSON into the EXIF `UserComment` slot of an image
//! and recovers it again. Decoding is tolerant: it accepts text or
//! byte-prefixed comment values, padding, legacy document shapes, and
//! unrecognized JSON objects.
//!
//! # Example
//! ```rust,ignore
//! let codec = MetadataCodec::new(ExifBackend::new());
//! let tagged = codec.encode(&document, &image)?;
//! let decoded = codec.decode(&ImageFile::new("photo.jpg", tagged))?;
//! ```

use super::reconcile;
use crate::error::{Error, Result};
use crate::models::{DocumentPatch, ImageFile, ImageMetadataDocument, ProjectContext};
use crate::tags::{
    ExifBackend, ParseOptions, Section, TagBackend, TagContainer, TagKey, TagValue, USER_COMMENT,
    USER_COMMENT_ALIAS,
};
use chrono::{SubsecRound, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Hard ceiling on the serialized document, in UTF-8 bytes
pub const MAX_PAYLOAD_BYTES: usize = 65_000;

/// Length of the character-code prefix on byte-form comments
const CHARSET_PREFIX_LEN: usize = 8;

/// One place the comment value may be reported
struct CommentLocation {
    name: &'static str,
    find: fn(&TagContainer) -> Option<&TagValue>,
}

/// Tried in order; the first present, non-empty value wins
const COMMENT_LOCATIONS: [CommentLocation; 4] = [
    CommentLocation {
        name: "exif/number",
        find: exif_by_number,
    },
    CommentLocation {
        name: "exif/alias",
        find: exif_by_alias,
    },
    CommentLocation {
        name: "top-level/number",
        find: top_level_by_number,
    },
    CommentLocation {
        name: "top-level/alias",
        find: top_level_by_alias,
    },
];

fn exif_by_number(container: &TagContainer) -> Option<&TagValue> {
    container.get(Section::Exif, &TagKey::Number(USER_COMMENT))
}

fn exif_by_alias(container: &TagContainer) -> Option<&TagValue> {
    container.get(Section::Exif, &TagKey::Name(USER_COMMENT_ALIAS.to_string()))
}

fn top_level_by_number(container: &TagContainer) -> Option<&TagValue> {
    container.top_level.get(&TagKey::Number(USER_COMMENT))
}

fn top_level_by_alias(container: &TagContainer) -> Option<&TagValue> {
    container
        .top_level
        .get(&TagKey::Name(USER_COMMENT_ALIAS.to_string()))
}

fn locate_comment(container: &TagContainer) -> Option<(&'static str, &TagValue)> {
    COMMENT_LOCATIONS.iter().find_map(|location| {
        (location.find)(container)
            .filter(|value| !value.is_empty())
            .map(|value| (location.name, value))
    })
}

/// Normalize a raw comment value to text
///
/// Byte values longer than the prefix are assumed to carry the 8-byte
/// character-code prefix of the EXIF convention.
fn comment_text(value: &TagValue) -> String {
    match value {
        TagValue::Text(text) => text.clone(),
        TagValue::Bytes(bytes) | TagValue::U8(bytes) if bytes.len() > CHARSET_PREFIX_LEN => {
            String::from_utf8_lossy(&bytes[CHARSET_PREFIX_LEN..]).to_string()
        }
        TagValue::Bytes(bytes) | TagValue::U8(bytes) => String::from_utf8_lossy(bytes).to_string(),
        other => other.to_string(),
    }
}

fn clean_comment(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

fn looks_like_object(text: &str) -> bool {
    text.starts_with('{') && text.ends_with('}')
}

/// Stateless metadata codec over a tag backend
#[derive(Debug, Clone, Default)]
pub struct MetadataCodec<B = ExifBackend> {
    backend: B,
}

impl<B: TagBackend> MetadataCodec<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Embed `document` in `image`, returning the new image bytes
    ///
    /// An image without a usable tag container gets a fresh one. Fails with
    /// `PayloadTooLarge` above [`MAX_PAYLOAD_BYTES`] and `EncodeIo` when the
    /// container cannot be written back.
    pub fn encode(&self, document: &ImageMetadataDocument, image: &ImageFile) -> Result<Vec<u8>> {
        let json = serde_json::to_string_pretty(document)?;
        if json.len() > MAX_PAYLOAD_BYTES {
            return Err(Error::PayloadTooLarge {
                size: json.len(),
                limit: MAX_PAYLOAD_BYTES,
            });
        }

        let mut container = match self.backend.parse_container(&image.bytes, ParseOptions::raw()) {
            Ok(container) => container,
            Err(e) => {
                debug!(image = %image.name, reason = %e, "No usable tag container, starting fresh");
                TagContainer::empty()
            }
        };

        let payload_bytes = json.len();
        container.remove(Section::Exif, &TagKey::Name(USER_COMMENT_ALIAS.to_string()));
        container.insert(Section::Exif, TagKey::Number(USER_COMMENT), TagValue::Text(json));

        let encode_io = |source| Error::EncodeIo {
            image: image.name.clone(),
            source,
        };
        let tag_bytes = self.backend.write_container(&container).map_err(encode_io)?;
        let output = self
            .backend
            .splice_into_image(&tag_bytes, &image.bytes)
            .map_err(encode_io)?;

        debug!(
            image = %image.name,
            payload_bytes,
            output_bytes = output.len(),
            "Embedded metadata"
        );
        Ok(output)
    }

    /// Recover the embedded document, `Ok(None)` when there is none
    ///
    /// Only a comment that looks like a JSON object but fails to parse is an
    /// error (`MalformedPayload`).
    pub fn decode(&self, image: &ImageFile) -> Result<Option<ImageMetadataDocument>> {
        let container = match self.backend.parse_container(&image.bytes, ParseOptions::raw()) {
            Ok(container) => container,
            Err(e) => {
                debug!(image = %image.name, reason = %e, "No tag container");
                return Ok(None);
            }
        };

        let Some((location, raw)) = locate_comment(&container) else {
            debug!(image = %image.name, "No UserComment found");
            return Ok(None);
        };

        let text = clean_comment(&comment_text(raw));
        if !looks_like_object(&text) {
            warn!(
                image = %image.name,
                location,
                length = text.len(),
                "UserComment does not appear to be JSON"
            );
            return Ok(None);
        }

        let payload: Map<String, Value> =
            serde_json::from_str(&text).map_err(|source| Error::MalformedPayload {
                image: image.name.clone(),
                source,
            })?;

        debug!(image = %image.name, location, "Parsed embedded metadata");
        let now = Utc::now().trunc_subsecs(3);
        Ok(Some(reconcile::reconcile(payload, &image.descriptor(), now)))
    }

    /// Merge `patch` into the embedded document and re-embed it
    ///
    /// Returns the new image bytes and the merged document.
    pub fn update(
        &self,
        image: &ImageFile,
        patch: &DocumentPatch,
    ) -> Result<(Vec<u8>, ImageMetadataDocument)> {
        let mut document = self.decode(image)?.ok_or_else(|| Error::NoDocument {
            image: image.name.clone(),
        })?;

        document.apply_patch(patch, Utc::now().trunc_subsecs(3));
        let bytes = self.encode(&document, image)?;
        Ok((bytes, document))
    }

    /// True when a document can be recovered from `image`
    pub fn has_embedded_metadata(&self, image: &ImageFile) -> bool {
        matches!(self.decode(image), Ok(Some(_)))
    }

    /// Project context recorded in the embedded document
    pub fn project_context(&self, image: &ImageFile) -> Result<Option<ProjectContext>> {
        Ok(self.decode(image)?.map(|doc| ProjectContext {
            organization_name: doc.organization,
            project_name: doc.project.name,
            inspection_station: doc.project.inspection_station,
            camera_name: doc.project.camera_name,
        }))
    }
}
