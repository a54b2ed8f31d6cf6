//! Binary tag container boundary
//!
//! The codec never touches EXIF structures directly. It talks to a
//! [`TagBackend`], which parses an image's tag container into a
//! [`TagContainer`], serializes a container back to bytes, and splices those
//! bytes into the image. [`ExifBackend`] is the production implementation.

pub mod exif_backend;
pub mod jpeg;

pub use exif_backend::ExifBackend;

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// EXIF `UserComment` tag number
pub const USER_COMMENT: u16 = 0x9286;

/// Name under which backends that translate keys report `UserComment`
pub const USER_COMMENT_ALIAS: &str = "UserComment";

/// Tag library errors
#[derive(Debug, Error)]
pub enum TagError {
    /// The image has no tag container
    #[error("No tag container found")]
    NotFound,

    /// The image is not in a format the backend can rewrite
    #[error("Unsupported image format: {0}")]
    UnsupportedImage(String),

    /// Container or image structure is corrupt or truncated
    #[error("Malformed container: {0}")]
    Malformed(String),

    /// Serialized container does not fit in one image segment
    #[error("Tag segment too large: {size} bytes (max {max})")]
    SegmentTooLarge { size: usize, max: usize },

    /// Serializing the container failed
    #[error("Failed to write tag container: {0}")]
    Write(String),
}

/// Sub-section of a tag container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// IFD0 (`0th`)
    Primary,
    /// Exif sub-IFD, where `UserComment` lives
    Exif,
    Gps,
    Interop,
    /// IFD1 (`1st`)
    Thumbnail,
}

impl Section {
    /// Sections present in a freshly created container
    pub const STANDARD: [Section; 4] = [
        Section::Primary,
        Section::Exif,
        Section::Gps,
        Section::Thumbnail,
    ];
}

/// Tag key: raw tag number, or a translated name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKey {
    Number(u16),
    Name(String),
}

/// Tag value as reported by the backend
///
/// `Text` and `Bytes` cover the comment slot; the typed vectors carry every
/// other TIFF field type through a parse/write cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    /// UNDEFINED-typed opaque bytes
    Bytes(Vec<u8>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    URational(Vec<(u32, u32)>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    IRational(Vec<(i32, i32)>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TagValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Bytes(v) | Self::U8(v) => v.is_empty(),
            Self::U16(v) => v.is_empty(),
            Self::U32(v) => v.is_empty(),
            Self::URational(v) => v.is_empty(),
            Self::I8(v) => v.is_empty(),
            Self::I16(v) => v.is_empty(),
            Self::I32(v) => v.is_empty(),
            Self::IRational(v) => v.is_empty(),
            Self::F32(v) => v.is_empty(),
            Self::F64(v) => v.is_empty(),
        }
    }
}

/// Generic text coercion: comma-separated elements
impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }
        fn join_ratio<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[(T, T)]) -> fmt::Result {
            for (i, (num, denom)) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}/{}", num, denom)?;
            }
            Ok(())
        }

        match self {
            Self::Text(s) => f.write_str(s),
            Self::Bytes(v) | Self::U8(v) => join(f, v),
            Self::U16(v) => join(f, v),
            Self::U32(v) => join(f, v),
            Self::URational(v) => join_ratio(f, v),
            Self::I8(v) => join(f, v),
            Self::I16(v) => join(f, v),
            Self::I32(v) => join(f, v),
            Self::IRational(v) => join_ratio(f, v),
            Self::F32(v) => join(f, v),
            Self::F64(v) => join(f, v),
        }
    }
}

/// Parsed tag container
///
/// `top_level` holds entries a backend reports outside any section (merged
/// output); the EXIF backend leaves it empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagContainer {
    pub sections: BTreeMap<Section, BTreeMap<TagKey, TagValue>>,
    pub top_level: BTreeMap<TagKey, TagValue>,
}

impl TagContainer {
    /// Container with the standard sections present but empty
    pub fn empty() -> Self {
        Self {
            sections: Section::STANDARD
                .iter()
                .map(|s| (*s, BTreeMap::new()))
                .collect(),
            top_level: BTreeMap::new(),
        }
    }

    pub fn get(&self, section: Section, key: &TagKey) -> Option<&TagValue> {
        self.sections.get(&section).and_then(|entries| entries.get(key))
    }

    pub fn insert(&mut self, section: Section, key: TagKey, value: TagValue) {
        self.sections.entry(section).or_default().insert(key, value);
    }

    pub fn remove(&mut self, section: Section, key: &TagKey) -> Option<TagValue> {
        self.sections.get_mut(&section).and_then(|entries| entries.remove(key))
    }

    /// Number of tag entries across all sections and the top level
    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum::<usize>() + self.top_level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report the `UserComment` tag (skipped otherwise)
    pub user_comment: bool,
    /// Report tag names instead of raw tag numbers
    pub translate_keys: bool,
    /// Decode character-code prefixes and trim NULs/whitespace from text
    pub sanitize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            user_comment: false,
            translate_keys: true,
            sanitize: true,
        }
    }
}

impl ParseOptions {
    /// Raw numeric keys, untouched values, comment included
    pub fn raw() -> Self {
        Self {
            user_comment: true,
            translate_keys: false,
            sanitize: false,
        }
    }
}

/// Binary tag library
pub trait TagBackend {
    /// Parse the tag container embedded in `image`
    fn parse_container(&self, image: &[u8], options: ParseOptions) -> Result<TagContainer, TagError>;

    /// Serialize a container to its on-image byte form
    fn write_container(&self, container: &TagContainer) -> Result<Vec<u8>, TagError>;

    /// Replace the tag container in `image` with `tag_bytes`
    fn splice_into_image(&self, tag_bytes: &[u8], image: &[u8]) -> Result<Vec<u8>, TagError>;
}

impl<T: TagBackend + ?Sized> TagBackend for &T {
    fn parse_container(&self, image: &[u8], options: ParseOptions) -> Result<TagContainer, TagError> {
        (**self).parse_container(image, options)
    }

    fn write_container(&self, container: &TagContainer) -> Result<Vec<u8>, TagError> {
        (**self).write_container(container)
    }

    fn splice_into_image(&self, tag_bytes: &[u8], image: &[u8]) -> Result<Vec<u8>, TagError> {
        (**self).splice_into_image(tag_bytes, image)
    }
}
