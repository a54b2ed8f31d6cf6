//! EXIF tag backend using kamadak-exif
//!
//! Parsing goes through `exif::Reader` (JPEG, TIFF, PNG, HEIF and WebP
//! containers). Writing serializes fields with `exif::experimental::Writer`
//! and splices the result into JPEG images only.

use super::jpeg;
use super::{ParseOptions, Section, TagBackend, TagContainer, TagError, TagKey, TagValue, USER_COMMENT};
use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Reader, SRational, Tag, Value};
use std::io::Cursor;
use tracing::{debug, warn};

/// Eight-byte character-code prefixes defined for `UserComment`
const CHARSET_HEADERS: [&[u8; 8]; 4] = [
    b"ASCII\0\0\0",
    b"UNICODE\0",
    b"JIS\0\0\0\0\0",
    b"\0\0\0\0\0\0\0\0",
];

/// Production tag backend for EXIF containers
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifBackend;

impl ExifBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TagBackend for ExifBackend {
    fn parse_container(&self, image: &[u8], options: ParseOptions) -> Result<TagContainer, TagError> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(image))
            .map_err(|e| match e {
                exif::Error::NotFound(_) => TagError::NotFound,
                other => TagError::Malformed(other.to_string()),
            })?;

        let mut container = TagContainer::empty();
        for field in exif.fields() {
            let Some(section) = section_of(field) else {
                debug!(tag = %field.tag, ifd = field.ifd_num.index(), "Skipping field outside primary/thumbnail IFDs");
                continue;
            };

            let is_comment = section == Section::Exif && field.tag.number() == USER_COMMENT;
            if is_comment && !options.user_comment {
                continue;
            }

            let value = match (&field.value, is_comment) {
                (Value::Undefined(bytes, _), true) => comment_value(bytes, options.sanitize),
                (value, _) => match from_exif_value(value) {
                    Some(v) => v,
                    None => {
                        debug!(tag = %field.tag, "Skipping field with unknown value type");
                        continue;
                    }
                },
            };
            let value = match value {
                TagValue::Text(text) if options.sanitize => TagValue::Text(sanitize_text(&text)),
                other => other,
            };

            let key = if options.translate_keys {
                TagKey::Name(field.tag.to_string())
            } else {
                TagKey::Number(field.tag.number())
            };
            container.insert(section, key, value);
        }

        debug!(fields = container.len(), "Parsed EXIF container");
        Ok(container)
    }

    fn write_container(&self, container: &TagContainer) -> Result<Vec<u8>, TagError> {
        let mut fields = Vec::with_capacity(container.len());
        for (section, entries) in &container.sections {
            let context = match section {
                Section::Primary => Context::Tiff,
                Section::Exif => Context::Exif,
                Section::Gps => Context::Gps,
                Section::Interop => Context::Interop,
                Section::Thumbnail => {
                    if !entries.is_empty() {
                        warn!(fields = entries.len(), "Dropping thumbnail IFD fields");
                    }
                    continue;
                }
            };

            for (key, value) in entries {
                let TagKey::Number(number) = key else {
                    warn!(key = ?key, "Cannot write a tag identified only by name, skipping");
                    continue;
                };
                let is_comment = *section == Section::Exif && *number == USER_COMMENT;
                fields.push(Field {
                    tag: Tag(context, *number),
                    ifd_num: In::PRIMARY,
                    value: to_exif_value(value, is_comment),
                });
            }
        }
        if !container.top_level.is_empty() {
            debug!(fields = container.top_level.len(), "Top-level entries are not written");
        }

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer
            .write(&mut buf, false)
            .map_err(|e| TagError::Write(e.to_string()))?;
        Ok(buf.into_inner())
    }

    fn splice_into_image(&self, tag_bytes: &[u8], image: &[u8]) -> Result<Vec<u8>, TagError> {
        jpeg::splice_exif(tag_bytes, image)
    }
}

fn section_of(field: &Field) -> Option<Section> {
    if field.ifd_num == In::THUMBNAIL {
        return Some(Section::Thumbnail);
    }
    if field.ifd_num != In::PRIMARY {
        return None;
    }
    match field.tag.context() {
        Context::Tiff => Some(Section::Primary),
        Context::Exif => Some(Section::Exif),
        Context::Gps => Some(Section::Gps),
        Context::Interop => Some(Section::Interop),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Classify a `UserComment` payload
///
/// A payload with a character-code prefix, or one that is not UTF-8, is
/// reported as raw bytes. Anything else was written verbatim and is text.
/// With `sanitize`, the prefix is decoded away instead.
fn comment_value(bytes: &[u8], sanitize: bool) -> TagValue {
    let has_header = bytes.len() >= 8 && CHARSET_HEADERS.iter().any(|h| &bytes[..8] == h.as_slice());
    if has_header {
        if sanitize {
            return TagValue::Text(String::from_utf8_lossy(&bytes[8..]).to_string());
        }
        return TagValue::Bytes(bytes.to_vec());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => TagValue::Text(text.to_string()),
        Err(_) => TagValue::Bytes(bytes.to_vec()),
    }
}

fn sanitize_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

fn from_exif_value(value: &Value) -> Option<TagValue> {
    let converted = match value {
        Value::Byte(v) => TagValue::U8(v.clone()),
        Value::Ascii(parts) => TagValue::Text(
            parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).to_string())
                .collect::<Vec<_>>()
                .join("\0"),
        ),
        Value::Short(v) => TagValue::U16(v.clone()),
        Value::Long(v) => TagValue::U32(v.clone()),
        Value::Rational(v) => TagValue::URational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::SByte(v) => TagValue::I8(v.clone()),
        Value::Undefined(v, _) => TagValue::Bytes(v.clone()),
        Value::SShort(v) => TagValue::I16(v.clone()),
        Value::SLong(v) => TagValue::I32(v.clone()),
        Value::SRational(v) => TagValue::IRational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::Float(v) => TagValue::F32(v.clone()),
        Value::Double(v) => TagValue::F64(v.clone()),
        _ => return None,
    };
    Some(converted)
}

/// Convert back to an EXIF value
///
/// Text in the comment slot is written verbatim as UNDEFINED bytes, with no
/// character-code prefix.
fn to_exif_value(value: &TagValue, is_comment: bool) -> Value {
    match value {
        TagValue::Text(text) if is_comment => Value::Undefined(text.as_bytes().to_vec(), 0),
        TagValue::Text(text) => Value::Ascii(text.split('\0').map(|p| p.as_bytes().to_vec()).collect()),
        TagValue::Bytes(v) => Value::Undefined(v.clone(), 0),
        TagValue::U8(v) => Value::Byte(v.clone()),
        TagValue::U16(v) => Value::Short(v.clone()),
        TagValue::U32(v) => Value::Long(v.clone()),
        TagValue::URational(v) => Value::Rational(
            v.iter().map(|&(num, denom)| Rational { num, denom }).collect(),
        ),
        TagValue::I8(v) => Value::SByte(v.clone()),
        TagValue::I16(v) => Value::SShort(v.clone()),
        TagValue::I32(v) => Value::SLong(v.clone()),
        TagValue::IRational(v) => Value::SRational(
            v.iter().map(|&(num, denom)| SRational { num, denom }).collect(),
        ),
        TagValue::F32(v) => Value::Float(v.clone()),
        TagValue::F64(v) => Value::Double(v.clone()),
    }
}
