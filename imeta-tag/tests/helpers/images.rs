//! Minimal JPEG images for codec tests

use imeta_tag::tags::{Section, TagBackend, TagContainer, TagKey, TagValue, USER_COMMENT};
use imeta_tag::{ExifBackend, ProjectContext};

/// SOI, JFIF APP0, a one-component SOS with two entropy bytes, EOI
pub fn bare_jpeg() -> Vec<u8> {
    vec![
        0xFF, 0xD8, // SOI
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00, // APP0
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, // SOS
        0x12, 0x34, // scan data
        0xFF, 0xD9, // EOI
    ]
}

fn with_container(container: &TagContainer) -> Vec<u8> {
    let backend = ExifBackend::new();
    let tiff = backend.write_container(container).unwrap();
    backend.splice_into_image(&tiff, &bare_jpeg()).unwrap()
}

/// JPEG whose Exif block carries only a camera `Make`
pub fn jpeg_with_make(make: &str) -> Vec<u8> {
    let mut container = TagContainer::empty();
    container.insert(
        Section::Primary,
        TagKey::Number(0x010F),
        TagValue::Text(make.to_string()),
    );
    with_container(&container)
}

/// JPEG whose `UserComment` holds `comment` verbatim
pub fn jpeg_with_comment(comment: &str) -> Vec<u8> {
    let mut container = TagContainer::empty();
    container.insert(
        Section::Exif,
        TagKey::Number(USER_COMMENT),
        TagValue::Text(comment.to_string()),
    );
    with_container(&container)
}

/// JPEG whose `UserComment` holds raw bytes, e.g. with a charset prefix
pub fn jpeg_with_comment_bytes(comment: &[u8]) -> Vec<u8> {
    let mut container = TagContainer::empty();
    container.insert(
        Section::Exif,
        TagKey::Number(USER_COMMENT),
        TagValue::Bytes(comment.to_vec()),
    );
    with_container(&container)
}

pub fn sample_context() -> ProjectContext {
    ProjectContext::new("Acme Corp", "Line 4 QA", "Station A", "Basler-01")
}
