//! JPEG APP1 splicing
//!
//! Walks the marker segments before the scan data, drops any existing Exif
//! APP1 segment, and inserts a new one right after SOI (or after a leading
//! JFIF APP0). Everything from SOS onwards is copied verbatim.

use super::TagError;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

/// Identifier that starts an Exif APP1 payload
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Largest APP1 payload: segment length is a u16 that counts itself
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// One marker segment, including its `FF xx` marker bytes
#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    marker: u8,
    bytes: &'a [u8],
}

impl Segment<'_> {
    fn is_exif(&self) -> bool {
        self.marker == APP1 && self.bytes.get(4..4 + EXIF_HEADER.len()) == Some(EXIF_HEADER)
    }
}

pub fn is_jpeg(image: &[u8]) -> bool {
    image.len() >= 2 && image[0] == 0xFF && image[1] == SOI
}

/// Split the header segments from the scan data that follows them
fn split_segments(image: &[u8]) -> Result<(Vec<Segment<'_>>, &[u8]), TagError> {
    if !is_jpeg(image) {
        return Err(TagError::UnsupportedImage(
            "missing JPEG start-of-image marker".to_string(),
        ));
    }

    let mut segments = Vec::new();
    let mut pos = 2;
    loop {
        if pos == image.len() {
            return Ok((segments, &image[pos..]));
        }
        if pos + 2 > image.len() {
            return Err(TagError::Malformed(format!("truncated marker at offset {}", pos)));
        }
        if image[pos] != 0xFF {
            return Err(TagError::Malformed(format!(
                "expected marker at offset {}, found 0x{:02X}",
                pos, image[pos]
            )));
        }

        let marker = image[pos + 1];
        match marker {
            // Fill byte before a marker
            0xFF => {
                pos += 1;
            }
            SOS | EOI => return Ok((segments, &image[pos..])),
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                segments.push(Segment {
                    marker,
                    bytes: &image[pos..pos + 2],
                });
                pos += 2;
            }
            _ => {
                if pos + 4 > image.len() {
                    return Err(TagError::Malformed(format!(
                        "truncated segment length at offset {}",
                        pos
                    )));
                }
                let length = u16::from_be_bytes([image[pos + 2], image[pos + 3]]) as usize;
                let end = pos + 2 + length;
                if length < 2 || end > image.len() {
                    return Err(TagError::Malformed(format!(
                        "segment 0x{:02X} at offset {} overruns image",
                        marker, pos
                    )));
                }
                segments.push(Segment {
                    marker,
                    bytes: &image[pos..end],
                });
                pos = end;
            }
        }
    }
}

/// Build a complete Exif APP1 segment around raw TIFF bytes
pub fn exif_segment(tiff: &[u8]) -> Result<Vec<u8>, TagError> {
    let payload_len = EXIF_HEADER.len() + tiff.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(TagError::SegmentTooLarge {
            size: payload_len,
            max: MAX_SEGMENT_PAYLOAD,
        });
    }

    let mut segment = Vec::with_capacity(4 + payload_len);
    segment.extend_from_slice(&[0xFF, APP1]);
    segment.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(tiff);
    Ok(segment)
}

/// Replace the Exif APP1 segment of `image` with one carrying `tiff`
pub fn splice_exif(tiff: &[u8], image: &[u8]) -> Result<Vec<u8>, TagError> {
    let new_segment = exif_segment(tiff)?;
    let (segments, rest) = split_segments(image)?;

    let kept: Vec<Segment<'_>> = segments.into_iter().filter(|s| !s.is_exif()).collect();
    let insert_at = kept.iter().take_while(|s| s.marker == APP0).count();

    let mut out = Vec::with_capacity(image.len() + new_segment.len());
    out.extend_from_slice(&[0xFF, SOI]);
    for segment in &kept[..insert_at] {
        out.extend_from_slice(segment.bytes);
    }
    out.extend_from_slice(&new_segment);
    for segment in &kept[insert_at..] {
        out.extend_from_slice(segment.bytes);
    }
    out.extend_from_slice(rest);
    Ok(out)
}
