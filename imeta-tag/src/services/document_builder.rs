//! Metadata document construction
//!
//! Assembles the document embedded in one image from the batch's project
//! context and the image's normalized observations.

use crate::error::Result;
use crate::models::{
    ImageDescriptor, ImageInfo, ImageMetadataDocument, ObservationRecord, ProjectContext,
    ProjectInfo, DOCUMENT_VERSION,
};
use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde_json::Map;

pub const DEFAULT_PHASE: &str = "Image Classification";
pub const DEFAULT_ORGANIZATION_TYPE: &str = "Industrial";
pub const DEFAULT_CATEGORY: &str = "general";
pub const STATUS_PROCESSED: &str = "processed";

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 5;

/// Position-derived image id: index 0 → `img-001`
pub fn image_id(index: usize) -> String {
    format!("img-{:03}", index + 1)
}

/// `PROJ-<millis>-<5 random base36 chars>`
///
/// Only unique enough to tell projects apart in a browsable export.
pub fn generate_project_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("PROJ-{}-{}", now.timestamp_millis(), suffix)
}

/// Stateless document builder
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBuilder;

impl DocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the document for the image at `index` in its batch
    pub fn build(
        &self,
        context: &ProjectContext,
        image: &ImageDescriptor,
        index: usize,
        observations: &[ObservationRecord],
    ) -> Result<ImageMetadataDocument> {
        self.build_at(context, image, index, observations, Utc::now())
    }

    /// Build with an explicit creation time
    ///
    /// Timestamps are truncated to milliseconds.
    pub fn build_at(
        &self,
        context: &ProjectContext,
        image: &ImageDescriptor,
        index: usize,
        observations: &[ObservationRecord],
        now: DateTime<Utc>,
    ) -> Result<ImageMetadataDocument> {
        context.validate()?;
        let now = now.trunc_subsecs(3);

        // Later records with the same name overwrite earlier ones
        let mut flattened = Map::new();
        for record in observations {
            flattened.insert(record.name().to_string(), record.value().to_json());
        }

        Ok(ImageMetadataDocument {
            version: DOCUMENT_VERSION.to_string(),
            organization: context.organization_name.clone(),
            project: ProjectInfo {
                id: generate_project_id(now),
                name: context.project_name.clone(),
                phase: DEFAULT_PHASE.to_string(),
                inspection_station: context.inspection_station.clone(),
                camera_name: context.camera_name.clone(),
                organization_type: DEFAULT_ORGANIZATION_TYPE.to_string(),
            },
            image: ImageInfo {
                id: image_id(index),
                category: DEFAULT_CATEGORY.to_string(),
                tags: Vec::new(),
                status: STATUS_PROCESSED.to_string(),
                created_at: now,
                last_modified: now,
                title: Some(image.name.clone()),
                description: Some(String::new()),
                original_filename: image.name.clone(),
                file_size_bytes: image.size_bytes,
                dimensions: None,
            },
            observations: flattened,
            custom_fields: Map::new(),
        })
    }
}
