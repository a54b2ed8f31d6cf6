//! Canonical image metadata document
//!
//! The JSON produced here is the on-image format. Wire names follow the
//! format written since version 1.0: `image_metadata`, `created_date`,
//! `custom_fields` and so on. Readers ignore unknown keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document format version written by this release
pub const DOCUMENT_VERSION: &str = "1.0";

/// Metadata embedded in one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadataDocument {
    #[serde(default = "default_version")]
    pub version: String,
    pub organization: String,
    pub project: ProjectInfo,
    #[serde(rename = "image_metadata")]
    pub image: ImageInfo,
    /// Flattened observation name → value
    #[serde(default)]
    pub observations: Map<String, Value>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectInfo {
    /// Assigned once when the document is created
    pub id: String,
    pub name: String,
    pub phase: String,
    pub inspection_station: String,
    pub camera_name: String,
    pub organization_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInfo {
    /// Position-derived id, unique within a batch (`img-001`)
    pub id: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: String,
    #[serde(rename = "created_date")]
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub original_filename: String,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Partial update merged into an existing document
///
/// `project.id`, `image.id` and `created_date` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPatch {
    pub organization: Option<String>,
    pub project: Option<ProjectPatch>,
    #[serde(rename = "image_metadata")]
    pub image: Option<ImagePatch>,
    /// Replaces the observation map wholesale when present
    pub observations: Option<Map<String, Value>>,
    pub custom_fields: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub phase: Option<String>,
    pub inspection_station: Option<String>,
    pub camera_name: Option<String>,
    pub organization_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePatch {
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub dimensions: Option<Dimensions>,
}

impl ImageMetadataDocument {
    /// Merge `patch` into this document and refresh `last_modified`
    ///
    /// `last_modified` never moves before `created_at`, even when `now`
    /// comes from a clock behind the one that created the document.
    pub fn apply_patch(&mut self, patch: &DocumentPatch, now: DateTime<Utc>) {
        if let Some(organization) = &patch.organization {
            self.organization = organization.clone();
        }

        if let Some(project) = &patch.project {
            merge(&mut self.project.name, &project.name);
            merge(&mut self.project.phase, &project.phase);
            merge(&mut self.project.inspection_station, &project.inspection_station);
            merge(&mut self.project.camera_name, &project.camera_name);
            merge(&mut self.project.organization_type, &project.organization_type);
        }

        if let Some(image) = &patch.image {
            merge(&mut self.image.category, &image.category);
            merge(&mut self.image.tags, &image.tags);
            merge(&mut self.image.status, &image.status);
            if image.title.is_some() {
                self.image.title = image.title.clone();
            }
            if image.description.is_some() {
                self.image.description = image.description.clone();
            }
            if image.dimensions.is_some() {
                self.image.dimensions = image.dimensions;
            }
        }

        if let Some(observations) = &patch.observations {
            self.observations = observations.clone();
        }
        if let Some(custom_fields) = &patch.custom_fields {
            self.custom_fields = custom_fields.clone();
        }

        self.image.last_modified = now.max(self.image.created_at);
    }
}

fn merge<T: Clone>(target: &mut T, update: &Option<T>) {
    if let Some(value) = update {
        *target = value.clone();
    }
}
