//! Reconciliation of decoded payloads into the current document shape
//!
//! Three payload shapes exist in the wild:
//! - current: nested document with `image_metadata`, `project`, `organization`
//! - legacy flat: one flat object keyed by `id` and `organisationName`
//! - anything else: an unrecognized but well-formed JSON object
//!
//! Every shape yields a document. Unrecognized payloads are kept whole under
//! `observations` rather than discarded.

use super::document_builder::{
    DEFAULT_CATEGORY, DEFAULT_ORGANIZATION_TYPE, DEFAULT_PHASE, STATUS_PROCESSED,
};
use crate::models::{ImageDescriptor, ImageInfo, ImageMetadataDocument, ProjectInfo, DOCUMENT_VERSION};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const UNKNOWN_ORGANIZATION: &str = "Unknown";
const UNKNOWN_PROJECT: &str = "Unknown Project";
const UNKNOWN_STATION: &str = "Unknown Station";
const UNKNOWN_CAMERA: &str = "Unknown Camera";
const STATUS_UNKNOWN: &str = "unknown";

/// Payload classified by its top-level keys
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    Current(Map<String, Value>),
    LegacyFlat(Map<String, Value>),
    Unknown(Map<String, Value>),
}

impl PayloadShape {
    pub fn classify(payload: Map<String, Value>) -> Self {
        if ["image_metadata", "project", "organization"]
            .iter()
            .all(|key| has_value(&payload, key))
        {
            Self::Current(payload)
        } else if has_value(&payload, "id") && has_value(&payload, "organisationName") {
            Self::LegacyFlat(payload)
        } else {
            Self::Unknown(payload)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Current(_) => "current",
            Self::LegacyFlat(_) => "legacy-flat",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// A key counts as present unless missing, null, false, or an empty string
fn has_value(payload: &Map<String, Value>, key: &str) -> bool {
    match payload.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Map a parsed payload to a document; never fails
pub fn reconcile(
    payload: Map<String, Value>,
    source: &ImageDescriptor,
    now: DateTime<Utc>,
) -> ImageMetadataDocument {
    let shape = PayloadShape::classify(payload);
    debug!(image = %source.name, shape = shape.name(), "Reconciling embedded payload");

    match shape {
        PayloadShape::Current(payload) => {
            match serde_json::from_value::<ImageMetadataDocument>(Value::Object(payload.clone())) {
                Ok(document) => document,
                Err(e) => {
                    warn!(
                        image = %source.name,
                        error = %e,
                        "Current-shape payload does not fit the document model, preserving as unknown"
                    );
                    from_unknown(payload, source, now)
                }
            }
        }
        PayloadShape::LegacyFlat(payload) => from_legacy(payload, source, now),
        PayloadShape::Unknown(payload) => {
            warn!(image = %source.name, keys = payload.len(), "Unknown metadata format, preserving as observations");
            from_unknown(payload, source, now)
        }
    }
}

fn string_or(payload: &Map<String, Value>, key: &str, default: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Legacy `timestamp`: RFC 3339 text or epoch milliseconds
fn legacy_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn from_legacy(
    payload: Map<String, Value>,
    source: &ImageDescriptor,
    now: DateTime<Utc>,
) -> ImageMetadataDocument {
    let timestamp = legacy_timestamp(payload.get("timestamp")).unwrap_or_else(|| {
        if payload.contains_key("timestamp") {
            warn!(image = %source.name, "Unparseable legacy timestamp, using current time");
        }
        now
    });

    let observations = match payload.get("observations") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            warn!(image = %source.name, "Legacy observations are not an object, keeping under \"value\"");
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), other.clone());
            wrapped
        }
    };

    let image_id = match payload.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => source.name.clone(),
    };

    ImageMetadataDocument {
        version: DOCUMENT_VERSION.to_string(),
        organization: string_or(&payload, "organisationName", UNKNOWN_ORGANIZATION),
        project: ProjectInfo {
            id: format!("PROJ-{}-legacy", now.timestamp_millis()),
            name: string_or(&payload, "projectName", UNKNOWN_PROJECT),
            phase: DEFAULT_PHASE.to_string(),
            inspection_station: string_or(&payload, "inspectionStation", UNKNOWN_STATION),
            camera_name: string_or(&payload, "cameraName", UNKNOWN_CAMERA),
            organization_type: DEFAULT_ORGANIZATION_TYPE.to_string(),
        },
        image: ImageInfo {
            id: image_id,
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            status: STATUS_PROCESSED.to_string(),
            created_at: timestamp,
            last_modified: timestamp,
            title: Some(string_or(&payload, "imageFile", &source.name)),
            description: Some(String::new()),
            original_filename: source.name.clone(),
            file_size_bytes: source.size_bytes,
            dimensions: None,
        },
        observations,
        custom_fields: Map::new(),
    }
}

fn from_unknown(
    payload: Map<String, Value>,
    source: &ImageDescriptor,
    now: DateTime<Utc>,
) -> ImageMetadataDocument {
    ImageMetadataDocument {
        version: DOCUMENT_VERSION.to_string(),
        organization: UNKNOWN_ORGANIZATION.to_string(),
        project: ProjectInfo {
            id: format!("PROJ-{}-unknown", now.timestamp_millis()),
            name: UNKNOWN_PROJECT.to_string(),
            phase: DEFAULT_PHASE.to_string(),
            inspection_station: UNKNOWN_STATION.to_string(),
            camera_name: UNKNOWN_CAMERA.to_string(),
            organization_type: DEFAULT_ORGANIZATION_TYPE.to_string(),
        },
        image: ImageInfo {
            id: source.name.clone(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            status: STATUS_UNKNOWN.to_string(),
            created_at: now,
            last_modified: now,
            title: Some(source.name.clone()),
            description: Some(String::new()),
            original_filename: source.name.clone(),
            file_size_bytes: source.size_bytes,
            dimensions: None,
        },
        observations: payload,
        custom_fields: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> ImageDescriptor {
        ImageDescriptor {
            name: "IMG_0042.jpg".to_string(),
            size_bytes: 5000,
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_classify_shapes() {
        let current = object(json!({"image_metadata": {}, "project": {}, "organization": "Acme"}));
        let legacy = object(json!({"id": "img-001", "organisationName": "Acme"}));
        let partial = object(json!({"project": {}, "organization": "Acme"}));

        assert!(matches!(PayloadShape::classify(current), PayloadShape::Current(_)));
        assert!(matches!(PayloadShape::classify(legacy), PayloadShape::LegacyFlat(_)));
        assert!(matches!(PayloadShape::classify(partial), PayloadShape::Unknown(_)));
        assert!(matches!(PayloadShape::classify(Map::new()), PayloadShape::Unknown(_)));
    }

    #[test]
    fn test_legacy_mapping() {
        let payload = object(json!({
            "id": "img-007",
            "organisationName": "Acme",
            "projectName": "P1",
            "inspectionStation": "S1",
            "cameraName": "C1",
            "imageFile": "weld.jpg",
            "timestamp": "2024-05-01T10:00:00.000Z",
            "observations": {"Temp": 42}
        }));

        let doc = reconcile(payload, &source(), now());

        assert_eq!(doc.organization, "Acme");
        assert_eq!(doc.project.name, "P1");
        assert_eq!(doc.project.inspection_station, "S1");
        assert_eq!(doc.project.camera_name, "C1");
        assert_eq!(doc.project.phase, "Image Classification");
        assert_eq!(doc.project.organization_type, "Industrial");
        assert!(doc.project.id.ends_with("-legacy"));
        assert_eq!(doc.image.id, "img-007");
        assert_eq!(doc.image.title.as_deref(), Some("weld.jpg"));
        assert_eq!(doc.image.category, "general");
        assert_eq!(doc.image.status, "processed");
        assert!(doc.image.tags.is_empty());
        assert_eq!(
            doc.image.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(doc.image.created_at, doc.image.last_modified);
        assert_eq!(doc.image.original_filename, "IMG_0042.jpg");
        assert_eq!(doc.image.file_size_bytes, 5000);
        assert_eq!(doc.observations["Temp"], json!(42));
    }

    #[test]
    fn test_legacy_missing_fields_default() {
        let payload = object(json!({"id": "img-001", "organisationName": "Acme"}));
        let doc = reconcile(payload, &source(), now());

        assert_eq!(doc.project.name, "Unknown Project");
        assert_eq!(doc.project.inspection_station, "Unknown Station");
        assert_eq!(doc.project.camera_name, "Unknown Camera");
        assert_eq!(doc.image.title.as_deref(), Some("IMG_0042.jpg"));
        assert_eq!(doc.image.created_at, now());
        assert!(doc.observations.is_empty());
    }

    #[test]
    fn test_legacy_epoch_millis_timestamp() {
        let payload = object(json!({
            "id": "img-001",
            "organisationName": "Acme",
            "timestamp": 1_700_000_000_000i64
        }));
        let doc = reconcile(payload, &source(), now());
        assert_eq!(doc.image.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_unknown_shape_preserves_everything() {
        let payload = object(json!({"camera": {"iso": 200}, "note": "hand edited"}));
        let doc = reconcile(payload.clone(), &source(), now());

        assert_eq!(doc.organization, "Unknown");
        assert_eq!(doc.image.status, "unknown");
        assert_eq!(doc.image.id, "IMG_0042.jpg");
        assert_eq!(doc.image.title.as_deref(), Some("IMG_0042.jpg"));
        assert_eq!(doc.observations, payload);
    }

    #[test]
    fn test_ill_typed_current_shape_falls_back_to_unknown() {
        let payload = object(json!({
            "organization": "Acme",
            "project": {"name": "P1"},
            "image_metadata": {"tags": "not-a-list"}
        }));
        let doc = reconcile(payload.clone(), &source(), now());

        assert_eq!(doc.organization, "Unknown");
        assert_eq!(doc.observations, payload);
    }
}
