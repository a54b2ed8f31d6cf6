//! Observation normalization
//!
//! Turns a form's raw `templateId → value` map into typed observation
//! records. Entries for unknown templates and blank values are dropped
//! silently: a partially filled form must not put empty observations into
//! the document.

use crate::models::{ObservationKind, ObservationRecord, ObservationTemplate, ObservationValue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Normalizer over one template catalog
pub struct ObservationNormalizer<'a> {
    templates: HashMap<&'a str, &'a ObservationTemplate>,
}

impl<'a> ObservationNormalizer<'a> {
    pub fn new(catalog: &'a [ObservationTemplate]) -> Self {
        Self {
            templates: catalog.iter().map(|t| (t.id.as_str(), t)).collect(),
        }
    }

    /// Normalize one image's raw observation map
    pub fn normalize(&self, raw: &Map<String, Value>) -> Vec<ObservationRecord> {
        raw.iter()
            .filter_map(|(template_id, raw_value)| {
                let Some(template) = self.templates.get(template_id.as_str()) else {
                    debug!(template_id = %template_id, "Skipping observation for unknown template");
                    return None;
                };
                let record = typed_value(template.kind, raw_value)
                    .and_then(|value| ObservationRecord::new(template.name.clone(), value));
                if record.is_none() {
                    debug!(
                        template_id = %template_id,
                        kind = ?template.kind,
                        "Skipping blank or inadmissible observation value"
                    );
                }
                record
            })
            .collect()
    }

    /// Normalize per-image raw maps for a batch of `image_count` images
    ///
    /// Every index in `0..image_count` gets an entry, empty when the image
    /// has no raw input. Indices outside the batch are ignored.
    pub fn normalize_batch(
        &self,
        image_count: usize,
        raw_by_index: &HashMap<usize, Map<String, Value>>,
    ) -> HashMap<usize, Vec<ObservationRecord>> {
        (0..image_count)
            .map(|index| {
                let records = raw_by_index
                    .get(&index)
                    .map(|raw| self.normalize(raw))
                    .unwrap_or_default();
                (index, records)
            })
            .collect()
    }
}

/// Interpret a raw value for the given kind
///
/// `null` and `""` stand for "not filled in". Numeric and boolean kinds only
/// admit values already of that JSON type; text accepts scalars.
fn typed_value(kind: ObservationKind, raw: &Value) -> Option<ObservationValue> {
    match (kind, raw) {
        (_, Value::Null) => None,
        (_, Value::String(s)) if s.is_empty() => None,
        (ObservationKind::Boolean, Value::Bool(b)) => Some(ObservationValue::Boolean(*b)),
        (ObservationKind::Numeric, Value::Number(n)) => n.as_f64().map(ObservationValue::Numeric),
        (ObservationKind::Text, Value::String(s)) => Some(ObservationValue::Text(s.clone())),
        (ObservationKind::Text, Value::Number(n)) => Some(ObservationValue::Text(n.to_string())),
        (ObservationKind::Text, Value::Bool(b)) => Some(ObservationValue::Text(b.to_string())),
        _ => None,
    }
}
