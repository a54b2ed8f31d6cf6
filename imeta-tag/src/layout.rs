//! Output layout for persisted images
//!
//! Processed images are stored as
//! `<root>/<organization>/<project>/<station>/images/<image id>.<ext>`.
//! This module only computes names; writing files is up to the caller.

use crate::error::{Error, Result};
use crate::models::{ImageMetadataDocument, ProjectContext};
use std::path::{Path, PathBuf};

/// Leaf directory holding the images of one station
pub const IMAGES_DIR: &str = "images";

const DEFAULT_EXTENSION: &str = "jpg";

/// Replace characters invalid in file names with `_` and trim
///
/// Returns `None` when nothing is left.
pub fn sanitize_segment(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();
    let trimmed = sanitized.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Sanitized directory segments for one project context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub organization: String,
    pub project: String,
    pub station: String,
}

impl OutputLayout {
    pub fn for_context(context: &ProjectContext) -> Result<Self> {
        let segment = |value: &str, field: &'static str| {
            sanitize_segment(value).ok_or(Error::InvalidContext { field })
        };
        Ok(Self {
            organization: segment(&context.organization_name, "organizationName")?,
            project: segment(&context.project_name, "projectName")?,
            station: segment(&context.inspection_station, "inspectionStation")?,
        })
    }

    /// Path segments below the output root, ending in [`IMAGES_DIR`]
    pub fn segments(&self) -> [&str; 4] {
        [
            self.organization.as_str(),
            self.project.as_str(),
            self.station.as_str(),
            IMAGES_DIR,
        ]
    }

    pub fn images_dir(&self, root: &Path) -> PathBuf {
        self.segments()
            .iter()
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

/// `<image id>.<original extension>`, defaulting to `.jpg`
pub fn output_file_name(document: &ImageMetadataDocument, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EXTENSION);
    format!("{}.{}", document.image.id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageInfo, ProjectInfo};
    use serde_json::Map;

    fn document(id: &str) -> ImageMetadataDocument {
        ImageMetadataDocument {
            version: "1.0".to_string(),
            organization: "Acme".to_string(),
            project: ProjectInfo::default(),
            image: ImageInfo {
                id: id.to_string(),
                ..Default::default()
            },
            observations: Map::new(),
            custom_fields: Map::new(),
        }
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("  Acme / Line:4 ").as_deref(), Some("Acme _ Line_4"));
        assert_eq!(sanitize_segment(r#"a<b>c"d\e|f?g*"#).as_deref(), Some("a_b_c_d_e_f_g_"));
        assert_eq!(sanitize_segment("   "), None);
    }

    #[test]
    fn test_images_dir() {
        let layout = OutputLayout::for_context(&ProjectContext::new("Acme Corp", "P/1", "S1", "C1"))
            .unwrap();
        assert_eq!(
            layout.images_dir(Path::new("/out")),
            PathBuf::from("/out/Acme Corp/P_1/S1/images")
        );
    }

    #[test]
    fn test_blank_segment_rejected() {
        let err = OutputLayout::for_context(&ProjectContext::new("Acme", " ", "S1", "C1")).unwrap_err();
        assert!(matches!(err, Error::InvalidContext { field: "projectName" }));
    }

    #[test]
    fn test_output_file_name_keeps_extension() {
        assert_eq!(output_file_name(&document("img-001"), "photo.PNG"), "img-001.PNG");
        assert_eq!(output_file_name(&document("img-002"), "noext"), "img-002.jpg");
    }
}
