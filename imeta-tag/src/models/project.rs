//! Project context shared by every image in a batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Organization and project a batch of images belongs to
///
/// All four fields are required and must be non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    #[serde(alias = "organisationName")]
    pub organization_name: String,
    pub project_name: String,
    pub inspection_station: String,
    pub camera_name: String,
}

impl ProjectContext {
    pub fn new(
        organization_name: impl Into<String>,
        project_name: impl Into<String>,
        inspection_station: impl Into<String>,
        camera_name: impl Into<String>,
    ) -> Self {
        Self {
            organization_name: organization_name.into(),
            project_name: project_name.into(),
            inspection_station: inspection_station.into(),
            camera_name: camera_name.into(),
        }
    }

    /// Fails with `InvalidContext` naming the first blank field
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("organizationName", &self.organization_name),
            ("projectName", &self.project_name),
            ("inspectionStation", &self.inspection_station),
            ("cameraName", &self.camera_name),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::InvalidContext { field });
            }
        }
        Ok(())
    }
}
