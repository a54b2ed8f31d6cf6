//! Data models shared by the normalizer, builder, codec, and batch processor

pub mod document;
pub mod image;
pub mod observation;
pub mod project;

pub use document::{
    Dimensions, DocumentPatch, ImageInfo, ImageMetadataDocument, ImagePatch, ProjectInfo,
    ProjectPatch, DOCUMENT_VERSION,
};
pub use image::{ImageDescriptor, ImageFile};
pub use observation::{ObservationKind, ObservationRecord, ObservationTemplate, ObservationValue};
pub use project::ProjectContext;
