//! imeta-tag library interface
//!
//! Embeds inspection metadata documents in an image's EXIF comment tag and
//! recovers them again, including documents written by older releases.
//!
//! Forward path: raw observation inputs → [`ObservationNormalizer`] →
//! [`DocumentBuilder`] → [`MetadataCodec::encode`]. Reverse path: image bytes
//! → [`MetadataCodec::decode`] → canonical [`ImageMetadataDocument`].

pub mod error;
pub mod layout;
pub mod models;
pub mod services;
pub mod tags;

pub use crate::error::{Error, Result};
pub use crate::models::{
    Dimensions, DocumentPatch, ImageDescriptor, ImageFile, ImageInfo, ImageMetadataDocument,
    ImagePatch, ObservationKind, ObservationRecord, ObservationTemplate, ObservationValue,
    ProjectContext, ProjectInfo, ProjectPatch,
};
pub use crate::services::{
    BatchProcessor, BatchResult, DocumentBuilder, MetadataCodec, ObservationNormalizer,
    ReadOutcome,
};
pub use crate::tags::{ExifBackend, TagBackend};
