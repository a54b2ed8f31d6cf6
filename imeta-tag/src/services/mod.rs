//! Metadata pipeline services
//!
//! - `observation_normalizer`: raw form values → typed observation records
//! - `document_builder`: project context + observations → document
//! - `metadata_codec`: document ↔ image comment tag
//! - `reconcile`: decoded payload shapes → current document
//! - `batch_processor`: ordered all-or-nothing batches

pub mod batch_processor;
pub mod document_builder;
pub mod metadata_codec;
pub mod observation_normalizer;
pub mod reconcile;

pub use batch_processor::{BatchProcessor, BatchResult, ReadOutcome};
pub use document_builder::DocumentBuilder;
pub use metadata_codec::{MetadataCodec, MAX_PAYLOAD_BYTES};
pub use observation_normalizer::ObservationNormalizer;
pub use reconcile::PayloadShape;
