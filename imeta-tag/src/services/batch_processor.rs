//! Batch metadata processing
//!
//! Builds and embeds one document per image, strictly in input order and one
//! image at a time. A batch either succeeds for every image or returns no
//! result at all.

use super::document_builder::DocumentBuilder;
use super::metadata_codec::MetadataCodec;
use crate::error::{Error, Result};
use crate::models::{ImageFile, ImageMetadataDocument, ObservationRecord, ProjectContext};
use crate::tags::{ExifBackend, TagBackend};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Index-aligned output of a successful batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// Image bytes with embedded metadata, one per input image
    pub encoded: Vec<Vec<u8>>,
    /// Document embedded in the image at the same index
    pub documents: Vec<ImageMetadataDocument>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Pairs of (encoded bytes, document) in input order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &ImageMetadataDocument)> {
        self.encoded
            .iter()
            .map(Vec::as_slice)
            .zip(self.documents.iter())
    }
}

/// Result of reading one image in a multi-image read
#[derive(Debug)]
pub enum ReadOutcome {
    Found(ImageMetadataDocument),
    /// No embedded document
    Missing,
    Failed(Error),
}

impl ReadOutcome {
    pub fn document(&self) -> Option<&ImageMetadataDocument> {
        match self {
            Self::Found(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Sequential batch processor
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor<B = ExifBackend> {
    builder: DocumentBuilder,
    codec: MetadataCodec<B>,
}

impl<B: TagBackend> BatchProcessor<B> {
    pub fn new(codec: MetadataCodec<B>) -> Self {
        Self {
            builder: DocumentBuilder::new(),
            codec,
        }
    }

    pub fn codec(&self) -> &MetadataCodec<B> {
        &self.codec
    }

    /// Build and embed a document for every image
    ///
    /// `observations_by_index` is keyed by position in `images`; missing
    /// entries mean no observations. The context is validated before any
    /// image is touched. The first failing image aborts the batch with
    /// `BatchAborted` naming it.
    pub fn process(
        &self,
        images: &[ImageFile],
        observations_by_index: &HashMap<usize, Vec<ObservationRecord>>,
        context: &ProjectContext,
    ) -> Result<BatchResult> {
        context.validate()?;

        let mut result = BatchResult {
            encoded: Vec::with_capacity(images.len()),
            documents: Vec::with_capacity(images.len()),
        };

        for (index, image) in images.iter().enumerate() {
            let observations = observations_by_index
                .get(&index)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let (encoded, document) = self
                .process_one(image, index, observations, context)
                .map_err(|e| {
                    warn!(index, image = %image.name, error = %e, "Aborting batch");
                    Error::BatchAborted {
                        index,
                        name: image.name.clone(),
                        source: Box::new(e),
                    }
                })?;

            debug!(index, image = %image.name, id = %document.image.id, "Processed image");
            result.encoded.push(encoded);
            result.documents.push(document);
        }

        info!(images = result.len(), "Batch processed");
        Ok(result)
    }

    fn process_one(
        &self,
        image: &ImageFile,
        index: usize,
        observations: &[ObservationRecord],
        context: &ProjectContext,
    ) -> Result<(Vec<u8>, ImageMetadataDocument)> {
        let document = self
            .builder
            .build(context, &image.descriptor(), index, observations)?;
        let encoded = self.codec.encode(&document, image)?;
        Ok((encoded, document))
    }

    /// Decode every image; one failure never stops the others
    pub fn read_all(&self, images: &[ImageFile]) -> Vec<ReadOutcome> {
        images
            .iter()
            .map(|image| match self.codec.decode(image) {
                Ok(Some(doc)) => ReadOutcome::Found(doc),
                Ok(None) => ReadOutcome::Missing,
                Err(e) => {
                    warn!(image = %image.name, error = %e, "Failed to read metadata");
                    ReadOutcome::Failed(e)
                }
            })
            .collect()
    }
}
