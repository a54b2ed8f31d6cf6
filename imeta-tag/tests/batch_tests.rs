//! Batch Processor Tests
//!
//! Ordered all-or-nothing batches and per-image reads over real JPEG bytes.

mod helpers;

use helpers::{bare_jpeg, jpeg_with_comment, sample_context};
use imeta_tag::layout::{output_file_name, OutputLayout};
use imeta_tag::{
    BatchProcessor, Error, ExifBackend, ImageFile, MetadataCodec, ObservationRecord,
    ObservationValue, ProjectContext, ReadOutcome,
};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn processor() -> BatchProcessor {
    BatchProcessor::new(MetadataCodec::new(ExifBackend::new()))
}

fn images(names: &[&str]) -> Vec<ImageFile> {
    names
        .iter()
        .map(|name| ImageFile::new(*name, bare_jpeg()))
        .collect()
}

#[test]
fn test_batch_is_index_aligned() {
    // Given: three images, observations for the first and last only
    let batch = images(&["first.jpg", "second.jpg", "third.jpg"]);
    let mut observations = HashMap::new();
    observations.insert(
        0,
        vec![ObservationRecord::new("Temp", ObservationValue::Numeric(42.0)).unwrap()],
    );
    observations.insert(
        2,
        vec![ObservationRecord::new("Pass", ObservationValue::Boolean(false)).unwrap()],
    );

    // When: processed
    let result = processor()
        .process(&batch, &observations, &sample_context())
        .unwrap();

    // Then: outputs line up with inputs
    assert_eq!(result.len(), 3);
    let ids: Vec<_> = result.documents.iter().map(|d| d.image.id.as_str()).collect();
    assert_eq!(ids, ["img-001", "img-002", "img-003"]);
    for (document, image) in result.documents.iter().zip(&batch) {
        assert_eq!(document.image.original_filename, image.name);
        assert_eq!(document.image.file_size_bytes, image.size_bytes());
    }
    assert_eq!(result.documents[0].observations["Temp"], json!(42));
    assert!(result.documents[1].observations.is_empty());
    assert_eq!(result.documents[2].observations["Pass"], json!(false));

    // And: each encoded image carries its own document
    let reader = processor();
    for ((bytes, document), image) in result.iter().zip(&batch) {
        let decoded = reader
            .codec()
            .decode(&ImageFile::new(image.name.clone(), bytes.to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(&decoded, document);
    }
}

#[test]
fn test_empty_batch() {
    let result = processor()
        .process(&[], &HashMap::new(), &sample_context())
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_failing_image_aborts_batch() {
    let mut batch = images(&["ok-1.jpg", "ok-2.jpg"]);
    batch.insert(1, ImageFile::new("scan.png", b"\x89PNG\r\n\x1a\n".to_vec()));

    let err = processor()
        .process(&batch, &HashMap::new(), &sample_context())
        .unwrap_err();

    match err {
        Error::BatchAborted { index, name, source } => {
            assert_eq!(index, 1);
            assert_eq!(name, "scan.png");
            assert!(matches!(*source, Error::EncodeIo { .. }));
        }
        other => panic!("expected BatchAborted, got {:?}", other),
    }
}

#[test]
fn test_invalid_context_rejected_up_front() {
    let context = ProjectContext::new("Acme", "", "S1", "C1");
    let err = processor()
        .process(&images(&["a.jpg"]), &HashMap::new(), &context)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidContext { field: "projectName" }));
}

#[test]
fn test_read_all_reports_each_image() {
    let tagged = processor()
        .process(&images(&["a.jpg"]), &HashMap::new(), &sample_context())
        .unwrap();

    let batch = vec![
        ImageFile::new("a.jpg", tagged.encoded[0].clone()),
        ImageFile::new("plain.jpg", bare_jpeg()),
        ImageFile::new("broken.jpg", jpeg_with_comment("{\"organization\": ???}")),
        ImageFile::new("unknown.jpg", jpeg_with_comment("{}")),
    ];
    let outcomes = processor().read_all(&batch);

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0].document(), Some(&tagged.documents[0]));
    assert!(matches!(outcomes[1], ReadOutcome::Missing));
    assert!(matches!(outcomes[2], ReadOutcome::Failed(Error::MalformedPayload { .. })));
    match &outcomes[3] {
        ReadOutcome::Found(document) => assert_eq!(document.image.status, "unknown"),
        other => panic!("expected Found, got {:?}", other),
    }
}

#[test]
fn test_batch_persisted_under_output_layout() {
    // Given: an output root and a processed batch
    let root = TempDir::new().unwrap();
    let context = ProjectContext::new("Acme: West", "Line 4", "Station A", "Cam");
    let batch = images(&["one.jpg", "two.JPG"]);
    let result = processor()
        .process(&batch, &HashMap::new(), &context)
        .unwrap();

    // When: written the way the CLI writes them
    let layout = OutputLayout::for_context(&context).unwrap();
    let dir = layout.images_dir(root.path());
    fs::create_dir_all(&dir).unwrap();
    for ((bytes, document), image) in result.iter().zip(&batch) {
        fs::write(dir.join(output_file_name(document, &image.name)), bytes).unwrap();
    }

    // Then: files are named by image id below the sanitized project path
    let expected = root.path().join("Acme_ West").join("Line 4").join("Station A").join("images");
    assert_eq!(dir, expected);
    assert!(expected.join("img-001.jpg").is_file());
    assert!(expected.join("img-002.JPG").is_file());

    let stored = fs::read(expected.join("img-002.JPG")).unwrap();
    let decoded = processor()
        .codec()
        .decode(&ImageFile::new("img-002.JPG", stored))
        .unwrap()
        .unwrap();
    assert_eq!(decoded.image.original_filename, "two.JPG");
}
