//! imeta-tag - embed and read inspection metadata in image files
//!
//! Subcommands:
//! - `embed`: tag a batch of images and write them under
//!   `<root>/<organization>/<project>/<station>/images/`
//! - `read`: print the documents embedded in images as JSON
//! - `update`: merge a JSON patch into one image's document

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use imeta_common::config::{self, ConfigSource, TomlConfig, OUTPUT_ROOT_ENV_VAR};
use imeta_tag::layout::{output_file_name, OutputLayout};
use imeta_tag::{
    BatchProcessor, DocumentPatch, ExifBackend, ImageFile, MetadataCodec, ObservationNormalizer,
    ObservationTemplate, ProjectContext, ReadOutcome,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for imeta-tag
#[derive(Parser, Debug)]
#[command(name = "imeta-tag")]
#[command(about = "Embed inspection metadata in image EXIF comment tags")]
#[command(version)]
struct Args {
    /// Config file (default: <config_dir>/imeta/imeta.toml)
    #[arg(short, long, global = true, env = "IMETA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed metadata into a batch of images
    Embed {
        /// Images, in batch order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Organization name
        #[arg(long)]
        organization: Option<String>,

        /// Project name
        #[arg(long)]
        project: Option<String>,

        /// Inspection station
        #[arg(long)]
        station: Option<String>,

        /// Camera name
        #[arg(long)]
        camera: Option<String>,

        /// Observation template catalog (JSON array)
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Raw observations per image index: {"0": {"<template id>": value}}
        #[arg(long)]
        observations: Option<PathBuf>,

        /// Output root folder
        #[arg(short, long)]
        output_root: Option<PathBuf>,

        /// Give up on the batch after this many seconds
        ///
        /// Nothing is written when the limit is hit. The batch itself cannot
        /// be interrupted, so the process still exits only once it finishes.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print embedded documents as JSON
    Read {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Merge a JSON patch into an image's embedded document
    Update {
        image: PathBuf,

        /// Patch file (JSON document fragment)
        #[arg(long)]
        patch: PathBuf,

        /// Where to write the updated image (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let (toml_config, config_source) = config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &config_source {
        ConfigSource::File(path) => info!("Config: {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::Defaults => debug!("No config file, using defaults"),
    }

    match args.command {
        Command::Embed {
            images,
            organization,
            project,
            station,
            camera,
            templates,
            observations,
            output_root,
            timeout_secs,
        } => {
            let context = project_context(&toml_config, organization, project, station, camera);
            let root = config::resolve_output_root(output_root.as_deref(), OUTPUT_ROOT_ENV_VAR, &toml_config);
            let timeout = timeout_secs.map(Duration::from_secs);
            embed(images, context, templates, observations, root, timeout).await
        }
        Command::Read { images } => read(images).await,
        Command::Update {
            image,
            patch,
            output,
        } => update(image, patch, output).await,
    }
}

/// CLI flags win over the `[project]` table of the config file
fn project_context(
    toml_config: &TomlConfig,
    organization: Option<String>,
    project: Option<String>,
    station: Option<String>,
    camera: Option<String>,
) -> ProjectContext {
    let defaults = toml_config.project.clone().unwrap_or_default();
    ProjectContext::new(
        organization.or(defaults.organization_name).unwrap_or_default(),
        project.or(defaults.project_name).unwrap_or_default(),
        station.or(defaults.inspection_station).unwrap_or_default(),
        camera.or(defaults.camera_name).unwrap_or_default(),
    )
}

async fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageFile>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        images.push(ImageFile::from_path(path, bytes));
    }
    Ok(images)
}

async fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse `{"<index>": {...}}` into raw maps keyed by image index
fn raw_observations_by_index(
    raw: HashMap<String, Map<String, Value>>,
) -> Result<HashMap<usize, Map<String, Value>>> {
    raw.into_iter()
        .map(|(key, value)| {
            let index = key
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Observation key {:?} is not an image index", key))?;
            Ok((index, value))
        })
        .collect()
}

async fn embed(
    paths: Vec<PathBuf>,
    context: ProjectContext,
    templates_path: Option<PathBuf>,
    observations_path: Option<PathBuf>,
    root: PathBuf,
    timeout: Option<Duration>,
) -> Result<()> {
    context.validate().context(
        "Missing required project data: organization, project, station and camera are all required",
    )?;
    let layout = OutputLayout::for_context(&context)?;

    let images = load_images(&paths).await?;
    let templates: Vec<ObservationTemplate> = match &templates_path {
        Some(path) => load_json(path).await?,
        None => Vec::new(),
    };
    let raw = match &observations_path {
        Some(path) => raw_observations_by_index(load_json(path).await?)?,
        None => HashMap::new(),
    };

    let observations = ObservationNormalizer::new(&templates).normalize_batch(images.len(), &raw);
    info!(
        images = images.len(),
        templates = templates.len(),
        "Embedding metadata for {} / {}",
        context.organization_name,
        context.project_name
    );

    let batch = tokio::task::spawn_blocking(move || {
        let processor = BatchProcessor::new(MetadataCodec::new(ExifBackend::new()));
        processor
            .process(&images, &observations, &context)
            .map(|result| (images, result))
    });
    let (images, result) = match timeout {
        Some(limit) => tokio::time::timeout(limit, batch)
            .await
            .with_context(|| format!("Batch abandoned after {:?}", limit))?,
        None => batch.await,
    }
    .context("Batch task failed")??;

    let images_dir = layout.images_dir(&root);
    tokio::fs::create_dir_all(&images_dir)
        .await
        .with_context(|| format!("Failed to create {}", images_dir.display()))?;

    for ((bytes, document), image) in result.iter().zip(&images) {
        let target = images_dir.join(output_file_name(document, &image.name));
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!("{} -> {}", image.name, target.display());
    }

    info!(
        "Saved {} images with embedded metadata to {}",
        result.len(),
        images_dir.display()
    );
    Ok(())
}

async fn read(paths: Vec<PathBuf>) -> Result<()> {
    let images = load_images(&paths).await?;
    let processor = BatchProcessor::new(MetadataCodec::new(ExifBackend::new()));

    let mut reports = Vec::with_capacity(images.len());
    let mut found = 0;
    for (image, outcome) in images.iter().zip(processor.read_all(&images)) {
        let report = match outcome {
            ReadOutcome::Found(document) => {
                found += 1;
                json!({"file": image.name, "document": document})
            }
            ReadOutcome::Missing => json!({"file": image.name, "document": null}),
            ReadOutcome::Failed(e) => {
                json!({"file": image.name, "document": null, "error": e.to_string()})
            }
        };
        reports.push(report);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    if found < images.len() {
        warn!("{} of {} images carry no readable metadata", images.len() - found, images.len());
    }
    Ok(())
}

async fn update(path: PathBuf, patch_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut images = load_images(std::slice::from_ref(&path)).await?;
    let Some(image) = images.pop() else {
        bail!("No image loaded from {}", path.display());
    };
    let patch: DocumentPatch = load_json(&patch_path).await?;

    let codec = MetadataCodec::new(ExifBackend::new());
    let (bytes, document) = codec.update(&image, &patch)?;

    let target = output.unwrap_or(path);
    tokio::fs::write(&target, bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!(
        id = %document.image.id,
        last_modified = %document.image.last_modified,
        "Updated metadata in {}",
        target.display()
    );
    Ok(())
}
