//! JSON model artifacts.

use crate::error::{ModelError, Result};
use crate::gbm::GbmClassifier;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized layout of [`GbmClassifier`] changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format_version: u32,
    model: &'a GbmClassifier,
}

#[derive(Deserialize)]
struct Artifact {
    format_version: u32,
    model: serde_json::Value,
}

/// Writes `model` to `path`, creating parent directories as needed.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn save_model(model: &GbmClassifier, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(
        writer,
        &ArtifactRef {
            format_version: MODEL_FORMAT_VERSION,
            model,
        },
    )?;

    info!(path = %path.display(), iterations = model.n_iterations(), "Saved model");
    Ok(())
}

/// Reads a model written by [`save_model`].
///
/// # Errors
/// Returns [`ModelError::VersionMismatch`] for artifacts from another format
/// version, and an error if the file is missing or malformed.
pub fn load_model(path: impl AsRef<Path>) -> Result<GbmClassifier> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let artifact: Artifact = serde_json::from_reader(reader)?;

    if artifact.format_version != MODEL_FORMAT_VERSION {
        return Err(ModelError::VersionMismatch {
            found: artifact.format_version,
            expected: MODEL_FORMAT_VERSION,
        });
    }

    let model: GbmClassifier = serde_json::from_value(artifact.model)?;
    model.validate_loaded()?;

    info!(
        path = %path.display(),
        classes = ?model.classes(),
        iterations = model.n_iterations(),
        "Loaded model"
    );
    Ok(model)
}
