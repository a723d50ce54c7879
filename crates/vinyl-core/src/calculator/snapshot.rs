//! Versioned snapshot persistence for calculator entities.
//!
//! A snapshot is one self-describing JSON document per file: a schema
//! version tag plus the full entity graph. Restore buffers the whole
//! document before committing, so a failed restore never leaves a
//! half-applied state.

use super::CalculatorEntity;
use crate::data::DatasetCollection;
use crate::domain::{VinylError, VinylResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub(crate) const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Fixed suffix of generated snapshot filenames.
pub const SNAPSHOT_SUFFIX: &str = "_dump.json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    schema_version: u32,
    calculator: CalculatorEntity,
}

pub(crate) fn write_snapshot(
    entity: &CalculatorEntity,
    path: Option<&Path>,
    type_name: &str,
) -> VinylResult<PathBuf> {
    let document = Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        calculator: entity.clone(),
    };
    let payload = serde_json::to_string_pretty(&document).map_err(|source| {
        VinylError::SnapshotWrite {
            path: path.map_or_else(PathBuf::new, Path::to_path_buf),
            reason: source.to_string(),
        }
    })?;

    match path {
        Some(path) => {
            fs::write(path, payload).map_err(|source| VinylError::SnapshotWrite {
                path: path.to_path_buf(),
                reason: source.to_string(),
            })?;
            Ok(path.to_path_buf())
        }
        None => write_unique_snapshot(&payload, type_name),
    }
}

/// Writes to a uniquely named file in the current working directory so
/// concurrent saves without explicit paths never collide.
fn write_unique_snapshot(payload: &str, type_name: &str) -> VinylResult<PathBuf> {
    let working_dir =
        std::env::current_dir().map_err(|source| VinylError::SnapshotWrite {
            path: PathBuf::new(),
            reason: source.to_string(),
        })?;
    let io_error = |source: std::io::Error| VinylError::SnapshotWrite {
        path: working_dir.clone(),
        reason: source.to_string(),
    };

    let mut file = tempfile::Builder::new()
        .prefix(&snapshot_prefix(type_name))
        .suffix(SNAPSHOT_SUFFIX)
        .tempfile_in(&working_dir)
        .map_err(io_error)?;
    file.write_all(payload.as_bytes()).map_err(io_error)?;

    let (_, path) = file
        .keep()
        .map_err(|persist| VinylError::SnapshotWrite {
            path: working_dir.clone(),
            reason: persist.error.to_string(),
        })?;
    Ok(path)
}

/// Generated-filename prefix: the last character of the concrete type
/// name, the naming convention snapshots have always used.
fn snapshot_prefix(type_name: &str) -> String {
    let base = type_name.rsplit("::").next().unwrap_or(type_name);
    base.chars()
        .rev()
        .find(|character| character.is_ascii_alphanumeric())
        .map_or_else(|| "c".to_string(), |character| character.to_string())
}

pub(crate) fn read_snapshot(path: &Path) -> VinylResult<CalculatorEntity> {
    let restore_error = |reason: String| VinylError::SnapshotRestore {
        path: path.to_path_buf(),
        reason,
    };

    let source = fs::read_to_string(path).map_err(|source| restore_error(source.to_string()))?;
    let document: Snapshot =
        serde_json::from_str(&source).map_err(|source| restore_error(source.to_string()))?;
    if document.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(restore_error(format!(
            "unsupported snapshot schema version {}, expected {}",
            document.schema_version, SNAPSHOT_SCHEMA_VERSION
        )));
    }
    validate_restored(&document.calculator).map_err(restore_error)?;
    Ok(document.calculator)
}

/// Re-checks the structural invariants the builder enforced at
/// construction time. A snapshot can be well-formed JSON and still
/// describe an entity no builder would have produced; such documents are
/// rejected before anything is committed.
fn validate_restored(entity: &CalculatorEntity) -> Result<(), String> {
    if entity.name.trim().is_empty() {
        return Err("snapshot has an empty calculator name".to_string());
    }

    let key_count = entity.output_keys.len();
    if entity.output_data_types.len() != key_count {
        return Err(format!(
            "snapshot declares {} output data types for {} output keys",
            entity.output_data_types.len(),
            key_count
        ));
    }
    if entity.output_filenames.len() != key_count {
        return Err(format!(
            "snapshot declares {} output filenames for {} output keys",
            entity.output_filenames.len(),
            key_count
        ));
    }

    let mut seen_keys = HashSet::new();
    for key in &entity.output_keys {
        if key.trim().is_empty() {
            return Err("snapshot contains an empty output key".to_string());
        }
        if !seen_keys.insert(key.as_str()) {
            return Err(format!("snapshot contains duplicate output key `{key}`"));
        }
    }

    check_collection_keys("input", &entity.input)?;
    check_collection_keys("output", &entity.output)
}

fn check_collection_keys(label: &str, collection: &DatasetCollection) -> Result<(), String> {
    let mut seen = HashSet::new();
    for dataset in collection {
        if !seen.insert(dataset.key()) {
            return Err(format!(
                "snapshot {label} collection contains duplicate dataset key `{}`",
                dataset.key()
            ));
        }
    }
    Ok(())
}
