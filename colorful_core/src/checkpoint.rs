//! Checkpoint trait and error handling for deterministic state persistence.
//!
//! [`Checkpointable`] fixes a versioned binary format: every implementation
//! stores a version header next to its payload so that files written by an
//! incompatible schema are rejected on load. [`CategoryModel`] is the one
//! checkpointed component; unlike the CSV export its checkpoint also carries
//! the diversity bias of every category.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{Category, CategoryModel};

/// Schema version of [`CategoryModel`] checkpoints.
pub const MODEL_CHECKPOINT_VERSION: u32 = 1;

/// Errors that can occur while saving or loading checkpoints.
#[derive(Debug)]
pub enum CheckpointError {
    /// Underlying I/O failure while reading or writing checkpoint files.
    Io(std::io::Error),
    /// Serialization or deserialization error from the binary codec.
    Serialization(bincode::Error),
    /// The checkpoint file was well formed but produced an incompatible schema version.
    VersionMismatch { expected: u32, found: u32 },
    /// The checkpoint decoded but holds values no model may contain.
    InvalidFormat(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(err) => write!(f, "I/O error while accessing checkpoint: {err}"),
            CheckpointError::Serialization(err) => {
                write!(f, "Failed to (de)serialize checkpoint payload: {err}")
            }
            CheckpointError::VersionMismatch { expected, found } => write!(
                f,
                "Checkpoint version mismatch: expected {expected}, found {found}",
            ),
            CheckpointError::InvalidFormat(msg) => {
                write!(f, "Checkpoint file has invalid structure: {msg}")
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::Io(err)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(err: bincode::Error) -> Self {
        CheckpointError::Serialization(err)
    }
}

impl From<ModelError> for CheckpointError {
    fn from(err: ModelError) -> Self {
        CheckpointError::InvalidFormat(err.to_string())
    }
}

/// Deterministic binary codec options shared by all checkpoint implementations.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_little_endian()
}

/// Components that support deterministic persistence implement this trait.
pub trait Checkpointable: Sized {
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError>;

    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>;

    /// Utility for writing a serializable snapshot with the shared codec.
    fn write_snapshot<P, T>(snapshot: &T, path: P) -> Result<(), CheckpointError>
    where
        P: AsRef<Path>,
        T: Serialize,
    {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        codec().serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }

    /// Utility for reading a serializable snapshot with the shared codec.
    fn read_snapshot<P, T>(path: P) -> Result<T, CheckpointError>
    where
        P: AsRef<Path>,
        T: serde::de::DeserializeOwned,
    {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Ok(codec().deserialize_from(&mut reader)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryRow {
    name: String,
    hc: Option<f64>,
    hr: f64,
    sc: f64,
    sr: f64,
    lc: f64,
    lr: f64,
    add_diversity: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryModelCheckpoint {
    version: u32,
    rows: Vec<CategoryRow>,
}

impl Checkpointable for CategoryModel {
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let rows = self
            .iter()
            .map(|(name, cat)| CategoryRow {
                name: name.to_string(),
                hc: cat.hc(),
                hr: cat.hr(),
                sc: cat.sc(),
                sr: cat.sr(),
                lc: cat.lc(),
                lr: cat.lr(),
                add_diversity: cat.add_diversity(),
            })
            .collect();

        let snapshot = CategoryModelCheckpoint {
            version: MODEL_CHECKPOINT_VERSION,
            rows,
        };
        Self::write_snapshot(&snapshot, path)
    }

    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: CategoryModelCheckpoint = Self::read_snapshot(path)?;
        if snapshot.version != MODEL_CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: MODEL_CHECKPOINT_VERSION,
                found: snapshot.version,
            });
        }

        let mut model = CategoryModel::new();
        for row in snapshot.rows {
            if !row.add_diversity.is_finite() || row.add_diversity < 0.0 {
                return Err(CheckpointError::InvalidFormat(format!(
                    "category '{}' has diversity bias {}",
                    row.name, row.add_diversity
                )));
            }
            let category = Category::new(row.hc, row.hr, row.sc, row.sr, row.lc, row.lr)?
                .with_diversity(row.add_diversity);
            if model.insert(row.name.clone(), category).is_some() {
                return Err(CheckpointError::InvalidFormat(format!(
                    "duplicate category '{}'",
                    row.name
                )));
            }
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn model() -> CategoryModel {
        let mut model = CategoryModel::new();
        model.insert(
            "red",
            Category::new(Some(0.0), 20.0, 90.0, 10.0, 50.0, 15.0).unwrap(),
        );
        model.insert(
            "grey",
            Category::new(None, 10.0, 5.0, 5.0, 50.0, 20.0).unwrap(),
        );
        model.bump_diversity("red", 5.0).unwrap();
        model
    }

    #[test]
    fn checkpoint_keeps_diversity_and_hue_agnostic_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        let original = model();
        original.save_checkpoint(&path).unwrap();

        let restored = CategoryModel::load_checkpoint(&path).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.get("red").unwrap().add_diversity(), 5.0);
        assert!(restored.get("grey").unwrap().is_hue_agnostic());
    }

    #[test]
    fn checkpoint_rejects_other_versions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let snapshot = CategoryModelCheckpoint {
            version: MODEL_CHECKPOINT_VERSION + 1,
            rows: Vec::new(),
        };
        CategoryModel::write_snapshot(&snapshot, &path).unwrap();

        match CategoryModel::load_checkpoint(&path) {
            Err(CheckpointError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, MODEL_CHECKPOINT_VERSION);
                assert_eq!(found, MODEL_CHECKPOINT_VERSION + 1);
            }
            other => panic!("unexpected result {:?}", other.map(|m| m.len())),
        }
    }

    #[test]
    fn checkpoint_rejects_degenerate_radius() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let snapshot = CategoryModelCheckpoint {
            version: MODEL_CHECKPOINT_VERSION,
            rows: vec![CategoryRow {
                name: "red".to_string(),
                hc: Some(0.0),
                hr: 0.0,
                sc: 90.0,
                sr: 10.0,
                lc: 50.0,
                lr: 15.0,
                add_diversity: 0.0,
            }],
        };
        CategoryModel::write_snapshot(&snapshot, &path).unwrap();
        assert!(matches!(
            CategoryModel::load_checkpoint(&path),
            Err(CheckpointError::InvalidFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            CategoryModel::load_checkpoint(dir.path().join("absent.bin")),
            Err(CheckpointError::Io(_))
        ));
    }
}
