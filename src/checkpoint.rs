//! Versioned binary persistence for run components.
//!
//! Partition snapshots and fitted classifier weights share one durable
//! format: a fixed-width little-endian bincode payload carrying a schema
//! version tag. Loaders check the tag before touching the payload, so a
//! file written by an incompatible build is rejected instead of
//! misinterpreted.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;

/// Failure modes for checkpoint persistence.
#[derive(Debug)]
pub enum CheckpointError {
    /// Reading or writing the checkpoint file failed.
    Io(std::io::Error),
    /// The binary codec rejected the payload.
    Serialization(bincode::Error),
    /// The file decoded cleanly but carries a different schema version.
    VersionMismatch { expected: u32, found: u32 },
    /// The payload decoded but its contents are not usable.
    InvalidFormat(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(err) => write!(f, "checkpoint I/O failed: {err}"),
            CheckpointError::Serialization(err) => {
                write!(f, "checkpoint payload could not be (de)serialized: {err}")
            }
            CheckpointError::VersionMismatch { expected, found } => write!(
                f,
                "checkpoint schema version {found} does not match expected {expected}",
            ),
            CheckpointError::InvalidFormat(msg) => {
                write!(f, "checkpoint contents are unusable: {msg}")
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

/// Shared codec: fixed-width integers, little-endian, identical bytes for
/// identical payloads.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_little_endian()
}

/// Rejects payloads whose schema version differs from the current one.
pub fn require_version(expected: u32, found: u32) -> Result<(), CheckpointError> {
    if expected == found {
        Ok(())
    } else {
        Err(CheckpointError::VersionMismatch { expected, found })
    }
}

/// Durable state that can round-trip through a checkpoint file.
pub trait Checkpointable: Sized {
    /// Save the current state to `path`.
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError>;

    /// Load a previously saved state from `path`.
    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>;

    /// Writes one serializable payload, creating parent directories as
    /// needed.
    fn write_snapshot<P, T>(snapshot: &T, path: P) -> Result<(), CheckpointError>
    where
        P: AsRef<Path>,
        T: serde::Serialize,
    {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        codec().serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads one payload written by [`Checkpointable::write_snapshot`].
    fn read_snapshot<P, T>(path: P) -> Result<T, CheckpointError>
    where
        P: AsRef<Path>,
        T: serde::de::DeserializeOwned,
    {
        let mut reader = BufReader::new(File::open(path)?);
        Ok(codec().deserialize_from(&mut reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Probe {
        version: u32,
        values: Vec<f32>,
    }

    #[test]
    fn codec_output_is_deterministic() {
        let probe = Probe {
            version: 1,
            values: vec![0.25, 0.5, 0.75],
        };
        let a = codec().serialize(&probe).unwrap();
        let b = codec().serialize(&probe).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn require_version_accepts_current_and_rejects_others() {
        assert!(require_version(2, 2).is_ok());
        assert!(matches!(
            require_version(2, 3),
            Err(CheckpointError::VersionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }
}
