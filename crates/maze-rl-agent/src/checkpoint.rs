//! Q-network checkpoints: gzip-compressed bincode

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use maze_rl_core::RLError;

use crate::network::QNetwork;

/// Current checkpoint layout
pub const FORMAT_VERSION: u32 = 1;

/// Errors reading or writing a checkpoint
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes are not a valid checkpoint
    #[error("Failed to decode checkpoint: {0}")]
    Decode(#[from] bincode::Error),

    /// Written by an incompatible layout
    #[error("Unsupported checkpoint version {found}, expected {}", FORMAT_VERSION)]
    UnsupportedVersion {
        /// Version stored in the file
        found: u32,
    },

    /// Layer sizes differ from the network being restored
    #[error("Checkpoint shape {found:?} does not match network shape {expected:?}")]
    ShapeMismatch {
        /// Shape of the target network
        expected: (usize, usize, usize),
        /// Shape stored in the checkpoint
        found: (usize, usize, usize),
    },
}

impl From<CheckpointError> for RLError {
    fn from(err: CheckpointError) -> Self {
        match err {
            CheckpointError::Io(io) => RLError::Io(io),
            other => RLError::Agent(other.to_string()),
        }
    }
}

/// Result type alias for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Saved online-network parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Layout version, see [`FORMAT_VERSION`]
    pub format_version: u32,
    /// Observation length
    pub input_dim: usize,
    /// Hidden layer width
    pub hidden_dim: usize,
    /// Number of actions
    pub output_dim: usize,
    /// Flattened weights in [`QNetwork::parameters`] order
    pub parameters: Vec<f32>,
    /// Time of the snapshot
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot a network's parameters
    #[must_use]
    pub fn from_network(network: &QNetwork) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            input_dim: network.input_dim(),
            hidden_dim: network.hidden_dim(),
            output_dim: network.output_dim(),
            parameters: network.parameters(),
            saved_at: Utc::now(),
        }
    }

    /// `(input, hidden, output)` sizes
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.input_dim, self.hidden_dim, self.output_dim)
    }

    /// Serialize to gzip-compressed bincode
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data)?;
        Ok(encoder.finish()?)
    }

    /// Inverse of [`Checkpoint::encode`]; rejects other layout versions
    pub fn decode(compressed: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(compressed);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;

        let checkpoint: Self = bincode::deserialize(&data)?;
        if checkpoint.format_version != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.format_version,
            });
        }
        Ok(checkpoint)
    }

    /// Write to `path`, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let compressed = self.encode()?;
        tokio::fs::write(path, &compressed).await?;
        tracing::info!(
            path = %path.display(),
            parameters = self.parameters.len(),
            bytes = compressed.len(),
            "saved checkpoint"
        );
        Ok(())
    }

    /// Read a checkpoint file
    pub async fn load(path: &Path) -> Result<Self> {
        let compressed = tokio::fs::read(path).await?;
        Self::decode(&compressed)
    }

    /// Copy the parameters into `network` when the shapes agree
    pub fn restore_into(&self, network: &mut QNetwork) -> Result<()> {
        let expected = (network.input_dim(), network.hidden_dim(), network.output_dim());
        if self.shape() != expected || self.parameters.len() != network.parameter_count() {
            return Err(CheckpointError::ShapeMismatch {
                expected,
                found: self.shape(),
            });
        }
        network.set_parameters(&self.parameters).map_err(|_| CheckpointError::ShapeMismatch {
            expected,
            found: self.shape(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn network(input: usize, seed: u64) -> QNetwork {
        QNetwork::new(input, 8, 4, 1e-3, &mut StdRng::seed_from_u64(seed))
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("q.ckpt");
        let source = network(9, 1);
        Checkpoint::from_network(&source).save(&path).await.unwrap();

        let loaded = Checkpoint::load(&path).await.unwrap();
        assert_eq!(loaded.shape(), (9, 8, 4));

        let mut target = network(9, 2);
        loaded.restore_into(&mut target).unwrap();
        assert_eq!(target.parameters(), source.parameters());
    }

    #[test]
    fn test_shape_mismatch() {
        let checkpoint = Checkpoint::from_network(&network(9, 1));
        let mut other = network(25, 1);
        let err = checkpoint.restore_into(&mut other).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::ShapeMismatch { expected: (25, 8, 4), found: (9, 8, 4) }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_and_other_versions() {
        assert!(matches!(Checkpoint::decode(b"not gzip"), Err(CheckpointError::Io(_))));

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[1, 2, 3]).unwrap();
        let truncated = encoder.finish().unwrap();
        assert!(matches!(Checkpoint::decode(&truncated), Err(CheckpointError::Decode(_))));

        let mut checkpoint = Checkpoint::from_network(&network(9, 1));
        checkpoint.format_version = 99;
        let bytes = checkpoint.encode().unwrap();
        assert!(matches!(
            Checkpoint::decode(&bytes),
            Err(CheckpointError::UnsupportedVersion { found: 99 })
        ));
    }
}
