// packages/interpose/src/recording/compressor.rs
//! zstd compression for stored fixtures

use crate::utils::errors::{MockError, Result};
use tracing::debug;

/// zstd frame magic number, little-endian
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Compression levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Level 1
    Fast,

    /// Level 3
    Balanced,

    /// Level 19, for fixtures committed to the repository
    Best,
}

impl CompressionLevel {
    pub fn as_i32(&self) -> i32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Balanced => 3,
            CompressionLevel::Best => 19,
        }
    }
}

/// Fixture compressor
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    level: CompressionLevel,
}

impl Compressor {
    pub fn new(level: CompressionLevel) -> Self {
        Self { level }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let compressed = zstd::encode_all(data, self.level.as_i32())
            .map_err(|e| MockError::CompressionFailed(format!("Compression error: {}", e)))?;

        debug!(
            "Compressed fixture {} bytes -> {} bytes",
            data.len(),
            compressed.len()
        );

        Ok(compressed)
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if !Self::is_compressed(data) {
            return Err(MockError::CompressionFailed(
                "data is not a zstd frame".to_string(),
            ));
        }

        zstd::decode_all(data)
            .map_err(|e| MockError::CompressionFailed(format!("Decompression error: {}", e)))
    }

    /// Whether `data` starts with a zstd frame header
    pub fn is_compressed(data: &[u8]) -> bool {
        data.starts_with(&ZSTD_MAGIC)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(CompressionLevel::Best)
    }
}
