// packages/interpose/src/recording/fixture_store.rs
//! Fixture storage on the file system
//!
//! Capture records live one per file under a base directory:
//!
//! ```text
//! tests/fixtures/
//!   httpbin-get.json
//!   httpbin-headers.yaml
//!   large-download.json.zst
//! ```
//!
//! Loading picks the decoder from the extension, so a directory may mix
//! formats. Saving uses the store's configured format.

use crate::recording::capture::CaptureRecord;
use crate::recording::compressor::Compressor;
use crate::utils::config::FixtureSettings;
use crate::utils::errors::{MockError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk encoding of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureFormat {
    Json,
    Yaml,
    CompressedJson,
}

impl FixtureFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FixtureFormat::Json => "json",
            FixtureFormat::Yaml => "yaml",
            FixtureFormat::CompressedJson => "json.zst",
        }
    }

    /// Format of a file name, by extension
    pub fn detect(file_name: &str) -> Option<(Self, &str)> {
        [
            FixtureFormat::CompressedJson,
            FixtureFormat::Json,
            FixtureFormat::Yaml,
        ]
        .into_iter()
        .find_map(|format| {
            let stem = file_name.strip_suffix(format.extension())?.strip_suffix('.')?;
            (!stem.is_empty()).then_some((format, stem))
        })
        .or_else(|| {
            let stem = file_name.strip_suffix(".yml")?;
            (!stem.is_empty()).then_some((FixtureFormat::Yaml, stem))
        })
    }
}

/// Directory of capture records
#[derive(Debug, Clone)]
pub struct FixtureStore {
    base_dir: PathBuf,
    format: FixtureFormat,
    compressor: Compressor,
}

impl FixtureStore {
    pub fn new(base_dir: impl Into<PathBuf>, format: FixtureFormat) -> Self {
        Self {
            base_dir: base_dir.into(),
            format,
            compressor: Compressor::default(),
        }
    }

    pub fn from_settings(settings: &FixtureSettings) -> Self {
        Self::new(settings.dir.clone(), settings.format)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write `record` as `<name>.<ext>`, creating the directory if needed
    pub fn save(&self, name: &str, record: &CaptureRecord) -> Result<PathBuf> {
        validate_name(name)?;
        fs::create_dir_all(&self.base_dir)?;

        let path = self
            .base_dir
            .join(format!("{}.{}", name, self.format.extension()));

        let data = match self.format {
            FixtureFormat::Json => serde_json::to_vec_pretty(record)?,
            FixtureFormat::Yaml => serde_yaml::to_string(record)?.into_bytes(),
            FixtureFormat::CompressedJson => self.compressor.compress(&serde_json::to_vec(record)?)?,
        };

        fs::write(&path, &data)?;
        info!("Saved fixture '{}' to {:?} ({} bytes)", name, path, data.len());

        Ok(path)
    }

    /// Read the fixture called `name`, whatever its format
    pub fn load(&self, name: &str) -> Result<CaptureRecord> {
        validate_name(name)?;

        let (path, format) = self
            .candidates(name)
            .into_iter()
            .find(|(path, _)| path.is_file())
            .ok_or_else(|| {
                MockError::FixtureError(format!(
                    "no fixture named '{}' in {:?}",
                    name, self.base_dir
                ))
            })?;

        self.load_path(&path, format)
    }

    /// Read a fixture file directly
    pub fn load_path(&self, path: &Path, format: FixtureFormat) -> Result<CaptureRecord> {
        debug!("Loading fixture {:?} as {:?}", path, format);
        let data = fs::read(path)?;

        let record: CaptureRecord = match format {
            FixtureFormat::Json => serde_json::from_slice(&data)?,
            FixtureFormat::Yaml => serde_yaml::from_slice(&data)?,
            FixtureFormat::CompressedJson => {
                serde_json::from_slice(&self.compressor.decompress(&data)?)?
            }
        };

        Ok(record)
    }

    /// Names of all fixtures in the directory, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.base_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            if let Some((_, stem)) = file_name.to_str().and_then(FixtureFormat::detect) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load every fixture, paired with its name
    pub fn load_all(&self) -> Result<Vec<(String, CaptureRecord)>> {
        self.list()?
            .into_iter()
            .map(|name| -> Result<(String, CaptureRecord)> {
                let record = self.load(&name)?;
                Ok((name, record))
            })
            .collect()
    }

    fn candidates(&self, name: &str) -> Vec<(PathBuf, FixtureFormat)> {
        let mut out = vec![(
            self.base_dir.join(format!("{}.{}", name, self.format.extension())),
            self.format,
        )];

        for format in [
            FixtureFormat::Json,
            FixtureFormat::Yaml,
            FixtureFormat::CompressedJson,
        ] {
            if format != self.format {
                out.push((
                    self.base_dir.join(format!("{}.{}", name, format.extension())),
                    format,
                ));
            }
        }
        out.push((self.base_dir.join(format!("{}.yml", name)), FixtureFormat::Yaml));

        out
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(MockError::FixtureError(format!(
            "invalid fixture name '{}'",
            name
        )));
    }
    Ok(())
}
