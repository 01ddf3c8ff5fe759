// packages/interpose/src/utils/config.rs
//! Configuration loading
//!
//! Sources are layered in this order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `interpose.{toml,yaml,json}` in the working directory (optional)
//! 3. `INTERPOSE__SECTION__KEY` environment variables

use crate::recording::fixture_store::FixtureFormat;
use crate::utils::errors::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    pub fixtures: FixtureSettings,
    pub transport: TransportSettings,
    pub logging: LoggingSettings,
}

/// Where recorded fixtures live and how they are encoded
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSettings {
    pub dir: PathBuf,
    pub format: FixtureFormat,
}

/// Settings for the real HTTP transport
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    pub timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl TransportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fixtures: FixtureSettings {
                dir: PathBuf::from("tests/fixtures"),
                format: FixtureFormat::Json,
            },
            transport: TransportSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl MockConfig {
    /// Load configuration from defaults, optional file, and environment
    pub fn load() -> Result<Self> {
        Self::load_from("interpose")
    }

    /// Load configuration using `file_stem` as the optional config file name
    pub fn load_from(file_stem: &str) -> Result<Self> {
        let defaults = Self::default();

        let config = ::config::Config::builder()
            .set_default("fixtures.dir", defaults.fixtures.dir.to_string_lossy().to_string())?
            .set_default("fixtures.format", "json")?
            .set_default("transport.timeout_secs", defaults.transport.timeout_secs)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?
            .add_source(::config::File::with_name(file_stem).required(false))
            .add_source(
                ::config::Environment::with_prefix("INTERPOSE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let loaded: MockConfig = config.try_deserialize()?;
        debug!("Loaded configuration: {:?}", loaded);

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MockConfig::default();
        assert_eq!(config.fixtures.format, FixtureFormat::Json);
        assert_eq!(config.transport.timeout(), Duration::from_secs(30));
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = MockConfig::load_from("definitely-not-a-config-file").unwrap();
        assert_eq!(config.fixtures.dir, PathBuf::from("tests/fixtures"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interpose.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[fixtures]\ndir = \"/tmp/recorded\"\nformat = \"compressed_json\"\n\n[transport]\ntimeout_secs = 5"
        )
        .unwrap();

        let stem = dir.path().join("interpose");
        let config = MockConfig::load_from(stem.to_str().unwrap()).unwrap();

        assert_eq!(config.fixtures.dir, PathBuf::from("/tmp/recorded"));
        assert_eq!(config.fixtures.format, FixtureFormat::CompressedJson);
        assert_eq!(config.transport.timeout_secs, 5);
        assert_eq!(config.logging.level, "info");
    }
}
