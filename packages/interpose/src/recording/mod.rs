// packages/interpose/src/recording/mod.rs
//! Capture records and call recording
//!
//! - **Capture**: the fixture type substitutes replay in place of real calls
//! - **Call Log**: records the calls a substitute receives
//! - **Fixture Store**: JSON / YAML / zstd fixture files on disk
//! - **Compressor**: zstd for large fixtures
//! - **Exporter**: JSON and HAR export of fixture sets
//!
//! # Workflow
//!
//! ```text
//! once, with network:   real transport → CaptureRecord → FixtureStore::save
//! every test run:       FixtureStore::load → substitute returns the record
//! ```

pub mod call_log;
pub mod capture;
pub mod compressor;
pub mod exporter;
pub mod fixture_store;

// Re-export commonly used types
pub use call_log::{CallLog, RecordedCall};
pub use capture::CaptureRecord;
pub use compressor::{CompressionLevel, Compressor};
pub use exporter::{ExportFormat, Exporter};
pub use fixture_store::{FixtureFormat, FixtureStore};
