// packages/interpose/src/recording/exporter.rs
//! Export capture records
//!
//! Supports:
//! - JSON (the fixture list as stored)
//! - HAR (HTTP Archive 1.2), for browser devtools and HAR viewers

use crate::recording::capture::CaptureRecord;
use crate::utils::errors::{MockError, Result};
use serde::Serialize;
use tracing::debug;

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Har,
}

/// Exporter for capture records
pub struct Exporter {
    format: ExportFormat,
}

impl Exporter {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Export named records to a string
    pub fn export(&self, records: &[(String, CaptureRecord)]) -> Result<String> {
        debug!("Exporting {} records as {:?}", records.len(), self.format);

        match self.format {
            ExportFormat::Json => self.export_json(records),
            ExportFormat::Har => self.export_har(records),
        }
    }

    fn export_json(&self, records: &[(String, CaptureRecord)]) -> Result<String> {
        let by_name: serde_json::Map<String, serde_json::Value> = records
            .iter()
            .map(|(name, record)| -> Result<(String, serde_json::Value)> {
                Ok((name.clone(), serde_json::to_value(record)?))
            })
            .collect::<Result<_>>()?;

        serde_json::to_string_pretty(&by_name)
            .map_err(|e| MockError::ExportFailed(format!("JSON serialization error: {}", e)))
    }

    fn export_har(&self, records: &[(String, CaptureRecord)]) -> Result<String> {
        let har = HarDocument {
            log: HarLog {
                version: "1.2".to_string(),
                creator: HarCreator {
                    name: "interpose".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                entries: records.iter().map(|(name, record)| har_entry(name, record)).collect(),
            },
        };

        serde_json::to_string_pretty(&har)
            .map_err(|e| MockError::ExportFailed(format!("HAR serialization error: {}", e)))
    }
}

fn har_entry(name: &str, record: &CaptureRecord) -> HarEntry {
    let header_block = String::from_utf8_lossy(&record.headers);
    let status_line = header_block.lines().next().unwrap_or_default();
    let (http_version, status_text) = parse_status_line(status_line);

    let headers: Vec<HarHeader> = record
        .header_lines()
        .into_iter()
        .map(|(name, value)| HarHeader { name, value })
        .collect();

    let mime_type = headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-type"))
        .map(|h| h.value.clone())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let ms = |phase: &str| record.times.get(phase).map(|s| s * 1000.0).unwrap_or(-1.0);

    HarEntry {
        started_date_time: record
            .recorded_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string()),
        time: record.total_time() * 1000.0,
        request: HarRequest {
            method: "GET".to_string(),
            url: record.url.clone(),
            http_version: http_version.clone(),
        },
        response: HarResponse {
            status: record.status_code,
            status_text,
            http_version,
            headers,
            content: HarContent {
                size: record.content.len(),
                mime_type,
                text: String::from_utf8_lossy(&record.content).into_owned(),
            },
        },
        timings: HarTimings {
            dns: ms("namelookup"),
            connect: ms("connect"),
            wait: ms("starttransfer"),
        },
        comment: name.to_string(),
    }
}

/// Split `HTTP/1.1 200 OK` into version and reason phrase
fn parse_status_line(line: &str) -> (String, String) {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("HTTP/1.1").to_string();
    let _code = parts.next();
    let reason = parts.next().unwrap_or_default().to_string();
    (version, reason)
}

// HAR format structures
#[derive(Serialize)]
struct HarDocument {
    log: HarLog,
}

#[derive(Serialize)]
struct HarLog {
    version: String,
    creator: HarCreator,
    entries: Vec<HarEntry>,
}

#[derive(Serialize)]
struct HarCreator {
    name: String,
    version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarEntry {
    started_date_time: String,
    time: f64,
    request: HarRequest,
    response: HarResponse,
    timings: HarTimings,
    comment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarRequest {
    method: String,
    url: String,
    http_version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: u16,
    status_text: String,
    http_version: String,
    headers: Vec<HarHeader>,
    content: HarContent,
}

#[derive(Serialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarContent {
    size: usize,
    mime_type: String,
    text: String,
}

#[derive(Serialize)]
struct HarTimings {
    dns: f64,
    connect: f64,
    wait: f64,
}
