// packages/interpose/src/recording/capture.rs
//! Capture records: one real call's response, frozen for replay
//!
//! A record holds the response exactly as the transport produced it: the raw
//! header block in wire format, the raw body, and the timing breakdown.
//! Records are inert; substitutes hand them back in place of a real call.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recorded response of one transport call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Request target
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Header block as received, status line included
    #[serde(with = "raw_bytes", default)]
    pub headers: Bytes,

    /// Response body
    #[serde(with = "raw_bytes", default)]
    pub content: Bytes,

    /// Named phase durations, in seconds
    #[serde(default)]
    pub times: BTreeMap<String, f64>,

    /// When the record was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl CaptureRecord {
    /// Start a record with an empty `HTTP/1.1 <status>` header block
    pub fn new(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            status_code,
            headers: Bytes::from(format!("HTTP/1.1 {}\r\n\r\n", status_code)),
            content: Bytes::new(),
            times: BTreeMap::new(),
            recorded_at: None,
        }
    }

    /// Append a header line to the raw header block
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let updated = {
            let block = String::from_utf8_lossy(&self.headers);
            let head = block.trim_end_matches("\r\n");
            format!("{}\r\n{}: {}\r\n\r\n", head, name, value)
        };
        self.headers = Bytes::from(updated);
        self
    }

    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    /// Serialize `value` as the body and set a JSON content type
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        let body = value.to_string();
        self.with_header("Content-Type", "application/json")
            .with_content(body)
    }

    pub fn with_time(mut self, phase: impl Into<String>, seconds: f64) -> Self {
        self.times.insert(phase.into(), seconds);
        self
    }

    pub fn recorded_now(mut self) -> Self {
        self.recorded_at = Some(Utc::now());
        self
    }

    /// Header lines after the status line
    pub fn header_lines(&self) -> Vec<(String, String)> {
        String::from_utf8_lossy(&self.headers)
            .split("\r\n")
            .skip(1)
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Total time, falling back to the sum of phases
    pub fn total_time(&self) -> f64 {
        self.times
            .get("total")
            .copied()
            .unwrap_or_else(|| self.times.values().sum())
    }
}

/// Bytes stored as a string when valid UTF-8, as a byte array otherwise
mod raw_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Binary(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(bytes) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.collect_seq(bytes.iter()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Bytes::from(text),
            Repr::Binary(raw) => Bytes::from(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn httpbin() -> CaptureRecord {
        CaptureRecord::new("http://httpbin.org/get", 200)
            .with_header("Host", "httpbin.org")
            .with_json(&serde_json::json!({"url": "http://httpbin.org/get"}))
            .with_time("namelookup", 0.01)
            .with_time("connect", 0.02)
    }

    #[test]
    fn test_header_block_is_wire_format() {
        let record = httpbin();
        let block = std::str::from_utf8(&record.headers).unwrap();

        assert!(block.starts_with("HTTP/1.1 200\r\n"));
        assert!(block.ends_with("\r\n\r\n"));
        assert_eq!(
            record.header_lines(),
            vec![
                ("Host".to_string(), "httpbin.org".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn test_total_time() {
        let record = httpbin();
        assert!((record.total_time() - 0.03).abs() < 1e-9);

        let record = record.with_time("total", 0.5);
        assert_eq!(record.total_time(), 0.5);
    }

    #[test]
    fn test_json_fixture_is_readable() {
        let record = httpbin();
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"status_code\":200"));
        assert!(json.contains("Host: httpbin.org"));
        assert!(!json.contains("recorded_at"));

        let back: CaptureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_binary_body_kept_as_bytes() {
        let record = CaptureRecord::new("http://example.com/img", 200)
            .with_content(vec![0xff, 0x00, 0xfe]);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("[255,0,254]"));

        let back: CaptureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(&back.content[..], &[0xff, 0x00, 0xfe]);
    }
}
