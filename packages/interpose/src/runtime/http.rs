// packages/interpose/src/runtime/http.rs
//! HTTP GET wrapper
//!
//! `http_get` never touches the network itself. It goes through
//! `curl.fetch_memory`, two calls down, which is the binding tests replace:
//!
//! ```text
//! http_get(url) → request("GET", url) → curl.fetch_memory(url) → CaptureRecord
//! ```

use crate::interception::registry::Registry;
use crate::recording::capture::CaptureRecord;
use crate::runtime::builtins::FETCH_MEMORY;
use crate::utils::errors::{MockError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::debug;

/// Parsed response
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status_code: u16,
    headers: Vec<(String, String)>,
    pub content: Bytes,
    pub times: BTreeMap<String, f64>,
}

impl Response {
    pub fn from_capture(record: CaptureRecord) -> Self {
        let headers = record.header_lines();

        Self {
            url: record.url,
            status_code: record.status_code,
            headers,
            content: record.content,
            times: record.times,
        }
    }

    /// First header with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| MockError::TransportFailed(format!("Body of {} is not UTF-8: {}", self.url, e)))
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.content)?)
    }

    /// Turn a non-2xx response into an error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MockError::HttpStatus {
                url: self.url,
                status: self.status_code,
            })
        }
    }
}

/// GET `url`
pub fn http_get(registry: &Registry, url: &str) -> Result<Response> {
    request(registry, "GET", url)
}

fn request(registry: &Registry, method: &str, url: &str) -> Result<Response> {
    debug!("{} {}", method, url);

    let fetched: Result<CaptureRecord> = registry.call(FETCH_MEMORY, url.to_string())?;
    let response = Response::from_capture(fetched?);

    debug!("{} {} -> {}", method, url, response.status_code);
    Ok(response)
}
