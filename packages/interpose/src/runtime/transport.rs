// packages/interpose/src/runtime/transport.rs
//! Real HTTP transport behind `curl.fetch_memory`
//!
//! Performs one plain-HTTP GET and freezes the response into a
//! [`CaptureRecord`]. This is the call tests substitute; it only runs when
//! nothing is mocked, or deliberately once to capture a fixture.
//!
//! The fetch drives its own current-thread runtime, so it must not be called
//! from inside another tokio runtime.

use crate::recording::capture::CaptureRecord;
use crate::utils::errors::{MockError, Result};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Empty};
use hyper::{HeaderMap, StatusCode, Uri, Version};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// GET `url` and capture the response
pub fn fetch_memory(url: &str, timeout: Duration) -> Result<CaptureRecord> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| MockError::TransportFailed(format!("Failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        match tokio::time::timeout(timeout, fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(MockError::TransportFailed(format!(
                "Request to {} timed out after {:?}",
                url, timeout
            ))),
        }
    })
}

async fn fetch(url: &str) -> Result<CaptureRecord> {
    let uri: Uri = url
        .parse()
        .map_err(|e| MockError::TransportFailed(format!("Invalid URL {}: {}", url, e)))?;

    if uri.scheme_str() != Some("http") {
        return Err(MockError::TransportFailed(format!(
            "Unsupported scheme in {}: only http is handled",
            url
        )));
    }

    let client: Client<HttpConnector, Empty<Bytes>> =
        Client::builder(TokioExecutor::new()).build_http();

    info!("Fetching {}", url);
    let started = Instant::now();

    let response = client
        .get(uri)
        .await
        .map_err(|e| MockError::TransportFailed(format!("Request to {} failed: {}", url, e)))?;
    let starttransfer = started.elapsed();

    let status = response.status();
    let headers = header_block(response.version(), status, response.headers());

    let content = response
        .into_body()
        .collect()
        .await
        .map_err(|e| MockError::TransportFailed(format!("Response body error: {}", e)))?
        .to_bytes();
    let total = started.elapsed();

    debug!(
        "Fetched {} ({}, {} bytes) in {:?}",
        url,
        status,
        content.len(),
        total
    );

    let times = BTreeMap::from([
        ("starttransfer".to_string(), starttransfer.as_secs_f64()),
        ("total".to_string(), total.as_secs_f64()),
    ]);

    Ok(CaptureRecord {
        url: url.to_string(),
        status_code: status.as_u16(),
        headers,
        content,
        times,
        recorded_at: Some(Utc::now()),
    })
}

/// Rebuild the wire-format header block: status line, headers, blank line
fn header_block(version: Version, status: StatusCode, headers: &HeaderMap) -> Bytes {
    let mut block = format!("{:?} {}\r\n", version, status);

    for (name, value) in headers {
        block.push_str(&format!(
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    block.push_str("\r\n");

    Bytes::from(block)
}
