//! Capture record builder and filesystem persistence.
//!
//! One pretty-printed JSON file per capture, named from the sanitized
//! request timestamp.  No collision detection: two requests whose
//! timestamps sanitize identically overwrite each other (last write
//! wins); timestamps are caller-generated and expected distinct.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use pagecap_common::protocol::{CaptureRequest, CaptureSummary, FileEntry};
use pagecap_common::record::{CaptureRecord, RecordMetadata, RequestData};

use crate::analyze;
use crate::decode;
use crate::error::ApiError;

/// Filesystem-safe filename component from a request timestamp.
pub fn sanitize_timestamp(timestamp: &str) -> String {
    timestamp.replace([':', '-', '.'], "_")
}

pub fn record_file_name(timestamp: &str) -> String {
    format!("coupang_{}.json", sanitize_timestamp(timestamp))
}

/// Decode, analyze, assemble and persist one capture.
///
/// A malformed `url` fails here and surfaces as a 500 through the outer
/// error handler; validity is not checked ahead of time.
pub async fn save_capture(data_dir: &Path, request: &CaptureRequest) -> Result<CaptureSummary> {
    let decoded = decode::decode_html(&request.html_content);
    let mut analysis = analyze::run(&decoded);
    if analysis.error.is_none() {
        analysis.formatted_file = write_formatted(data_dir, &analysis.formatted_html).await;
    }

    let url_domain = url::Url::parse(&request.url)
        .with_context(|| format!("Malformed capture url: {}", request.url))?
        .host_str()
        .unwrap_or("")
        .to_string();

    let file_name = record_file_name(&request.timestamp);
    let saved_at = Utc::now().to_rfc3339();

    let record = CaptureRecord {
        metadata: RecordMetadata {
            saved_at: saved_at.clone(),
            file_name: file_name.clone(),
            html_size: decoded.chars().count(),
            html_size_original: request.html_content.chars().count(),
            html_size_formatted: analysis.formatted_html.chars().count(),
            url_domain,
            decoded: true,
            structured: true,
            html_stats: analysis.stats.clone(),
        },
        request_data: RequestData::from(request),
        html_analysis: analysis,
        html_content: decoded,
        original_html_content: request.html_content.clone(),
    };

    let json = serde_json::to_string_pretty(&record).context("Cannot serialize record")?;
    let path = data_dir.join(&file_name);
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Cannot write record {}", path.display()))?;

    info!(
        "Capture stored: {file_name} ({} chars decoded, {} original)",
        record.metadata.html_size, record.metadata.html_size_original
    );

    Ok(CaptureSummary {
        file_name,
        saved_at,
        html_size: record.metadata.html_size,
        html_size_original: record.metadata.html_size_original,
        capture_mode: request.capture_mode,
        decoded: true,
        url: request.url.clone(),
    })
}

/// Write the formatted sibling file, named by current epoch millis,
/// independent of the JSON record's filename.  A failed write degrades
/// to `None`; it never fails the capture.
async fn write_formatted(data_dir: &Path, formatted: &str) -> Option<String> {
    let name = format!("formatted_{}.html", Utc::now().timestamp_millis());
    match tokio::fs::write(data_dir.join(&name), formatted).await {
        Ok(()) => Some(name),
        Err(e) => {
            warn!("Cannot write formatted HTML {name}: {e}");
            None
        }
    }
}

/// List stored capture records, newest created first.  Records that can
/// no longer be parsed degrade to a stub entry instead of failing the
/// listing.
pub async fn list_captures(data_dir: &Path) -> Result<Vec<FileEntry>> {
    let mut entries: Vec<(SystemTime, FileEntry)> = Vec::new();

    let mut dir = tokio::fs::read_dir(data_dir)
        .await
        .with_context(|| format!("Cannot read data directory {}", data_dir.display()))?;

    while let Some(entry) = dir.next_entry().await.context("Cannot read directory entry")? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        // Records are write-once, so mtime stands in for birthtime.
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = DateTime::<Utc>::from(modified).to_rfc3339();
        let file_name = entry.file_name().to_string_lossy().to_string();

        let file_entry = match read_record(&path).await {
            Ok(record) => FileEntry {
                file_name,
                created,
                size: meta.len(),
                url: Some(record.request_data.url),
                timestamp: Some(record.request_data.timestamp),
                html_size: Some(record.metadata.html_size),
                error: None,
            },
            Err(e) => FileEntry {
                file_name,
                created,
                size: meta.len(),
                url: None,
                timestamp: None,
                html_size: None,
                error: Some(format!("{e:#}")),
            },
        };
        entries.push((modified, file_entry));
    }

    entries.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(entries.into_iter().map(|(_, e)| e).collect())
}

/// Read one capture record back.  An absent file is the 404 case;
/// unreadable or unparsable content is a 500.
pub async fn load_capture(data_dir: &Path, file_name: &str) -> Result<CaptureRecord, ApiError> {
    let path = data_dir.join(file_name);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => {
            return Err(ApiError::Internal(anyhow::Error::new(e).context(format!(
                "Cannot read record {}",
                path.display()
            ))));
        }
    };
    let record = serde_json::from_str(&text)
        .with_context(|| format!("Cannot parse record {}", path.display()))?;
    Ok(record)
}

async fn read_record(path: &Path) -> Result<CaptureRecord> {
    let text = tokio::fs::read_to_string(path).await.context("Cannot read record")?;
    let record = serde_json::from_str(&text).context("Cannot parse record")?;
    Ok(record)
}

// ─── tests ───────────────────────────────────────────────────────────────
