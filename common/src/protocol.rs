//! HTTP protocol types shared between the capture endpoints and clients.

use serde::{Deserialize, Serialize};

use crate::record::CaptureRecord;

/// How the client captured the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    #[default]
    FullHtml,
    ProductSections,
}

/// Inbound capture submission.
///
/// `timestamp`, `url` and `html_content` are required; their absence is a
/// validation error reported with the field names actually received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub timestamp: String,
    pub url: String,
    /// Raw HTML as received, possibly escape-encoded for JSON transport.
    pub html_content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub capture_mode: CaptureMode,
}

/// Summary returned in the 201 body after a capture is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub file_name: String,
    /// ISO-8601 save timestamp.
    pub saved_at: String,
    /// Decoded HTML size in characters.
    pub html_size: usize,
    /// Size of the HTML exactly as received.
    pub html_size_original: usize,
    pub capture_mode: CaptureMode,
    pub decoded: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureAccepted {
    pub success: bool,
    pub message: String,
    pub data: CaptureSummary,
}

/// One entry in the `GET /list` response.  Records that cannot be read
/// back degrade to a stub carrying only file facts and an error note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_name: String,
    /// ISO-8601 creation timestamp.
    pub created: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub files: Vec<FileEntry>,
}

/// Envelope for `GET /view/{filename}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResponse {
    pub success: bool,
    pub data: CaptureRecord,
}

/// Health-check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    /// Seconds since process start.
    pub uptime: u64,
    pub data_directory: String,
}
