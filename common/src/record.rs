//! Persisted capture-record types.
//!
//! A `CaptureRecord` is written exactly once per successful POST and never
//! mutated afterward.  The analysis block inside it is allowed to degrade
//! (see [`HtmlAnalysis::failed`]) but the record itself is all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::protocol::{CaptureMode, CaptureRequest};

/// Element and attribute counts over the parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralStats {
    pub total_elements: usize,
    pub head_elements: usize,
    pub body_elements: usize,
    pub div_count: usize,
    pub span_count: usize,
    pub link_count: usize,
    pub img_count: usize,
    pub script_count: usize,
    pub style_count: usize,
    pub form_count: usize,
    pub input_count: usize,
    pub button_count: usize,
    pub table_count: usize,
    /// Distinct verbatim `class` attribute values (not split into tokens).
    pub unique_classes: usize,
    /// Distinct `id` attribute values.
    pub unique_ids: usize,
}

/// One `<meta>` element; any of the three attributes may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// Document-level structure facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralMetadata {
    /// "HTML5" when the raw text carries a `<!DOCTYPE` marker, else "Legacy".
    pub doctype: String,
    pub has_head: bool,
    pub has_body: bool,
    /// Text of the first `<title>` element, or empty.
    pub title: String,
    pub meta_tags: Vec<MetaTag>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
}

/// One top-level `<div>` directly under `<body>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivSummary {
    pub index: usize,
    pub id: Option<String>,
    pub class: Option<String>,
    pub tag: String,
    pub children_count: usize,
    pub text_length: usize,
}

/// A navigation-like element: `<nav>`, or any element whose class
/// contains "nav", "navigation" or "menu".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavSummary {
    pub tag: String,
    pub class: Option<String>,
    pub link_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSummary {
    pub action: Option<String>,
    pub method: Option<String>,
    pub input_count: usize,
}

/// Targeted extracts of the interesting parts of the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionExtract {
    /// Inner markup of `<head>`.
    pub head_content: String,
    /// Outer markup of the first element child of `<body>`, when present.
    pub body_first_child: Option<String>,
    pub top_level_divs: Vec<DivSummary>,
    pub navigation: Vec<NavSummary>,
    pub forms: Vec<FormSummary>,
}

/// Output of the decode/analyze/format pipeline for one capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtmlAnalysis {
    pub stats: StructuralStats,
    pub structure: StructuralMetadata,
    pub sections: SectionExtract,
    pub formatted_html: String,
    /// Name of the sibling formatted-HTML file, when the write succeeded.
    pub formatted_file: Option<String>,
    /// ISO-8601 analysis timestamp.
    pub analysis_timestamp: String,
    /// Populated only in the degraded variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HtmlAnalysis {
    /// Degraded analysis: error message plus zeroed/empty fields.  Used
    /// when analysis fails for any reason; the capture still succeeds.
    pub fn failed(message: impl Into<String>) -> Self {
        HtmlAnalysis {
            analysis_timestamp: chrono::Utc::now().to_rfc3339(),
            error: Some(message.into()),
            ..HtmlAnalysis::default()
        }
    }
}

/// Bookkeeping block of the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub saved_at: String,
    pub file_name: String,
    /// Decoded HTML size.
    pub html_size: usize,
    /// HTML size exactly as received.
    pub html_size_original: usize,
    pub html_size_formatted: usize,
    pub url_domain: String,
    pub decoded: bool,
    pub structured: bool,
    pub html_stats: StructuralStats,
}

/// The request fields minus the HTML payload itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestData {
    pub timestamp: String,
    pub url: String,
    pub source: Option<String>,
    pub app_version: Option<String>,
    pub user_agent: Option<String>,
    pub capture_mode: CaptureMode,
}

impl From<&CaptureRequest> for RequestData {
    fn from(req: &CaptureRequest) -> Self {
        RequestData {
            timestamp: req.timestamp.clone(),
            url: req.url.clone(),
            source: req.source.clone(),
            app_version: req.app_version.clone(),
            user_agent: req.user_agent.clone(),
            capture_mode: req.capture_mode,
        }
    }
}

/// The persisted unit: one JSON file per capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub metadata: RecordMetadata,
    pub request_data: RequestData,
    pub html_analysis: HtmlAnalysis,
    /// Decoded HTML.
    pub html_content: String,
    /// HTML exactly as received, before escape decoding.
    pub original_html_content: String,
}
