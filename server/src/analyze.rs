//! HTML structural analyzer – parses decoded markup into stats, structure
//! facts and targeted section extracts.
//!
//! Parsing is forgiving: the HTML5 parser auto-closes unclosed tags and
//! recovers from structural errors, so no input is ever rejected.  The
//! whole stage runs behind an unwind boundary; if anything inside it
//! panics the caller gets the degraded [`HtmlAnalysis`] variant and the
//! capture request still succeeds.

use std::collections::HashSet;

use dom_query::{Document, Selection};
use tracing::warn;

use pagecap_common::record::{
    DivSummary, FormSummary, HtmlAnalysis, MetaTag, NavSummary, SectionExtract,
    StructuralMetadata, StructuralStats,
};

use crate::format;

/// Class-attribute substrings that mark an element as navigation-like.
/// A fixed selector set, not a general heuristic.
const NAV_CLASS_MARKERS: &[&str] = &["nav", "navigation", "menu"];

/// Run the analyze-and-format pipeline over decoded HTML.
///
/// CPU-only: `formatted_file` is left `None` here and filled in by the
/// storage layer once the sibling file write lands.
pub fn run(decoded: &str) -> HtmlAnalysis {
    run_guarded(|| analyze_document(decoded), decoded)
}

/// The unwind boundary, separated from [`run`] so tests can drive the
/// degraded path directly.
fn run_guarded<F>(analysis: F, decoded: &str) -> HtmlAnalysis
where
    F: FnOnce() -> (StructuralStats, StructuralMetadata, SectionExtract),
{
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(analysis));
    let (stats, structure, sections) = match outcome {
        Ok(parts) => parts,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("HTML analysis failed, storing degraded record: {message}");
            return HtmlAnalysis::failed(message);
        }
    };

    let (formatted_html, _fell_back) = format::canonical_or_original(decoded);

    HtmlAnalysis {
        stats,
        structure,
        sections,
        formatted_html,
        formatted_file: None,
        analysis_timestamp: chrono::Utc::now().to_rfc3339(),
        error: None,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "HTML analysis failed".to_string())
}

// ─── extraction ──────────────────────────────────────────────────────────

fn analyze_document(decoded: &str) -> (StructuralStats, StructuralMetadata, SectionExtract) {
    let doc = Document::from(decoded);
    (
        collect_stats(&doc),
        collect_structure(&doc, decoded),
        collect_sections(&doc),
    )
}

fn count(doc: &Document, selector: &str) -> usize {
    doc.select(selector).nodes().len()
}

fn collect_stats(doc: &Document) -> StructuralStats {
    // Verbatim attribute values: "btn btn-primary" is one class entry.
    let mut classes: HashSet<String> = HashSet::new();
    for node in doc.select("[class]").nodes() {
        if let Some(value) = Selection::from(*node).attr("class") {
            classes.insert(value.to_string());
        }
    }
    let mut ids: HashSet<String> = HashSet::new();
    for node in doc.select("[id]").nodes() {
        if let Some(value) = Selection::from(*node).attr("id") {
            ids.insert(value.to_string());
        }
    }

    StructuralStats {
        total_elements: count(doc, "*"),
        head_elements: count(doc, "head *"),
        body_elements: count(doc, "body *"),
        div_count: count(doc, "div"),
        span_count: count(doc, "span"),
        link_count: count(doc, "a"),
        img_count: count(doc, "img"),
        script_count: count(doc, "script"),
        style_count: count(doc, "style"),
        form_count: count(doc, "form"),
        input_count: count(doc, "input"),
        button_count: count(doc, "button"),
        table_count: count(doc, "table"),
        unique_classes: classes.len(),
        unique_ids: ids.len(),
    }
}

fn collect_structure(doc: &Document, raw: &str) -> StructuralMetadata {
    let title = doc
        .select("title")
        .nodes()
        .first()
        .map(|n| Selection::from(*n).text().trim().to_string())
        .unwrap_or_default();

    let meta_tags = doc
        .select("meta")
        .nodes()
        .iter()
        .map(|n| {
            let meta = Selection::from(*n);
            MetaTag {
                name: attr(&meta, "name"),
                content: attr(&meta, "content"),
                property: attr(&meta, "property"),
            }
        })
        .collect();

    let stylesheets = doc
        .select("link[rel='stylesheet']")
        .nodes()
        .iter()
        .filter_map(|n| attr(&Selection::from(*n), "href"))
        .collect();

    let scripts = doc
        .select("script[src]")
        .nodes()
        .iter()
        .filter_map(|n| attr(&Selection::from(*n), "src"))
        .collect();

    StructuralMetadata {
        doctype: if raw.contains("<!DOCTYPE") {
            "HTML5".to_string()
        } else {
            "Legacy".to_string()
        },
        has_head: doc.select("head").exists(),
        has_body: doc.select("body").exists(),
        title,
        meta_tags,
        stylesheets,
        scripts,
    }
}

fn collect_sections(doc: &Document) -> SectionExtract {
    let head_content = doc.select("head").inner_html().to_string();

    // Outer markup: the element's full serialized form, own tag included.
    let body_first_child = doc
        .select("body > *")
        .nodes()
        .first()
        .map(|n| Selection::from(*n).html().to_string());

    let top_level_divs = doc
        .select("body > div")
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, n)| {
            let div = Selection::from(*n);
            DivSummary {
                index,
                id: attr(&div, "id"),
                class: attr(&div, "class"),
                tag: tag_name(&div).unwrap_or_else(|| "div".to_string()),
                children_count: div.children().nodes().len(),
                text_length: div.text().chars().count(),
            }
        })
        .collect();

    let mut navigation = Vec::new();
    for node in doc.select("*").nodes() {
        let el = Selection::from(*node);
        let Some(tag) = tag_name(&el) else { continue };
        let class = attr(&el, "class");
        let class_is_nav = class.as_deref().is_some_and(|c| {
            NAV_CLASS_MARKERS.iter().any(|marker| c.contains(marker))
        });
        if tag == "nav" || class_is_nav {
            navigation.push(NavSummary {
                tag,
                class,
                link_count: el.select("a").nodes().len(),
            });
        }
    }

    let forms = doc
        .select("form")
        .nodes()
        .iter()
        .map(|n| {
            let form = Selection::from(*n);
            FormSummary {
                action: attr(&form, "action"),
                method: attr(&form, "method"),
                input_count: form.select("input").nodes().len(),
            }
        })
        .collect();

    SectionExtract {
        head_content,
        body_first_child,
        top_level_divs,
        navigation,
        forms,
    }
}

fn attr(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|v| v.to_string())
}

fn tag_name(sel: &Selection) -> Option<String> {
    sel.nodes()
        .first()
        .and_then(dom_query::NodeRef::node_name)
        .map(|t| t.to_string())
}

// ─── tests ───────────────────────────────────────────────────────────────
