//! Page context probing and PDF classification.
//!
//! The bridge receives raw tab reports ([`TabInfo`]) from the browser shim and
//! derives a fresh [`PageContext`] from the latest one on every request. The
//! interesting part is PDF classification: browsers render PDFs through many
//! different viewer URLs, so a single extension check is not enough.
//!
//! # Classification rules
//!
//! The rules are checked in order; any match classifies the page as a PDF:
//!
//! 1. URL path ends with `.pdf` (query string and fragment stripped)
//! 2. URL contains `.pdf` anywhere (covers query-string file references)
//! 3. URL contains a viewer path segment: `/pdf/`, `pdf=`, or `file=` + `pdf`
//! 4. Google Drive file-viewer URL (`drive.google.com` + `/file/d/`)
//! 5. URL contains `pdfviewer` or `pdf-viewer`
//! 6. Page title ends with `.pdf`
//! 7. Browser-extension viewer URL containing `pdf`
//!
//! This rule set is canonical for the whole client — command availability and
//! capture routing use the same classifier.

use serde::{Deserialize, Serialize};

use crate::models::{PageContext, PdfSource};

/// Raw facts about the active tab, as reported by the browser shim.
///
/// `selection` is best-effort: reading the page selection can fail (protected
/// pages, viewer frames), in which case the shim reports an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub selection: String,
}

/// Returns true if the page should be treated as a PDF document.
pub fn is_pdf_page(url: &str, title: &str) -> bool {
    let url = url.to_lowercase();
    let title = title.to_lowercase();

    // Path ends with .pdf (ignore query string and fragment)
    let path = url.split(['?', '#']).next().unwrap_or(url.as_str());
    if path.ends_with(".pdf") {
        return true;
    }
    if url.contains(".pdf") {
        return true;
    }
    if url.contains("/pdf/")
        || url.contains("pdf=")
        || (url.contains("file=") && url.contains("pdf"))
    {
        return true;
    }
    if url.contains("drive.google.com") && url.contains("/file/d/") {
        return true;
    }
    if url.contains("pdfviewer") || url.contains("pdf-viewer") {
        return true;
    }
    if title.ends_with(".pdf") {
        return true;
    }
    // Built-in extension viewers (chrome-extension://... , moz-extension://...)
    if is_extension_url(&url) && url.contains("pdf") {
        return true;
    }

    false
}

fn is_extension_url(url: &str) -> bool {
    url.starts_with("chrome-extension://")
        || url.starts_with("moz-extension://")
        || url.starts_with("edge-extension://")
}

/// Classifies where a PDF is served from. Only meaningful for PDF pages.
pub fn pdf_source(url: &str) -> PdfSource {
    if url.to_lowercase().starts_with("file:") {
        PdfSource::Local
    } else {
        PdfSource::Online
    }
}

impl PageContext {
    /// Derives a fresh context from a tab report.
    pub fn from_tab(tab: &TabInfo) -> Self {
        let is_pdf = is_pdf_page(&tab.url, &tab.title);
        PageContext {
            selected_text: tab.selection.clone(),
            current_url: tab.url.clone(),
            page_title: tab.title.clone(),
            is_pdf,
            pdf_source: is_pdf.then(|| pdf_source(&tab.url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(url: &str, title: &str) -> PageContext {
        PageContext::from_tab(&TabInfo {
            url: url.to_string(),
            title: title.to_string(),
            selection: String::new(),
        })
    }

    #[test]
    fn test_pdf_extension_online() {
        let c = ctx("https://example.com/report.pdf", "report");
        assert!(c.is_pdf);
        assert_eq!(c.pdf_source, Some(PdfSource::Online));
    }

    #[test]
    fn test_pdf_local_file() {
        let c = ctx("file:///C:/docs/report.pdf", "report.pdf");
        assert!(c.is_pdf);
        assert_eq!(c.pdf_source, Some(PdfSource::Local));
    }

    #[test]
    fn test_pdf_in_query_string() {
        assert!(is_pdf_page("https://example.com/view?doc=paper.pdf", ""));
    }

    #[test]
    fn test_pdf_viewer_path_segment() {
        assert!(is_pdf_page("https://arxiv.org/pdf/2301.00001", "paper"));
        assert!(is_pdf_page("https://example.com/viewer?pdf=123", ""));
        assert!(is_pdf_page("https://example.com/open?file=123&kind=pdf", ""));
    }

    #[test]
    fn test_google_drive_file_viewer() {
        let c = ctx("https://drive.google.com/file/d/abc123/view", "My Doc");
        assert!(c.is_pdf);
        assert_eq!(c.pdf_source, Some(PdfSource::Online));
    }

    #[test]
    fn test_named_pdf_viewer() {
        assert!(is_pdf_page("https://example.com/pdfviewer/abc", ""));
        assert!(is_pdf_page("https://example.com/pdf-viewer?id=1", ""));
    }

    #[test]
    fn test_title_suffix() {
        assert!(is_pdf_page("https://example.com/view/123", "quarterly-results.PDF"));
    }

    #[test]
    fn test_extension_viewer() {
        assert!(is_pdf_page(
            "chrome-extension://abcdef/pdf/index.html?src=x",
            ""
        ));
        // Extension URL without a pdf hint is not a PDF
        assert!(!is_pdf_page("chrome-extension://abcdef/popup.html", ""));
    }

    #[test]
    fn test_non_pdf_document() {
        let c = ctx("https://example.com/report.docx", "report");
        assert!(!c.is_pdf);
        assert_eq!(c.pdf_source, None);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_pdf_page("https://example.com/REPORT.PDF", ""));
    }

    #[test]
    fn test_fragment_stripped_for_path_rule() {
        assert!(is_pdf_page("https://example.com/report.pdf#page=4", ""));
    }

    #[test]
    fn test_selection_carried_through() {
        let c = PageContext::from_tab(&TabInfo {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            selection: "Hello world".to_string(),
        });
        assert_eq!(c.selected_text, "Hello world");
        assert!(!c.is_pdf);
    }
}
