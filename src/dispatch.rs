//! Capture dispatching.
//!
//! Takes the pending capture input, decides which backend call it maps to,
//! and performs it. Classification is strict-order, first match wins:
//!
//! 1. An explicitly chosen local file is always a PDF upload — no text
//!    classification happens at all.
//! 2. A structured descriptor routes by its tag: `pdf` fetches the document
//!    bytes and uploads them, `url` saves the link, `selection` saves the
//!    text with the originating page URL as context.
//! 3. Plain text is saved as a URL capture when it parses as an absolute URL,
//!    otherwise as a selection capture.
//!
//! Input normally arrives already discriminated ([`CaptureInput`]); raw
//! strings are classified once at the boundary by [`CaptureInput::classify`].
//!
//! A dispatch in flight cannot be cancelled. Re-entrancy is prevented by an
//! in-flight flag: a second save while one is pending fails fast without
//! touching the network.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::api::BackendClient;
use crate::models::CaptureDescriptor;

/// The pending capture value, discriminated at the boundary instead of being
/// re-parsed from a string on every save.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureInput {
    /// Free text typed or captured from the page.
    Text(String),
    /// A structured capture produced by a slash command.
    Descriptor(CaptureDescriptor),
    /// A local file explicitly chosen for upload.
    File(PathBuf),
}

impl CaptureInput {
    /// Classifies a raw input string.
    ///
    /// JSON that parses into a known descriptor becomes structured input
    /// (this is how a serialized `/pdf` descriptor re-enters the pipeline);
    /// everything else stays text.
    pub fn classify(raw: &str) -> CaptureInput {
        match serde_json::from_str::<CaptureDescriptor>(raw) {
            Ok(descriptor) => CaptureInput::Descriptor(descriptor),
            Err(_) => CaptureInput::Text(raw.to_string()),
        }
    }
}

/// Returns true if the text is a well-formed absolute URL.
pub fn is_url(text: &str) -> bool {
    reqwest::Url::parse(text.trim()).is_ok()
}

/// Derives the upload filename for a fetched PDF: the descriptor title if
/// present, else the last path segment of the URL, else `document.pdf`.
pub fn pdf_file_name(title: &str, url: &str) -> String {
    let title = title.trim();
    if !title.is_empty() {
        return title.to_string();
    }
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(segments) = parsed.path_segments() {
            if let Some(last) = segments.filter(|s| !s.is_empty()).last() {
                return last.to_string();
            }
        }
    }
    "document.pdf".to_string()
}

/// Routes capture inputs to the backend.
pub struct Dispatcher {
    client: BackendClient,
    fetcher: reqwest::Client,
    in_flight: AtomicBool,
}

impl Dispatcher {
    /// `fetch_timeout` bounds the PDF byte fetch, which is a separate request
    /// from the backend upload.
    pub fn new(client: BackendClient, fetch_timeout: Duration) -> Result<Self> {
        let fetcher = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .context("failed to build PDF fetch client")?;
        Ok(Self {
            client,
            fetcher,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Dispatches one capture. Returns the backend's success message.
    ///
    /// Preconditions checked before any network call:
    /// - `collection` must be non-blank,
    /// - text input must be non-blank (files and descriptors carry their own
    ///   content).
    ///
    /// `page_url` is the active tab's URL, attached as context to selection
    /// captures when known.
    pub async fn dispatch(
        &self,
        input: CaptureInput,
        collection: &str,
        page_url: Option<&str>,
    ) -> Result<String> {
        if collection.trim().is_empty() {
            bail!("select a knowledge base before saving");
        }
        if let CaptureInput::Text(text) = &input {
            if text.trim().is_empty() {
                bail!("nothing to capture: enter text, a URL, or choose a file");
            }
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            bail!("a capture is already in progress");
        }
        let result = self.route(input, collection, page_url).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn route(
        &self,
        input: CaptureInput,
        collection: &str,
        page_url: Option<&str>,
    ) -> Result<String> {
        match input {
            CaptureInput::File(path) => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("could not read file: {}", path.display()))?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("document.pdf")
                    .to_string();
                self.client.capture_pdf(collection, &name, bytes).await
            }
            CaptureInput::Descriptor(CaptureDescriptor::Pdf { url, title, .. }) => {
                let bytes = self.fetch_pdf_bytes(&url).await?;
                let name = pdf_file_name(&title, &url);
                self.client.capture_pdf(collection, &name, bytes).await
            }
            CaptureInput::Descriptor(CaptureDescriptor::Url { content }) => {
                self.client.capture_url(collection, &content).await
            }
            CaptureInput::Descriptor(CaptureDescriptor::Selection { content }) => {
                self.client
                    .capture_selection(collection, &content, page_url)
                    .await
            }
            CaptureInput::Text(text) => {
                let text = text.trim();
                if is_url(text) {
                    self.client.capture_url(collection, text).await
                } else {
                    self.client
                        .capture_selection(collection, text, page_url)
                        .await
                }
            }
        }
    }

    /// Reads the PDF bytes behind a descriptor URL. Works for both local
    /// `file:` URLs and remote ones; failures carry a remediation hint since
    /// the user can always upload the file directly.
    async fn fetch_pdf_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if let Ok(parsed) = reqwest::Url::parse(url) {
            if parsed.scheme() == "file" {
                let path = parsed.to_file_path().map_err(|_| {
                    anyhow::anyhow!(
                        "could not read the local PDF at {}; upload the file directly instead",
                        url
                    )
                })?;
                return std::fs::read(&path).map_err(|e| {
                    anyhow::anyhow!(
                        "could not read the local PDF at {} ({}); upload the file directly instead",
                        path.display(),
                        e
                    )
                });
            }
        }

        let failed = |detail: String| {
            anyhow::anyhow!(
                "could not fetch the PDF from {} ({}); upload the file directly instead",
                url,
                detail
            )
        };
        let response = self
            .fetcher
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PdfSource;

    #[test]
    fn test_classify_plain_text() {
        assert_eq!(
            CaptureInput::classify("Hello world"),
            CaptureInput::Text("Hello world".to_string())
        );
    }

    #[test]
    fn test_classify_pdf_descriptor() {
        let raw = r#"{"type":"pdf","source":"online","url":"https://a.com/x.pdf","title":"","timestamp":1}"#;
        match CaptureInput::classify(raw) {
            CaptureInput::Descriptor(CaptureDescriptor::Pdf { source, .. }) => {
                assert_eq!(source, PdfSource::Online)
            }
            other => panic!("expected pdf descriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unknown_json_stays_text() {
        // JSON without a recognizable type falls through to text handling.
        let raw = r#"{"type":"bookmark","content":"x"}"#;
        assert_eq!(CaptureInput::classify(raw), CaptureInput::Text(raw.to_string()));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/page?q=1"));
        assert!(is_url("  https://example.com  "));
        assert!(is_url("file:///tmp/report.pdf"));
        assert!(!is_url("Hello world"));
        assert!(!is_url("example.com/page"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_pdf_file_name_prefers_title() {
        assert_eq!(
            pdf_file_name("Quarterly Report", "https://a.com/q3.pdf"),
            "Quarterly Report"
        );
    }

    #[test]
    fn test_pdf_file_name_last_segment() {
        assert_eq!(
            pdf_file_name("", "https://a.com/docs/report.pdf?dl=1"),
            "report.pdf"
        );
    }

    #[test]
    fn test_pdf_file_name_default() {
        assert_eq!(pdf_file_name("", "https://a.com/"), "document.pdf");
        assert_eq!(pdf_file_name("  ", "https://a.com"), "document.pdf");
    }

    fn test_dispatcher() -> Dispatcher {
        // Unroutable backend: precondition tests must fail before any I/O.
        let client =
            BackendClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        Dispatcher::new(client, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_requires_collection() {
        let d = test_dispatcher();
        let err = d
            .dispatch(CaptureInput::Text("hello".to_string()), "  ", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("knowledge base"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_blank_text() {
        let d = test_dispatcher();
        let err = d
            .dispatch(CaptureInput::Text("   ".to_string()), "research", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to capture"));
    }

    #[tokio::test]
    async fn test_in_flight_flag_resets_after_failure() {
        let d = test_dispatcher();
        // First attempt fails at the network layer...
        let first = d
            .dispatch(CaptureInput::Text("hello".to_string()), "research", None)
            .await
            .unwrap_err();
        assert!(!first.to_string().contains("already in progress"));
        // ...and the guard must be released for the retry.
        let second = d
            .dispatch(CaptureInput::Text("hello".to_string()), "research", None)
            .await
            .unwrap_err();
        assert!(!second.to_string().contains("already in progress"));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_an_error() {
        let d = test_dispatcher();
        let err = d
            .dispatch(
                CaptureInput::File(PathBuf::from("/nonexistent/file.pdf")),
                "research",
                None,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not read file"));
    }
}
