//! Core data types used throughout the PocketLM client.
//!
//! These types represent the page context observed by the bridge, the capture
//! descriptors that flow into the dispatcher, and the chat messages exchanged
//! with the backend.

use serde::{Deserialize, Serialize};

/// Where a PDF page is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfSource {
    /// Opened from the local filesystem (`file:` scheme).
    Local,
    /// Served over the network.
    Online,
}

/// A fresh snapshot of the active page.
///
/// Derived on each request from the last tab report; never persisted.
/// `pdf_source` is `Some` exactly when `is_pdf` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub selected_text: String,
    pub current_url: String,
    pub page_title: String,
    pub is_pdf: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_source: Option<PdfSource>,
}

/// A capture ready to be routed to the backend.
///
/// Produced either by the command router (structured) or by classifying raw
/// input text. The JSON form is what the `/pdf` command serializes into the
/// pending input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaptureDescriptor {
    Url {
        content: String,
    },
    Selection {
        content: String,
    },
    Pdf {
        source: PdfSource,
        url: String,
        title: String,
        /// Milliseconds since the Unix epoch, set when the command resolved.
        timestamp: i64,
    },
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Ai,
}

/// One message in a chat transcript. Ordering and persistence are owned by
/// the backend; the client only appends and renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_content: String,
    #[serde(rename = "type")]
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,
}
