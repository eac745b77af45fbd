//! Typed client for the PocketLM backend HTTP API.
//!
//! The backend owns all storage, retrieval, and chat; this client is a thin
//! request/response wrapper around its fixed endpoint set:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `GET` | `/` | Health check |
//! | `POST` | `/capture` | Save a URL, selection, or PDF (multipart) |
//! | `GET` | `/collection` | List knowledge bases |
//! | `POST` | `/collection` | Create a knowledge base |
//! | `DELETE` | `/collection` | Delete a knowledge base |
//! | `GET` | `/chat/history` | Fetch the chat transcript |
//! | `POST` | `/chat/message` | Send a query against a knowledge base |
//! | `DELETE` | `/chat/clear` | Clear the chat transcript |
//!
//! # Error contract
//!
//! Every failure is normalized into a single human-readable message. For HTTP
//! errors the server-supplied `detail` field is preferred (then `message`),
//! falling back to the status code and raw body. Transport errors (connection
//! refused, timeout) surface as a generic "could not reach" message. There is
//! no retry; the only deadline is the client-wide request timeout.

use anyhow::{bail, Context, Result};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::models::ChatMessage;

/// Client for the PocketLM backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

/// Standard `{status, message, data}` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Response body of `POST /chat/message`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatReply {
    message_content: String,
}

impl BackendClient {
    /// Creates a client with a fixed request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and normalizes every failure into one message.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            anyhow::anyhow!("could not reach the PocketLM backend: {}", e)
        })?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("{}", error_detail(&body, status));
        }
        Ok(body)
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).context("unexpected response from backend")
    }

    /// `GET /` — returns the backend's reported status string.
    pub async fn health(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }
        let body = self.send(self.http.get(self.endpoint("/"))).await?;
        let health: Health =
            serde_json::from_str(&body).context("unexpected health response from backend")?;
        Ok(health.status)
    }

    /// `POST /capture` with `type=url`.
    pub async fn capture_url(&self, knowledge_base: &str, url: &str) -> Result<String> {
        let form = multipart::Form::new()
            .text("type", "url")
            .text("knowledge_base", knowledge_base.to_string())
            .text("url", url.to_string());
        self.capture(form).await
    }

    /// `POST /capture` with `type=selection`. The originating page URL is
    /// included as context when known.
    pub async fn capture_selection(
        &self,
        knowledge_base: &str,
        selection: &str,
        context_url: Option<&str>,
    ) -> Result<String> {
        let mut form = multipart::Form::new()
            .text("type", "selection")
            .text("knowledge_base", knowledge_base.to_string())
            .text("selection", selection.to_string());
        if let Some(url) = context_url {
            form = form.text("url", url.to_string());
        }
        self.capture(form).await
    }

    /// `POST /capture` with `type=pdf`, uploading the file bytes.
    pub async fn capture_pdf(
        &self,
        knowledge_base: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .context("invalid mime type for PDF upload")?;
        let form = multipart::Form::new()
            .text("type", "pdf")
            .text("knowledge_base", knowledge_base.to_string())
            .part("pdf", part);
        self.capture(form).await
    }

    async fn capture(&self, form: multipart::Form) -> Result<String> {
        let envelope: Envelope<serde_json::Value> = self
            .send_envelope(self.http.post(self.endpoint("/capture")).multipart(form))
            .await?;
        Ok(envelope.message)
    }

    /// `GET /collection` — lists knowledge base names.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let envelope: Envelope<Vec<String>> = self
            .send_envelope(self.http.get(self.endpoint("/collection")))
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// `POST /collection` — creates a knowledge base.
    pub async fn create_collection(&self, name: &str) -> Result<String> {
        let envelope: Envelope<serde_json::Value> = self
            .send_envelope(
                self.http
                    .post(self.endpoint("/collection"))
                    .json(&serde_json::json!({ "name": name })),
            )
            .await?;
        Ok(envelope.message)
    }

    /// `DELETE /collection` — deletes a knowledge base.
    pub async fn delete_collection(&self, name: &str) -> Result<String> {
        let envelope: Envelope<serde_json::Value> = self
            .send_envelope(
                self.http
                    .delete(self.endpoint("/collection"))
                    .json(&serde_json::json!({ "name": name })),
            )
            .await?;
        Ok(envelope.message)
    }

    /// `GET /chat/history` — full transcript in backend order.
    pub async fn chat_history(&self) -> Result<Vec<ChatMessage>> {
        let envelope: Envelope<Vec<ChatMessage>> = self
            .send_envelope(self.http.get(self.endpoint("/chat/history")))
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// `POST /chat/message` — sends a query scoped to a knowledge base and
    /// returns the assistant's reply text.
    pub async fn send_chat(&self, user_query: &str, collection_name: &str) -> Result<String> {
        let envelope: Envelope<ChatReply> = self
            .send_envelope(
                self.http.post(self.endpoint("/chat/message")).json(&serde_json::json!({
                    "userQuery": user_query,
                    "collectionName": collection_name,
                })),
            )
            .await?;
        match envelope.data {
            Some(reply) => Ok(reply.message_content),
            None => bail!("backend returned no chat reply"),
        }
    }

    /// `DELETE /chat/clear` — clears the transcript.
    pub async fn clear_chat(&self) -> Result<String> {
        let envelope: Envelope<serde_json::Value> = self
            .send_envelope(self.http.delete(self.endpoint("/chat/clear")))
            .await?;
        Ok(envelope.message)
    }
}

/// Extracts the most useful error message from an HTTP error response.
///
/// Preference order: JSON `detail` field, JSON `message` field, raw body,
/// bare status code.
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("backend error {}", status)
    } else {
        format!("backend error {}: {}", status, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_server_detail() {
        let body = r#"{"detail":"collection already exists","message":"other"}"#;
        let msg = error_detail(body, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(msg, "collection already exists");
    }

    #[test]
    fn test_error_detail_falls_back_to_message() {
        let body = r#"{"status":"error","message":"invalid capture type"}"#;
        let msg = error_detail(body, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(msg, "invalid capture type");
    }

    #[test]
    fn test_error_detail_raw_body_fallback() {
        let msg = error_detail("gateway exploded", reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "backend error 502 Bad Gateway: gateway exploded");
    }

    #[test]
    fn test_error_detail_empty_body() {
        let msg = error_detail("", reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "backend error 500 Internal Server Error");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            BackendClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint("/capture"), "http://localhost:8000/capture");
    }
}
