//! The background bridge process.
//!
//! The bridge is the long-lived half of the client: it owns the ephemeral
//! capture slot and the latest observed tab state, and serves the typed
//! message protocol that the capture surface (CLI or browser shim) speaks.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/message` | Dispatch one [`BridgeRequest`] |
//! | `GET`  | `/health` | Liveness check (returns version) |
//!
//! # Message protocol
//!
//! Requests are a closed, tagged set — there are no untyped payloads:
//!
//! | Message | Producer/consumer | Response |
//! |---------|-------------------|----------|
//! | `CAPTURE_SELECTION` | context-menu trigger | `ACK` |
//! | `CAPTURE_URL` | keyboard-shortcut trigger | `ACK` |
//! | `UPDATE_TAB` | browser shim tab report | `ACK` |
//! | `GET_CAPTURED_TEXT` | capture surface (consumes the slot) | `CAPTURED_TEXT` |
//! | `GET_FRESH_CONTEXT` | capture surface | `CONTEXT` (null when no tab) |
//!
//! The slot is consume-once: `GET_CAPTURED_TEXT` clears it. Context is
//! derived fresh from the latest tab report on every `GET_FRESH_CONTEXT`;
//! nothing is persisted across bridge restarts.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser shim can
//! post messages cross-origin.

use anyhow::{bail, Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::PageContext;
use crate::probe::TabInfo;
use crate::slot::CaptureSlot;

/// State shared by all bridge handlers.
#[derive(Debug, Default)]
pub struct BridgeState {
    slot: CaptureSlot,
    tab: Mutex<Option<TabInfo>>,
}

impl BridgeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest active-tab report.
    pub fn report_tab(&self, tab: TabInfo) {
        *self.tab.lock().expect("tab state poisoned") = Some(tab);
    }

    /// Derives a fresh page context from the latest tab report, or `None`
    /// when no active tab is known.
    pub fn fresh_context(&self) -> Option<PageContext> {
        self.tab
            .lock()
            .expect("tab state poisoned")
            .as_ref()
            .map(PageContext::from_tab)
    }

    /// Context-menu producer: stores the selection text in the slot.
    pub fn capture_selection(&self, text: String) {
        self.slot.set(text);
    }

    /// Keyboard-shortcut producer: stores the active tab's URL in the slot.
    /// A shortcut with no known tab is a no-op.
    pub fn capture_active_url(&self) {
        let url = self
            .tab
            .lock()
            .expect("tab state poisoned")
            .as_ref()
            .map(|t| t.url.clone());
        if let Some(url) = url {
            self.slot.set(url);
        }
    }

    /// Consumes and clears the pending capture value.
    pub fn take_captured_text(&self) -> String {
        self.slot.take_and_clear()
    }
}

/// Messages accepted by `POST /message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeRequest {
    /// Context-menu trigger fired with the given selection text.
    CaptureSelection { text: String },
    /// Keyboard-shortcut trigger fired; captures the active tab's URL.
    CaptureUrl,
    /// The browser shim reports the current active tab.
    UpdateTab { tab: TabInfo },
    /// Consume the pending capture value.
    GetCapturedText,
    /// Derive a fresh page context.
    GetFreshContext,
}

/// Responses returned by `POST /message`, one shape per request kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeResponse {
    Ack,
    CapturedText { text: String },
    Context { context: Option<PageContext> },
}

/// Builds the bridge router over the given state.
pub fn bridge_router(state: Arc<BridgeState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/message", post(handle_message))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the bridge and serves until the process is terminated.
pub async fn run_bridge(config: &Config) -> Result<()> {
    let bind = config.bridge.bind.clone();
    let app = bridge_router(Arc::new(BridgeState::new()));

    println!("PocketLM bridge listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind bridge to {}", bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_message(
    State(state): State<Arc<BridgeState>>,
    Json(request): Json<BridgeRequest>,
) -> Json<BridgeResponse> {
    let response = match request {
        BridgeRequest::CaptureSelection { text } => {
            state.capture_selection(text);
            BridgeResponse::Ack
        }
        BridgeRequest::CaptureUrl => {
            state.capture_active_url();
            BridgeResponse::Ack
        }
        BridgeRequest::UpdateTab { tab } => {
            state.report_tab(tab);
            BridgeResponse::Ack
        }
        BridgeRequest::GetCapturedText => BridgeResponse::CapturedText {
            text: state.take_captured_text(),
        },
        BridgeRequest::GetFreshContext => BridgeResponse::Context {
            context: state.fresh_context(),
        },
    };
    Json(response)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Client side of the bridge protocol, used by the CLI.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build bridge client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one message and returns the typed response.
    pub async fn send(&self, request: &BridgeRequest) -> Result<BridgeResponse> {
        let response = self
            .http
            .post(format!("{}/message", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("could not reach the bridge: {}", e))?;
        if !response.status().is_success() {
            bail!("bridge error {}", response.status());
        }
        response
            .json()
            .await
            .context("unexpected response from bridge")
    }

    /// Consumes the pending capture value (empty when nothing is pending).
    pub async fn captured_text(&self) -> Result<String> {
        match self.send(&BridgeRequest::GetCapturedText).await? {
            BridgeResponse::CapturedText { text } => Ok(text),
            other => bail!("unexpected bridge response: {:?}", other),
        }
    }

    /// Fetches a fresh page context, `None` when no active tab is known.
    pub async fn fresh_context(&self) -> Result<Option<PageContext>> {
        match self.send(&BridgeRequest::GetFreshContext).await? {
            BridgeResponse::Context { context } => Ok(context),
            other => bail!("unexpected bridge response: {:?}", other),
        }
    }
}
