//! # PocketLM Client
//!
//! A capture client and local bridge for PocketLM knowledge bases.
//!
//! PocketLM stores captured web content (selected text, page URLs, PDF
//! documents) in named knowledge bases and answers questions against them
//! with retrieval-augmented chat. The backend owns all storage and
//! retrieval; this crate is the client side: a CLI capture surface (`plm`)
//! and a small background bridge that buffers captures between the moment a
//! trigger fires and the moment the user saves.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  typed messages  ┌────────────┐
//! │ browser shim │─────────────────▶│   bridge   │
//! │ / triggers   │                  │ slot + tab │
//! └──────────────┘                  └─────┬──────┘
//!                                         │ GET_CAPTURED_TEXT
//!                                         │ GET_FRESH_CONTEXT
//!                                   ┌─────▼──────┐   HTTP    ┌──────────┐
//!                                   │  plm CLI   │──────────▶│ backend  │
//!                                   │ router +   │  capture  │ KB + RAG │
//!                                   │ dispatcher │   chat    └──────────┘
//!                                   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! plm serve                                  # start the bridge
//! plm collection create research             # make a knowledge base
//! plm capture "https://example.com" --collection research
//! plm chat send "what did I save?" --collection research
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with env override |
//! | [`models`] | Core data types |
//! | [`probe`] | Page context derivation and PDF classification |
//! | [`slot`] | Single-slot ephemeral capture buffer |
//! | [`router`] | Slash-command availability and resolution |
//! | [`dispatch`] | Capture classification and routing |
//! | [`api`] | Typed backend HTTP client |
//! | [`bridge`] | Background bridge server and its message protocol |

pub mod api;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod models;
pub mod probe;
pub mod router;
pub mod slot;
