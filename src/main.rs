//! # PocketLM CLI (`plm`)
//!
//! The `plm` binary is the capture surface of the PocketLM client. It talks
//! to two processes: the local bridge (pending captures, page context) and
//! the remote backend (knowledge bases, chat).
//!
//! ## Usage
//!
//! ```bash
//! plm --config ./config/plm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `plm serve` | Run the background bridge |
//! | `plm capture [TEXT]` | Save text, a URL, or a PDF into a knowledge base |
//! | `plm commands [NAME]` | Show or resolve the slash commands for the current page |
//! | `plm context` | Print the fresh page context from the bridge |
//! | `plm collection <list|create|delete>` | Manage knowledge bases |
//! | `plm chat <send|history|clear>` | Chat against a knowledge base |
//! | `plm health` | Check the backend |
//!
//! ## Examples
//!
//! ```bash
//! # Save the pending capture (set by a trigger) into "research"
//! plm capture --collection research
//!
//! # Save a page directly
//! plm capture "https://example.com/article" --collection research
//!
//! # Upload a local PDF
//! plm capture --file ./paper.pdf --collection research
//!
//! # Resolve the /pdf command into a pending input value
//! plm commands pdf
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use pocketlm::api::BackendClient;
use pocketlm::bridge::{self, BridgeClient};
use pocketlm::config::{self, Config};
use pocketlm::dispatch::{CaptureInput, Dispatcher};
use pocketlm::models::{MessageRole, PageContext};
use pocketlm::router::{self, SlashCommand};

/// PocketLM client — capture web content into knowledge bases and chat
/// against them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file falls back to defaults (local backend, local bridge).
/// The `POCKETLM_BACKEND_URL` environment variable overrides the backend URL.
#[derive(Parser)]
#[command(
    name = "plm",
    about = "PocketLM — capture web content into knowledge bases and chat against them",
    version,
    long_about = "The PocketLM client captures selected text, page URLs, and PDF documents \
    into named knowledge bases on a PocketLM backend, and chats against those knowledge bases \
    via retrieval-augmented generation. A local bridge process buffers pending captures and \
    the active page context between trigger and save."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/plm.toml`. Backend, bridge, and capture
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/plm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable.
    Health,

    /// Save a capture into a knowledge base.
    ///
    /// With TEXT, classifies and saves it (absolute URL → link capture,
    /// anything else → selection capture, serialized PDF descriptor → PDF
    /// upload). Without TEXT, consumes the pending capture from the bridge —
    /// the value stored by the last context-menu or keyboard trigger.
    /// `--file` uploads a local PDF and skips text classification entirely.
    Capture {
        /// Text, URL, or serialized capture descriptor to save.
        text: Option<String>,

        /// Target knowledge base. Falls back to `capture.default_collection`.
        #[arg(long)]
        collection: Option<String>,

        /// Local PDF file to upload instead of text.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show or resolve slash commands for the current page.
    ///
    /// Without NAME, lists the commands available for the current page
    /// context (`/select` needs a selection, `/pdf` needs a PDF page,
    /// `/url` is always available). With NAME, resolves that command against
    /// a fresh context and prints the pending input value it produces.
    #[command(name = "commands")]
    Slash {
        /// Command to resolve: `select`, `url`, or `pdf` (leading slash optional).
        name: Option<String>,
    },

    /// Print the fresh page context reported by the bridge.
    Context,

    /// Manage knowledge bases.
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Chat against a knowledge base.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Run the background bridge.
    ///
    /// The bridge holds the pending capture slot and the latest active-tab
    /// report, and serves the typed message protocol on `[bridge].bind`.
    Serve,
}

/// Knowledge base management subcommands.
#[derive(Subcommand)]
enum CollectionAction {
    /// List all knowledge bases.
    List,
    /// Create a knowledge base.
    Create {
        /// Unique name for the new knowledge base.
        name: String,
    },
    /// Delete a knowledge base and its contents.
    Delete {
        /// Name of the knowledge base to delete.
        name: String,
    },
}

/// Chat subcommands.
#[derive(Subcommand)]
enum ChatAction {
    /// Send a query scoped to a knowledge base and print the reply.
    Send {
        /// The question to ask.
        query: String,

        /// Knowledge base to retrieve from. Falls back to
        /// `capture.default_collection`.
        #[arg(long)]
        collection: Option<String>,
    },
    /// Print the chat transcript.
    History,
    /// Clear the chat transcript.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Health => run_health(&cfg).await?,
        Commands::Capture {
            text,
            collection,
            file,
        } => run_capture(&cfg, text, collection, file).await?,
        Commands::Slash { name } => run_commands(&cfg, name).await?,
        Commands::Context => run_context(&cfg).await?,
        Commands::Collection { action } => match action {
            CollectionAction::List => run_collection_list(&cfg).await?,
            CollectionAction::Create { name } => run_collection_create(&cfg, &name).await?,
            CollectionAction::Delete { name } => run_collection_delete(&cfg, &name).await?,
        },
        Commands::Chat { action } => match action {
            ChatAction::Send { query, collection } => {
                run_chat_send(&cfg, &query, collection).await?
            }
            ChatAction::History => run_chat_history(&cfg).await?,
            ChatAction::Clear => run_chat_clear(&cfg).await?,
        },
        Commands::Serve => bridge::run_bridge(&cfg).await?,
    }

    Ok(())
}

fn backend_client(cfg: &Config) -> Result<BackendClient> {
    BackendClient::new(
        &cfg.backend.base_url,
        Duration::from_secs(cfg.backend.timeout_secs),
    )
}

fn bridge_client(cfg: &Config) -> Result<BridgeClient> {
    BridgeClient::new(&cfg.bridge_url(), Duration::from_secs(5))
}

/// Fetches a fresh page context from the bridge. A bridge that is not
/// running is a best-effort failure: the context is simply absent.
async fn try_fresh_context(cfg: &Config) -> Option<PageContext> {
    let client = bridge_client(cfg).ok()?;
    client.fresh_context().await.ok().flatten()
}

async fn run_health(cfg: &Config) -> Result<()> {
    let client = backend_client(cfg)?;
    let status = client.health().await?;
    println!("Backend at {} reports: {}", client.base_url(), status);
    Ok(())
}

async fn run_capture(
    cfg: &Config,
    text: Option<String>,
    collection: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let collection = collection
        .or_else(|| cfg.capture.default_collection.clone())
        .unwrap_or_default();

    // A chosen file always wins over text input.
    let input = if let Some(path) = file {
        CaptureInput::File(path)
    } else if let Some(text) = text {
        CaptureInput::classify(&text)
    } else {
        // Popup-mount behavior: consume the pending capture from the bridge.
        let bridge = bridge_client(cfg)?;
        let pending = bridge.captured_text().await.context(
            "no input given and the bridge is not reachable; start it with `plm serve`",
        )?;
        if pending.trim().is_empty() {
            bail!("nothing to capture: no pending capture and no input given");
        }
        CaptureInput::classify(&pending)
    };

    let page_url = try_fresh_context(cfg).await.map(|ctx| ctx.current_url);

    let client = backend_client(cfg)?;
    let dispatcher = Dispatcher::new(
        client,
        Duration::from_secs(cfg.capture.pdf_fetch_timeout_secs),
    )?;
    let message = dispatcher
        .dispatch(input, &collection, page_url.as_deref())
        .await?;

    println!("Saved: {}", message);
    Ok(())
}

async fn run_commands(cfg: &Config, name: Option<String>) -> Result<()> {
    let context = try_fresh_context(cfg).await;

    match name {
        None => {
            let (has_selection, is_pdf) = match &context {
                Some(ctx) => (!ctx.selected_text.trim().is_empty(), ctx.is_pdf),
                None => (false, false),
            };
            let available: Vec<_> = router::available_commands(has_selection, is_pdf)
                .into_iter()
                .filter(|c| c.available)
                .collect();
            if available.is_empty() {
                println!("No commands available for this page.");
                return Ok(());
            }
            for descriptor in available {
                println!("{:<10} {}", descriptor.command.as_str(), descriptor.description);
            }
        }
        Some(name) => {
            let command = SlashCommand::parse(&name)
                .with_context(|| format!("unknown command: {} (try select, url, pdf)", name))?;
            // Always resolve against a context re-queried just now; the one
            // shown by a previous `plm commands` may be stale.
            let input = router::resolve_command(command, context.as_ref())?;
            match input {
                CaptureInput::Text(text) => println!("{}", text),
                CaptureInput::Descriptor(descriptor) => {
                    println!("{}", serde_json::to_string(&descriptor)?)
                }
                CaptureInput::File(path) => println!("{}", path.display()),
            }
        }
    }
    Ok(())
}

async fn run_context(cfg: &Config) -> Result<()> {
    match try_fresh_context(cfg).await {
        None => println!("No active tab reported to the bridge."),
        Some(ctx) => {
            println!("url:       {}", ctx.current_url);
            println!("title:     {}", ctx.page_title);
            println!(
                "selection: {}",
                if ctx.selected_text.is_empty() {
                    "(none)"
                } else {
                    &ctx.selected_text
                }
            );
            match ctx.pdf_source {
                Some(source) => println!("pdf:       yes ({:?})", source),
                None => println!("pdf:       no"),
            }
        }
    }
    Ok(())
}

async fn run_collection_list(cfg: &Config) -> Result<()> {
    let client = backend_client(cfg)?;
    let collections = client.list_collections().await?;
    if collections.is_empty() {
        println!("No knowledge bases yet. Create one with `plm collection create <name>`.");
    } else {
        for name in collections {
            println!("{}", name);
        }
    }
    Ok(())
}

async fn run_collection_create(cfg: &Config, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("knowledge base name must not be empty");
    }
    let client = backend_client(cfg)?;
    let message = client.create_collection(name).await?;
    println!("{}", message);
    Ok(())
}

async fn run_collection_delete(cfg: &Config, name: &str) -> Result<()> {
    let client = backend_client(cfg)?;
    let message = client.delete_collection(name).await?;
    println!("{}", message);
    Ok(())
}

async fn run_chat_send(cfg: &Config, query: &str, collection: Option<String>) -> Result<()> {
    let collection = collection
        .or_else(|| cfg.capture.default_collection.clone())
        .unwrap_or_default();
    if collection.trim().is_empty() {
        bail!("select a knowledge base: pass --collection or set capture.default_collection");
    }
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let client = backend_client(cfg)?;
    let reply = client.send_chat(query, &collection).await?;
    println!("{}", reply);
    Ok(())
}

async fn run_chat_history(cfg: &Config) -> Result<()> {
    let client = backend_client(cfg)?;
    let history = client.chat_history().await?;
    if history.is_empty() {
        println!("No chat history.");
        return Ok(());
    }
    for message in history {
        let who = match message.role {
            MessageRole::Human => "you",
            MessageRole::Ai => "pocketlm",
        };
        match message.knowledge_base {
            Some(kb) => println!("[{} → {}] {}", who, kb, message.message_content),
            None => println!("[{}] {}", who, message.message_content),
        }
    }
    Ok(())
}

async fn run_chat_clear(cfg: &Config) -> Result<()> {
    let client = backend_client(cfg)?;
    let message = client.clear_chat().await?;
    println!("{}", message);
    Ok(())
}
