//! Slash-command routing.
//!
//! The capture surface exposes exactly three commands:
//!
//! | Command | Available when | Resolves to |
//! |---------|----------------|-------------|
//! | `/select` | the page has a text selection | the selected text |
//! | `/url` | always | the active tab's URL |
//! | `/pdf` | the page is a PDF | a structured PDF descriptor |
//!
//! Availability is computed from the page context at render time, but
//! resolution always works against a *fresh* context — the popup can stay
//! open across tab navigation, so context captured at open time may be stale.

use anyhow::{bail, Result};

use crate::dispatch::CaptureInput;
use crate::models::{CaptureDescriptor, PageContext};
use crate::probe;

/// The fixed set of capture commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Select,
    Url,
    Pdf,
}

impl SlashCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlashCommand::Select => "/select",
            SlashCommand::Url => "/url",
            SlashCommand::Pdf => "/pdf",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SlashCommand::Select => "Capture the selected text on the page",
            SlashCommand::Url => "Capture the current page URL",
            SlashCommand::Pdf => "Capture the PDF shown on this page",
        }
    }

    /// Parses a command name, with or without the leading slash.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('/') {
            "select" => Some(SlashCommand::Select),
            "url" => Some(SlashCommand::Url),
            "pdf" => Some(SlashCommand::Pdf),
            _ => None,
        }
    }
}

/// A command with its availability for the current page.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub command: SlashCommand,
    pub description: &'static str,
    pub available: bool,
}

/// Returns the fixed, ordered command list with availability flags.
///
/// Callers filter to `available == true` before display; an empty result
/// after filtering must be rendered as an explicit "no commands available"
/// state, not as an empty list.
pub fn available_commands(has_selection: bool, is_pdf: bool) -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor {
            command: SlashCommand::Select,
            description: SlashCommand::Select.description(),
            available: has_selection,
        },
        CommandDescriptor {
            command: SlashCommand::Url,
            description: SlashCommand::Url.description(),
            available: true,
        },
        CommandDescriptor {
            command: SlashCommand::Pdf,
            description: SlashCommand::Pdf.description(),
            available: is_pdf,
        },
    ]
}

/// Resolves a command against a fresh page context, producing the pending
/// capture input.
///
/// `fresh` is the context re-queried at selection time; `None` means no
/// active tab is known, which fails every command.
pub fn resolve_command(command: SlashCommand, fresh: Option<&PageContext>) -> Result<CaptureInput> {
    let ctx = match fresh {
        Some(ctx) => ctx,
        None => bail!("no active tab — nothing to capture"),
    };

    match command {
        SlashCommand::Select => {
            if ctx.selected_text.trim().is_empty() {
                bail!("no text is selected on the page");
            }
            Ok(CaptureInput::Text(ctx.selected_text.clone()))
        }
        SlashCommand::Url => {
            if ctx.current_url.is_empty() {
                bail!("the active tab has no URL");
            }
            Ok(CaptureInput::Text(ctx.current_url.clone()))
        }
        SlashCommand::Pdf => {
            if !ctx.is_pdf {
                bail!("the current page is not a PDF");
            }
            Ok(CaptureInput::Descriptor(CaptureDescriptor::Pdf {
                source: ctx
                    .pdf_source
                    .unwrap_or_else(|| probe::pdf_source(&ctx.current_url)),
                url: ctx.current_url.clone(),
                title: ctx.page_title.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PdfSource;
    use crate::probe::TabInfo;

    fn context(url: &str, title: &str, selection: &str) -> PageContext {
        PageContext::from_tab(&TabInfo {
            url: url.to_string(),
            title: title.to_string(),
            selection: selection.to_string(),
        })
    }

    #[test]
    fn test_select_absent_without_selection() {
        let commands = available_commands(false, false);
        let select = &commands[0];
        assert_eq!(select.command, SlashCommand::Select);
        assert!(!select.available);

        let visible: Vec<_> = commands.iter().filter(|c| c.available).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].command, SlashCommand::Url);
    }

    #[test]
    fn test_all_commands_on_pdf_with_selection() {
        let commands = available_commands(true, true);
        assert!(commands.iter().all(|c| c.available));
        // Order is fixed: select, url, pdf
        assert_eq!(commands[0].command, SlashCommand::Select);
        assert_eq!(commands[1].command, SlashCommand::Url);
        assert_eq!(commands[2].command, SlashCommand::Pdf);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(SlashCommand::parse("/pdf"), Some(SlashCommand::Pdf));
        assert_eq!(SlashCommand::parse("url"), Some(SlashCommand::Url));
        assert_eq!(SlashCommand::parse("/bookmark"), None);
    }

    #[test]
    fn test_resolve_select_uses_fresh_selection() {
        let ctx = context("https://example.com", "Example", "Hello world");
        let input = resolve_command(SlashCommand::Select, Some(&ctx)).unwrap();
        assert_eq!(input, CaptureInput::Text("Hello world".to_string()));
    }

    #[test]
    fn test_resolve_select_fails_when_selection_gone() {
        // Selection present at render time can be gone by resolution time.
        let ctx = context("https://example.com", "Example", "");
        assert!(resolve_command(SlashCommand::Select, Some(&ctx)).is_err());
    }

    #[test]
    fn test_resolve_url_reads_tab() {
        let ctx = context("https://example.com/page", "Example", "");
        let input = resolve_command(SlashCommand::Url, Some(&ctx)).unwrap();
        assert_eq!(
            input,
            CaptureInput::Text("https://example.com/page".to_string())
        );
    }

    #[test]
    fn test_resolve_pdf_builds_descriptor() {
        let ctx = context("https://docs.example.com/file.pdf", "file.pdf", "");
        match resolve_command(SlashCommand::Pdf, Some(&ctx)).unwrap() {
            CaptureInput::Descriptor(CaptureDescriptor::Pdf {
                source,
                url,
                title,
                timestamp,
            }) => {
                assert_eq!(source, PdfSource::Online);
                assert_eq!(url, "https://docs.example.com/file.pdf");
                assert_eq!(title, "file.pdf");
                assert!(timestamp > 0);
            }
            other => panic!("expected pdf descriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_pdf_rejects_non_pdf() {
        let ctx = context("https://example.com/report.docx", "report", "");
        assert!(resolve_command(SlashCommand::Pdf, Some(&ctx)).is_err());
    }

    #[test]
    fn test_resolve_without_tab() {
        assert!(resolve_command(SlashCommand::Url, None).is_err());
    }
}
