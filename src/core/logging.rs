//! Logging and Terminal Output
//!
//! - tracing subscriber: env filter, stderr layer, optional JSON file layer
//! - `log` crate events bridged into tracing
//! - miette hook for fatal error reports
//! - one progress bar per book (indicatif)
//! - styled run summary (console)
//!
//! Standard output carries the JSON report, so everything here writes to
//! standard error.

use std::fs;
use std::io;
use std::sync::OnceLock;

use console::{style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use miette::Diagnostic;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::ingestion::wargaming::Page;
use crate::ingestion::BookReport;

const LOG_FILE: &str = "rulebook-extract.log";

// ============================================================================
// Terminal Capability Detection
// ============================================================================

static TERMINAL_CAPS: OnceLock<TerminalCapabilities> = OnceLock::new();

fn get_terminal_caps() -> &'static TerminalCapabilities {
    TERMINAL_CAPS.get_or_init(TerminalCapabilities::detect)
}

/// Detected capabilities of standard error
#[derive(Debug, Clone)]
pub struct TerminalCapabilities {
    pub is_interactive: bool,
    pub supports_unicode: bool,
    pub width: u16,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        use is_terminal::IsTerminal;

        let is_interactive = io::stderr().is_terminal();
        let width = Term::stderr().size().1;

        // Unicode support heuristic
        let supports_unicode = std::env::var("TERM")
            .map(|t| !t.contains("dumb"))
            .unwrap_or(true)
            && std::env::var("LANG")
                .map(|l| l.contains("UTF-8") || l.contains("utf8"))
                .unwrap_or(true);

        Self {
            is_interactive,
            supports_unicode,
            width,
        }
    }
}

// ============================================================================
// Logging Initialization
// ============================================================================

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the logging system.
///
/// Installs a stderr layer and, when enabled, a JSON file layer rolling
/// daily in the configured log directory; redirects `log` macros to
/// tracing and installs the miette hook.
///
/// The returned guard flushes the file layer when dropped, so the caller
/// keeps it alive for the whole run.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let caps = get_terminal_caps();

    let (file_layer, guard) = if config.json_file {
        let log_dir = config.log_dir();
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
        let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_filter(env_filter(&config.level));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(caps.is_interactive)
        .with_target(false)
        .compact()
        .with_filter(env_filter(&config.level));

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize LogTracer: {}", e);
    }

    init_miette();

    if config.json_file {
        log::info!(
            "Logging initialized. Writing to: {:?} (daily rolling)",
            config.log_dir().join(LOG_FILE)
        );
    }

    guard
}

fn init_miette() {
    let caps = get_terminal_caps();

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .unicode(caps.supports_unicode)
                .context_lines(2)
                .tab_width(4)
                .color(caps.is_interactive)
                .build(),
        )
    }))
    .ok(); // Ignore if already set
}

// ============================================================================
// Progress Bars (Indicatif Integration)
// ============================================================================

/// Bar width that leaves room for the prefix, counters and message.
fn bar_width(term_width: u16) -> usize {
    usize::from(term_width).saturating_sub(60).clamp(10, 40)
}

fn page_style(term_width: u16) -> ProgressStyle {
    let template = format!(
        "{{spinner:.green}} {{prefix:.bold}} [{{bar:{}.cyan/blue}}] {{pos}}/{{len}} pages | {{msg}}",
        bar_width(term_width)
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Progress over the pages of one book.
pub struct BookProgress {
    bar: ProgressBar,
}

impl BookProgress {
    /// A bar drawn on standard error; hidden when that is not a terminal.
    pub fn new(title: &str, pages: usize) -> Self {
        let caps = get_terminal_caps();
        let bar = ProgressBar::new(pages as u64);
        if !caps.is_interactive {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self::styled(bar, title, caps.width)
    }

    pub fn hidden(title: &str, pages: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(pages as u64);
        Self::styled(bar, title, 0)
    }

    fn styled(bar: ProgressBar, title: &str, term_width: u16) -> Self {
        bar.set_style(page_style(term_width));
        bar.set_prefix(title.to_string());
        Self { bar }
    }

    pub fn page_done(&self, page: &Page) {
        let page_type = page.page_type.map_or("unassigned", |t| t.as_str());
        self.bar
            .set_message(format!("page {} ({})", page.number, page_type));
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Abandon the bar, leaving it where it stopped.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

// ============================================================================
// Diagnostic Error Type (miette integration)
// ============================================================================

/// Fatal error reported by the binary, optionally pointing into page text.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(rulebook::error))]
pub struct AppError {
    message: String,

    #[source_code]
    source_code: Option<String>,

    #[label("expected the table header here")]
    span: Option<miette::SourceSpan>,

    #[help]
    help_text: Option<String>,
}

impl AppError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_code: None,
            span: None,
            help_text: None,
        }
    }

    /// Add source context
    pub fn with_source(mut self, source: impl Into<String>, offset: usize, length: usize) -> Self {
        self.source_code = Some(source.into());
        self.span = Some(miette::SourceSpan::new(offset.into(), length));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help_text = Some(help.into());
        self
    }
}

// ============================================================================
// Console Output Utilities
// ============================================================================

/// Plain summary lines for a processed book.
pub fn summary_lines(report: &BookReport) -> Vec<String> {
    let totals = &report.totals;
    let mut lines = vec![
        format!("{} ({})", report.title, report.edition),
        format!(
            "{} pages: {} units, {} weapons, {} special rules, {} wargear, {} unit types, {} FAQ entries",
            totals.pages,
            totals.units,
            totals.weapons,
            totals.special_rules,
            totals.wargear,
            totals.unit_types,
            totals.faq_entries
        ),
    ];
    if totals.dropped_rules > 0 {
        lines.push(format!("{} rule names dropped without a body", totals.dropped_rules));
    }
    if totals.errors > 0 {
        lines.push(format!("{} errors recorded", totals.errors));
    }
    lines
}

/// Print the styled run summary to standard error.
pub fn print_summary(report: &BookReport) {
    let term = Term::stderr();
    let lines = summary_lines(report);
    let check = if get_terminal_caps().supports_unicode { "✓" } else { "[OK]" };

    for (idx, line) in lines.iter().enumerate() {
        let styled = match idx {
            0 => format!("{} {}", style(check).green(), style(line).green().bold()),
            1 => format!("  {}", line),
            _ if report.has_errors() => format!("  {}", style(line).yellow()),
            _ => format!("  {}", style(line).dim()),
        };
        term.write_line(&styled).ok();
    }
}

/// Print an error message to standard error
pub fn print_error(message: &str) {
    let prefix = if get_terminal_caps().supports_unicode { "✗" } else { "[ERR]" };
    Term::stderr()
        .write_line(&format!("{} {}", style(prefix).red(), style(message).red().bold()))
        .ok();
}

// ============================================================================
// Tests
// ============================================================================
