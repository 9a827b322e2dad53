use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use rulebook_extract::config::AppConfig;
use rulebook_extract::core::logging::{self, AppError, BookProgress};
use rulebook_extract::ingestion::{Book, ExtractionError};

/// Extract unit datasheets, weapon profiles and special rules from a
/// rulebook text dump.
#[derive(Debug, Parser)]
#[command(name = "rulebook-extract", version, about)]
struct Cli {
    /// PDF-to-text output of the rulebook, pages separated by form feeds
    input: PathBuf,

    /// Edition id (hh1, hh2)
    #[arg(short, long)]
    edition: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON lookup context with catalogue ids
    #[arg(short, long)]
    lookup: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of the first page in the dump
    #[arg(long)]
    first_page: Option<u32>,

    /// Pages holding FAQ entries (comma separated)
    #[arg(long = "faq-pages", value_delimiter = ',')]
    faq_pages: Vec<u32>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is configured by the file, so the load outcome is reported after init
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let loaded = AppConfig::try_load_from(&config_path);
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => AppConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    let _log_guard = logging::init(&config.logging);
    log::info!("{} v{} starting", rulebook_extract::NAME, rulebook_extract::VERSION);
    match loaded {
        Ok(Some(_)) => log::info!("Loaded config from {}", config_path.display()),
        Ok(None) => log::debug!("No config file at {}, using defaults", config_path.display()),
        Err(e) => {
            let message = format!("Failed to parse config at {}: {e}, using defaults", config_path.display());
            log::warn!("{message}");
            logging::print_error(&message);
        }
    }

    run(&cli, &config)
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    let extraction = &mut config.extraction;
    if let Some(edition) = &cli.edition {
        extraction.edition = edition.clone();
        extraction.edition_file = None;
    }
    if let Some(lookup) = &cli.lookup {
        extraction.lookup_file = Some(lookup.clone());
    }
    if let Some(first_page) = cli.first_page {
        extraction.first_page = first_page;
    }
    extraction.faq_pages.extend(&cli.faq_pages);
    if cli.compact {
        config.output.pretty = false;
    }
}

fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let edition = config.extraction.edition_profile().into_diagnostic()?;
    let lookup = config.extraction.lookup_context().into_diagnostic()?;
    if lookup.is_empty() {
        log::debug!("No lookup context, extracted names are not resolved");
    }
    let text = std::fs::read_to_string(&cli.input).into_diagnostic()?;

    let title = cli
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    let mut book = Book::from_pdf_text(title.clone(), &text, config.extraction.first_page);
    book.mark_faq_pages(&config.extraction.faq_pages);

    let progress = BookProgress::new(&title, book.pages.len());
    let report = match book.process_with(&edition, &lookup, |page| progress.page_done(page)) {
        Ok(report) => {
            progress.finish("done");
            report
        }
        Err(e) => {
            progress.abandon();
            logging::print_error("Extraction stopped");
            return Err(diagnose(e, &book).into());
        }
    };

    let output = cli
        .output
        .clone()
        .or_else(|| config.output.report_path(&cli.input));
    match output {
        Some(path) => {
            report.write_to(&path, config.output.pretty).into_diagnostic()?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", report.to_json(config.output.pretty).into_diagnostic()?),
    }

    logging::print_summary(&report);
    Ok(())
}

/// Point a table corruption error at the page it happened on.
fn diagnose(err: ExtractionError, book: &Book) -> AppError {
    let ExtractionError::HeadersNotFound { page, headers } = &err else {
        return AppError::new(err.to_string());
    };

    let mut diagnostic = AppError::new(err.to_string()).with_help(format!(
        "The page no longer matches the \"{}\" header row; review page {} against the edition profile",
        headers.join(" "),
        page
    ));
    if let Some(source) = book.page(*page) {
        let first_line = source.raw_text.lines().next().map_or(0, str::len);
        diagnostic = diagnostic.with_source(source.raw_text.clone(), 0, first_line);
    }
    diagnostic
}
