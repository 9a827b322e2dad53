//! Books
//!
//! A book is the ordered list of its pages. PDF-to-text output separates
//! pages with form feeds; EPUB input arrives as one paragraph list per page.
//! Pages are processed strictly in order because a page's type can carry
//! over from the page before it.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info, info_span};

use super::error::Result;
use super::wargaming::{
    EditionProfile, EpubParagraph, LookupContext, Page, PageClassifier, PageType,
};

/// Page separator in PDF-to-text output.
pub const FORM_FEED: char = '\x0c';

#[derive(Debug, Clone)]
pub struct Book {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Book {
    pub fn from_pages(title: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            title: title.into(),
            pages,
        }
    }

    /// Split PDF-to-text output into pages numbered from `first_page`.
    pub fn from_pdf_text(title: impl Into<String>, text: &str, first_page: u32) -> Self {
        let mut parts: Vec<&str> = text.split(FORM_FEED).collect();
        // The converter terminates the last page with a form feed as well
        if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
            parts.pop();
        }

        let pages = parts
            .into_iter()
            .zip(first_page..)
            .map(|(text, number)| Page::pdf(number, text))
            .collect();
        Self::from_pages(title, pages)
    }

    /// One paragraph list per page, numbered from `first_page`.
    pub fn from_epub(
        title: impl Into<String>,
        pages: Vec<Vec<EpubParagraph>>,
        first_page: u32,
    ) -> Self {
        let pages = pages
            .into_iter()
            .zip(first_page..)
            .map(|(paragraphs, number)| Page::epub(number, paragraphs))
            .collect();
        Self::from_pages(title, pages)
    }

    /// Pre-assign the FAQ type; returns how many pages matched.
    pub fn mark_faq_pages(&mut self, numbers: &[u32]) -> usize {
        let mut marked = 0;
        for page in self.pages.iter_mut().filter(|p| numbers.contains(&p.number)) {
            page.page_type = Some(PageType::Faq);
            marked += 1;
        }
        marked
    }

    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }

    /// Classify and extract every page.
    ///
    /// # Errors
    /// Returns the first unrecoverable error; every other failure is
    /// recorded on its page and processing continues.
    pub fn process(&mut self, edition: &EditionProfile, lookup: &LookupContext) -> Result<BookReport> {
        self.process_with(edition, lookup, |_| {})
    }

    /// Like [`Book::process`], calling `on_page` after each page.
    pub fn process_with<F>(
        &mut self,
        edition: &EditionProfile,
        lookup: &LookupContext,
        mut on_page: F,
    ) -> Result<BookReport>
    where
        F: FnMut(&Page),
    {
        let classifier = PageClassifier::new(edition, lookup);
        let mut previous: Option<PageType> = None;

        info!(title = %self.title, pages = self.pages.len(), edition = %edition.name, "processing book");

        for page in &mut self.pages {
            let span = info_span!("page", number = page.number);
            let _enter = span.enter();

            match classifier.process(page, previous) {
                Ok(page_type) => previous = Some(page_type),
                Err(e) if e.is_recoverable() => {
                    page.push_error(e.to_string());
                    page.page_type = Some(PageType::BlankOrIgnored);
                    previous = page.page_type;
                }
                Err(e) => {
                    error!(page = page.number, error = %e, "unrecoverable table corruption");
                    return Err(e);
                }
            }
            on_page(page);
        }

        let report = BookReport::new(&self.title, edition, &self.pages);
        info!(
            units = report.totals.units,
            weapons = report.totals.weapons,
            special_rules = report.totals.special_rules,
            errors = report.totals.errors,
            "book processed"
        );
        Ok(report)
    }
}

// ============================================================================
// Report
// ============================================================================

/// Record counts over a whole book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub pages: usize,
    pub pages_by_type: IndexMap<String, usize>,
    pub units: usize,
    pub weapons: usize,
    pub special_rules: usize,
    pub wargear: usize,
    pub unit_types: usize,
    pub faq_entries: usize,
    pub dropped_rules: usize,
    /// Page errors plus unit errors
    pub errors: usize,
}

impl ReportTotals {
    pub fn from_pages(pages: &[Page]) -> Self {
        let mut totals = Self {
            pages: pages.len(),
            ..Default::default()
        };
        for page in pages {
            let page_type = page.page_type.unwrap_or(PageType::BlankOrIgnored);
            *totals
                .pages_by_type
                .entry(page_type.as_str().to_string())
                .or_insert(0) += 1;
            totals.units += page.units.len();
            totals.weapons += page.weapons.len();
            totals.special_rules += page.special_rules.len();
            totals.wargear += page.wargear.len();
            totals.unit_types += page.unit_types.len();
            totals.faq_entries += page.faq.len();
            totals.dropped_rules += page.dropped_rules.len();
            totals.errors += page.errors.len() + page.units.iter().map(|u| u.errors.len()).sum::<usize>();
        }
        totals
    }
}

/// Everything extracted from a book, in the shape the catalogue consumer reads.
#[derive(Debug, Clone, Serialize)]
pub struct BookReport {
    pub title: String,
    pub edition: String,
    pub version: String,
    pub totals: ReportTotals,
    pub pages: Vec<Page>,
}

impl BookReport {
    pub fn new(title: &str, edition: &EditionProfile, pages: &[Page]) -> Self {
        Self {
            title: title.to_string(),
            edition: edition.name.clone(),
            version: crate::VERSION.to_string(),
            totals: ReportTotals::from_pages(pages),
            pages: pages.to_vec(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.totals.errors > 0
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pdf_text_splits_on_form_feed() {
        let book = Book::from_pdf_text("Test", "one\x0ctwo\x0cthree\x0c", 10);

        assert_eq!(book.pages.len(), 3);
        assert_eq!(book.pages[0].number, 10);
        assert_eq!(book.pages[2].number, 12);
        assert_eq!(book.page(11).map(|p| p.raw_text.as_str()), Some("two"));
        assert!(book.page(13).is_none());
    }

    #[test]
    fn test_mark_faq_pages() {
        let mut book = Book::from_pdf_text("Test", "a\x0cb\x0cc", 1);
        assert_eq!(book.mark_faq_pages(&[2, 7]), 1);
        assert_eq!(book.pages[1].page_type, Some(PageType::Faq));
        assert_eq!(book.pages[0].page_type, None);
    }

    #[test]
    fn test_process_carries_types_over() {
        let text = "\
Special Rules
Bulky
Each model counts as two models for transport capacity.
\x0cFearless
The unit automatically passes Morale checks.
Relentless
The unit may fire heavy weapons after moving.
\x0cPage 3
\x0c";
        let mut book = Book::from_pdf_text("Rules", text, 1);
        let edition = EditionProfile::horus_heresy_2e();
        let lookup = LookupContext::new();

        let mut seen = Vec::new();
        let report = book
            .process_with(&edition, &lookup, |page| seen.push(page.number))
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(book.pages[1].page_type, Some(PageType::SpecialRules));
        assert_eq!(book.pages[2].page_type, Some(PageType::BlankOrIgnored));
        assert_eq!(report.totals.special_rules, 3);
        assert_eq!(report.totals.pages_by_type["special_rules"], 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_unrecoverable_error_propagates() {
        let text = "\
Armoury
Bolter  24\"  4  5  Rapid Fire
Some other text here.";
        let mut book = Book::from_pdf_text("Broken", text, 1);
        let edition = EditionProfile::horus_heresy_1e();
        let lookup = LookupContext::new();

        let err = book.process(&edition, &lookup).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_report_json() {
        let mut book = Book::from_pdf_text("Empty", "x", 1);
        let report = book
            .process(&EditionProfile::horus_heresy_2e(), &LookupContext::new())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();

        assert_eq!(json["title"], "Empty");
        assert_eq!(json["totals"]["pages"], 1);
        assert_eq!(json["pages"][0]["page_type"], "blank_or_ignored");
        assert!(json["pages"][0].get("raw_text").is_none());
    }
}
