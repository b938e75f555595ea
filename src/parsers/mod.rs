// src/parsers/mod.rs
//! Document-type specific parsers.
//!
//! Every parser turns the same [`RawExtraction`] into a [`Record`]; they differ
//! in how they recognize their documents and which fields they pull out.

pub mod board_meeting;
pub mod bulk_deal;
pub mod generic;
pub mod macro_economic;
pub mod rule;
pub mod shareholding;
pub mod tables;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{DocumentKind, Language, RawExtraction, Record, Section, Table};
use crate::translation::TranslationSession;
use crate::utils::error::ParseError;
use crate::utils::language::detect_language;

pub use board_meeting::BoardMeetingParser;
pub use bulk_deal::BulkDealParser;
pub use generic::GenericParser;
pub use macro_economic::MacroEconomicParser;
pub use rule::{ClassificationRule, HeaderWindow};
pub use shareholding::ShareholdingPatternParser;

/// Longest line still considered a title rather than running text.
const MAX_TITLE_CHARS: usize = 120;

// --- Shared field patterns ---
pub(crate) static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|\d{4}-\d{2}-\d{2}|\d{1,2}[-\s](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[-\s,]+\d{4})\b",
    )
    .expect("Failed to compile DATE_RE")
});

pub(crate) static COMPANY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^.*?\b(?:company|security|scrip|listed\s+entity)\s*name\s*[:\-]\s*(.+)$")
        .expect("Failed to compile COMPANY_NAME_RE")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%y", "%d/%m/%y", "%d-%b-%Y",
    "%d %b %Y", "%d-%B-%Y", "%d %B %Y", "%d %B, %Y", "%d %b, %Y",
];

/// Everything a parser may use besides the raw extraction itself.
pub struct ParseContext {
    pub document_id: String,
    pub header: HeaderWindow,
    pub translation: TranslationSession,
    /// Fail the parse instead of warning when a translation is unavailable.
    pub strict_translation: bool,
}

/// Capability shared by every document parser.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    fn kind(&self) -> DocumentKind;

    /// Cheap predicate over the header window and filename.
    fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool;

    /// Produces a complete record or fails; never a partial record.
    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError>;
}

/// The closed set of parsers the registry can hold.
pub enum Parser {
    MacroEconomic(MacroEconomicParser),
    BulkDeal(BulkDealParser),
    BoardMeeting(BoardMeetingParser),
    ShareholdingPattern(ShareholdingPatternParser),
    Generic(GenericParser),
}

impl Parser {
    pub fn as_dyn(&self) -> &dyn DocumentParser {
        match self {
            Parser::MacroEconomic(p) => p,
            Parser::BulkDeal(p) => p,
            Parser::BoardMeeting(p) => p,
            Parser::ShareholdingPattern(p) => p,
            Parser::Generic(p) => p,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.as_dyn().kind()
    }

    pub fn rule(&self) -> Option<&ClassificationRule> {
        match self {
            Parser::MacroEconomic(p) => Some(&p.rule),
            Parser::BulkDeal(p) => Some(&p.rule),
            Parser::BoardMeeting(p) => Some(&p.rule),
            Parser::ShareholdingPattern(p) => Some(&p.rule),
            Parser::Generic(_) => None,
        }
    }
}

// --- Helpers shared by the parser variants ---

/// First short line of the header window, used where no stronger title rule exists.
pub(crate) fn first_line_title(header: &HeaderWindow) -> Option<String> {
    header
        .lines()
        .find(|l| l.chars().count() <= MAX_TITLE_CHARS && l.chars().any(char::is_alphabetic))
        .map(str::to_string)
}

pub(crate) fn is_title_length(line: &str) -> bool {
    line.chars().count() <= MAX_TITLE_CHARS
}

/// One section per page, verbatim.
pub(crate) fn page_sections(raw: &RawExtraction) -> Vec<Section> {
    raw.pages
        .iter()
        .enumerate()
        .map(|(i, page)| Section::new(format!("Page {}", i + 1), page.trim(), detect_language(page)))
        .collect()
}

/// First capture group of `re` in `text`, trimmed.
pub(crate) fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// ISO form of a date when chrono can read it, otherwise the input unchanged.
pub(crate) fn normalize_date(value: &str) -> String {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Records a translation failure as a warning, or fails when strict.
fn translation_failure(
    ctx: &ParseContext,
    warnings: &mut Vec<String>,
    heading: &str,
    reason: String,
) -> Result<(), ParseError> {
    let err = ParseError::TranslationUnavailable {
        heading: heading.to_string(),
        reason,
    };
    if ctx.strict_translation {
        return Err(err);
    }
    tracing::warn!("{} ({})", err, ctx.document_id);
    warnings.push(err.to_string());
    Ok(())
}

/// Translates the body and heading of every Chinese section.
/// A failed body keeps `body_translated` empty and leaves a warning behind.
pub(crate) async fn translate_sections(
    sections: &mut [Section],
    ctx: &mut ParseContext,
    warnings: &mut Vec<String>,
) -> Result<(), ParseError> {
    for section in sections.iter_mut() {
        if detect_language(&section.heading) == Language::Zh {
            match ctx.translation.to_english(&section.heading, Language::Zh).await {
                Ok(text) => section.heading_translated = Some(text),
                Err(e) => tracing::debug!("Heading translation failed for '{}': {}", section.heading, e),
            }
        }

        if !section.requires_translation() {
            continue;
        }
        match ctx.translation.to_english(&section.body_original, section.language).await {
            Ok(text) => section.body_translated = Some(text),
            Err(e) => translation_failure(ctx, warnings, &section.heading, e.to_string())?,
        }
    }
    Ok(())
}

/// Translates the record title when it is Chinese.
pub(crate) async fn translate_title(
    record: &mut Record,
    ctx: &mut ParseContext,
    warnings: &mut Vec<String>,
) -> Result<(), ParseError> {
    let Some(title) = record.title.clone() else {
        return Ok(());
    };
    let language = detect_language(&title);
    if language != Language::Zh {
        return Ok(());
    }
    match ctx.translation.to_english(&title, language).await {
        Ok(text) => record.title_translated = Some(text),
        Err(e) => translation_failure(ctx, warnings, "title", e.to_string())?,
    }
    Ok(())
}

/// Translates the header row of tables whose header is not English.
pub(crate) async fn translate_table_headers(
    tables: &mut [Table],
    ctx: &mut ParseContext,
    warnings: &mut Vec<String>,
) -> Result<(), ParseError> {
    for (index, table) in tables.iter_mut().enumerate() {
        let Some(header) = table.rows.first() else {
            continue;
        };
        if detect_language(&header.join(" ")) != Language::Zh {
            continue;
        }

        let mut translated = Vec::with_capacity(header.len());
        let mut failure = None;
        for cell in header {
            let language = detect_language(cell);
            if language != Language::Zh {
                translated.push(cell.clone());
                continue;
            }
            match ctx.translation.to_english(cell, language).await {
                Ok(text) => translated.push(text),
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        match failure {
            None => {
                table.translated_header = Some(translated);
                table.translated = true;
            }
            Some(reason) => {
                let label = table
                    .caption
                    .clone()
                    .unwrap_or_else(|| format!("table {}", index + 1));
                translation_failure(ctx, warnings, &label, reason)?;
            }
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::translation::testing::{EchoTranslator, FailingTranslator};
    use std::sync::Arc;

    #[test]
    fn normalizes_common_date_shapes() {
        assert_eq!(normalize_date("05-03-2024"), "2024-03-05");
        assert_eq!(normalize_date("05/03/2024"), "2024-03-05");
        assert_eq!(normalize_date("5-Mar-2024"), "2024-03-05");
        assert_eq!(normalize_date("12 March 2024"), "2024-03-12");
        assert_eq!(normalize_date("sometime soon"), "sometime soon");
    }

    #[test]
    fn date_pattern_finds_dates_in_text() {
        let text = "Meeting held on 14/02/2024 at Mumbai";
        assert_eq!(DATE_RE.find(text).unwrap().as_str(), "14/02/2024");
        assert_eq!(DATE_RE.find("dated 3 Jan 2024.").unwrap().as_str(), "3 Jan 2024");
    }

    #[test]
    fn company_name_is_captured_from_labelled_line() {
        let text = "NOTICE\nCompany Name: Acme Industries Ltd\nDate: 01-01-2024";
        assert_eq!(capture(&COMPANY_NAME_RE, text).as_deref(), Some("Acme Industries Ltd"));
    }

    #[test]
    fn page_sections_keep_page_order() {
        let r = raw(&["first page", "第二页"], vec![]);
        let sections = page_sections(&r);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Page 1");
        assert_eq!(sections[1].language, Language::Zh);
    }

    #[tokio::test]
    async fn failed_body_translation_is_kept_with_warning() {
        let r = raw(&["x"], vec![]);
        let mut ctx = context(&r, Arc::new(FailingTranslator { needle: "失败".to_string() }));
        let mut sections = vec![
            Section::new("一、价格", "价格上涨", Language::Zh),
            Section::new("二、就业", "就业失败", Language::Zh),
            Section::new("Notes", "Plain English", Language::En),
        ];
        let mut warnings = Vec::new();
        translate_sections(&mut sections, &mut ctx, &mut warnings).await.unwrap();

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].body_translated.as_deref(), Some("EN:价格上涨"));
        assert_eq!(sections[0].heading_translated.as_deref(), Some("EN:一、价格"));
        assert!(sections[1].body_translated.is_none());
        assert!(sections[2].body_translated.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("二、就业"));
    }

    #[tokio::test]
    async fn strict_mode_turns_failure_into_error() {
        let r = raw(&["x"], vec![]);
        let mut ctx = context(&r, Arc::new(FailingTranslator { needle: "价格".to_string() }));
        ctx.strict_translation = true;
        let mut sections = vec![Section::new("A", "价格上涨", Language::Zh)];
        let err = translate_sections(&mut sections, &mut ctx, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::TranslationUnavailable { ref heading, .. } if heading == "A"));
    }

    #[tokio::test]
    async fn chinese_table_header_is_translated() {
        let r = raw(&["x"], vec![]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let mut tables = vec![Table::new(
            None,
            grid(&[&["指标", "2024"], &["12.5", "13.1"]]),
            crate::model::TableSource::Grid,
        )];
        translate_table_headers(&mut tables, &mut ctx, &mut Vec::new()).await.unwrap();
        assert!(tables[0].translated);
        assert_eq!(
            tables[0].translated_header.as_deref(),
            Some(&["EN:指标".to_string(), "2024".to_string()][..])
        );
    }
}
