// src/parsers/macro_economic.rs
//! Parser for central-bank macro-economic reports (PBoC surveys, price and
//! sentiment indices). These are Chinese, organized under numbered headings,
//! and often carry their tables as aligned text rather than real grids.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rule::{ClassificationRule, HeaderWindow};
use super::tables::{detect_text_tables, is_number};
use super::{
    capture, is_title_length, translate_sections, translate_table_headers, translate_title,
    DocumentParser, ParseContext,
};
use crate::model::{DocumentKind, RawExtraction, Record, Section, Table, TableSource};
use crate::utils::error::ParseError;
use crate::utils::language::detect_language;

const PREAMBLE_HEADING: &str = "Summary";
const PBOC_NAME: &str = "People's Bank of China";

static TITLE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"报告|调查|公报|统计|指数|纪要|(?i:\breport\b|\bsurvey\b|\bbulletin\b|\boutlook\b|\breview\b)")
        .expect("Failed to compile TITLE_MARKER_RE")
});

// `1.` `2、` `一、` `（三）` style headings at the start of a line. A digit right
// after the separator means a decimal number, not a heading.
static SECTION_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,2}\s*[\.、．]|[一二三四五六七八九十]{1,3}\s*[、．.]|[（(][一二三四五六七八九十\d]{1,3}[）)])\s*[^\d\s.．%]")
        .expect("Failed to compile SECTION_HEADING_RE")
});

static REPORT_PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d{4}\s*年\s*(?:第[一二三四1-4]季度|[一二三四]季度|\d{1,2}\s*月份?|[上下]半年)?|\bQ[1-4]\s*\d{4}\b|\b(?:first|second|third|fourth)\s+quarter(?:\s+of)?\s+\d{4}\b|\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{4}\b)",
    )
    .expect("Failed to compile REPORT_PERIOD_RE")
});

pub struct MacroEconomicParser {
    pub(crate) rule: ClassificationRule,
}

impl MacroEconomicParser {
    pub fn new(rule: ClassificationRule) -> Self {
        Self { rule }
    }

    /// First line of the header window that reads like a report title.
    fn find_title(header: &HeaderWindow) -> Option<String> {
        header
            .lines()
            .filter(|l| is_title_length(l) && !SECTION_HEADING_RE.is_match(l))
            .filter(|l| l.split_whitespace().filter(|t| is_number(t)).count() < 2)
            .find(|l| TITLE_MARKER_RE.is_match(l))
            .map(str::to_string)
    }
}

/// A heading and where it sits: page index and line index within the page's
/// non-blank lines.
#[derive(Debug, Clone)]
struct HeadingPosition {
    page: usize,
    line: usize,
    text: String,
}

fn push_section(sections: &mut Vec<Section>, heading: &str, body: &mut Vec<&str>, keep_empty: bool) {
    let text = body.join("\n");
    if keep_empty || !text.trim().is_empty() {
        let language = if text.trim().is_empty() {
            detect_language(heading)
        } else {
            detect_language(&text)
        };
        sections.push(Section::new(heading, text, language));
    }
    body.clear();
}

/// Splits page text into sections at numbered headings. Text before the
/// first heading (minus the title line) becomes a summary section.
fn split_sections(raw: &RawExtraction, title: &str) -> (Vec<Section>, Vec<HeadingPosition>) {
    let mut sections = Vec::new();
    let mut positions: Vec<HeadingPosition> = Vec::new();
    let mut heading = PREAMBLE_HEADING.to_string();
    let mut body: Vec<&str> = Vec::new();
    let mut title_seen = false;

    for (page_idx, page) in raw.pages.iter().enumerate() {
        let lines = page.lines().map(str::trim).filter(|l| !l.is_empty());
        for (line_idx, line) in lines.enumerate() {
            if !title_seen && line == title {
                title_seen = true;
                continue;
            }
            if SECTION_HEADING_RE.is_match(line) {
                // Headings without body text are still sections; an empty
                // preamble is not.
                let keep_empty = !positions.is_empty();
                push_section(&mut sections, &heading, &mut body, keep_empty);
                heading = line.to_string();
                positions.push(HeadingPosition {
                    page: page_idx,
                    line: line_idx,
                    text: line.to_string(),
                });
            } else {
                body.push(line);
            }
        }
    }
    let keep_empty = !positions.is_empty();
    push_section(&mut sections, &heading, &mut body, keep_empty);

    (sections, positions)
}

/// Locates the line of a page holding `needle`.
fn line_of(page: &str, needle: &str) -> Option<usize> {
    page.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .position(|l| l.contains(needle))
}

/// Caption for a table: the closest heading above the table's first header
/// cell, falling back to that cell itself.
fn infer_caption(
    raw: &RawExtraction,
    headings: &[HeadingPosition],
    page: Option<usize>,
    rows: &[Vec<String>],
) -> Option<String> {
    let anchor = rows
        .first()
        .and_then(|r| r.iter().find(|c| !c.trim().is_empty()))
        .map(|c| c.trim().to_string());

    let located = match (page, anchor.as_deref()) {
        (Some(p), Some(a)) => {
            let line = raw.pages.get(p).and_then(|text| line_of(text, a));
            Some((p, line.unwrap_or(usize::MAX)))
        }
        (Some(p), None) => Some((p, usize::MAX)),
        (None, Some(a)) => raw
            .pages
            .iter()
            .enumerate()
            .find_map(|(p, text)| line_of(text, a).map(|l| (p, l))),
        (None, None) => None,
    };

    located
        .and_then(|(page, line)| {
            headings
                .iter()
                .filter(|h| h.page < page || (h.page == page && h.line <= line))
                .last()
                .map(|h| h.text.clone())
        })
        .or(anchor)
}

#[async_trait]
impl DocumentParser for MacroEconomicParser {
    fn kind(&self) -> DocumentKind {
        DocumentKind::MacroEconomic
    }

    fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool {
        self.rule.matches(header, filename_hint)
    }

    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError> {
        let title = Self::find_title(&ctx.header).ok_or(ParseError::MissingTitle {
            pages: ctx.header.pages(),
        })?;
        tracing::debug!("Macro report title: {}", title);

        let mut record = Record::new(ctx.document_id.clone(), DocumentKind::MacroEconomic, raw);
        let mut warnings = Vec::new();
        record.title = Some(title.clone());

        let (mut sections, headings) = split_sections(raw, &title);
        tracing::debug!("Split macro report into {} sections", sections.len());

        let mut tables = Vec::new();
        if raw.tables.is_empty() {
            for found in detect_text_tables(&raw.pages) {
                let caption = infer_caption(raw, &headings, Some(found.page), &found.rows);
                tables.push(Table::new(caption, found.rows, TableSource::Text));
            }
            if !tables.is_empty() {
                tracing::debug!("Recovered {} text tables", tables.len());
            }
        } else {
            for (index, table) in raw.tables.iter().enumerate() {
                if table.is_blank() {
                    warnings.push(format!(
                        "Table {} from the extraction backend is empty and was skipped",
                        index + 1
                    ));
                    continue;
                }
                let caption = infer_caption(raw, &headings, table.page, &table.rows);
                tables.push(Table::new(caption, table.rows.clone(), TableSource::Grid));
            }
        }

        translate_title(&mut record, ctx, &mut warnings).await?;
        translate_sections(&mut sections, ctx, &mut warnings).await?;
        translate_table_headers(&mut tables, ctx, &mut warnings).await?;

        let all_translated = sections
            .iter()
            .all(|s| !s.requires_translation() || s.body_translated.is_some());
        let full_text = raw.pages.join("\n");

        record.set_meta("source_language", raw.source_language.as_str());
        record.set_meta("translated", all_translated.to_string());
        record.set_meta("section_count", sections.len().to_string());
        if let Some(period) = capture(&REPORT_PERIOD_RE, ctx.header.text()) {
            record.set_meta("report_period", period);
        }
        if full_text.contains("中国人民银行") || full_text.to_lowercase().contains("people's bank of china") {
            record.set_meta("publisher", PBOC_NAME);
        }

        record.sections = sections;
        record.tables = tables;
        record.extraction_warnings = warnings;
        Ok(record)
    }
}
