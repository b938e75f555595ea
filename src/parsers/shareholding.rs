// src/parsers/shareholding.rs
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rule::{ClassificationRule, HeaderWindow};
use super::tables::{detect_text_tables, find_column, header_row, parse_number};
use super::{
    capture, first_line_title, normalize_date, page_sections, translate_sections,
    translate_table_headers, DocumentParser, ParseContext, COMPANY_NAME_RE,
};
use crate::model::{DocumentKind, RawExtraction, Record, Table, TableSource};
use crate::utils::error::ParseError;

static QUARTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)quarter\s+(?:ended|ending|end)\s*[:\-]?\s*([^\n]+?)\s*$")
        .expect("Failed to compile QUARTER_RE")
});

static NAME_OF_ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)name\s+of\s+(?:the\s+)?(?:listed\s+entity|company)\s*[:\-]\s*(.+)$")
        .expect("Failed to compile NAME_OF_ENTITY_RE")
});

/// Parser for quarterly shareholding pattern filings.
pub struct ShareholdingPatternParser {
    pub(crate) rule: ClassificationRule,
}

#[derive(Debug, Default)]
struct Holdings {
    categories: usize,
    promoter: Option<f64>,
    public: Option<f64>,
}

impl ShareholdingPatternParser {
    pub fn new(rule: ClassificationRule) -> Self {
        Self { rule }
    }

    /// Reads category rows from a holding table. Returns false when the table
    /// has no category/percentage columns.
    fn read_holdings(
        index: usize,
        rows: &[Vec<String>],
        holdings: &mut Holdings,
        warnings: &mut Vec<String>,
    ) -> bool {
        let Some(h) = header_row(rows) else {
            return false;
        };
        let header = &rows[h];
        let (Some(category), Some(percentage)) = (
            find_column(header, &["category", "shareholder"]),
            find_column(header, &["%", "percentage", "per cent"]),
        ) else {
            return false;
        };

        for (offset, row) in rows[h + 1..].iter().enumerate() {
            let name = row.get(category).map(|c| c.trim()).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            holdings.categories += 1;

            let cell = row.get(percentage).map(|c| c.trim()).unwrap_or_default();
            let Some(value) = parse_number(cell) else {
                warnings.push(format!(
                    "Percentage '{}' for '{}' in table {} row {} is not a number",
                    cell,
                    name,
                    index + 1,
                    h + offset + 2
                ));
                continue;
            };

            let label = category_label(name);
            if label.starts_with("non") {
                continue;
            }
            if label.contains("promoter") && holdings.promoter.is_none() {
                holdings.promoter = Some(value);
            } else if label.contains("public") && holdings.public.is_none() {
                holdings.public = Some(value);
            }
        }
        true
    }
}

/// Lowercased category name without its "(A)"-style marker, so that
/// "(C) Non Promoter - Non Public" reads as "non promoter - non public".
fn category_label(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let unmarked = match lowered.strip_prefix('(').and_then(|rest| rest.split_once(')')) {
        Some((marker, rest)) if marker.len() <= 4 => rest,
        _ => lowered.as_str(),
    };
    unmarked.trim_start_matches(|c: char| !c.is_alphabetic()).to_string()
}

#[async_trait]
impl DocumentParser for ShareholdingPatternParser {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ShareholdingPattern
    }

    fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool {
        self.rule.matches(header, filename_hint)
    }

    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError> {
        let mut record = Record::new(ctx.document_id.clone(), DocumentKind::ShareholdingPattern, raw);
        let mut warnings = Vec::new();
        let text = raw.pages.join("\n");
        record.title = first_line_title(&ctx.header);
        let mut sections = page_sections(raw);

        let mut tables: Vec<Table> = if raw.tables.is_empty() {
            detect_text_tables(&raw.pages)
                .into_iter()
                .map(|t| Table::new(None, t.rows, TableSource::Text))
                .collect()
        } else {
            raw.tables
                .iter()
                .filter(|t| !t.is_blank())
                .map(|t| Table::new(None, t.rows.clone(), TableSource::Grid))
                .collect()
        };

        let mut holdings = Holdings::default();
        for (index, table) in tables.iter_mut().enumerate() {
            if Self::read_holdings(index, &table.rows, &mut holdings, &mut warnings) {
                table.caption = Some("Shareholding by category".to_string());
            }
        }
        if holdings.categories == 0 {
            warnings.push("No shareholding category table found".to_string());
        }

        translate_sections(&mut sections, ctx, &mut warnings).await?;
        translate_table_headers(&mut tables, ctx, &mut warnings).await?;

        let company = capture(&NAME_OF_ENTITY_RE, &text).or_else(|| capture(&COMPANY_NAME_RE, &text));
        if let Some(company) = company {
            record.set_meta("company_name", company);
        }
        if let Some(quarter) = capture(&QUARTER_RE, &text) {
            record.set_meta("quarter", normalize_date(&quarter));
        }
        record.set_meta("category_count", holdings.categories.to_string());
        if let Some(p) = holdings.promoter {
            record.set_meta("promoter_percentage", p.to_string());
        }
        if let Some(p) = holdings.public {
            record.set_meta("public_percentage", p.to_string());
        }

        record.sections = sections;
        record.tables = tables;
        record.extraction_warnings = warnings;
        Ok(record)
    }
}
