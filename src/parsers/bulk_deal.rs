// src/parsers/bulk_deal.rs
//! Parser for exchange bulk/block deal disclosures: one or more deal tables
//! listing date, security, client, side, quantity and price.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rule::{ClassificationRule, HeaderWindow};
use super::tables::{detect_text_tables, find_column, header_row, parse_number};
use super::{
    capture, first_line_title, normalize_date, page_sections, translate_sections,
    translate_table_headers, DocumentParser, ParseContext, COMPANY_NAME_RE, DATE_RE,
};
use crate::model::{DocumentKind, RawExtraction, Record, Table, TableSource};
use crate::utils::error::ParseError;

const DEAL_TABLE_CAPTION: &str = "Bulk deal transactions";

static EXCHANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(NSE|BSE|National Stock Exchange|Bombay Stock Exchange)\b")
        .expect("Failed to compile EXCHANGE_RE")
});

/// Column positions of a recognized deal table.
#[derive(Debug, Default)]
struct DealColumns {
    date: Option<usize>,
    company: Option<usize>,
    client: Option<usize>,
    quantity: Option<usize>,
}

impl DealColumns {
    fn from_header(header: &[String]) -> Self {
        Self {
            date: find_column(header, &["date"]),
            company: find_column(header, &["security name", "company", "scrip name", "symbol"]),
            client: find_column(header, &["client", "acquirer", "counterparty", "party name"]),
            quantity: find_column(header, &["quantity", "no. of shares", "shares"]),
        }
    }

    fn is_deal_table(&self) -> bool {
        self.client.is_some() || self.quantity.is_some()
    }
}

/// Width of a row ignoring trailing empty cells.
fn used_width(row: &[String]) -> usize {
    row.iter().rposition(|c| !c.trim().is_empty()).map_or(0, |i| i + 1)
}

fn cell(row: &[String], column: Option<usize>) -> Option<&str> {
    column
        .and_then(|i| row.get(i))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
}

#[derive(Debug, Default)]
struct DealSummary {
    first_date: Option<String>,
    first_company: Option<String>,
    counterparties: Vec<String>,
    deal_count: usize,
    total_quantity: f64,
}

pub struct BulkDealParser {
    pub(crate) rule: ClassificationRule,
}

impl BulkDealParser {
    pub fn new(rule: ClassificationRule) -> Self {
        Self { rule }
    }

    /// Reads deal rows from one table into `summary`. Rows wider than the
    /// header cannot be attributed to columns and fail the parse.
    fn read_deals(
        index: usize,
        rows: &[Vec<String>],
        check_width: bool,
        summary: &mut DealSummary,
        warnings: &mut Vec<String>,
    ) -> Result<bool, ParseError> {
        let Some(h) = header_row(rows) else {
            return Ok(false);
        };
        let header = &rows[h];
        let columns = DealColumns::from_header(header);
        if !columns.is_deal_table() {
            return Ok(false);
        }

        let width = used_width(header);
        for (offset, row) in rows[h + 1..].iter().enumerate() {
            if used_width(row) == 0 {
                continue;
            }
            if check_width && used_width(row) > width {
                return Err(ParseError::MalformedTable {
                    table: index + 1,
                    detail: format!(
                        "row {} has {} cells but the header has {}",
                        h + offset + 2,
                        used_width(row),
                        width
                    ),
                });
            }

            summary.deal_count += 1;
            if summary.first_date.is_none() {
                summary.first_date = cell(row, columns.date).map(normalize_date);
            }
            if summary.first_company.is_none() {
                summary.first_company = cell(row, columns.company).map(str::to_string);
            }
            if let Some(client) = cell(row, columns.client) {
                if !summary.counterparties.iter().any(|c| c == client) {
                    summary.counterparties.push(client.to_string());
                }
            }
            if let Some(quantity) = cell(row, columns.quantity) {
                match parse_number(quantity) {
                    Some(q) => summary.total_quantity += q,
                    None => warnings.push(format!(
                        "Quantity '{}' in table {} row {} is not a number",
                        quantity,
                        index + 1,
                        h + offset + 2
                    )),
                }
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl DocumentParser for BulkDealParser {
    fn kind(&self) -> DocumentKind {
        DocumentKind::BulkDeal
    }

    fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool {
        self.rule.matches(header, filename_hint)
    }

    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError> {
        let mut record = Record::new(ctx.document_id.clone(), DocumentKind::BulkDeal, raw);
        let mut warnings = Vec::new();
        record.title = first_line_title(&ctx.header);
        let mut sections = page_sections(raw);

        // Backend grids first; text tables only when there are none.
        let candidates: Vec<(Vec<Vec<String>>, TableSource)> = if raw.tables.is_empty() {
            detect_text_tables(&raw.pages)
                .into_iter()
                .map(|t| (t.rows, TableSource::Text))
                .collect()
        } else {
            raw.tables
                .iter()
                .filter(|t| !t.is_blank())
                .map(|t| (t.rows.clone(), TableSource::Grid))
                .collect()
        };

        let mut summary = DealSummary::default();
        let mut tables = Vec::with_capacity(candidates.len());
        for (index, (rows, source)) in candidates.into_iter().enumerate() {
            let check_width = source == TableSource::Grid;
            let is_deals = Self::read_deals(index, &rows, check_width, &mut summary, &mut warnings)?;
            let caption = is_deals.then(|| DEAL_TABLE_CAPTION.to_string());
            tables.push(Table::new(caption, rows, source));
        }
        if summary.deal_count == 0 {
            warnings.push("No bulk deal rows found".to_string());
        }
        tracing::debug!("Read {} bulk deal rows", summary.deal_count);

        translate_sections(&mut sections, ctx, &mut warnings).await?;
        translate_table_headers(&mut tables, ctx, &mut warnings).await?;

        let full_text = raw.pages.join("\n");
        let company = capture(&COMPANY_NAME_RE, &full_text).or(summary.first_company);
        let deal_date = summary
            .first_date
            .or_else(|| DATE_RE.find(ctx.header.text()).map(|m| normalize_date(m.as_str())));
        let exchange = capture(&EXCHANGE_RE, &full_text).map(|e| match e.to_lowercase().as_str() {
            "nse" | "national stock exchange" => "NSE".to_string(),
            _ => "BSE".to_string(),
        });

        if let Some(company) = company {
            record.set_meta("company_name", company);
        }
        if let Some(date) = deal_date {
            record.set_meta("deal_date", date);
        }
        if let Some(exchange) = exchange {
            record.set_meta("exchange", exchange);
        }
        record.set_meta("counterparties", summary.counterparties.join("; "));
        record.set_meta("deal_count", summary.deal_count.to_string());
        if summary.deal_count > 0 {
            record.set_meta("total_quantity", summary.total_quantity.to_string());
        }

        record.sections = sections;
        record.tables = tables;
        record.extraction_warnings = warnings;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;
    use crate::model::{Language, RawTable};
    use crate::parsers::testing::{context, grid, raw};
    use crate::translation::testing::EchoTranslator;
    use crate::translation::DisabledTranslator;
    use std::sync::Arc;

    fn parser() -> BulkDealParser {
        let config = ClassificationConfig::default();
        BulkDealParser::new(ClassificationRule::from_config(DocumentKind::BulkDeal, &config.bulk_deal).unwrap())
    }

    fn deal_grid() -> Vec<Vec<String>> {
        grid(&[
            &["Bulk Deals", "", "", "", "", ""],
            &["Deal Date", "Security Name", "Client Name", "Buy/Sell", "Quantity Traded", "Trade Price"],
            &["05-03-2024", "ACME LTD", "ALPHA FUND", "BUY", "1,20,000", "101.50"],
            &["05-03-2024", "ACME LTD", "BETA CAPITAL", "SELL", "80,000", "101.20"],
            &["05-03-2024", "ACME LTD", "ALPHA FUND", "SELL", "20,000", "102.00"],
        ])
    }

    #[tokio::test]
    async fn extracts_deal_fields_from_grid() {
        let r = raw(
            &["NSE Bulk Deal Disclosure\nDate of transaction: 05-03-2024"],
            vec![RawTable::new(deal_grid())],
        );
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();

        assert_eq!(record.kind, DocumentKind::BulkDeal);
        assert_eq!(record.title.as_deref(), Some("NSE Bulk Deal Disclosure"));
        assert_eq!(record.metadata["company_name"], "ACME LTD");
        assert_eq!(record.metadata["deal_date"], "2024-03-05");
        assert_eq!(record.metadata["exchange"], "NSE");
        assert_eq!(record.metadata["counterparties"], "ALPHA FUND; BETA CAPITAL");
        assert_eq!(record.metadata["deal_count"], "3");
        assert_eq!(record.metadata["total_quantity"], "220000");
        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.tables[0].caption.as_deref(), Some(DEAL_TABLE_CAPTION));
        assert!(record.extraction_warnings.is_empty());
    }

    #[tokio::test]
    async fn labelled_company_name_wins_over_table() {
        let r = raw(
            &["Bulk deal\nCompany Name: Acme Industries Limited"],
            vec![RawTable::new(deal_grid())],
        );
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();
        assert_eq!(record.metadata["company_name"], "Acme Industries Limited");
    }

    #[tokio::test]
    async fn row_wider_than_header_is_malformed() {
        let mut rows = deal_grid();
        rows[3].push("EXTRA".to_string());
        let r = raw(&["Bulk deal"], vec![RawTable::new(rows)]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let err = parser().parse(&r, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedTable { table: 1, .. }));
    }

    #[tokio::test]
    async fn missing_table_is_a_warning_not_a_failure() {
        let r = raw(&["Bulk deal report\nNo deals were reported today."], vec![]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();
        assert!(record.tables.is_empty());
        assert_eq!(record.metadata["deal_count"], "0");
        assert_eq!(record.extraction_warnings, vec!["No bulk deal rows found"]);
    }

    #[tokio::test]
    async fn bad_quantity_is_reported() {
        let mut rows = deal_grid();
        rows[2][4] = "n/a".to_string();
        let r = raw(&["Bulk deal"], vec![RawTable::new(rows)]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();
        assert_eq!(record.metadata["total_quantity"], "100000");
        assert_eq!(record.extraction_warnings.len(), 1);
        assert!(record.extraction_warnings[0].contains("'n/a'"));
    }

    #[tokio::test]
    async fn numeric_page_needs_no_translation() {
        let r = raw(
            &["NSE Bulk Deal Disclosure\nDate of transaction: 05-03-2024", "05-03-2024 1,20,000 101.50"],
            vec![RawTable::new(deal_grid())],
        );
        let mut ctx = context(&r, Arc::new(DisabledTranslator));
        let record = parser().parse(&r, &mut ctx).await.unwrap();

        assert_eq!(record.sections.len(), 2);
        assert_eq!(record.sections[1].language, Language::Unknown);
        assert!(record.sections.iter().all(|s| !s.requires_translation()));
        assert!(record.extraction_warnings.is_empty(), "{:?}", record.extraction_warnings);
    }
}
