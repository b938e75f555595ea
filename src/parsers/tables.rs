// src/parsers/tables.rs
//! Table helpers: recovering whitespace-aligned tables from page text, and
//! locating columns by header words.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?[\d,]+(?:\.\d+)?%?$").expect("Failed to compile NUMBER_RE"));

/// Lines following a candidate header that are checked for numeric rows.
const LOOKAHEAD_LINES: usize = 5;
const MIN_HEADER_TOKENS: usize = 3;

pub fn is_number(token: &str) -> bool {
    NUMBER_RE.is_match(token.trim())
}

/// Parses a numeric cell such as `1,20,000` or `12.5%`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok()
}

fn numeric_tokens(tokens: &[&str]) -> usize {
    tokens.iter().filter(|t| is_number(t)).count()
}

/// A text table found in page text: header plus data rows, all the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

/// Finds tables laid out as whitespace-separated columns: a header line of at
/// least three tokens followed by rows carrying numbers. Rows wider than the
/// header have their leading tokens folded into the first column, which is
/// how multi-word row labels come out of text extraction.
pub fn detect_text_tables(pages: &[String]) -> Vec<TextTable> {
    let mut tables = Vec::new();

    for (page_idx, page) in pages.iter().enumerate() {
        let lines: Vec<&str> = page.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let mut idx = 0;
        while idx < lines.len() {
            let header: Vec<&str> = lines[idx].split_whitespace().collect();
            let looks_like_header = header.len() >= MIN_HEADER_TOKENS
                && numeric_tokens(&header) < header.len()
                && lines[idx + 1..]
                    .iter()
                    .take(LOOKAHEAD_LINES)
                    .any(|l| numeric_tokens(&l.split_whitespace().collect::<Vec<_>>()) >= 2);
            if !looks_like_header {
                idx += 1;
                continue;
            }

            let width = header.len();
            let mut rows = vec![header.iter().map(|t| t.to_string()).collect::<Vec<_>>()];
            let mut next = idx + 1;
            while next < lines.len() {
                let tokens: Vec<&str> = lines[next].split_whitespace().collect();
                if tokens.len() < 2 || numeric_tokens(&tokens) == 0 {
                    break;
                }
                rows.push(fit_row(&tokens, width));
                next += 1;
            }

            if rows.len() > 1 {
                tables.push(TextTable { page: page_idx, rows });
                idx = next;
            } else {
                idx += 1;
            }
        }
    }

    tables
}

fn fit_row(tokens: &[&str], width: usize) -> Vec<String> {
    if tokens.len() > width {
        let overflow = tokens.len() - width;
        let mut row = vec![tokens[..=overflow].join(" ")];
        row.extend(tokens[overflow + 1..].iter().map(|t| t.to_string()));
        row
    } else {
        let mut row: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        // Short rows are missing leading label cells, not trailing numbers.
        while row.len() < width {
            row.insert(0, String::new());
        }
        row
    }
}

/// Index of the first header cell containing any of `needles`
/// (case-insensitive).
pub fn find_column(header: &[String], needles: &[&str]) -> Option<usize> {
    header.iter().position(|cell| {
        let cell = cell.to_lowercase();
        needles.iter().any(|n| cell.contains(n))
    })
}

/// Index of the first row that has at least two non-empty cells.
pub fn header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .position(|r| r.iter().filter(|c| !c.trim().is_empty()).count() >= 2)
}
