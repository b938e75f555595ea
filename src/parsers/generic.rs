// src/parsers/generic.rs
use async_trait::async_trait;

use super::rule::HeaderWindow;
use super::{first_line_title, page_sections, DocumentParser, ParseContext};
use crate::model::{DocumentKind, RawExtraction, Record, Table, TableSource};
use crate::utils::error::ParseError;

/// Fallback parser. Matches everything and never fails: one section per
/// page, tables in backend order, no translation.
pub struct GenericParser;

impl GenericParser {
    /// The infallible core of [`DocumentParser::parse`].
    pub fn build(&self, raw: &RawExtraction, document_id: &str, header: &HeaderWindow) -> Record {
        let mut record = Record::new(document_id, DocumentKind::Generic, raw);
        record.title = first_line_title(header);
        record.sections = page_sections(raw);
        record.tables = raw
            .tables
            .iter()
            .filter(|t| !t.is_blank())
            .map(|t| Table::new(None, t.rows.clone(), TableSource::Grid))
            .collect();

        // Untranslated text is recorded, never dropped silently.
        record.extraction_warnings = record
            .sections
            .iter()
            .filter(|s| s.requires_translation())
            .map(|s| format!("Translation not attempted for section '{}' (generic extraction)", s.heading))
            .collect();

        record.set_meta("page_count", raw.pages.len().to_string());
        record.set_meta("source_language", raw.source_language.as_str());
        record
    }
}

#[async_trait]
impl DocumentParser for GenericParser {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Generic
    }

    fn matches(&self, _header: &HeaderWindow, _filename_hint: &str) -> bool {
        true
    }

    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError> {
        Ok(self.build(raw, &ctx.document_id, &ctx.header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTable;
    use crate::parsers::testing::{grid, raw};

    #[test]
    fn empty_input_gives_empty_record() {
        let r = RawExtraction::default();
        let record = GenericParser.build(&r, "empty", &HeaderWindow::new(&r, 2));
        assert_eq!(record.kind, DocumentKind::Generic);
        assert!(record.sections.is_empty());
        assert!(record.tables.is_empty());
        assert!(record.title.is_none());
        assert!(record.extraction_warnings.is_empty());
        assert_eq!(record.metadata["page_count"], "0");
    }

    #[test]
    fn one_section_per_page_verbatim() {
        let r = raw(
            &["Annual Report\nSome text", "More text"],
            vec![RawTable::new(grid(&[&["a", "b"]])), RawTable::new(grid(&[&[" "]]))],
        );
        let record = GenericParser.build(&r, "doc", &HeaderWindow::new(&r, 2));
        assert_eq!(record.title.as_deref(), Some("Annual Report"));
        assert_eq!(record.sections.len(), 2);
        assert_eq!(record.sections[1].body_original, "More text");
        assert!(record.sections.iter().all(|s| s.body_translated.is_none()));
        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.raw_table_count, 2);
    }

    #[test]
    fn chinese_pages_are_flagged_untranslated() {
        let r = raw(&["市场概况", "English page"], vec![]);
        let record = GenericParser.build(&r, "doc", &HeaderWindow::new(&r, 2));
        assert_eq!(record.extraction_warnings.len(), 1);
        assert!(record.extraction_warnings[0].contains("Page 1"));
    }

    #[test]
    fn numeric_pages_are_not_flagged() {
        let r = raw(&["Trade summary", "12.5 13,400 -2.1\n2024"], vec![]);
        let record = GenericParser.build(&r, "doc", &HeaderWindow::new(&r, 2));
        assert_eq!(record.sections.len(), 2);
        assert!(record.extraction_warnings.is_empty());
    }
}
