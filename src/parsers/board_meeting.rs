// src/parsers/board_meeting.rs
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rule::{ClassificationRule, HeaderWindow};
use super::{
    capture, first_line_title, normalize_date, page_sections, translate_sections,
    translate_table_headers, DocumentParser, ParseContext, COMPANY_NAME_RE, DATE_RE,
};
use crate::model::{DocumentKind, RawExtraction, Record, Section, Table, TableSource};
use crate::utils::error::ParseError;
use crate::utils::language::detect_language;

static LIMITED_COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*([A-Z][A-Za-z0-9&.,'()\- ]*?\s(?:LIMITED|Limited|LTD\.?|Ltd\.?))\s*$")
        .expect("Failed to compile LIMITED_COMPANY_RE")
});

static MEETING_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)meeting\s+(?:(?:was\s+)?(?:held|scheduled|to\s+be\s+held)\s+)?on\s*[:\-]?\s*(?:\w+day,?\s*)?(\S+(?:\s+\S+,?\s+\d{4})?)")
        .expect("Failed to compile MEETING_DATE_RE")
});

static AGENDA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:agenda(?:\s+item)?|subject)\s*(?:no\.?\s*)?\d*\s*[:\-]\s*(.+)$")
        .expect("Failed to compile AGENDA_RE")
});

static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*resolution\s*(?:no\.?\s*)?\d*\s*[:\-]\s*(.+)$")
        .expect("Failed to compile RESOLUTION_RE")
});

/// Parser for board meeting notices and outcomes.
pub struct BoardMeetingParser {
    pub(crate) rule: ClassificationRule,
}

impl BoardMeetingParser {
    pub fn new(rule: ClassificationRule) -> Self {
        Self { rule }
    }

    fn meeting_date(text: &str) -> Option<String> {
        let near_meeting = MEETING_DATE_RE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .find_map(|m| DATE_RE.find(m.as_str()).map(|d| d.as_str().to_string()));
        near_meeting
            .or_else(|| DATE_RE.find(text).map(|m| m.as_str().to_string()))
            .map(|d| normalize_date(&d))
    }
}

fn all_captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl DocumentParser for BoardMeetingParser {
    fn kind(&self) -> DocumentKind {
        DocumentKind::BoardMeeting
    }

    fn matches(&self, header: &HeaderWindow, filename_hint: &str) -> bool {
        self.rule.matches(header, filename_hint)
    }

    async fn parse(&self, raw: &RawExtraction, ctx: &mut ParseContext) -> Result<Record, ParseError> {
        let mut record = Record::new(ctx.document_id.clone(), DocumentKind::BoardMeeting, raw);
        let mut warnings = Vec::new();
        let text = raw.pages.join("\n");
        record.title = first_line_title(&ctx.header);

        let agenda = all_captures(&AGENDA_RE, &text);
        let resolutions = all_captures(&RESOLUTION_RE, &text);
        tracing::debug!("Found {} agenda items and {} resolutions", agenda.len(), resolutions.len());

        let mut sections: Vec<Section> = agenda
            .iter()
            .enumerate()
            .map(|(i, a)| Section::new(format!("Agenda {}", i + 1), a.as_str(), detect_language(a)))
            .chain(resolutions.iter().enumerate().map(|(i, r)| {
                Section::new(format!("Resolution {}", i + 1), r.as_str(), detect_language(r))
            }))
            .collect();
        if sections.is_empty() {
            warnings.push("No agenda items or resolutions found".to_string());
            sections = page_sections(raw);
        }

        let mut tables: Vec<Table> = raw
            .tables
            .iter()
            .filter(|t| !t.is_blank())
            .map(|t| Table::new(None, t.rows.clone(), TableSource::Grid))
            .collect();

        translate_sections(&mut sections, ctx, &mut warnings).await?;
        translate_table_headers(&mut tables, ctx, &mut warnings).await?;

        let company = capture(&COMPANY_NAME_RE, &text).or_else(|| capture(&LIMITED_COMPANY_RE, ctx.header.text()));
        if let Some(company) = company {
            record.set_meta("company_name", company);
        }
        if let Some(date) = Self::meeting_date(&text) {
            record.set_meta("meeting_date", date);
        }
        record.set_meta("num_resolutions", resolutions.len().to_string());
        record.set_meta("num_agenda_items", agenda.len().to_string());

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
    use crate::parsers::testing::{context, raw};
    use crate::translation::testing::EchoTranslator;
    use std::sync::Arc;

    fn parser() -> BoardMeetingParser {
        let config = ClassificationConfig::default();
        BoardMeetingParser::new(
            ClassificationRule::from_config(DocumentKind::BoardMeeting, &config.board_meeting).unwrap(),
        )
    }

    const NOTICE: &str = "Outcome of Board Meeting\n\
        ACME INDUSTRIES LIMITED\n\
        Intimation dated 01/02/2024\n\
        The meeting was held on 14/02/2024 at the registered office.\n\
        Agenda 1: Approval of unaudited financial results\n\
        Agenda 2: Declaration of interim dividend\n\
        Resolution: Approved the unaudited financial results for Q3\n\
        Resolution No. 2: Declared an interim dividend of Rs. 5 per share";

    #[tokio::test]
    async fn extracts_agenda_resolutions_and_fields() {
        let r = raw(&[NOTICE], vec![]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Outcome of Board Meeting"));
        assert_eq!(record.metadata["company_name"], "ACME INDUSTRIES LIMITED");
        assert_eq!(record.metadata["meeting_date"], "2024-02-14");
        assert_eq!(record.metadata["num_agenda_items"], "2");
        assert_eq!(record.metadata["num_resolutions"], "2");

        let headings: Vec<&str> = record.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Agenda 1", "Agenda 2", "Resolution 1", "Resolution 2"]);
        assert_eq!(record.sections[3].body_original, "Declared an interim dividend of Rs. 5 per share");
        assert!(record.extraction_warnings.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_pages_without_resolutions() {
        let r = raw(&["Board meeting\nCompany Name: Beta Ltd\nNothing else."], vec![]);
        let mut ctx = context(&r, Arc::new(EchoTranslator::default()));
        let record = parser().parse(&r, &mut ctx).await.unwrap();

        assert_eq!(record.sections.len(), 1);
        assert_eq!(record.sections[0].heading, "Page 1");
        assert_eq!(record.metadata["company_name"], "Beta Ltd");
        assert!(!record.metadata.contains_key("meeting_date"));
        assert_eq!(record.extraction_warnings.len(), 1);
    }
}
