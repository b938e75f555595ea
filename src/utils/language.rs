// src/utils/language.rs
//! Cheap script-based language detection.
//!
//! The corpus is Chinese macro reports and English exchange filings, so the
//! decision is between CJK ideographs and Latin letters only.

use crate::model::Language;

/// Roughly how many Latin letters carry the content of one ideograph.
const LETTERS_PER_IDEOGRAPH: usize = 4;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // Extension A
        | '\u{F900}'..='\u{FAFF}' // Compatibility Ideographs
    )
}

/// Detect the dominant language of `text`.
pub fn detect_language(text: &str) -> Language {
    let mut ideographs = 0usize;
    let mut letters = 0usize;
    for c in text.chars() {
        if is_cjk(c) {
            ideographs += 1;
        } else if c.is_ascii_alphabetic() {
            letters += 1;
        }
    }

    if ideographs > 0 && ideographs * LETTERS_PER_IDEOGRAPH >= letters {
        Language::Zh
    } else if letters > 0 {
        Language::En
    } else {
        Language::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_chinese_with_numbers() {
        assert_eq!(detect_language("2024年第三季度城镇居民消费价格指数 12.5"), Language::Zh);
        assert_eq!(detect_language("GDP增长"), Language::Zh);
    }

    #[test]
    fn detects_english_with_stray_ideograph() {
        assert_eq!(
            detect_language("Bulk deal disclosure for the trading session 宏"),
            Language::En
        );
    }

    #[test]
    fn digits_only_is_unknown() {
        assert_eq!(detect_language("12.5 13,400 -2.1"), Language::Unknown);
        assert_eq!(detect_language(""), Language::Unknown);
    }
}
