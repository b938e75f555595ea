// src/utils/html_debug.rs
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::dispatch::Classification;
use crate::utils::error::AppError;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Saves plain text as an HTML page with the given byte ranges highlighted.
/// Overlapping ranges are dropped in favour of the earlier one.
pub fn save_debug_html(
    text: &str,
    path: &Path,
    heading: &str,
    highlights: &[(usize, usize, &str)],
) -> Result<(), AppError> {
    let mut file = File::create(path)?;

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    debug_html.push_str("body { font-family: monospace; }\n");
    debug_html.push_str("pre { white-space: pre-wrap; }\n");
    debug_html.push_str(".highlight-keyword { background-color: #90EE90; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");
    debug_html.push_str(&format!("<h1>{}</h1>\n<pre>", escape_html(heading)));

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, h.1));

    for (start, end, label) in sorted_highlights {
        if start < last_pos || end > text.len() {
            continue;
        }
        debug_html.push_str(&escape_html(&text[last_pos..start]));
        debug_html.push_str(&format!(
            "<span class=\"highlight-keyword\" title=\"{}\">",
            escape_html(label)
        ));
        debug_html.push_str(&escape_html(&text[start..end]));
        debug_html.push_str("</span>");
        last_pos = end;
    }

    if last_pos < text.len() {
        debug_html.push_str(&escape_html(&text[last_pos..]));
    }

    debug_html.push_str("</pre>\n</body>\n</html>");
    file.write_all(debug_html.as_bytes())?;

    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

/// Writes the header window with every keyword that drove classification
/// highlighted.
pub fn write_classification_debug(
    header_text: &str,
    classification: &Classification,
    path: &Path,
) -> Result<(), AppError> {
    let mut highlights = Vec::new();

    for hit in classification.hits.iter().filter(|h| !h.starts_with("filename:")) {
        let re = Regex::new(&format!("(?i){}", regex::escape(hit)))
            .map_err(|e| AppError::Processing(format!("Invalid keyword '{}': {}", hit, e)))?;
        for mat in re.find_iter(header_text) {
            highlights.push((mat.start(), mat.end(), hit.as_str()));
        }
    }

    let filename_hits: Vec<&str> = classification
        .hits
        .iter()
        .filter_map(|h| h.strip_prefix("filename:"))
        .collect();
    let mut heading = format!("Classified as {}", classification.kind);
    if !filename_hits.is_empty() {
        heading.push_str(&format!(" (filename: {})", filename_hits.join(", ")));
    }

    save_debug_html(header_text, path, &heading, &highlights)
}
