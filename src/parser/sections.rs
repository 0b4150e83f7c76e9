/// Decides whether a trimmed line opens a new section of a CR cover sheet.
pub type HeaderPolicy = fn(&str) -> bool;

const SUMMARY_MARKERS: &[&str] = &["summary of change", "summary of the change"];

/// Header text that may be repeated right under the summary marker.
const REPEATED_SUMMARY_HEADERS: &[&str] = &[
    "summary of change:",
    "summary of the change:",
    "summary of change",
    "summary of the change",
];

/// Upper-case phrases that are part of the summary block, not a new section.
const BENIGN_UPPER: &[&str] = &[
    "summary of change",
    "summary of the change",
    "description of change",
    "details of change",
    "explanation of change",
];

const BENIGN_COLON: &[&str] = &[
    "summary of change",
    "summary of the change",
    "description of change",
    "table of changes",
    "list of changes",
    "overview",
    "section",
];

/// Colon-terminated lines mentioning these read as content labels, not headers.
const CONTENT_LABEL_WORDS: &[&str] = &[
    "title",
    "heading",
    "section",
    "chapter",
    "clause",
    "item",
    "specification",
    "requirement",
];

const SUMMARY_LOOKAHEAD: usize = 10;
const FALLBACK_LOOKAHEAD: usize = 14;

/// Default header heuristic: short and shouting, or short and ending in a colon.
pub fn looks_like_section_header(line: &str) -> bool {
    let len = line.chars().count();
    let lower = line.to_lowercase();

    let shouting = is_upper(line) && len < 100 && !BENIGN_UPPER.contains(&lower.as_str());

    let labelled = line.ends_with(':')
        && len < 50
        && !BENIGN_COLON.contains(&lower.trim_end_matches(':').trim_end())
        && !CONTENT_LABEL_WORDS.iter().any(|w| lower.contains(w));

    shouting || labelled
}

/// At least one cased character and no lower-case ones.
fn is_upper(s: &str) -> bool {
    let mut cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

pub fn is_summary_marker(block: &str) -> bool {
    let lower = block.to_lowercase();
    SUMMARY_MARKERS.iter().any(|m| lower.contains(m))
}

/// Text under the first "summary of change" marker, or `None` when the
/// document has no such marker at all.
pub fn extract_summary(blocks: &[String], is_header: HeaderPolicy) -> Option<String> {
    let start = blocks.iter().position(|b| is_summary_marker(b))? + 1;
    let end = blocks.len().min(start + SUMMARY_LOOKAHEAD);

    let mut lines: Vec<&str> = Vec::new();
    for block in blocks.get(start..end).unwrap_or_default() {
        let line = block.trim();
        if line.is_empty() {
            continue;
        }
        if REPEATED_SUMMARY_HEADERS.contains(&line.to_lowercase().as_str()) {
            continue;
        }
        if is_header(line) {
            break;
        }
        if lines.last() != Some(&line) {
            lines.push(line);
        }
    }

    Some(lines.join("\n").trim().to_string())
}

/// Fallback summary: whatever follows the "clauses affected" block up to the
/// next header-looking line.
pub fn summary_after(blocks: &[String], anchor: usize, is_header: HeaderPolicy) -> String {
    let start = anchor + 1;
    let end = blocks.len().min(start + FALLBACK_LOOKAHEAD);

    let mut lines: Vec<&str> = Vec::new();
    for block in blocks.get(start..end).unwrap_or_default() {
        let line = block.trim();
        if line.is_empty() || line.to_lowercase().contains(super::clauses::CLAUSES_MARKER) {
            continue;
        }
        if is_header(line) {
            break;
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_heuristic() {
        assert!(looks_like_section_header("CONSEQUENCES IF NOT APPROVED:"));
        assert!(looks_like_section_header("REASON FOR CHANGE"));
        assert!(looks_like_section_header("Other specs affected:"));
        assert!(looks_like_section_header("Reason for change:"));

        assert!(!looks_like_section_header("First line."));
        assert!(!looks_like_section_header("SUMMARY OF CHANGE"));
        assert!(!looks_like_section_header("Summary of change:"));
        // content labels are kept
        assert!(!looks_like_section_header("Affected clause:"));
        assert!(!looks_like_section_header("New requirement:"));
        // numbers alone have no case
        assert!(!looks_like_section_header("6.4.2"));
        // long colon-terminated prose is content
        assert!(!looks_like_section_header(
            "The following tolerances are introduced for the new band combinations:"
        ));
    }

    #[test]
    fn summary_stops_at_header() {
        let b = blocks(&[
            "Summary of change:",
            "First line.",
            "Second line.",
            "CONSEQUENCES IF NOT APPROVED:",
            "ignored",
        ]);
        assert_eq!(
            extract_summary(&b, looks_like_section_header).as_deref(),
            Some("First line.\nSecond line.")
        );
    }

    #[test]
    fn summary_skips_blanks_repeats_and_echoed_header() {
        let b = blocks(&[
            "Summary of the change",
            "summary of the change:",
            "",
            "Align MPR tables.",
            "Align MPR tables.",
            "   ",
            "Add note 3.",
        ]);
        assert_eq!(
            extract_summary(&b, looks_like_section_header).as_deref(),
            Some("Align MPR tables.\nAdd note 3.")
        );
    }

    #[test]
    fn summary_window_is_bounded() {
        let mut lines = vec!["Summary of change".to_string()];
        lines.extend((0..20).map(|i| format!("line {i}")));
        let summary = extract_summary(&lines, looks_like_section_header).unwrap();
        assert_eq!(summary.lines().count(), SUMMARY_LOOKAHEAD);
        assert!(summary.ends_with("line 9"));
    }

    #[test]
    fn summary_absent_without_marker() {
        let b = blocks(&["Reason for change:", "Because."]);
        assert_eq!(extract_summary(&b, looks_like_section_header), None);
    }

    #[test]
    fn summary_present_but_empty() {
        let b = blocks(&["Summary of change:", "REASON FOR CHANGE", "text"]);
        assert_eq!(extract_summary(&b, looks_like_section_header).as_deref(), Some(""));
    }

    #[test]
    fn fallback_reads_until_header() {
        let b = blocks(&[
            "Clauses affected:",
            "6.4.2",
            "",
            "Corrects the EVM requirement.",
            "Other specs affected:",
            "38.101-2",
        ]);
        assert_eq!(
            summary_after(&b, 0, looks_like_section_header),
            "6.4.2\nCorrects the EVM requirement."
        );
    }

    #[test]
    fn custom_policy_is_honoured() {
        fn never(_: &str) -> bool {
            false
        }
        let b = blocks(&["Summary of change:", "a", "CONSEQUENCES:", "b"]);
        assert_eq!(extract_summary(&b, never).as_deref(), Some("a\nCONSEQUENCES:\nb"));
    }
}
