use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::sections::{self, HeaderPolicy};
use crate::config::ClauseSet;

pub(crate) const CLAUSES_MARKER: &str = "clauses affected";

/// Blocks after the marker that may still hold clause numbers.
const CLAUSE_WINDOW: usize = 5;

/// Dotted identifiers: `4.1`, `6.4.2.1a`, `F.5.2`.
static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\w.]+\.\w+").unwrap());

/// How many clause matches a document may contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Stop at the first clause found in the set.
    #[default]
    First,
    /// Collect every distinct clause found across all "clauses affected" blocks.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseMatch {
    /// Matched clauses in discovery order; exactly one in `MatchMode::First`.
    pub clauses: Vec<String>,
    pub summary: String,
}

pub struct ClauseMatcher<'a> {
    clauses: &'a ClauseSet,
    mode: MatchMode,
    is_header: HeaderPolicy,
}

impl<'a> ClauseMatcher<'a> {
    pub fn new(clauses: &'a ClauseSet, mode: MatchMode) -> Self {
        ClauseMatcher {
            clauses,
            mode,
            is_header: sections::looks_like_section_header,
        }
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.is_header = policy;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Scan the blocks of one CR document. `None` when no tracked clause is named.
    pub fn match_blocks(&self, blocks: &[String]) -> Option<ClauseMatch> {
        let (clauses, anchor) = self.find_clauses(blocks)?;

        let summary = match sections::extract_summary(blocks, self.is_header) {
            Some(s) => s,
            None => {
                debug!("no summary marker, reading text after clauses block");
                sections::summary_after(blocks, anchor, self.is_header)
            }
        };

        Some(ClauseMatch { clauses, summary })
    }

    /// Matched clauses plus the index of the marker block that produced the first one.
    fn find_clauses(&self, blocks: &[String]) -> Option<(Vec<String>, usize)> {
        let mut found: Vec<String> = Vec::new();
        let mut anchor = None;

        for (i, block) in blocks.iter().enumerate() {
            if !block.to_lowercase().contains(CLAUSES_MARKER) {
                continue;
            }

            let end = blocks.len().min(i + 1 + CLAUSE_WINDOW);
            let window = blocks[i..end].join(" ");

            for candidate in CLAUSE_RE.find_iter(&window) {
                let clause = candidate
                    .as_str()
                    .trim_matches(|c: char| matches!(c, '.' | ',' | ' '));
                if !self.clauses.contains(clause) || found.iter().any(|f| f == clause) {
                    continue;
                }
                info!(clause, "found matching clause");
                found.push(clause.to_string());
                anchor.get_or_insert(i);
                if self.mode == MatchMode::First {
                    return Some((found, i));
                }
            }
        }

        anchor.map(|a| (found, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn first(set: &[&str], b: &[String]) -> Option<ClauseMatch> {
        let set = ClauseSet::new(set.iter().copied());
        ClauseMatcher::new(&set, MatchMode::First).match_blocks(b)
    }

    #[test]
    fn matches_clause_on_marker_line() {
        let b = blocks(&["Clauses Affected: 6.4.2.1a, 9.9.9"]);
        assert_eq!(first(&["6.4.2.1a"], &b).unwrap().clauses, vec!["6.4.2.1a"]);
        assert_eq!(first(&["9.9.9"], &b).unwrap().clauses, vec!["9.9.9"]);
        assert!(first(&["1.1"], &b).is_none());
    }

    #[test]
    fn comparison_is_exact() {
        let b = blocks(&["Clauses affected: 6.4.2.1A"]);
        assert!(first(&["6.4.2.1a"], &b).is_none());
        // a prefix of a longer clause is not a match
        let b = blocks(&["Clauses affected: 6.4.2"]);
        assert!(first(&["6.4"], &b).is_none());
    }

    #[test]
    fn clause_in_following_cells() {
        let b = blocks(&["Clauses affected:", "", "F.5.2, Annex F.10.", "x", "y", "z"]);
        let m = first(&["F.10"], &b).unwrap();
        assert_eq!(m.clauses, vec!["F.10"]);
    }

    #[test]
    fn window_is_five_blocks() {
        let b = blocks(&["Clauses affected:", "a", "b", "c", "d", "e", "6.4"]);
        assert!(first(&["6.4"], &b).is_none());
        let b = blocks(&["Clauses affected:", "a", "b", "c", "d", "6.4"]);
        assert!(first(&["6.4"], &b).is_some());
    }

    #[test]
    fn no_marker_no_match() {
        let b = blocks(&["Changes to 6.4.2.1a are proposed."]);
        assert!(first(&["6.4.2.1a"], &b).is_none());
    }

    #[test]
    fn first_mode_takes_first_in_text_order() {
        let b = blocks(&["Clauses affected: 6.5.1, 6.4"]);
        let m = first(&["6.4", "6.5.1"], &b).unwrap();
        assert_eq!(m.clauses, vec!["6.5.1"]);
    }

    #[test]
    fn all_mode_collects_distinct_across_markers() {
        let set = ClauseSet::new(["6.4", "6.5.1", "F.3"]);
        let b = blocks(&[
            "Clauses affected: 6.5.1, 6.4",
            "Summary of change: tidy",
            "ok",
            "",
            "",
            "",
            "",
            "Clauses affected (annex): F.3, 6.4",
        ]);
        let m = ClauseMatcher::new(&set, MatchMode::All).match_blocks(&b).unwrap();
        assert_eq!(m.clauses, vec!["6.5.1", "6.4", "F.3"]);
    }

    #[test]
    fn summary_from_marker() {
        let b = blocks(&[
            "Title: Correction of EVM",
            "Summary of change:",
            "Corrected EVM equalizer definition.",
            "CONSEQUENCES IF NOT APPROVED:",
            "Misalignment",
            "Clauses affected:",
            "6.4.2.1a",
        ]);
        let m = first(&["6.4.2.1a"], &b).unwrap();
        assert_eq!(m.summary, "Corrected EVM equalizer definition.");
    }

    #[test]
    fn summary_falls_back_to_text_after_clauses() {
        let b = blocks(&[
            "Clauses Affected 6.4",
            "Relaxes the in-band emission limit.",
            "OTHER SPECS AFFECTED",
        ]);
        let m = first(&["6.4"], &b).unwrap();
        assert_eq!(m.clauses, vec!["6.4"]);
        assert_eq!(m.summary, "Relaxes the in-band emission limit.");
    }

    #[test]
    fn empty_summary_header_does_not_fall_back() {
        let b = blocks(&["Summary of change:", "REASON", "Clauses affected: 6.4", "text"]);
        let m = first(&["6.4"], &b).unwrap();
        assert_eq!(m.summary, "");
    }
}
