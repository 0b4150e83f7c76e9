pub mod blocks;
pub mod clauses;
pub mod sections;

use std::path::Path;

use crate::error::DocumentError;
use clauses::{ClauseMatch, ClauseMatcher};

/// Two-pass scan: docx → text blocks → clause match + summary.
pub fn scan_document(
    path: &Path,
    matcher: &ClauseMatcher<'_>,
) -> Result<Option<ClauseMatch>, DocumentError> {
    let blocks = blocks::read_docx(path)?;
    Ok(matcher.match_blocks(&blocks))
}
