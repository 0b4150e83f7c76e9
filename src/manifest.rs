use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{error, info, warn};
use url::Url;

use crate::error::ManifestError;
use crate::html;
use crate::scratch::{self, ScratchFile};
use crate::transport::Transport;

pub const MANIFEST_EXTENSION: &str = ".xlsx";
pub const SHEET_NAME: &str = "CR_Packs_List";
pub const COL_ARCHIVE: &str = "CR Pack TDoc";
pub const COL_DOCUMENTS: &str = "WG Tdoc";
pub const COL_STATUS: &str = "CR Individual TSG decision";
pub const COL_SPEC: &str = "Spec";

const APPROVED: &str = "approved";

/// One CR package and one working-group document inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrReference {
    pub archive_id: String,
    pub document_id: String,
}

impl CrReference {
    pub fn new(archive_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        CrReference {
            archive_id: archive_id.into(),
            document_id: document_id.into(),
        }
    }
}

/// Find the first spreadsheet linked from a folder's document index and
/// download it into `scratch_dir`. `None` on any failure.
pub async fn locate_manifest<T: Transport>(
    transport: &T,
    docs_url: &Url,
    scratch_dir: &Path,
) -> Option<PathBuf> {
    info!(url = %docs_url, "searching for manifest");
    let page = match transport.get_text(docs_url).await {
        Ok(p) => p,
        Err(e) => {
            error!(url = %docs_url, "could not access document index: {}", e);
            return None;
        }
    };

    let href = find_manifest_link(&page)?;
    let manifest_url = match docs_url.join(&href) {
        Ok(u) => u,
        Err(e) => {
            error!(href = %href, "bad manifest link: {}", e);
            return None;
        }
    };
    info!(url = %manifest_url, "found manifest");

    let Some(file_name) = scratch::file_name_of(manifest_url.path()) else {
        warn!(url = %manifest_url, "manifest URL has no file name");
        return None;
    };
    let local = scratch_dir.join(file_name);

    info!(path = %local.display(), "downloading manifest");
    // drops (and removes) the partial file unless the download completes
    let guard = ScratchFile::new(local);
    match transport.download(&manifest_url, guard.path(), None).await {
        Ok(_) => Some(guard.keep()),
        Err(e) => {
            error!(url = %manifest_url, "failed to download manifest: {}", e);
            None
        }
    }
}

/// First link target ending in `.xlsx`; no ranking among several.
pub fn find_manifest_link(page: &str) -> Option<String> {
    html::anchors(page)
        .into_iter()
        .filter_map(|a| a.href)
        .find(|h| h.ends_with(MANIFEST_EXTENSION))
}

/// Approved CRs against `spec_identifier`, one reference per listed document.
/// Every failure is logged and yields an empty list.
pub fn filter_manifest(path: &Path, spec_identifier: &str) -> Vec<CrReference> {
    info!(path = %path.display(), spec = spec_identifier, "filtering approved CRs");
    match read_references(path, spec_identifier) {
        Ok(refs) => {
            if refs.is_empty() {
                info!("no rows matched the filter criteria");
            } else {
                info!("found {} relevant CRs", refs.len());
            }
            refs
        }
        Err(e) => {
            error!(path = %path.display(), "cannot use manifest: {}", e);
            Vec::new()
        }
    }
}

fn read_references(path: &Path, spec_identifier: &str) -> Result<Vec<CrReference>, ManifestError> {
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|s| s == SHEET_NAME) {
        return Err(ManifestError::MissingSheet(SHEET_NAME.to_string()));
    }
    let range = workbook.worksheet_range(SHEET_NAME)?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ManifestError::EmptySheet)?;
    let columns = Columns::locate(header)?;

    let mut refs = Vec::new();
    for row in rows {
        let status = cell_text(row, columns.status).trim().to_lowercase();
        let spec = cell_text(row, columns.spec);
        if status != APPROVED || spec.trim() != spec_identifier {
            continue;
        }

        // only text cells carry document lists
        let Some(Data::String(docs)) = row.get(columns.documents) else {
            continue;
        };
        let archive_id = cell_text(row, columns.archive).trim().to_string();
        if archive_id.is_empty() {
            warn!(documents = %docs, "approved row has no archive id, skipping");
            continue;
        }

        refs.extend(
            split_documents(docs)
                .into_iter()
                .map(|doc| CrReference::new(archive_id.clone(), doc)),
        );
    }
    Ok(refs)
}

struct Columns {
    archive: usize,
    documents: usize,
    status: usize,
    spec: usize,
}

impl Columns {
    fn locate(header: &[Data]) -> Result<Self, ManifestError> {
        let find = |name: &str| header.iter().position(|c| c.to_string().trim() == name);
        let wanted = [COL_ARCHIVE, COL_DOCUMENTS, COL_STATUS, COL_SPEC];
        let found: Vec<Option<usize>> = wanted.iter().map(|&n| find(n)).collect();

        match found[..] {
            [Some(archive), Some(documents), Some(status), Some(spec)] => Ok(Columns {
                archive,
                documents,
                status,
                spec,
            }),
            _ => Err(ManifestError::MissingColumns(
                wanted
                    .iter()
                    .zip(&found)
                    .filter(|(_, f)| f.is_none())
                    .map(|(n, _)| n.to_string())
                    .collect(),
            )),
        }
    }
}

fn cell_text(row: &[Data], idx: usize) -> String {
    row.get(idx).map(|c| c.to_string()).unwrap_or_default()
}

/// `"R4-111, R4-222,R4-333"` → three ids. All spaces are dropped before splitting.
pub fn split_documents(cell: &str) -> Vec<String> {
    cell.replace(' ', "")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
