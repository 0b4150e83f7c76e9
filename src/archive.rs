use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};
use url::Url;
use zip::ZipArchive;

use crate::error::ArchiveError;
use crate::parser::blocks;
use crate::parser::clauses::{ClauseMatch, ClauseMatcher};
use crate::scratch::{self, ScratchFile};
use crate::transport::Transport;

pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const DOCUMENT_EXTENSION: &str = ".docx";

/// Leading bytes logged when a download turns out not to be a zip.
const SNIFF_LEN: usize = 100;

/// Downloads CR packages into a scratch directory and scans the requested
/// document inside them.
pub struct DocumentFetcher<'a, T> {
    transport: &'a T,
    scratch_dir: &'a Path,
    timeout: Duration,
}

impl<'a, T: Transport> DocumentFetcher<'a, T> {
    pub fn new(transport: &'a T, scratch_dir: &'a Path, timeout: Duration) -> Self {
        DocumentFetcher {
            transport,
            scratch_dir,
            timeout,
        }
    }

    /// Fetch `<archive_id>.zip` from `docs_url` and match `document_id` inside it.
    /// Every failure is logged and reported as `None`; no scratch file outlives
    /// the call.
    pub async fn fetch_and_match(
        &self,
        docs_url: &Url,
        archive_id: &str,
        document_id: &str,
        matcher: &ClauseMatcher<'_>,
    ) -> Option<ClauseMatch> {
        let archive_id = archive_id.trim();
        if archive_id.is_empty() || scratch::file_name_of(archive_id) != Some(archive_id) {
            warn!(archive_id, "invalid archive id");
            return None;
        }

        let archive_name = format!("{}{}", archive_id, ARCHIVE_EXTENSION);
        let zip_url = match docs_url.join(&archive_name) {
            Ok(u) => u,
            Err(e) => {
                error!(archive_id, "cannot build archive URL: {}", e);
                return None;
            }
        };
        let archive = ScratchFile::new(archive_path(self.scratch_dir, archive_id));

        info!(url = %zip_url, "downloading archive");
        match self
            .transport
            .download(&zip_url, archive.path(), Some(self.timeout))
            .await
        {
            Ok(_) => {}
            Err(e) => {
                error!(url = %zip_url, "failed to download archive: {}", e);
                return None;
            }
        }

        let blocks = self.document_blocks(archive.path(), document_id).await?;
        matcher.match_blocks(&blocks)
    }

    /// Text blocks of the document inside the downloaded archive. Zip and XML
    /// work runs on the blocking pool.
    async fn document_blocks(&self, archive: &Path, document_id: &str) -> Option<Vec<String>> {
        let scratch_dir = self.scratch_dir.to_path_buf();
        let path = archive.to_path_buf();
        let document_id = document_id.to_string();
        let search = tokio::task::spawn_blocking(move || {
            search_archive(&scratch_dir, &path, &document_id)
        });

        match search.await {
            Ok(Ok(found)) => found,
            Ok(Err(ArchiveError::Invalid(e))) => {
                error!(path = %archive.display(), "not a valid zip file: {}", e);
                log_leading_bytes(archive);
                None
            }
            Ok(Err(e)) => {
                error!(path = %archive.display(), "archive unusable: {}", e);
                None
            }
            Err(e) => {
                error!(path = %archive.display(), "archive search task failed: {}", e);
                None
            }
        }
    }
}

/// Direct hit first, then each nested archive in entry order.
fn search_archive(
    scratch_dir: &Path,
    path: &Path,
    document_id: &str,
) -> Result<Option<Vec<String>>, ArchiveError> {
    info!(path = %path.display(), "verifying downloaded archive");
    if std::fs::metadata(path)?.len() == 0 {
        return Err(ArchiveError::Empty(path.to_path_buf()));
    }

    let mut zip = ZipArchive::new(File::open(path)?)?;
    if let Some(entry) = find_document(&zip, document_id) {
        info!(entry = %entry, "found document in archive, extracting");
        return Ok(read_entry(scratch_dir, &mut zip, path, &entry));
    }

    let nested: Vec<String> = zip
        .file_names()
        .filter(|n| n.to_lowercase().ends_with(ARCHIVE_EXTENSION))
        .map(str::to_string)
        .collect();

    for inner in nested {
        info!(entry = %inner, "found inner archive, extracting");
        let Some(inner_file) = extract(scratch_dir, &mut zip, path, &inner) else {
            continue;
        };
        match search_nested(scratch_dir, inner_file.path(), document_id) {
            Ok(Some(found)) => return Ok(found),
            Ok(None) => {}
            Err(e) => error!(entry = %inner, "error processing inner archive: {}", e),
        }
    }

    warn!(
        document_id,
        path = %path.display(),
        "could not find {}{} in archive",
        document_id,
        DOCUMENT_EXTENSION
    );
    info!("available files in archive: {:?}", zip.file_names().collect::<Vec<_>>());
    Ok(None)
}

/// `Some(result)` once a matching document was found in this archive,
/// whether or not it could be read.
fn search_nested(
    scratch_dir: &Path,
    path: &Path,
    document_id: &str,
) -> Result<Option<Option<Vec<String>>>, ArchiveError> {
    let mut zip = ZipArchive::new(File::open(path)?)?;
    Ok(find_document(&zip, document_id).map(|entry| {
        info!(entry = %entry, "found document in inner archive, extracting");
        read_entry(scratch_dir, &mut zip, path, &entry)
    }))
}

fn read_entry<R: Read + io::Seek>(
    scratch_dir: &Path,
    zip: &mut ZipArchive<R>,
    container: &Path,
    entry: &str,
) -> Option<Vec<String>> {
    let doc = extract(scratch_dir, zip, container, entry)?;
    match blocks::read_docx(doc.path()) {
        Ok(b) => Some(b),
        Err(e) => {
            error!(path = %doc.path().display(), "error reading document: {}", e);
            None
        }
    }
}

/// Copy one entry into the scratch directory. The local name is prefixed with
/// the container's file name, so it never collides with the container itself.
fn extract<R: Read + io::Seek>(
    scratch_dir: &Path,
    zip: &mut ZipArchive<R>,
    container: &Path,
    entry: &str,
) -> Option<ScratchFile> {
    let guard = ScratchFile::new(scratch_dir.join(extracted_name(container, entry)?));
    match copy_entry(zip, entry, guard.path()) {
        Ok(()) => Some(guard),
        Err(e) => {
            error!(entry, "could not extract: {}", e);
            None
        }
    }
}

fn extracted_name(container: &Path, entry: &str) -> Option<String> {
    let file_name = scratch::file_name_of(entry)?;
    let prefix = container.file_name()?.to_string_lossy();
    Some(format!("{}_{}", prefix, file_name))
}

/// First entry naming the document (case-insensitive substring) with a
/// `.docx` extension.
pub fn find_document<R: Read + io::Seek>(
    zip: &ZipArchive<R>,
    document_id: &str,
) -> Option<String> {
    let needle = document_id.to_lowercase();
    zip.file_names()
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains(&needle) && lower.ends_with(DOCUMENT_EXTENSION)
        })
        .map(str::to_string)
}

fn copy_entry<R: Read + io::Seek>(
    zip: &mut ZipArchive<R>,
    entry: &str,
    dest: &Path,
) -> Result<(), ArchiveError> {
    let mut src = zip.by_name(entry)?;
    let mut out = File::create(dest)?;
    io::copy(&mut src, &mut out)?;
    Ok(())
}

fn log_leading_bytes(path: &Path) {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    match File::open(path).and_then(|f| f.take(SNIFF_LEN as u64).read_to_end(&mut head)) {
        Ok(_) => info!(
            "first {} bytes of file: {:?}",
            head.len(),
            String::from_utf8_lossy(&head)
        ),
        Err(e) => error!("could not read file for debugging: {}", e),
    }
}

/// Scratch path an archive download for `archive_id` lands on.
pub fn archive_path(scratch_dir: &Path, archive_id: &str) -> PathBuf {
    scratch_dir.join(format!("{}{}", archive_id, ARCHIVE_EXTENSION))
}
