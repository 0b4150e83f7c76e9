use tracing::{error, info, warn};
use url::Url;

use crate::archive::DocumentFetcher;
use crate::config::Settings;
use crate::discover::{discover_folders, MeetingFolder};
use crate::error::PipelineError;
use crate::manifest::{filter_manifest, locate_manifest, CrReference};
use crate::parser::clauses::ClauseMatcher;
use crate::report::{write_report, MatchRecord};
use crate::scratch::ScratchFile;
use crate::sink::PipelineSink;
use crate::transport::{join_dir, Transport};

const DOCS_DIR: &str = "Docs/";
const DISCOVERY_PROGRESS: u8 = 5;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The index listed no meeting folders. No report is written.
    NoFolders,
    /// Every folder lacked a manifest or approved references.
    NoUsableManifest { folders_checked: usize },
    /// The newest usable folder was processed; `records` may be empty.
    Completed {
        folder: String,
        references: usize,
        records: Vec<MatchRecord>,
    },
}

impl RunOutcome {
    pub fn records(&self) -> &[MatchRecord] {
        match self {
            RunOutcome::Completed { records, .. } => records,
            _ => &[],
        }
    }
}

/// Result of checking a single folder's first CR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    NoManifest,
    NoReferences,
    Checked {
        reference: CrReference,
        record: Option<MatchRecord>,
    },
}

pub struct Pipeline<T, S> {
    settings: Settings,
    transport: T,
    sink: S,
}

impl<T: Transport, S: PipelineSink> Pipeline<T, S> {
    pub fn new(settings: Settings, transport: T, sink: S) -> Self {
        Pipeline {
            settings,
            transport,
            sink,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Meeting folders on the index, newest first.
    pub async fn folders(&self) -> Result<Vec<MeetingFolder>, PipelineError> {
        let index_url = self.index_url()?;
        Ok(discover_folders(&self.transport, &index_url, &self.settings.folder_prefix).await)
    }

    /// Full run: the newest folder with approved references is processed and
    /// every older folder is left alone.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let index_url = self.index_url()?;
        self.prepare_scratch()?;

        self.sink.report_progress(0);
        self.narrate(format!(
            "Starting search for approved CRs against {}",
            self.settings.spec_identifier
        ));

        let folders =
            discover_folders(&self.transport, &index_url, &self.settings.folder_prefix).await;
        if folders.is_empty() {
            self.narrate("No meeting folders found, stopping".to_string());
            self.sink.report_progress(100);
            return Ok(RunOutcome::NoFolders);
        }
        self.sink.report_progress(DISCOVERY_PROGRESS);
        self.narrate(format!("Found {} meeting folders", folders.len()));

        let matcher = ClauseMatcher::new(&self.settings.clause_set, self.settings.match_mode);
        let mut outcome = RunOutcome::NoUsableManifest {
            folders_checked: folders.len(),
        };

        for (i, folder) in folders.iter().enumerate() {
            self.narrate(format!(
                "Checking folder {}/{}: {}",
                i + 1,
                folders.len(),
                folder.href
            ));
            let Some(docs_url) = self.docs_url(&index_url, &folder.href) else {
                continue;
            };

            let references = match self.approved_references(&docs_url).await {
                Some(refs) if !refs.is_empty() => refs,
                Some(_) => {
                    self.narrate(format!("No approved CRs in {}, trying next folder", folder.href));
                    continue;
                }
                None => {
                    self.narrate(format!("No manifest in {}, trying next folder", folder.href));
                    continue;
                }
            };

            self.narrate(format!(
                "Processing {} CRs from {}",
                references.len(),
                folder.href
            ));
            let records = self
                .process_references(&folder.href, &docs_url, &references, &matcher)
                .await;
            outcome = RunOutcome::Completed {
                folder: folder.href.clone(),
                references: references.len(),
                records,
            };
            break;
        }

        match &outcome {
            RunOutcome::Completed { records, .. } if records.is_empty() => {
                self.narrate("No matching clauses found".to_string())
            }
            RunOutcome::Completed { records, .. } => {
                self.narrate(format!("Found {} matching CRs", records.len()))
            }
            _ => self.narrate("No folder had a usable manifest".to_string()),
        }

        self.save_report(outcome.records());
        self.sink.report_progress(100);
        Ok(outcome)
    }

    /// Check one folder: locate its manifest, filter it and match only the
    /// first CR reference. Nothing is emitted to the result sink.
    pub async fn probe_folder(&self, folder_href: &str) -> Result<ProbeOutcome, PipelineError> {
        let index_url = self.index_url()?;
        self.prepare_scratch()?;

        let Some(docs_url) = self.docs_url(&index_url, folder_href) else {
            return Ok(ProbeOutcome::NoManifest);
        };
        let Some(references) = self.approved_references(&docs_url).await else {
            return Ok(ProbeOutcome::NoManifest);
        };
        let Some(reference) = references.into_iter().next() else {
            return Ok(ProbeOutcome::NoReferences);
        };

        let matcher = ClauseMatcher::new(&self.settings.clause_set, self.settings.match_mode);
        let fetcher = self.fetcher();
        let record = self
            .process_one(&fetcher, folder_href, &docs_url, &reference, &matcher)
            .await;
        Ok(ProbeOutcome::Checked { reference, record })
    }

    async fn process_references(
        &self,
        folder: &str,
        docs_url: &Url,
        references: &[CrReference],
        matcher: &ClauseMatcher<'_>,
    ) -> Vec<MatchRecord> {
        let fetcher = self.fetcher();
        let total = references.len();
        let mut records = Vec::new();

        for (i, reference) in references.iter().enumerate() {
            if let Some(record) = self
                .process_one(&fetcher, folder, docs_url, reference, matcher)
                .await
            {
                self.sink.emit_result(&record);
                records.push(record);
            }
            self.sink.report_progress(progress_after(i + 1, total));
        }
        records
    }

    async fn process_one(
        &self,
        fetcher: &DocumentFetcher<'_, T>,
        folder: &str,
        docs_url: &Url,
        reference: &CrReference,
        matcher: &ClauseMatcher<'_>,
    ) -> Option<MatchRecord> {
        let found = fetcher
            .fetch_and_match(docs_url, &reference.archive_id, &reference.document_id, matcher)
            .await;

        let Some(found) = found else {
            self.narrate(format!(
                "No match for {} in {}",
                reference.document_id, reference.archive_id
            ));
            return None;
        };

        let record = MatchRecord {
            meeting_folder: folder.to_string(),
            archive_id: reference.archive_id.clone(),
            document_id: reference.document_id.clone(),
            matching_clause: found.clauses.join(", "),
            summary_of_change: found.summary,
        };
        self.narrate(format!(
            "Match: {} in {} touches {}",
            record.document_id, record.archive_id, record.matching_clause
        ));
        Some(record)
    }

    /// `None` when no manifest could be fetched. The downloaded spreadsheet is
    /// removed once filtered.
    async fn approved_references(&self, docs_url: &Url) -> Option<Vec<CrReference>> {
        let path =
            locate_manifest(&self.transport, docs_url, &self.settings.scratch_directory).await?;
        let manifest = ScratchFile::new(path);
        Some(filter_manifest(
            manifest.path(),
            &self.settings.spec_identifier,
        ))
    }

    fn fetcher(&self) -> DocumentFetcher<'_, T> {
        DocumentFetcher::new(
            &self.transport,
            &self.settings.scratch_directory,
            self.settings.archive_timeout(),
        )
    }

    fn docs_url(&self, index_url: &Url, folder_href: &str) -> Option<Url> {
        match join_dir(index_url, folder_href).and_then(|f| join_dir(&f, DOCS_DIR)) {
            Ok(u) => Some(u),
            Err(e) => {
                warn!(folder = folder_href, "cannot build folder URL: {}", e);
                None
            }
        }
    }

    fn index_url(&self) -> Result<Url, PipelineError> {
        Url::parse(&self.settings.index_url).map_err(|source| PipelineError::IndexUrl {
            url: self.settings.index_url.clone(),
            source,
        })
    }

    fn prepare_scratch(&self) -> Result<(), PipelineError> {
        let dir = &self.settings.scratch_directory;
        std::fs::create_dir_all(dir).map_err(|source| PipelineError::Scratch {
            path: dir.clone(),
            source,
        })
    }

    fn save_report(&self, records: &[MatchRecord]) {
        let path = &self.settings.report_path;
        match write_report(path, records) {
            Ok(()) => self.narrate(format!("Report written to {}", path.display())),
            Err(e) => {
                error!(path = %path.display(), "could not write report: {}", e);
                self.sink
                    .emit_log(&format!("Could not write report {}: {}", path.display(), e));
            }
        }
    }

    fn narrate(&self, line: String) {
        info!("{}", line);
        self.sink.emit_log(&line);
    }
}

/// Progress after `processed` of `total` references: 5 → 100 linearly.
fn progress_after(processed: usize, total: usize) -> u8 {
    let span = (100 - DISCOVERY_PROGRESS) as usize;
    let pct = DISCOVERY_PROGRESS as usize + processed * span / total.max(1);
    pct.min(100) as u8
}
