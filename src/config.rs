use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};

use crate::parser::clauses::MatchMode;

pub const DEFAULT_INDEX_URL: &str = "https://www.3gpp.org/ftp/tsg_ran/TSG_RAN";
pub const DEFAULT_SPEC: &str = "38.101-1";
pub const DEFAULT_FOLDER_PREFIX: &str = "TSGR_";
pub const DEFAULT_SCRATCH_DIR: &str = "temp_files";
pub const DEFAULT_REPORT_PATH: &str = "approved_clauses.xlsx";
pub const DEFAULT_ARCHIVE_TIMEOUT_SECS: u64 = 60;

const ENV_PREFIX: &str = "CR_TRACKER";
const DEFAULT_CONFIG_FILE: &str = "cr_tracker";

/// Clauses of TS 38.101-1 tracked out of the box.
pub const DEFAULT_CLAUSES: &[&str] = &[
    "4.3", "5.1", "5.2", "5.3.1", "5.3.2", "5.3.3", "5.3.5", "6.3.2", "6.3.3", "6.3.3.1",
    "6.3.3.2", "6.4", "6.4.1", "6.4.2", "6.4.2.0", "6.4.2.1", "6.4.2.1a", "6.4.2.2", "6.4.2.3",
    "6.4.2.4", "6.4.2.4.1", "6.4.2.4.2", "6.4.2.5", "6.5.1", "6.5.2.1", "6.5.2.2", "6.5.2.3",
    "6.5.2.3.1", "6.5.2.3.2", "6.5.2.3.3", "6.5.2.3.4", "6.5.2.3.7", "6.5.2.3.8", "6.5.2.3.9",
    "6.5.2.4", "A.3", "C.2", "F.0", "F.1", "F.2", "F.3", "F.4", "F.5", "F.5.1", "F.5.2", "F.5.3",
    "F.5.4", "F.5.5", "F.6", "F.7", "F.8", "F.9", "F.10",
];

/// Exact, case-sensitive set of clause identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<String>")]
pub struct ClauseSet(BTreeSet<String>);

impl ClauseSet {
    pub fn new<I, S>(clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClauseSet(
            clauses
                .into_iter()
                .map(Into::into)
                .map(|c: String| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, clause: &str) -> bool {
        self.0.contains(clause)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ClauseSet {
    fn default() -> Self {
        ClauseSet::new(DEFAULT_CLAUSES.iter().copied())
    }
}

/// A list of identifiers, or one comma-separated string as it arrives from
/// `CR_TRACKER_CLAUSE_SET`. Values stay text so `6.40` is not read as a number.
impl<'de> Deserialize<'de> for ClauseSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Joined(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(list) => ClauseSet::new(list),
            Raw::Joined(joined) => ClauseSet::new(joined.split(',')),
        })
    }
}

impl From<Vec<String>> for ClauseSet {
    fn from(v: Vec<String>) -> Self {
        ClauseSet::new(v)
    }
}

impl From<ClauseSet> for Vec<String> {
    fn from(set: ClauseSet) -> Self {
        set.0.into_iter().collect()
    }
}

/// Everything a pipeline run needs to know up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index_url: String,
    pub spec_identifier: String,
    pub clause_set: ClauseSet,
    pub folder_prefix: String,
    pub scratch_directory: PathBuf,
    pub report_path: PathBuf,
    /// Seconds allowed for one archive download.
    pub archive_download_timeout: u64,
    pub match_mode: MatchMode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            index_url: DEFAULT_INDEX_URL.to_string(),
            spec_identifier: DEFAULT_SPEC.to_string(),
            clause_set: ClauseSet::default(),
            folder_prefix: DEFAULT_FOLDER_PREFIX.to_string(),
            scratch_directory: PathBuf::from(DEFAULT_SCRATCH_DIR),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            archive_download_timeout: DEFAULT_ARCHIVE_TIMEOUT_SECS,
            match_mode: MatchMode::default(),
        }
    }
}

impl Settings {
    /// Layer an optional config file and `CR_TRACKER_*` env vars over the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file_source)
            // env values stay strings; ClauseSet splits its own list
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_"))
            .build()?
            .try_deserialize()
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_download_timeout)
    }
}
