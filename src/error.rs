use std::path::PathBuf;

use thiserror::Error;

/// Transport-level failure. Always recovered by the caller into an absent result.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("sheet '{0}' not found")]
    MissingSheet(String),
    #[error("sheet is empty")]
    EmptySheet,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("downloaded archive is empty: {0}")]
    Empty(PathBuf),
    #[error("not a valid zip archive: {0}")]
    Invalid(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("cannot open document container: {0}")]
    Container(#[from] zip::result::ZipError),
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Setup failures that stop a run before it starts.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid index URL '{url}': {source}")]
    IndexUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("cannot prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
