//! Fixture builders shared by the unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::FetchError;
use crate::transport::Transport;

/// Serves canned bodies by exact URL and records every request.
#[derive(Default)]
pub struct MemoryTransport {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

impl Transport for MemoryTransport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let body = self.lookup(url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn download(
        &self,
        url: &Url,
        dest: &Path,
        _timeout: Option<Duration>,
    ) -> Result<u64, FetchError> {
        let body = self.lookup(url)?;
        std::fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }
}

/// Minimal WordprocessingML with one paragraph per line.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    zip_bytes(&[("word/document.xml", xml.as_bytes())])
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut out));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    out
}

/// Write a manifest workbook: `rows[0]` is the header row.
pub fn write_manifest(path: &Path, sheet: &str, rows: &[&[&str]]) {
    let mut wb = rust_xlsxwriter::Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name(sheet).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                ws.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    wb.save(path).unwrap();
}

pub const MANIFEST_HEADER: &[&str] = &[
    "CR Pack TDoc",
    "WG Tdoc",
    "Title",
    "CR Individual TSG decision",
    "Spec",
];

/// Files left in a directory, by name.
pub fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}
