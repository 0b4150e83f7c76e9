use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;

pub const REPORT_COLUMNS: [&str; 5] = [
    "Meeting Folder",
    "RP Number",
    "R4 Document",
    "Matching Clause",
    "Summary of Change",
];

pub const REPORT_SHEET: &str = "Matches";

/// One matched CR document, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    #[serde(rename = "Meeting Folder")]
    pub meeting_folder: String,
    #[serde(rename = "RP Number")]
    pub archive_id: String,
    #[serde(rename = "R4 Document")]
    pub document_id: String,
    /// Comma-separated when more than one clause matched.
    #[serde(rename = "Matching Clause")]
    pub matching_clause: String,
    #[serde(rename = "Summary of Change")]
    pub summary_of_change: String,
}

impl MatchRecord {
    fn as_row(&self) -> [&str; 5] {
        [
            &self.meeting_folder,
            &self.archive_id,
            &self.document_id,
            &self.matching_clause,
            &self.summary_of_change,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Xlsx,
    Csv,
}

impl ReportFormat {
    /// `.csv` paths get CSV; everything else gets a workbook.
    pub fn for_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ReportFormat::Csv,
            _ => ReportFormat::Xlsx,
        }
    }
}

/// Write the report. The header row is always present.
pub fn write_report(path: &Path, records: &[MatchRecord]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match ReportFormat::for_path(path) {
        ReportFormat::Xlsx => write_xlsx(path, records)?,
        ReportFormat::Csv => write_csv(path, records)?,
    }

    if records.is_empty() {
        info!(path = %path.display(), "empty results file created");
    } else {
        info!(path = %path.display(), "saved {} matches", records.len());
    }
    Ok(())
}

fn write_xlsx(path: &Path, records: &[MatchRecord]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(REPORT_SHEET)?;

    let bold = Format::new().set_bold();
    for (col, name) in REPORT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record.as_row().iter().enumerate() {
            sheet.write_string(row, col as u16, *value)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_csv(path: &Path, records: &[MatchRecord]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(REPORT_COLUMNS)?;
    for record in records {
        writer.write_record(record.as_row())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Reader};

    fn record() -> MatchRecord {
        MatchRecord {
            meeting_folder: "TSGR_109/".into(),
            archive_id: "RP-251001".into(),
            document_id: "R4-2509864".into(),
            matching_clause: "6.4.2.1a".into(),
            summary_of_change: "Line one,\n\"quoted\" line two".into(),
        }
    }

    fn sheet_rows(path: &Path) -> Vec<Vec<String>> {
        let mut wb = open_workbook_auto(path).unwrap();
        let range = wb.worksheet_range(REPORT_SHEET).unwrap();
        range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ReportFormat::for_path(Path::new("out.CSV")), ReportFormat::Csv);
        assert_eq!(ReportFormat::for_path(Path::new("out.xlsx")), ReportFormat::Xlsx);
        assert_eq!(ReportFormat::for_path(Path::new("out")), ReportFormat::Xlsx);
    }

    #[test]
    fn workbook_header_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("approved_clauses.xlsx");
        write_report(&path, &[]).unwrap();
        assert_eq!(sheet_rows(&path), vec![REPORT_COLUMNS.map(String::from).to_vec()]);
    }

    #[test]
    fn workbook_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approved_clauses.xlsx");
        write_report(&path, &[record()]).unwrap();

        let rows = sheet_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "RP-251001");
        assert_eq!(rows[1][3], "6.4.2.1a");
        assert_eq!(rows[1][4], "Line one,\n\"quoted\" line two");
    }

    #[test]
    fn csv_header_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.csv");
        write_report(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Meeting Folder,RP Number,R4 Document,Matching Clause,Summary of Change\n"
        );
    }

    #[test]
    fn csv_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&path, &[record()]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, REPORT_COLUMNS);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "6.4.2.1a");
        assert_eq!(&rows[0][4], "Line one,\n\"quoted\" line two");
    }

    #[test]
    fn json_shape_uses_report_columns() {
        let v = serde_json::to_value(record()).unwrap();
        assert_eq!(v["RP Number"], "RP-251001");
        assert_eq!(v["Matching Clause"], "6.4.2.1a");
    }
}
