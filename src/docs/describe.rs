//! Display formatting for file rows.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use super::kind::FileKind;
use super::schema::FileRecord;
use super::tags::{color_of, TagColor};

const NOT_AVAILABLE: &str = "N/A";

/// Size in kilobytes with two decimals, or `N/A`.
pub fn format_size(size: Option<u64>) -> String {
    match size {
        Some(bytes) if bytes > 0 => format!("{:.2} KB", bytes as f64 / 1024.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Upload time rendered in the given timezone, or `N/A`.
pub fn format_created_in<Tz>(created_at: Option<i64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    created_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_created(created_at: Option<i64>) -> String {
    format_created_in(created_at, &Local)
}

/// A tag ready to be drawn as a coloured chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChip {
    pub label: String,
    pub color: TagColor,
}

/// Everything a front end needs to draw one file row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub file_id: String,
    pub icon: &'static str,
    pub filename: String,
    pub created: String,
    pub size: String,
    pub tags: Vec<TagChip>,
    pub selected: bool,
    pub copied: bool,
}

impl FileRow {
    pub fn new(record: &FileRecord, selected: bool, copied: bool) -> Self {
        Self {
            file_id: record.file_id.clone(),
            icon: FileKind::from_filename(&record.filename).icon(),
            filename: record.filename.clone(),
            created: format_created(record.created_at),
            size: format_size(record.size),
            tags: record
                .tags
                .iter()
                .map(|t| TagChip {
                    label: t.clone(),
                    color: color_of(t),
                })
                .collect(),
            selected,
            copied,
        }
    }
}

/// Local file name to save a download under when the user gave none.
///
/// Only the last component of the server-side name is kept, so a name like
/// `../../.bashrc` or `/tmp/x` cannot escape the working directory. Falls
/// back to the file id, then to `download`.
pub fn download_name(filename: Option<&str>, file_id: &str) -> PathBuf {
    [filename, Some(file_id)]
        .into_iter()
        .flatten()
        .find_map(|name| {
            Path::new(name.trim())
                .file_name()
                .filter(|n| !n.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("download"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn size_in_kilobytes() {
        assert_eq!(format_size(Some(2048)), "2.00 KB");
        assert_eq!(format_size(Some(1500)), "1.46 KB");
        assert_eq!(format_size(Some(0)), "N/A");
        assert_eq!(format_size(None), "N/A");
    }

    #[test]
    fn created_at_formats_or_falls_back() {
        assert_eq!(format_created_in(Some(1_700_000_000), &Utc), "2023-11-14 22:13");
        assert_eq!(format_created_in(None, &Utc), "N/A");
    }

    #[test]
    fn row_picks_icon_and_colours() {
        let record = FileRecord {
            file_id: "f1".into(),
            filename: "holiday.jpg".into(),
            created_at: None,
            size: Some(1024),
            tags: vec!["photo".into()],
        };
        let row = FileRow::new(&record, true, false);
        assert_eq!(row.icon, FileKind::Image.icon());
        assert_eq!(row.size, "1.00 KB");
        assert_eq!(row.tags[0].color, color_of("photo"));
        assert!(row.selected);
    }

    #[test]
    fn download_name_stays_in_working_directory() {
        assert_eq!(download_name(Some("report.pdf"), "f1"), PathBuf::from("report.pdf"));
        assert_eq!(download_name(Some("../../.bashrc"), "f1"), PathBuf::from(".bashrc"));
        assert_eq!(download_name(Some("/tmp/x"), "f1"), PathBuf::from("x"));
        assert_eq!(download_name(Some(".."), "f1"), PathBuf::from("f1"));
        assert_eq!(download_name(None, "f1"), PathBuf::from("f1"));
        assert_eq!(download_name(Some("/"), "../.."), PathBuf::from("download"));
    }
}
