//! Data export in JSON and CSV form.
//!
//! The JSON document bundles records, profile and goal so a user can back up
//! everything in one file. The CSV variant only carries records, one per row.

use crate::{Result, UserProfile, WaterIntakeRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Version tag written into every JSON export
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    water_records: &'a [WaterIntakeRecord],
    user_settings: &'a UserProfile,
    daily_goal: i64,
    export_date: String,
    version: &'static str,
}

/// Pretty-printed JSON export of all user data
pub fn export_json(
    records: &[WaterIntakeRecord],
    profile: &UserProfile,
    daily_goal: i64,
    exported_at: DateTime<Utc>,
) -> Result<String> {
    let doc = ExportDocument {
        water_records: records,
        user_settings: profile,
        daily_goal,
        export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: EXPORT_VERSION,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// A row in the CSV output
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    amount: i64,
    timestamp: String,
    note: Option<&'a str>,
}

impl<'a> From<&'a WaterIntakeRecord> for CsvRow<'a> {
    fn from(record: &'a WaterIntakeRecord) -> Self {
        CsvRow {
            id: &record.id,
            amount: record.amount,
            timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            note: record.note.as_deref(),
        }
    }
}

/// Write records as CSV (with header row) to any writer, oldest first
pub fn write_csv<W: Write>(records: &[WaterIntakeRecord], writer: W) -> Result<usize> {
    let mut sorted: Vec<&WaterIntakeRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for record in &sorted {
        csv_writer.serialize(CsvRow::from(*record))?;
    }
    csv_writer.flush()?;
    Ok(sorted.len())
}

/// Write an export to `path`, creating parent directories and syncing to disk
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    tracing::info!("Wrote export to {:?}", path);
    Ok(())
}

/// CSV export straight to a file
pub fn export_csv_file(records: &[WaterIntakeRecord], path: &Path) -> Result<usize> {
    let mut buffer = Vec::new();
    let count = write_csv(records, &mut buffer)?;
    write_file(path, &buffer)?;
    if count == 0 {
        tracing::info!("No records to export");
    }
    Ok(count)
}

/// Output format of an export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, amount: i64, secs: i64, note: Option<&str>) -> WaterIntakeRecord {
        WaterIntakeRecord {
            id: id.into(),
            amount,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            note: note.map(String::from),
        }
    }

    #[test]
    fn test_json_export_keys() {
        let records = vec![record("a", 250, 1_700_000_000, None)];
        let exported_at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();

        let json = export_json(&records, &UserProfile::default(), 2000, exported_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["dailyGoal"], 2000);
        assert_eq!(value["waterRecords"][0]["amount"], 250);
        assert_eq!(value["userSettings"]["height"], 170);
        assert_eq!(value["userSettings"]["workingHours"]["end"], 18);
        assert_eq!(value["exportDate"], "2023-11-14T22:21:40.000Z");
    }

    #[test]
    fn test_csv_sorted_with_header() {
        let records = vec![
            record("late", 500, 1_700_000_600, Some("lunch, big glass")),
            record("early", 250, 1_700_000_000, None),
        ];

        let mut out = Vec::new();
        let count = write_csv(&records, &mut out).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,amount,timestamp,note");
        assert!(lines[1].starts_with("early,250,"));
        assert!(lines[2].contains("\"lunch, big glass\""));
    }

    #[test]
    fn test_csv_file_export() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out").join("records.csv");

        let count = export_csv_file(&[record("a", 100, 1_700_000_000, None)], &path).unwrap();
        assert_eq!(count, 1);

        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 1);
    }
}
