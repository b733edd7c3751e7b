//! Result-file rows consumed by the host's plugin importer.
//!
//! Each object is one `|`-separated line:
//! `primaryId|secondaryId|watched1|watched2|watched3|watched4|extra|foreignKey`.

use crate::speedtest::SpeedTestResult;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PRIMARY_ID: &str = "Speedtest";
pub const NULL: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginObject {
    pub primary_id: String,
    pub secondary_id: String,
    pub watched1: String,
    pub watched2: String,
    pub watched3: String,
    pub watched4: String,
    pub extra: String,
    pub foreign_key: String,
}

impl PluginObject {
    pub fn speedtest(result: &SpeedTestResult, secondary_id: impl Into<String>) -> Self {
        Self {
            primary_id: PRIMARY_ID.to_string(),
            secondary_id: secondary_id.into(),
            watched1: format_mbps(result.download_mbps),
            watched2: format_mbps(result.upload_mbps),
            watched3: result.payload.clone(),
            watched4: NULL.to_string(),
            extra: NULL.to_string(),
            foreign_key: NULL.to_string(),
        }
    }

    pub fn to_line(&self) -> String {
        let fields = [
            &self.primary_id,
            &self.secondary_id,
            &self.watched1,
            &self.watched2,
            &self.watched3,
            &self.watched4,
            &self.extra,
            &self.foreign_key,
        ];
        let mut line = fields
            .iter()
            .map(|field| sanitize(field))
            .collect::<Vec<_>>()
            .join("|");
        line.push('\n');
        line
    }
}

pub struct PluginObjects {
    result_file: PathBuf,
    objects: Vec<PluginObject>,
}

impl PluginObjects {
    pub fn new(result_file: impl Into<PathBuf>) -> Self {
        Self {
            result_file: result_file.into(),
            objects: Vec::new(),
        }
    }

    pub fn add_object(&mut self, object: PluginObject) {
        self.objects.push(object);
    }

    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// Appends the accumulated objects to the result file and clears them,
    /// so calling this twice never writes a row twice.
    pub fn write_result_file(&mut self) -> io::Result<usize> {
        if let Some(parent) = self.result_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.result_file)?;
        let mut writer = BufWriter::new(file);
        for object in &self.objects {
            writer.write_all(object.to_line().as_bytes())?;
        }
        writer.flush()?;

        let written = self.objects.len();
        self.objects.clear();
        tracing::debug!(
            path = %self.result_file.display(),
            written,
            "[INTRSPD] result file updated"
        );
        Ok(written)
    }
}

/// Matches Python's float repr for the values we emit: integral values keep
/// a trailing `.0`.
pub fn format_mbps(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn sanitize(field: &str) -> String {
    field.replace(['|', '\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> SpeedTestResult {
        SpeedTestResult {
            download_mbps: 93.45,
            upload_mbps: 35.0,
            payload: r#"{"download":93450000}"#.to_string(),
        }
    }

    #[test]
    fn speedtest_object_fields() {
        let object = PluginObject::speedtest(&sample_result(), "2024-01-01 00:00:00");
        assert_eq!(object.primary_id, "Speedtest");
        assert_eq!(object.secondary_id, "2024-01-01 00:00:00");
        assert_eq!(object.watched1, "93.45");
        assert_eq!(object.watched2, "35.0");
        assert_eq!(object.watched3, r#"{"download":93450000}"#);
        assert_eq!(object.watched4, "null");
        assert_eq!(object.extra, "null");
        assert_eq!(object.foreign_key, "null");
    }

    #[test]
    fn line_format() {
        let object = PluginObject::speedtest(&SpeedTestResult::default(), "2024-01-01 00:00:00");
        assert_eq!(
            object.to_line(),
            "Speedtest|2024-01-01 00:00:00|0.0|0.0|{}|null|null|null\n"
        );
    }

    #[test]
    fn separators_inside_values_are_replaced() {
        let result = SpeedTestResult {
            payload: "{\"error\":\"a|b\nc\"}".to_string(),
            ..SpeedTestResult::default()
        };
        let line = PluginObject::speedtest(&result, "t").to_line();
        assert_eq!(line.matches('|').count(), 7);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("a b c"));
    }

    #[test]
    fn mbps_formatting() {
        assert_eq!(format_mbps(100.0), "100.0");
        assert_eq!(format_mbps(0.0), "0.0");
        assert_eq!(format_mbps(10.5), "10.5");
        assert_eq!(format_mbps(987.65), "987.65");
    }

    #[test]
    fn write_appends_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins").join("last_result.INTRSPD.log");

        let mut objects = PluginObjects::new(&path);
        objects.add_object(PluginObject::speedtest(&sample_result(), "first"));
        assert_eq!(objects.write_result_file().unwrap(), 1);

        assert_eq!(objects.write_result_file().unwrap(), 0);

        objects.add_object(PluginObject::speedtest(&sample_result(), "second"));
        assert_eq!(objects.write_result_file().unwrap(), 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Speedtest|first|93.45|35.0|"));
        assert!(lines[1].starts_with("Speedtest|second|"));
    }
}
