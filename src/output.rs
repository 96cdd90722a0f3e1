//! Output formatting and persistence for crowd summaries.
//!
//! Supports a plain-text report, JSON serialization, and CSV history append.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::estimator::{CrowdIndexResult, CrowdSummary, classify};
use csv::WriterBuilder;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;

/// Renders the text report for `parks`, in the given order.
///
/// Parks missing from the summary are listed as unavailable.
pub fn render_report(summary: &CrowdSummary, parks: &[String], window_minutes: i64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Park Crowd Index Report");
    let _ = writeln!(out, "Timestamp: {}", summary.timestamp);
    let _ = writeln!(out, "Analysis Window: ±{window_minutes} minutes");
    let _ = writeln!(out, "{}", "=".repeat(90));

    for park in parks {
        let _ = writeln!(out);
        let _ = writeln!(out, "{park}");
        match summary.get(park) {
            Some(result) => render_park(&mut out, result),
            None => {
                let _ = writeln!(out, "   Crowd data unavailable");
            }
        }
    }

    out
}

fn render_park(out: &mut String, result: &CrowdIndexResult) {
    if let Some(failure) = &result.failure {
        let _ = writeln!(out, "   Crowd data unavailable: {}", failure.message);
        return;
    }

    let level = classify(result.crowd_index);
    let _ = writeln!(out, "   Crowd Index: {:>3}% {}", result.crowd_index, level);
    let _ = writeln!(
        out,
        "   Avg Wait: {:>5.1} min  |  Max Wait: {:>3} min",
        result.avg_wait, result.max_wait
    );
    let _ = writeln!(
        out,
        "   Operating: {:>2}/{:<2} attractions  |  Ratio: {:>5.1}%",
        result.attractions_operating,
        result.attractions_total,
        result.operating_ratio * 100.0
    );
    let _ = writeln!(
        out,
        "   vs Historical: {:>4.2}x baseline ({:>4.1} min)",
        result.baseline_comparison, result.historical_baseline
    );
    let _ = writeln!(
        out,
        "   Data Quality: {:<6} ({} data points)",
        result.confidence, result.data_points
    );
}

/// Serializes a summary as pretty-printed JSON.
pub fn to_json(summary: &CrowdSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// One CSV row per park per summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub park: String,
    pub crowd_index: u8,
    pub level: String,
    pub avg_wait: f64,
    pub max_wait: i64,
    pub attractions_operating: u32,
    pub attractions_total: u32,
    pub operating_ratio: f64,
    pub baseline_comparison: f64,
    pub historical_baseline: f64,
    pub data_points: u32,
    pub confidence: String,
}

impl HistoryRecord {
    pub fn from_result(park: &str, result: &CrowdIndexResult) -> Self {
        Self {
            timestamp: result.timestamp.clone(),
            park: park.to_string(),
            crowd_index: result.crowd_index,
            level: classify(result.crowd_index).label().to_string(),
            avg_wait: result.avg_wait,
            max_wait: result.max_wait,
            attractions_operating: result.attractions_operating,
            attractions_total: result.attractions_total,
            operating_ratio: result.operating_ratio,
            baseline_comparison: result.baseline_comparison,
            historical_baseline: result.historical_baseline,
            data_points: result.data_points,
            confidence: result.confidence.to_string(),
        }
    }
}

/// Appends a [`HistoryRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &HistoryRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Appends one row per park in the summary.
pub fn append_summary(path: &str, summary: &CrowdSummary) -> Result<()> {
    for (park, result) in &summary.parks {
        append_record(path, &HistoryRecord::from_result(park, result))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Confidence, CrowdIndexError};
    use std::collections::BTreeMap;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_result() -> CrowdIndexResult {
        CrowdIndexResult {
            timestamp: "2025-07-02T14:00:00Z".to_string(),
            crowd_index: 52,
            avg_wait: 31.5,
            max_wait: 75,
            attractions_operating: 18,
            attractions_total: 25,
            data_points: 36,
            confidence: Confidence::High,
            baseline_comparison: 0.79,
            historical_baseline: 40.0,
            operating_ratio: 1.0,
            failure: None,
        }
    }

    fn sample_summary() -> CrowdSummary {
        let mut parks = BTreeMap::new();
        parks.insert("Magic Kingdom".to_string(), sample_result());
        parks.insert(
            "Epcot".to_string(),
            CrowdIndexResult::failed(
                "2025-07-02T14:00:00Z",
                &CrowdIndexError::UnknownPark("Epcot".to_string()),
            ),
        );
        CrowdSummary {
            timestamp: "2025-07-02T14:00:00Z".to_string(),
            parks,
        }
    }

    #[test]
    fn test_render_report() {
        let parks = vec![
            "Magic Kingdom".to_string(),
            "Epcot".to_string(),
            "Animal Kingdom".to_string(),
        ];
        let report = render_report(&sample_summary(), &parks, 10);

        assert!(report.contains("Analysis Window: ±10 minutes"));
        assert!(report.contains("Crowd Index:  52% Busy"));
        assert!(report.contains("Operating: 18/25 attractions  |  Ratio: 100.0%"));
        assert!(report.contains("Data Quality: High   (36 data points)"));
        assert!(report.contains("Crowd data unavailable: no profile configured for park 'Epcot'"));
        // Missing from the summary entirely.
        assert!(report.ends_with("Animal Kingdom\n   Crowd data unavailable\n"));
        assert!(report.find("Magic Kingdom") < report.find("Epcot"));
    }

    #[test]
    fn test_to_json() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&sample_summary()).unwrap()).unwrap();
        assert_eq!(json["parks"]["Magic Kingdom"]["crowd_index"], 52);
        assert_eq!(json["parks"]["Epcot"]["confidence"], "Error");
        assert_eq!(json["parks"]["Epcot"]["failure"]["kind"], "unknown_park");
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("park_crowd_index_test_header.csv");
        let _ = fs::remove_file(&path);

        let record = HistoryRecord::from_result("Magic Kingdom", &sample_result());
        append_record(&path, &record).unwrap();
        append_record(&path, &record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,park,crowd_index,level"));
        assert!(lines[1].contains("Magic Kingdom,52,Busy"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_summary_one_row_per_park() {
        let path = temp_path("park_crowd_index_test_summary.csv");
        let _ = fs::remove_file(&path);

        append_summary(&path, &sample_summary()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",Epcot,0,Very Light,"));
        assert!(lines[1].ends_with(",Error"));

        fs::remove_file(&path).unwrap();
    }
}
