use crate::bound::BoundEstimate;
use crate::config::Config;
use crate::dataset::LengthProfile;
use crate::error::{RadeBoundError, Result};
use crate::estimator::PreparedDataset;
use crate::optimize::Minimizer;

use chrono::Local;
use csv::WriterBuilder;
use log::{info, warn};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Inclusive range of item-length thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRange {
    pub min: usize,
    pub max: usize,
}

impl ThresholdRange {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 || min > max {
            return Err(RadeBoundError::EmptyThresholdRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// `[ceil(average) + min_offset, min(max_threshold, max length)]`
    pub fn from_profile(
        profile: &LengthProfile,
        min_offset: usize,
        max_threshold: usize,
    ) -> Result<Self> {
        let min = (profile.average.ceil() as usize).saturating_add(min_offset);
        let max = max_threshold.min(profile.max);
        Self::new(min, max)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepEntry {
    pub threshold: usize,
    pub bound: Option<f64>,
    pub rademacher: Option<f64>,
    pub status_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub dataset: String,
    pub delta: f64,
    pub timestamp: String,
    pub entries: Vec<SweepEntry>,
    pub best: Option<BoundEstimate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = RadeBoundError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            _ => Err(RadeBoundError::UnknownReportFormat(s.to_string())),
        }
    }
}

/// Estimates the bound for every threshold in `range` and keeps the smallest.
///
/// Thresholds whose optimization fails are recorded without a bound; any other
/// error aborts the sweep.
pub fn sweep<M: Minimizer>(
    prepared: &PreparedDataset,
    dataset_name: &str,
    range: ThresholdRange,
    delta: f64,
    config: &Config,
    minimizer: &M,
) -> Result<SweepReport> {
    let mut entries = Vec::new();
    let mut best: Option<BoundEstimate> = None;

    for threshold in range.iter() {
        match prepared.estimate(threshold, delta, config, minimizer) {
            Ok(estimate) => {
                entries.push(SweepEntry {
                    threshold,
                    bound: Some(estimate.bound),
                    rademacher: Some(estimate.rademacher),
                    status_code: estimate.status.code(),
                });
                if best.is_none_or(|b| estimate.bound <= b.bound) {
                    best = Some(estimate);
                }
            }
            Err(RadeBoundError::OptimizationFailed { code, reason }) => {
                warn!("Threshold {threshold}: optimization failed ({reason}, code {code})");
                entries.push(SweepEntry {
                    threshold,
                    bound: None,
                    rademacher: None,
                    status_code: code,
                });
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(b) = &best {
        info!(
            "Smallest bound {} at threshold {} ({} thresholds tried)",
            b.bound,
            b.threshold,
            entries.len()
        );
    }

    Ok(SweepReport {
        dataset: dataset_name.to_string(),
        delta,
        timestamp: Local::now().to_rfc3339(),
        entries,
        best,
    })
}

impl SweepReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry.bound {
                Some(bound) => {
                    let _ = writeln!(out, "{} {}", entry.threshold, bound);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{} Optimization failed! return code: {}",
                        entry.threshold, entry.status_code
                    );
                }
            }
        }
        match &self.best {
            Some(best) => {
                let _ = write!(out, "{} {}", self.dataset, best.bound);
            }
            None => out.push_str("No threshold produced a bound"),
        }
        out
    }

    /// Writes the report as pretty JSON into `output_dir` and returns the file path.
    pub fn save_json(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = report_path(output_dir, "json")?;
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Writes one CSV row per threshold into `output_dir` and returns the file path.
    pub fn save_csv(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = report_path(output_dir, "csv")?;
        self.write_csv(&path)?;
        Ok(path)
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = WriterBuilder::new().from_writer(BufWriter::new(file));
        wtr.write_record(["threshold", "bound", "rademacher", "status_code"])?;
        for entry in &self.entries {
            let bound = entry.bound.map(|b| b.to_string()).unwrap_or_default();
            let rademacher = entry.rademacher.map(|r| r.to_string()).unwrap_or_default();
            wtr.write_record([
                entry.threshold.to_string(),
                bound,
                rademacher,
                entry.status_code.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// `<output_dir>/radebound_sweep_<timestamp>.<extension>`, creating the directory.
fn report_path(output_dir: &Path, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(output_dir.join(format!("radebound_sweep_{timestamp}.{extension}")))
}
