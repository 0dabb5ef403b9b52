//! Experiment report: what the presentation layer needs, as plain data.

use std::io::Write;
use std::path::Path;

use df_fit::{FitOutcome, FitParams, PhysicalEstimate};
use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::error::{AppError, AppResult};

/// Observed and best-fit position series on the shared time grid.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReportSeries {
    pub time: Vec<f64>,
    pub observed: Vec<f64>,
    pub fitted: Vec<f64>,
    /// observed - fitted
    pub error: Vec<f64>,
}

impl ReportSeries {
    pub fn new(time: Vec<f64>, observed: Vec<f64>, fitted: Vec<f64>) -> AppResult<Self> {
        if observed.len() != time.len() || fitted.len() != time.len() {
            return Err(AppError::Validation(format!(
                "series length mismatch: time {}, observed {}, fitted {}",
                time.len(),
                observed.len(),
                fitted.len()
            )));
        }
        let error = observed.iter().zip(&fitted).map(|(y, f)| y - f).collect();
        Ok(Self {
            time,
            observed,
            fitted,
            error,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn max_abs_error(&self) -> f64 {
        self.error.iter().fold(0.0, |m, e| m.max(e.abs()))
    }
}

/// Wall-clock timing of the experiment stages.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ExperimentTiming {
    pub generate_s: f64,
    pub fit_s: f64,
    pub total_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub config: ExperimentConfig,
    /// Nominal parameters in solver coordinates
    pub nominal: FitParams,
    pub fit: FitOutcome,
    pub physical: PhysicalEstimate,
    pub series: ReportSeries,
    pub timing: ExperimentTiming,
}

impl ExperimentReport {
    pub fn converged(&self) -> bool {
        self.fit.success
    }

    /// Write `time,observed,fitted,error` rows with a header line.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "time,observed,fitted,error")?;
        let s = &self.series;
        for i in 0..s.len() {
            writeln!(
                out,
                "{},{},{},{}",
                s.time[i], s.observed[i], s.fitted[i], s.error[i]
            )?;
        }
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> AppResult<()> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        std::fs::write(path, buf).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_observed_minus_fitted() {
        let s = ReportSeries::new(vec![0.0, 1.0], vec![0.5, 0.25], vec![0.4, 0.5]).unwrap();
        assert!((s.error[0] - 0.1).abs() < 1e-15);
        assert_eq!(s.error[1], -0.25);
        assert_eq!(s.max_abs_error(), 0.25);
    }

    #[test]
    fn mismatched_series_are_rejected() {
        assert!(ReportSeries::new(vec![0.0, 1.0], vec![0.5], vec![0.4, 0.5]).is_err());
    }
}
