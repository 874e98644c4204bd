//! JSON validation reports for `--export-report`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::model::{ValidationResult, ValidationSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub is_valid: bool,
    pub duration_ms: u128,
}

impl From<&ValidationSummary> for ReportSummary {
    fn from(summary: &ValidationSummary) -> Self {
        Self {
            total_issues: summary.total_issues,
            errors: summary.errors,
            warnings: summary.warnings,
            info: summary.info,
            is_valid: summary.is_valid,
            duration_ms: summary.duration.as_millis(),
        }
    }
}

/// A validation run as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub file: String,
    pub timestamp: DateTime<Local>,
    pub summary: ReportSummary,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(file: &Path, results: Vec<ValidationResult>, summary: &ValidationSummary) -> Self {
        Self {
            file: file.display().to_string(),
            timestamp: Local::now(),
            summary: summary.into(),
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `validation-report-{yyyyMMdd-HHmmss}.json` into `directory`
    pub fn export_to(&self, directory: &Path) -> Result<PathBuf> {
        let name = format!(
            "validation-report-{}.json",
            self.timestamp.format("%Y%m%d-%H%M%S")
        );
        let path = directory.join(name);
        std::fs::write(&path, self.to_json()?)?;
        info!(report = %path.display(), "Validation report exported");
        Ok(path)
    }
}
