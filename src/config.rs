// Dashboard configuration.
//
// Read from an optional TOML file; every key has a default so an empty file
// (or no file at all) yields a working setup.

use crate::error::Result;
use crate::filter::SelectionMode;
use crate::format::NumberLocale;
use crate::totals::DEFAULT_TOTAL_LABEL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub locale: NumberLocale,
    pub total_label: String,
    /// Rows shown in rankings and bar charts.
    pub top_n: usize,
    pub selection_mode: SelectionMode,
    /// Worksheet read from `.xlsx` uploads.
    pub sheet_name: String,
    pub hours_decimals: usize,
    /// Rows printed in console previews.
    pub preview_rows: usize,
    /// When set, dashboard tables are exported here as CSV and chart series as JSON.
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            locale: NumberLocale::PtBr,
            total_label: DEFAULT_TOTAL_LABEL.to_string(),
            top_n: 10,
            selection_mode: SelectionMode::RequireSelection,
            sheet_name: "base".to_string(),
            hours_decimals: 2,
            preview_rows: 10,
            export_dir: None,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
