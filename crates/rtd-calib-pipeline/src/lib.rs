//! JSON-facing calibration workflow.
//!
//! [`run_calibration`] builds a [`CalibrationNetwork`] from a [`Campaign`] and
//! packages the outcome as a serialisable [`CalibrationReport`]: per-sensor
//! constants, summary statistics, diagnostics and, on request, per-path
//! details and a raised-sensor audit.

pub mod audit;
pub mod details;
pub mod summary;

use anyhow::{Context, Result};
use log::info;
use rtd_calib_core::{Campaign, SensorId, SetId};
use rtd_calib_network::{CalibrationNetwork, CalibrationResult, Diagnostic, NetworkConfig};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::Path};

pub use audit::{audit_raised, RaisedAudit, RaisedAuditEntry, RaisedAuditStatus};
pub use details::{path_details, sensor_path_details, ChainDetail, HopDetail, SensorPathDetails};
pub use summary::{summarize, CalibrationSummary, DiagnosticCounts, PathCountStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub network: NetworkConfig,
    /// Export every chain behind each computed constant.
    pub include_path_details: bool,
    /// Compare declared raised sensors with set membership.
    pub audit_raised: bool,
    /// Ignore local references during the raised audit.
    pub audit_excludes_references: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            include_path_details: false,
            audit_raised: false,
            audit_excludes_references: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub reference_set: SetId,
    pub reference_sensor: SensorId,
    /// Ordered by round, set id, sensor id.
    pub results: Vec<CalibrationResult>,
    pub summary: CalibrationSummary,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_details: Vec<SensorPathDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised_audit: Option<RaisedAudit>,
}

impl CalibrationReport {
    /// Constant of `sensor` from its lowest-round set.
    pub fn constant_for(&self, sensor: SensorId) -> Option<&CalibrationResult> {
        self.results.iter().find(|r| r.sensor_id == sensor)
    }
}

/// Run the full calibration of `campaign`.
pub fn run_calibration(campaign: &Campaign, config: &CalibrationConfig) -> Result<CalibrationReport> {
    let raised_audit = config
        .audit_raised
        .then(|| audit_raised(campaign, config.audit_excludes_references));

    let network = CalibrationNetwork::build(campaign, &config.network)
        .context("failed to build calibration network")?;

    let summary = summarize(&network);
    info!(
        "computed {}/{} results against sensor {} of {}",
        summary.computed, summary.results, summary.reference_sensor, summary.reference_set
    );

    let details = if config.include_path_details {
        path_details(&network)
    } else {
        Vec::new()
    };

    Ok(CalibrationReport {
        reference_set: network.reference_set(),
        reference_sensor: network.reference_sensor(),
        results: network.all_results().to_vec(),
        summary,
        diagnostics: network.diagnostics().to_vec(),
        path_details: details,
        raised_audit,
    })
}

/// Deserialize a JSON document from `path`.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write `value` as pretty JSON to `path`.
pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
