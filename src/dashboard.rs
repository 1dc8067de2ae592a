use serde::Serialize;
use tracing::{info, warn};

use crate::charts::{ChartBundle, Panel};
use crate::metrics::DashboardMetrics;
use crate::models::{Column, RiskRecord, RiskTable};

/// Everything the dashboard page shows for one upload.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub source: String,
    pub row_count: usize,
    pub missing_columns: Vec<Column>,
    pub metrics: DashboardMetrics,
    pub charts: ChartBundle,
    /// The uploaded rows as loaded, for the data table.
    pub records: Vec<RiskRecord>,
}

impl Dashboard {
    pub fn build(source: impl Into<String>, table: &RiskTable) -> Self {
        let dashboard = Self {
            source: source.into(),
            row_count: table.len(),
            missing_columns: table.missing_columns(),
            metrics: DashboardMetrics::compute(table),
            charts: ChartBundle::prepare(table),
            records: table.records().to_vec(),
        };
        dashboard.log_degraded_panels();
        dashboard
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    fn log_degraded_panels(&self) {
        log_panel("open risks", &self.metrics.open_risks);
        log_panel("ATR provided", &self.metrics.atr_provided);
        log_panel("priority risks", &self.metrics.priority_risks);
        log_panel("risk assessment table", &self.charts.summary_table);
        log_panel("work vs risk status", &self.charts.status_bars);
        log_panel("risk distribution", &self.charts.work_shares);
    }
}

fn log_panel<T>(name: &str, panel: &Panel<T>) {
    match panel.error() {
        Some(error) if error.is_informational() => info!("Panel '{}' has no data: {}", name, error),
        Some(error) => warn!("Panel '{}' skipped: {}", name, error),
        None => {}
    }
}
