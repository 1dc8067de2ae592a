//! Chart-ready data: the per-work summary table, status bars and work shares.
//!
//! Nothing here knows about colours, titles or layout. Each product is
//! computed independently so one missing column only takes out the panels
//! that read it.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::metrics;
use crate::models::{
    BreakdownRow, Column, GroupSummary, RiskTable, StatusBreakdown, WorkDistribution,
};

pub const HIGH: &str = "High";
pub const SUBSTANTIAL: &str = "Substantial";
pub const MODERATE: &str = "Moderate";

const SUMMARY_COLUMNS: [Column; 6] = [
    Column::WorkName,
    Column::DateOfAssessment,
    Column::Status,
    Column::Classification,
    Column::AtrDate,
    Column::MitigationPlan,
];

pub const SUMMARY_HEADERS: [&str; 8] = [
    "Work Name",
    "Date of Assessment",
    "Risk Status",
    "High",
    "Substantial",
    "Moderate",
    "ATR Submitted",
    "Mitigation Planned",
];

/// A dashboard panel: either data to draw or the reason it cannot be drawn.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Unavailable { error: DashboardError },
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DashboardError> {
        match self {
            Panel::Ready { .. } => None,
            Panel::Unavailable { error } => Some(error),
        }
    }
}

impl<T> From<Result<T>> for Panel<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Panel::Ready { data },
            Err(error) => Panel::Unavailable { error },
        }
    }
}

/// One row per work name, in order of first appearance.
///
/// Assessment date and risk status are the first non-missing value in the
/// group, in source order; they are not aggregated. Classification labels other
/// than High, Substantial and Moderate are not counted anywhere. Work names
/// are compared exactly, so `"Bridge"` and `"bridge "` are separate groups.
pub fn summarize_by_work(table: &RiskTable) -> Result<Vec<GroupSummary>> {
    table.require_all(&SUMMARY_COLUMNS)?;

    let mut groups: IndexMap<&str, GroupSummary> = IndexMap::new();
    for record in table.records() {
        let Some(work_name) = record.work_name.as_deref() else {
            continue;
        };
        let summary = groups.entry(work_name).or_insert_with(|| GroupSummary {
            work_name: work_name.to_string(),
            date_of_assessment: None,
            risk_status: None,
            high_count: 0,
            substantial_count: 0,
            moderate_count: 0,
            atr_submitted_count: 0,
            mitigation_planned_count: 0,
        });

        if summary.date_of_assessment.is_none() {
            summary.date_of_assessment = record.date_of_assessment.clone();
        }
        if summary.risk_status.is_none() {
            summary.risk_status = record.status.clone();
        }
        match record.classification.as_deref() {
            Some(HIGH) => summary.high_count += 1,
            Some(SUBSTANTIAL) => summary.substantial_count += 1,
            Some(MODERATE) => summary.moderate_count += 1,
            _ => {}
        }
        if record.atr_date.is_some() {
            summary.atr_submitted_count += 1;
        }
        if record.mitigation_plan.is_some() {
            summary.mitigation_planned_count += 1;
        }
    }

    debug!("Summarized {} rows into {} work groups", table.len(), groups.len());
    Ok(groups.into_values().collect())
}

/// Count of rows per (work name, status). Every work name gets a cell for
/// every status seen anywhere in the table, zero when absent.
pub fn status_breakdown(table: &RiskTable) -> Result<StatusBreakdown> {
    table.require_all(&[Column::WorkName, Column::Status])?;

    let mut statuses: IndexSet<&str> = IndexSet::new();
    let mut cells: IndexMap<&str, IndexMap<&str, usize>> = IndexMap::new();
    for record in table.records() {
        let (Some(work_name), Some(status)) =
            (record.work_name.as_deref(), record.status.as_deref())
        else {
            continue;
        };
        statuses.insert(status);
        *cells
            .entry(work_name)
            .or_default()
            .entry(status)
            .or_insert(0) += 1;
    }

    let rows = cells
        .into_iter()
        .map(|(work_name, counts)| BreakdownRow {
            work_name: work_name.to_string(),
            counts: statuses
                .iter()
                .map(|status| counts.get(status).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    Ok(StatusBreakdown {
        statuses: statuses.into_iter().map(str::to_string).collect(),
        rows,
    })
}

/// Risks per work name across the whole table.
pub fn work_distribution(table: &RiskTable) -> Result<WorkDistribution> {
    metrics::value_counts(table, Column::WorkName)
}

#[derive(Debug, Serialize)]
pub struct SummaryTable {
    pub headers: [&'static str; 8],
    pub rows: Vec<GroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarPoint {
    pub category: String,
    pub value: usize,
}

/// One status, with a bar for every work name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub points: Vec<BarPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: usize,
    /// Percentage of all risks, 0-100.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSeries {
    pub slices: Vec<PieSlice>,
}

pub fn bar_series(breakdown: &StatusBreakdown) -> Vec<BarSeries> {
    breakdown
        .statuses
        .iter()
        .enumerate()
        .map(|(index, status)| BarSeries {
            name: status.clone(),
            points: breakdown
                .rows
                .iter()
                .map(|row| BarPoint {
                    category: row.work_name.clone(),
                    value: row.counts[index],
                })
                .collect(),
        })
        .collect()
}

/// Fails with [`DashboardError::EmptyDataset`] when there is nothing to slice.
pub fn pie_series(distribution: &WorkDistribution) -> Result<PieSeries> {
    let total: usize = distribution.values().sum();
    if total == 0 {
        return Err(DashboardError::EmptyDataset("work shares".to_string()));
    }
    let slices = distribution
        .iter()
        .map(|(label, value)| PieSlice {
            label: label.clone(),
            value: *value,
            share: *value as f64 * 100.0 / total as f64,
        })
        .collect();
    Ok(PieSeries { slices })
}

/// The three chart products for one table.
#[derive(Debug, Serialize)]
pub struct ChartBundle {
    pub summary_table: Panel<SummaryTable>,
    pub status_bars: Panel<Vec<BarSeries>>,
    pub work_shares: Panel<PieSeries>,
}

impl ChartBundle {
    pub fn prepare(table: &RiskTable) -> Self {
        Self {
            summary_table: summarize_by_work(table)
                .map(|rows| SummaryTable {
                    headers: SUMMARY_HEADERS,
                    rows,
                })
                .into(),
            status_bars: status_breakdown(table)
                .map(|breakdown| bar_series(&breakdown))
                .into(),
            work_shares: work_distribution(table)
                .and_then(|distribution| pie_series(&distribution))
                .into(),
        }
    }
}
