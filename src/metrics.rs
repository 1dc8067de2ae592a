use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::charts::Panel;
use crate::error::Result;
use crate::models::{Column, RiskTable};

pub const OPEN_STATUS: &str = "Open";

pub fn total_count(table: &RiskTable) -> usize {
    table.len()
}

/// Rows whose `column` equals `value` exactly. Missing cells never match.
pub fn count_where(table: &RiskTable, column: Column, value: &str) -> Result<usize> {
    table.require(column)?;
    Ok(table
        .records()
        .iter()
        .filter(|record| record.value(column).is_some_and(|cell| cell == value))
        .count())
}

pub fn count_non_null(table: &RiskTable, column: Column) -> Result<usize> {
    table.require(column)?;
    Ok(table
        .records()
        .iter()
        .filter(|record| record.is_present(column))
        .count())
}

/// Frequency of every present value, most frequent first. Ties keep the
/// order in which values first appear.
pub fn value_counts(table: &RiskTable, column: Column) -> Result<IndexMap<String, usize>> {
    table.require(column)?;
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in table.records() {
        if let Some(value) = record.value(column) {
            *counts.entry(value.into_owned()).or_insert(0) += 1;
        }
    }
    counts.sort_by(|_, left, _, right| right.cmp(left));
    debug!("{} distinct values in '{}'", counts.len(), column);
    Ok(counts)
}

/// Headline numbers for the metrics overview. Each column-dependent metric
/// degrades on its own.
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_risks: usize,
    pub open_risks: Panel<usize>,
    pub atr_provided: Panel<usize>,
    pub priority_risks: Panel<IndexMap<String, usize>>,
}

impl DashboardMetrics {
    pub fn compute(table: &RiskTable) -> Self {
        Self {
            total_risks: total_count(table),
            open_risks: count_where(table, Column::Status, OPEN_STATUS).into(),
            atr_provided: count_non_null(table, Column::AtrDate).into(),
            priority_risks: value_counts(table, Column::Priority).into(),
        }
    }
}
