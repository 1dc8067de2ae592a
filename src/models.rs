use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{DashboardError, Result};

/// Known columns of a risk upload, matched against the header row exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Column {
    WorkName,
    DateOfAssessment,
    Status,
    Classification,
    AtrDate,
    MitigationPlan,
    Priority,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::WorkName,
        Column::DateOfAssessment,
        Column::Status,
        Column::Classification,
        Column::AtrDate,
        Column::MitigationPlan,
        Column::Priority,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::WorkName => "Work Name",
            Column::DateOfAssessment => "Date of Assessment",
            Column::Status => "Status",
            Column::Classification => "Classification",
            Column::AtrDate => "ATR Date",
            Column::MitigationPlan => "Mitigation Plan",
            Column::Priority => "Priority",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        Self::ALL.into_iter().find(|column| column.header() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A date cell. Text that does not parse as a date is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellDate {
    Date(NaiveDate),
    Text(String),
}

impl CellDate {
    /// Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<CellDate> {
        if raw.is_empty() {
            return None;
        }
        let trimmed = raw.trim();
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Some(CellDate::Date(date));
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(CellDate::Date(datetime.date()));
            }
        }
        Some(CellDate::Text(raw.to_string()))
    }
}

impl fmt::Display for CellDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            CellDate::Text(text) => f.write_str(text),
        }
    }
}

/// One risk entry. `None` means the cell was empty or the column absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskRecord {
    pub work_name: Option<String>,
    pub date_of_assessment: Option<CellDate>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub atr_date: Option<CellDate>,
    pub mitigation_plan: Option<String>,
    pub priority: Option<String>,
}

impl RiskRecord {
    /// Textual view of a cell, used by the column-generic metrics.
    pub fn value(&self, column: Column) -> Option<Cow<'_, str>> {
        match column {
            Column::WorkName => self.work_name.as_deref().map(Cow::Borrowed),
            Column::Status => self.status.as_deref().map(Cow::Borrowed),
            Column::Classification => self.classification.as_deref().map(Cow::Borrowed),
            Column::MitigationPlan => self.mitigation_plan.as_deref().map(Cow::Borrowed),
            Column::Priority => self.priority.as_deref().map(Cow::Borrowed),
            Column::DateOfAssessment => self
                .date_of_assessment
                .as_ref()
                .map(|date| Cow::Owned(date.to_string())),
            Column::AtrDate => self.atr_date.as_ref().map(|date| Cow::Owned(date.to_string())),
        }
    }

    pub fn is_present(&self, column: Column) -> bool {
        match column {
            Column::WorkName => self.work_name.is_some(),
            Column::DateOfAssessment => self.date_of_assessment.is_some(),
            Column::Status => self.status.is_some(),
            Column::Classification => self.classification.is_some(),
            Column::AtrDate => self.atr_date.is_some(),
            Column::MitigationPlan => self.mitigation_plan.is_some(),
            Column::Priority => self.priority.is_some(),
        }
    }
}

/// The uploaded dataset: records in source order plus the header it came with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskTable {
    columns: BTreeSet<Column>,
    extra_columns: Vec<String>,
    records: Vec<RiskRecord>,
}

impl RiskTable {
    pub fn new(columns: impl IntoIterator<Item = Column>, records: Vec<RiskRecord>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            extra_columns: Vec::new(),
            records,
        }
    }

    pub fn with_extra_columns(mut self, extra_columns: Vec<String>) -> Self {
        self.extra_columns = extra_columns;
        self
    }

    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn missing_columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|column| !self.has_column(*column))
            .collect()
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn require(&self, column: Column) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DashboardError::MissingColumn(column.header().to_string()))
        }
    }

    /// Fails on the first absent column, in the order given.
    pub fn require_all(&self, columns: &[Column]) -> Result<()> {
        columns.iter().try_for_each(|column| self.require(*column))
    }
}

/// Per-work aggregate row of the risk assessment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub work_name: String,
    pub date_of_assessment: Option<CellDate>,
    pub risk_status: Option<String>,
    pub high_count: usize,
    pub substantial_count: usize,
    pub moderate_count: usize,
    pub atr_submitted_count: usize,
    pub mitigation_planned_count: usize,
}

/// Dense work name by status count matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub statuses: Vec<String>,
    pub rows: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub work_name: String,
    /// Parallel to `StatusBreakdown::statuses`.
    pub counts: Vec<usize>,
}

#[cfg(test)]
impl StatusBreakdown {
    pub fn count(&self, work_name: &str, status: &str) -> Option<usize> {
        let index = self.statuses.iter().position(|s| s == status)?;
        self.rows
            .iter()
            .find(|row| row.work_name == work_name)
            .and_then(|row| row.counts.get(index).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Risk count per work name, largest first.
pub type WorkDistribution = IndexMap<String, usize>;
