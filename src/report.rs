use std::fmt::Write;

use crate::charts::{BarSeries, Panel, PieSeries, SummaryTable};
use crate::dashboard::Dashboard;
use crate::error::DashboardError;
use crate::models::{Column, RiskRecord};

pub fn build_report(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Risk Management Dashboard");
    let _ = writeln!(
        output,
        "Generated for {} ({} risks)",
        dashboard.source, dashboard.row_count
    );
    if dashboard.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "> The dataset is empty. No data to visualize.");
    }
    if !dashboard.missing_columns.is_empty() {
        let names: Vec<&str> = dashboard
            .missing_columns
            .iter()
            .map(|column| column.header())
            .collect();
        let _ = writeln!(output);
        let _ = writeln!(output, "Columns not in upload: {}", names.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics Overview");
    let metrics = &dashboard.metrics;
    let _ = writeln!(output, "- Total Risks: {}", metrics.total_risks);
    let _ = writeln!(output, "- Open Risks: {}", scalar(&metrics.open_risks));
    let _ = writeln!(output, "- ATR Provided: {}", scalar(&metrics.atr_provided));
    match &metrics.priority_risks {
        Panel::Ready { data } if data.is_empty() => {
            let _ = writeln!(output, "- Priority Risks: none recorded");
        }
        Panel::Ready { data } => {
            let _ = writeln!(output, "- Priority Risks:");
            for (priority, count) in data {
                let _ = writeln!(output, "  - {}: {}", priority, count);
            }
        }
        Panel::Unavailable { error } => {
            let _ = writeln!(output, "- Priority Risks: {}", notice_text(error));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Assessment Table");
    write_panel(&mut output, &dashboard.charts.summary_table, write_summary_table);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Work vs Risk Status");
    write_panel(&mut output, &dashboard.charts.status_bars, |output, series| {
        write_status_bars(output, series)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution Work-wise");
    write_panel(&mut output, &dashboard.charts.work_shares, write_work_shares);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Table");
    write_records(&mut output, &dashboard.records);

    output
}

/// Compact plain-text overview for the terminal.
pub fn build_overview(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    let metrics = &dashboard.metrics;

    let _ = writeln!(output, "Total risks: {}", metrics.total_risks);
    let _ = writeln!(output, "Open risks: {}", scalar(&metrics.open_risks));
    let _ = writeln!(output, "ATR provided: {}", scalar(&metrics.atr_provided));

    match dashboard.charts.summary_table.ready() {
        Some(table) if !table.rows.is_empty() => {
            let _ = writeln!(output, "Risks by work:");
            for row in &table.rows {
                let _ = writeln!(
                    output,
                    "- {} ({}): {} high, {} substantial, {} moderate, {} ATR, {} mitigation",
                    row.work_name,
                    row.risk_status.as_deref().unwrap_or("-"),
                    row.high_count,
                    row.substantial_count,
                    row.moderate_count,
                    row.atr_submitted_count,
                    row.mitigation_planned_count
                );
            }
        }
        Some(_) => {
            let _ = writeln!(output, "No risks recorded in this upload.");
        }
        None => {}
    }

    if let Some(error) = dashboard.charts.summary_table.error() {
        let _ = writeln!(output, "Risk table unavailable: {}", error);
    }

    output
}

fn scalar(panel: &Panel<usize>) -> String {
    match panel {
        Panel::Ready { data } => data.to_string(),
        Panel::Unavailable { error } => notice_text(error),
    }
}

fn notice_text(error: &DashboardError) -> String {
    format!("unavailable ({})", error)
}

fn write_panel<T>(output: &mut String, panel: &Panel<T>, render: impl FnOnce(&mut String, &T)) {
    match panel {
        Panel::Ready { data } => render(output, data),
        Panel::Unavailable { error } if error.is_informational() => {
            let _ = writeln!(output, "> **Note:** {}", error);
        }
        Panel::Unavailable { error } => {
            let _ = writeln!(output, "> **Error:** {}", error);
        }
    }
}

fn write_summary_table(output: &mut String, table: &SummaryTable) {
    if table.rows.is_empty() {
        let _ = writeln!(output, "No risks recorded.");
        return;
    }
    let _ = writeln!(output, "| {} |", table.headers.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(table.headers.len()));
    for row in &table.rows {
        let date = row
            .date_of_assessment
            .as_ref()
            .map(|date| date.to_string())
            .unwrap_or_default();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            cell(&row.work_name),
            cell(&date),
            cell(row.risk_status.as_deref().unwrap_or_default()),
            row.high_count,
            row.substantial_count,
            row.moderate_count,
            row.atr_submitted_count,
            row.mitigation_planned_count
        );
    }
}

fn write_status_bars(output: &mut String, series: &[BarSeries]) {
    let Some(first) = series.first() else {
        let _ = writeln!(output, "No risks recorded.");
        return;
    };
    let names: Vec<String> = series.iter().map(|s| cell(&s.name)).collect();
    let _ = writeln!(output, "| Work Name | {} |", names.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(series.len() + 1));
    for (index, point) in first.points.iter().enumerate() {
        let counts: Vec<String> = series
            .iter()
            .map(|s| s.points[index].value.to_string())
            .collect();
        let _ = writeln!(output, "| {} | {} |", cell(&point.category), counts.join(" | "));
    }
}

fn write_work_shares(output: &mut String, pie: &PieSeries) {
    for slice in &pie.slices {
        let _ = writeln!(
            output,
            "- {}: {} risks ({:.1}%)",
            slice.label, slice.value, slice.share
        );
    }
}

/// Every uploaded row, known columns only, cells as loaded.
fn write_records(output: &mut String, records: &[RiskRecord]) {
    if records.is_empty() {
        let _ = writeln!(output, "No risks recorded.");
        return;
    }
    let headers: Vec<&str> = Column::ALL.iter().map(|column| column.header()).collect();
    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(headers.len()));
    for record in records {
        let cells: Vec<String> = Column::ALL
            .iter()
            .map(|&column| record.value(column).map(|value| cell(&value)).unwrap_or_default())
            .collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
}

fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadOptions, SourceFormat};
    use crate::loader::load_table;

    fn dashboard(csv: &str) -> Dashboard {
        let table = load_table(csv.as_bytes(), SourceFormat::Csv, &LoadOptions::default()).unwrap();
        Dashboard::build("risk.csv", &table)
    }

    const FULL: &str = "\
Work Name,Date of Assessment,Status,Classification,ATR Date,Mitigation Plan,Priority
Bridge,2024-01-10,Open,High,,Reroute traffic,P1
Bridge,2024-02-01,Closed,Moderate,2024-02-15,,P2
Tunnel,2024-03-01,Open,Substantial,,,P1
";

    #[test]
    fn report_covers_every_section() {
        let report = build_report(&dashboard(FULL));
        assert!(report.contains("# Risk Management Dashboard"));
        assert!(report.contains("Generated for risk.csv (3 risks)"));
        assert!(report.contains("- Open Risks: 2"));
        assert!(report.contains("- ATR Provided: 1"));
        assert!(report.contains("  - P1: 2"));
        assert!(report.contains("| Bridge | 2024-01-10 | Open | 1 | 0 | 1 | 1 | 1 |"));
        assert!(report.contains("| Work Name | Open | Closed |"));
        assert!(report.contains("| Tunnel | 1 | 0 |"));
        assert!(report.contains("- Bridge: 2 risks (66.7%)"));
    }

    #[test]
    fn missing_column_becomes_inline_notice() {
        let report = build_report(&dashboard("Work Name,Status,Priority\nBridge,Open,P1\n"));
        assert!(report.contains("> **Error:** Required column 'Date of Assessment' not found"));
        assert!(report.contains("- ATR Provided: unavailable"));
        assert!(report.contains("| Bridge | 1 |"));
        assert!(report.contains("- Bridge: 1 risks (100.0%)"));
    }

    #[test]
    fn empty_upload_gets_no_data_notices() {
        let report = build_report(&dashboard(
            "Work Name,Date of Assessment,Status,Classification,ATR Date,Mitigation Plan,Priority\n",
        ));
        assert!(report.contains("> The dataset is empty. No data to visualize."));
        assert!(report.contains("> **Note:** The dataset is empty"));
        assert!(report.contains("- Priority Risks: none recorded"));
        assert!(report.ends_with("## Data Table\nNo risks recorded.\n"));
    }

    #[test]
    fn overview_lists_each_work() {
        let overview = build_overview(&dashboard(FULL));
        assert!(overview.contains("Total risks: 3"));
        assert!(overview.contains("- Tunnel (Open): 0 high, 1 substantial, 0 moderate, 0 ATR, 0 mitigation"));
    }

    #[test]
    fn data_table_lists_every_row() {
        let report = build_report(&dashboard(FULL));
        let data = &report[report.find("## Data Table").unwrap()..];
        assert!(data.contains(
            "| Work Name | Date of Assessment | Status | Classification | ATR Date | Mitigation Plan | Priority |"
        ));
        assert!(data.contains("| Bridge | 2024-01-10 | Open | High |  | Reroute traffic | P1 |"));
        assert!(data.contains("| Bridge | 2024-02-01 | Closed | Moderate | 2024-02-15 |  | P2 |"));
        assert!(data.contains("| Tunnel | 2024-03-01 | Open | Substantial |  |  | P1 |"));
    }

    #[test]
    fn data_table_blanks_absent_columns() {
        let report = build_report(&dashboard("Work Name,Status,Owner
Bridge,Open,Asha
"));
        let data = &report[report.find("## Data Table").unwrap()..];
        assert!(data.contains("| Bridge |  | Open |  |  |  |  |"));
        assert!(!data.contains("Asha"));
    }

    #[test]
    fn pipes_in_cells_are_escaped() {
        assert_eq!(cell("A|B"), "A\\|B");
    }
}
