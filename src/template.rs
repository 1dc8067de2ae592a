use std::io::Write;

use crate::error::Result;
use crate::models::Column;

const SAMPLE_ROWS: [[&str; 7]; 2] = [
    [
        "Flyover Package 1",
        "2024-01-15",
        "Open",
        "High",
        "",
        "Temporary traffic diversion",
        "P1",
    ],
    [
        "Flyover Package 1",
        "2024-01-15",
        "Closed",
        "Moderate",
        "2024-02-20",
        "",
        "P2",
    ],
];

/// Writes the example upload: every known header and two sample risks.
pub fn write_template<W: Write>(writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(Column::ALL.iter().map(|column| column.header()))
        .map_err(std::io::Error::from)?;
    for row in SAMPLE_ROWS {
        csv.write_record(row).map_err(std::io::Error::from)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadOptions, SourceFormat};
    use crate::loader::load_table;

    #[test]
    fn template_loads_with_every_column() {
        let mut buffer = Vec::new();
        write_template(&mut buffer).unwrap();

        let table = load_table(&buffer, SourceFormat::Csv, &LoadOptions::default()).unwrap();
        assert!(table.missing_columns().is_empty());
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].atr_date, None);
    }
}
