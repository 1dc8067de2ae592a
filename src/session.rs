//! The single in-memory upload a user is looking at.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::{LoadOptions, SourceFormat};
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::loader;
use crate::models::RiskTable;

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub id: Uuid,
    pub source_name: String,
    pub loaded_at: DateTime<Utc>,
    pub table: RiskTable,
}

/// Holds at most one dataset. A new upload replaces it wholesale.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<LoadedDataset>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `bytes` and makes the result the current dataset. The previous
    /// dataset is dropped even when parsing fails.
    pub fn upload(
        &mut self,
        source_name: impl Into<String>,
        bytes: &[u8],
        format: SourceFormat,
        options: &LoadOptions,
    ) -> Result<&LoadedDataset> {
        self.clear();
        let table = loader::load_table(bytes, format, options)?;
        let dataset = LoadedDataset {
            id: Uuid::new_v4(),
            source_name: source_name.into(),
            loaded_at: Utc::now(),
            table,
        };
        info!(
            upload_id = %dataset.id,
            rows = dataset.table.len(),
            "Upload stored for {} at {}",
            dataset.source_name,
            dataset.loaded_at.to_rfc3339()
        );
        Ok(self.current.insert(dataset))
    }

    /// Cancels the current upload. Returns whether there was one.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn dataset(&self) -> Option<&LoadedDataset> {
        self.current.as_ref()
    }

    pub fn dashboard(&self) -> Option<Dashboard> {
        self.current
            .as_ref()
            .map(|dataset| Dashboard::build(&dataset.source_name, &dataset.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &[u8] = b"Work Name,Status\nBridge,Open\n";
    const SECOND: &[u8] = b"Work Name,Status\nTunnel,Open\nTunnel,Closed\n";

    fn upload(session: &mut Session, name: &str, bytes: &[u8]) -> Result<Uuid> {
        session
            .upload(name, bytes, SourceFormat::Csv, &LoadOptions::default())
            .map(|dataset| dataset.id)
    }

    #[test]
    fn new_upload_replaces_previous_dataset() {
        let mut session = Session::new();
        let first = upload(&mut session, "first.csv", FIRST).unwrap();
        let second = upload(&mut session, "second.csv", SECOND).unwrap();

        assert_ne!(first, second);
        let dataset = session.dataset().unwrap();
        assert_eq!(dataset.source_name, "second.csv");
        assert_eq!(dataset.table.len(), 2);
    }

    #[test]
    fn failed_upload_leaves_no_dataset() {
        let mut session = Session::new();
        upload(&mut session, "first.csv", FIRST).unwrap();
        assert!(upload(&mut session, "broken.csv", b"").is_err());
        assert!(session.dataset().is_none());
        assert!(session.dashboard().is_none());
    }

    #[test]
    fn clear_cancels_the_upload() {
        let mut session = Session::new();
        assert!(!session.clear());
        upload(&mut session, "first.csv", FIRST).unwrap();
        assert!(session.clear());
        assert!(session.dataset().is_none());
    }

    #[test]
    fn dashboard_reads_the_current_dataset() {
        let mut session = Session::new();
        upload(&mut session, "second.csv", SECOND).unwrap();
        let dashboard = session.dashboard().unwrap();
        assert_eq!(dashboard.source, "second.csv");
        assert_eq!(dashboard.metrics.open_risks.ready(), Some(&1));
    }
}
