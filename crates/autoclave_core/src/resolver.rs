//! Locator lookup.

use crate::error::ArchiveResult;
use crate::locator::{RecordLocator, ReportExtent};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps identifiers to archive coordinates.
///
/// The index itself lives elsewhere; implementations wrap whatever query
/// layer holds it. Returning `Ok(None)` means "no such record", which the
/// engine reports as [`crate::ArchiveError::NotFound`]. If the index holds
/// duplicate rows for an identifier, choosing one is up to the resolver.
#[async_trait]
pub trait LocatorResolver: Send + Sync {
    /// Looks up a single record by identifier.
    async fn resolve_record(&self, id: &str) -> ArchiveResult<Option<RecordLocator>>;

    /// Looks up a report by name.
    ///
    /// The extent holds the first and last records in
    /// `(frame_off, intra_off)` order and the report size.
    async fn resolve_report(&self, name: &str) -> ArchiveResult<Option<ReportExtent>>;
}

/// A resolver backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    records: RwLock<HashMap<String, RecordLocator>>,
    reports: RwLock<HashMap<String, ReportExtent>>,
}

impl MemoryResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record.
    pub fn insert_record(&self, id: impl Into<String>, locator: RecordLocator) {
        self.records.write().insert(id.into(), locator);
    }

    /// Registers a report from all of its members.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ArchiveError::InvalidLocator`] if the members do not
    /// form a valid report.
    pub fn insert_report(
        &self,
        name: impl Into<String>,
        members: &[RecordLocator],
    ) -> ArchiveResult<()> {
        let extent = ReportExtent::from_members(members)?;
        self.insert_extent(name, extent);
        Ok(())
    }

    /// Registers a precomputed report extent.
    pub fn insert_extent(&self, name: impl Into<String>, extent: ReportExtent) {
        self.reports.write().insert(name.into(), extent);
    }

    /// Number of registered records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Number of registered reports.
    #[must_use]
    pub fn report_count(&self) -> usize {
        self.reports.read().len()
    }
}

#[async_trait]
impl LocatorResolver for MemoryResolver {
    async fn resolve_record(&self, id: &str) -> ArchiveResult<Option<RecordLocator>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn resolve_report(&self, name: &str) -> ArchiveResult<Option<ReportExtent>> {
        Ok(self.reports.read().get(name).cloned())
    }
}
