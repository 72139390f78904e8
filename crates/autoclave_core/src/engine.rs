//! The engine facade.

use crate::config::EngineConfig;
use crate::error::{ArchiveError, ArchiveResult};
use crate::extract::RecordExtractor;
use crate::locator::{RecordLocator, ReportWindow};
use crate::reconstruct::{ReportReader, ReportReconstructor};
use crate::resolver::LocatorResolver;
use autoclave_storage::{ArchiveFile, RangeFetcher};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Entry point for serving measurements and reports out of archives.
///
/// The engine is cheap to clone and holds no per-request state; every call
/// is independent.
///
/// # Example
///
/// ```rust,no_run
/// use autoclave_core::{ArchiveEngine, EngineConfig, MemoryResolver};
/// use autoclave_storage::{HttpArchive, HttpArchiveConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpArchive::new(HttpArchiveConfig::default())?;
/// let engine = ArchiveEngine::new(Arc::new(fetcher), EngineConfig::default());
///
/// let resolver = MemoryResolver::new();
/// // ... populate the resolver from the index ...
/// let record = engine.measurement(&resolver, "temp-id-263478291").await?;
/// println!("{}", String::from_utf8_lossy(&record));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ArchiveEngine {
    extractor: RecordExtractor,
    reconstructor: ReportReconstructor,
}

impl ArchiveEngine {
    /// Creates an engine reading from `fetcher`.
    pub fn new(fetcher: Arc<dyn RangeFetcher>, config: EngineConfig) -> Self {
        Self {
            extractor: RecordExtractor::new(Arc::clone(&fetcher)),
            reconstructor: ReportReconstructor::new(fetcher, config),
        }
    }

    /// Extracts one record.
    ///
    /// # Errors
    ///
    /// See [`RecordExtractor::extract`].
    pub async fn extract(&self, locator: &RecordLocator) -> ArchiveResult<Bytes> {
        self.extractor.extract(locator).await
    }

    /// Returns a lazy reader for a report window.
    pub fn reconstruct(&self, file: &ArchiveFile, window: ReportWindow) -> ReportReader {
        self.reconstructor.reconstruct(file, window)
    }

    /// Fetches a standalone compressed measurement object.
    ///
    /// # Errors
    ///
    /// See [`RecordExtractor::extract_object`].
    pub async fn fetch_object(&self, file: &ArchiveFile) -> ArchiveResult<Bytes> {
        self.extractor.extract_object(file).await
    }

    /// Resolves a measurement identifier and extracts its record.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] if the resolver has no locator,
    /// otherwise any resolver or extraction error.
    pub async fn measurement(
        &self,
        resolver: &dyn LocatorResolver,
        id: &str,
    ) -> ArchiveResult<Bytes> {
        let locator = resolver
            .resolve_record(id)
            .await?
            .ok_or_else(|| ArchiveError::not_found(id))?;
        self.extract(&locator).await
    }

    /// Resolves a report name and returns a reader for it.
    ///
    /// The resolver is queried before returning; the archive is not touched
    /// until the first chunk is pulled.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] if the resolver has no extent and
    /// [`ArchiveError::InvalidLocator`] if the extent is unusable.
    pub async fn report(
        &self,
        resolver: &dyn LocatorResolver,
        name: &str,
    ) -> ArchiveResult<ReportReader> {
        let extent = resolver
            .resolve_report(name)
            .await?
            .ok_or_else(|| ArchiveError::not_found(name))?;
        let window = extent.window()?;

        debug!(
            report = name,
            archive_file = %extent.archive_file(),
            frame_off = window.frame_off(),
            total_frame_size = window.len(),
            intra_off = window.leading_trim(),
            report_size = window.report_size(),
            "report boundaries"
        );
        Ok(self.reconstruct(extent.archive_file(), window))
    }
}
