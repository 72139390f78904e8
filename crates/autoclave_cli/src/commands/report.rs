//! Report command implementation.

use autoclave_core::{ArchiveEngine, RecordLocator, ReportWindow};
use autoclave_storage::ArchiveFile;
use clap::Args;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

/// Window of the report to reconstruct.
///
/// Either `--members` with a JSON array of member locators, or the window
/// coordinates as stored in the index.
#[derive(Debug, Args)]
pub struct WindowArgs {
    /// JSON file holding an array of member locators
    #[arg(long, conflicts_with_all = ["file", "frame_off", "window_len", "leading_trim", "report_size"])]
    pub members: Option<PathBuf>,

    /// Archive file, relative to the base URL
    #[arg(long)]
    pub file: Option<String>,

    /// Offset of the report's first frame
    #[arg(long)]
    pub frame_off: Option<u64>,

    /// Compressed length of all the report's frames
    #[arg(long)]
    pub window_len: Option<u64>,

    /// Decompressed bytes before the first record
    #[arg(long, default_value = "0")]
    pub leading_trim: u64,

    /// Size of the reconstructed report
    #[arg(long)]
    pub report_size: Option<u64>,
}

impl WindowArgs {
    /// Builds the archive file and window from the arguments.
    pub fn to_window(&self) -> Result<(ArchiveFile, ReportWindow), Box<dyn std::error::Error>> {
        if let Some(path) = &self.members {
            let members: Vec<RecordLocator> = serde_json::from_slice(&std::fs::read(path)?)?;
            let window = ReportWindow::from_members(&members)?;
            let file = members
                .first()
                .map(|m| m.archive_file.clone())
                .ok_or("members file is empty")?;
            return Ok((file, window));
        }

        let file = self.file.as_deref().ok_or("--file or --members required")?;
        let window = ReportWindow::new(
            self.frame_off.ok_or("--frame-off required")?,
            self.window_len.ok_or("--window-len required")?,
            self.leading_trim,
            self.report_size.ok_or("--report-size required")?,
        )?;
        Ok((ArchiveFile::new(file)?, window))
    }
}

/// Runs the report command, writing chunks as they are decoded.
pub async fn run<W: AsyncWrite + Unpin>(
    engine: &ArchiveEngine,
    args: &WindowArgs,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let (file, window) = args.to_window()?;
    let mut reader = engine.reconstruct(&file, window);

    while let Some(chunk) = reader.next_chunk().await? {
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    info!(archive_file = %file, bytes = reader.emitted(), "report written");
    Ok(())
}
