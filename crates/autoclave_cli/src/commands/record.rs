//! Record command implementation.

use autoclave_core::{ArchiveEngine, ByteSlice, FrameSpan, RecordLocator};
use autoclave_storage::ArchiveFile;
use clap::Args;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Locator of the record to extract.
///
/// Either `--locator` with a JSON locator, or the five coordinates.
#[derive(Debug, Args)]
pub struct LocatorArgs {
    /// Locator as JSON
    /// (`{"archive_file":..,"frame_off":..,"frame_size":..,"intra_off":..,"intra_size":..}`)
    #[arg(long, conflicts_with_all = ["file", "frame_off", "frame_size", "intra_off", "intra_size"])]
    pub locator: Option<String>,

    /// Archive file, relative to the base URL
    #[arg(long)]
    pub file: Option<String>,

    /// Offset of the record's first frame
    #[arg(long)]
    pub frame_off: Option<u64>,

    /// Compressed length of the record's frames
    #[arg(long)]
    pub frame_size: Option<u64>,

    /// Offset of the record in the decompressed frames
    #[arg(long)]
    pub intra_off: Option<u64>,

    /// Length of the record
    #[arg(long)]
    pub intra_size: Option<u64>,
}

impl LocatorArgs {
    /// Builds the locator from the arguments.
    pub fn to_locator(&self) -> Result<RecordLocator, Box<dyn std::error::Error>> {
        if let Some(json) = &self.locator {
            return Ok(serde_json::from_str(json)?);
        }
        let file = self.file.as_deref().ok_or("--file or --locator required")?;
        Ok(RecordLocator::new(
            ArchiveFile::new(file)?,
            FrameSpan::new(
                self.frame_off.ok_or("--frame-off required")?,
                self.frame_size.ok_or("--frame-size required")?,
            )?,
            ByteSlice {
                intra_off: self.intra_off.ok_or("--intra-off required")?,
                intra_size: self.intra_size.ok_or("--intra-size required")?,
            },
        ))
    }
}

/// Runs the record command.
pub async fn run<W: AsyncWrite + Unpin>(
    engine: &ArchiveEngine,
    args: &LocatorArgs,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let locator = args.to_locator()?;
    let record = engine.extract(&locator).await?;
    out.write_all(&record).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
