//! Object command implementation.

use autoclave_core::ArchiveEngine;
use autoclave_storage::ArchiveFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Runs the object command.
pub async fn run<W: AsyncWrite + Unpin>(
    engine: &ArchiveEngine,
    file: &str,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = ArchiveFile::new(file)?;
    let data = engine.fetch_object(&file).await?;
    out.write_all(&data).await?;
    out.flush().await?;
    Ok(())
}
