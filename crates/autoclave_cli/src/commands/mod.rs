//! CLI command implementations.

pub mod inspect;
pub mod object;
pub mod record;
pub mod report;

use std::path::Path;
use tokio::io::AsyncWrite;

/// Boxed output sink.
pub type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Opens `path` for writing, or stdout when no path is given.
pub async fn open_output(path: Option<&Path>) -> std::io::Result<Output> {
    Ok(match path {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    })
}
