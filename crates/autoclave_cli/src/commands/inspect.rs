//! Inspect command implementation.

use autoclave_codec::frame_index;
use serde::Serialize;
use std::path::Path;

/// Archive inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Archive path.
    pub path: String,
    /// File size in bytes.
    pub compressed_size: u64,
    /// Total decompressed size in bytes.
    pub decompressed_size: u64,
    /// Every frame in file order.
    pub frames: Vec<FrameEntry>,
}

/// One frame of the archive.
#[derive(Debug, Serialize)]
pub struct FrameEntry {
    /// Offset of the frame (`frame_off`).
    pub offset: u64,
    /// Compressed size (`frame_size` for a single frame).
    pub compressed_len: u64,
    /// Decompressed size.
    pub decompressed_len: u64,
}

/// Reads and indexes an archive file.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)?;
    let frames: Vec<FrameEntry> = frame_index(&data)?
        .into_iter()
        .map(|info| FrameEntry {
            offset: info.offset,
            compressed_len: info.compressed_len,
            decompressed_len: info.decompressed_len,
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        compressed_size: data.len() as u64,
        decompressed_size: frames.iter().map(|f| f.decompressed_len).sum(),
        frames,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Archive: {}", result.path);
    println!("Frames: {}", result.frames.len());
    println!("Compressed size: {} bytes", result.compressed_size);
    println!("Decompressed size: {} bytes", result.decompressed_size);
    println!();
    println!("{:>12} {:>12} {:>14}", "frame_off", "frame_size", "decompressed");
    for frame in &result.frames {
        println!(
            "{:>12} {:>12} {:>14}",
            frame.offset, frame.compressed_len, frame.decompressed_len
        );
    }
}
