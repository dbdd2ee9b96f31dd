//! FFprobe source inspection.
//!
//! The compression loop only needs the source's pixel dimensions (to compute
//! scaled widths) and duration (for logging), so the probe output is kept
//! deliberately small.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{DecodeError, DecodeResult};

/// Dimensions and duration of a video source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video source for its dimensions and duration.
pub async fn probe_source(path: impl AsRef<Path>) -> DecodeResult<SourceInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DecodeError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("source not found: {}", path.display()),
        )));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(DecodeError::corrupt_source(format!(
            "ffprobe rejected source: {stderr}"
        )));
    }

    parse_probe_output(&output.stdout)
}

/// Parse ffprobe JSON into [`SourceInfo`].
fn parse_probe_output(bytes: &[u8]) -> DecodeResult<SourceInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::corrupt_source(format!("unreadable probe output: {e}")))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| DecodeError::corrupt_source("no video stream found"))?;

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(DecodeError::corrupt_source("video stream has zero dimensions"));
    }

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(SourceInfo {
        width,
        height,
        duration,
    })
}
