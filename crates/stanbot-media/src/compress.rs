//! Size-constrained GIF compression.
//!
//! The orchestrator for one conversion: decode and encode the source at
//! native resolution first, then re-run the pair at geometrically shrinking
//! scales until the output fits the byte ceiling or the attempt budget runs
//! out. Exhausting the budget is not an error; the last artifact is returned
//! and the caller decides what to do with an oversized result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};

use stanbot_models::MediaUpload;

use crate::artifacts::ArtifactArena;
use crate::encode::encode_gif;
use crate::error::{CompressError, CompressResult, StageError};
use crate::frames::{decode, DecodedFrames};
use crate::metrics;

/// Attachment size limit of the hosting chat platform.
pub const DEFAULT_SIZE_CEILING_BYTES: u64 = 25 * 1024 * 1024;

/// Default retry budget (so at most 11 encode passes).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default geometric scale decay between attempts.
pub const DEFAULT_SCALE_DECAY: f64 = 0.85;

/// Default work directory for intermediate and final artifacts.
pub const DEFAULT_WORK_DIR: &str = "/tmp/stanbot";

fn default_ceiling_bytes() -> u64 {
    DEFAULT_SIZE_CEILING_BYTES
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_scale_decay() -> f64 {
    DEFAULT_SCALE_DECAY
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

/// Tunables for one compression run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressOptions {
    /// Hard output-size ceiling in bytes.
    #[serde(default = "default_ceiling_bytes")]
    pub ceiling_bytes: u64,

    /// Retry budget after the initial unscaled attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Multiplier applied to the scale factor after each oversized attempt.
    #[serde(default = "default_scale_decay", deserialize_with = "deserialize_decay")]
    pub scale_decay: f64,

    /// Directory artifacts are written under.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            ceiling_bytes: default_ceiling_bytes(),
            max_attempts: default_max_attempts(),
            scale_decay: default_scale_decay(),
            work_dir: default_work_dir(),
        }
    }
}

impl CompressOptions {
    /// Load options from the environment, falling back to defaults:
    /// `GIF_SIZE_CEILING_BYTES`, `GIF_MAX_ATTEMPTS`, `GIF_SCALE_DECAY`,
    /// `GIF_WORK_DIR`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ceiling_bytes: std::env::var("GIF_SIZE_CEILING_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ceiling_bytes),
            max_attempts: std::env::var("GIF_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            scale_decay: std::env::var("GIF_SCALE_DECAY")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(clamp_decay)
                .unwrap_or(defaults.scale_decay),
            work_dir: std::env::var("GIF_WORK_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
        }
    }

    pub fn with_ceiling_bytes(mut self, bytes: u64) -> Self {
        self.ceiling_bytes = bytes;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_scale_decay(mut self, decay: f64) -> Self {
        self.scale_decay = clamp_decay(decay);
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }
}

/// Keep the decay strictly shrinking and non-degenerate.
fn clamp_decay(decay: f64) -> f64 {
    decay.clamp(0.05, 0.99)
}

fn deserialize_decay<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_decay)
}

/// Diagnostics for one encode attempt.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompressionAttempt {
    pub attempt: u32,
    pub scale: f64,
    pub output_size_bytes: u64,
    pub fits_ceiling: bool,
}

/// A finished conversion.
///
/// `path` is owned by the caller once returned; the pipeline has already
/// removed everything else it created. `fits_ceiling` is false when the
/// attempt budget ran out with the artifact still over the ceiling.
#[derive(Debug, Clone)]
pub struct CompressedGif {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub fits_ceiling: bool,
    pub attempts: Vec<CompressionAttempt>,
}

/// Convert an upload to a GIF no larger than the ceiling, shrinking the
/// scale geometrically across attempts.
pub async fn compress_to_gif(
    upload: &MediaUpload,
    options: &CompressOptions,
) -> CompressResult<CompressedGif> {
    let span = info_span!(
        "gif_compress",
        kind = %upload.kind,
        requester = %upload.requester,
        filename = %upload.filename,
    );
    compress_inner(upload, options).instrument(span).await
}

async fn compress_inner(
    upload: &MediaUpload,
    options: &CompressOptions,
) -> CompressResult<CompressedGif> {
    let kind = upload.kind.as_str();
    let mut arena = ArtifactArena::create(&options.work_dir, upload.requester).await?;

    let mut attempts: Vec<CompressionAttempt> = Vec::new();
    let mut scale = 1.0_f64;
    let mut final_attempt = 0;
    let mut last_size = 0;
    let mut fits_ceiling = false;

    for attempt in 0..=options.max_attempts {
        let artifact = match produce_attempt(upload, scale, &mut arena, attempt).await {
            Ok(path) => path,
            Err(stage) => {
                arena.cleanup().await;
                metrics::record_conversion(kind, "error");
                return Err(CompressError::stage(attempt, stage));
            }
        };

        let size = match tokio::fs::metadata(&artifact).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                arena.cleanup().await;
                metrics::record_conversion(kind, "error");
                return Err(CompressError::Workspace(e));
            }
        };

        let fits = size <= options.ceiling_bytes;
        attempts.push(CompressionAttempt {
            attempt,
            scale,
            output_size_bytes: size,
            fits_ceiling: fits,
        });
        info!(attempt, scale, size_bytes = size, fits, "Compression attempt finished");

        // The superseded artifact goes away only once its replacement exists.
        if attempt > 0 {
            arena.discard(attempt - 1).await;
        }

        final_attempt = attempt;
        last_size = size;

        if fits {
            fits_ceiling = true;
            break;
        }

        scale *= options.scale_decay;
    }

    if !fits_ceiling {
        warn!(
            size_bytes = last_size,
            ceiling_bytes = options.ceiling_bytes,
            attempts = attempts.len(),
            "Attempt budget exhausted, returning oversized artifact"
        );
    }

    let path = match arena.transfer(final_attempt).await {
        Ok(path) => path,
        Err(e) => {
            arena.cleanup().await;
            metrics::record_conversion(kind, "error");
            return Err(CompressError::Workspace(e));
        }
    };
    arena.cleanup().await;

    metrics::record_conversion(kind, if fits_ceiling { "fit" } else { "oversized" });
    metrics::record_attempts(kind, attempts.len() as u64);
    metrics::record_output_bytes(kind, last_size);

    Ok(CompressedGif {
        path,
        size_bytes: last_size,
        fits_ceiling,
        attempts,
    })
}

/// Run one decode+encode attempt and return its artifact path.
async fn produce_attempt(
    upload: &MediaUpload,
    scale: f64,
    arena: &mut ArtifactArena,
    attempt: u32,
) -> Result<PathBuf, StageError> {
    match decode(upload, scale, arena, attempt).await? {
        // Video path: the transcoder already wrote the artifact.
        DecodedFrames::Encoded(path) => Ok(path),
        DecodedFrames::Raster(seq) => {
            let dest = arena.attempt_path(attempt);
            encode_gif(seq, &dest).await?;
            Ok(dest)
        }
    }
}
