#![deny(unreachable_patterns)]
//! Media-to-GIF conversion for the stanbot backend.
//!
//! This crate provides:
//! - Frame decoding for uploaded videos (via FFmpeg) and images (in-process)
//! - Animated GIF encoding with restore-to-background disposal
//! - Size-constrained compression with a geometric scale-decay retry loop
//! - Attempt-indexed temp artifact tracking with guaranteed cleanup

pub mod artifacts;
pub mod command;
pub mod compress;
pub mod encode;
pub mod error;
pub mod frames;
pub mod metrics;
pub mod probe;

#[cfg(test)]
mod compress_tests;

pub use artifacts::ArtifactArena;
pub use command::{check_ffmpeg, check_ffprobe, run_ffmpeg, FfmpegCommand};
pub use compress::{
    compress_to_gif, CompressOptions, CompressedGif, CompressionAttempt,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_SCALE_DECAY, DEFAULT_SIZE_CEILING_BYTES, DEFAULT_WORK_DIR,
};
pub use encode::{encode_gif, encode_gif_blocking, GIF_QUANTIZE_SPEED};
pub use error::{
    CompressError, CompressResult, DecodeError, DecodeResult, EncodeError, EncodeResult,
    StageError,
};
pub use frames::{
    decode, DecodedFrames, FrameSequence, LoopCount, RasterFrame, FALLBACK_FRAME_DELAY_MS,
    VIDEO_SAMPLE_FPS,
};
pub use probe::{probe_source, SourceInfo};
