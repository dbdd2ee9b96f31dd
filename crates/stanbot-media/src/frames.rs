//! Frame source adapter: turns an uploaded attachment into frames.
//!
//! Videos are sampled by FFmpeg straight into a GIF artifact on disk; the
//! transcoder owns sampling rate, scaling, and timing in one pass. Images
//! (still or animated) are decoded in-process into an RGBA frame sequence and
//! handed to the encoder in memory. Unsupported uploads are rejected before
//! anything touches the filesystem.

use std::io::{self, Cursor};
use std::path::PathBuf;

use image::codecs::gif::GifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use tracing::debug;

use stanbot_models::{MediaKind, MediaUpload};

use crate::artifacts::ArtifactArena;
use crate::command::{run_ffmpeg, FfmpegCommand};
use crate::error::{DecodeError, DecodeResult};
use crate::probe::probe_source;

/// Frame sampling rate for video sources.
pub const VIDEO_SAMPLE_FPS: u32 = 15;

/// Per-frame delay applied when a source image carries no timing metadata.
pub const FALLBACK_FRAME_DELAY_MS: u32 = 100;

/// A single RGBA frame.
#[derive(Debug, Clone)]
pub struct RasterFrame {
    /// Packed RGBA bytes, row-major.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterFrame {
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = (image.width(), image.height());
        Self {
            pixels: image.into_raw(),
            width,
            height,
        }
    }
}

/// How many times an animation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Infinite,
    Finite(u16),
}

/// An ordered sequence of same-sized frames with uniform timing.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    pub frames: Vec<RasterFrame>,
    /// Delay applied to every frame, in milliseconds.
    pub frame_delay_ms: u32,
    pub loop_count: LoopCount,
}

impl FrameSequence {
    /// Canvas dimensions, taken from the first frame.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }
}

/// Output of one decode pass.
#[derive(Debug)]
pub enum DecodedFrames {
    /// Video path: the transcoder already wrote a finished GIF artifact.
    Encoded(PathBuf),
    /// Image path: frames held in memory for the encoder.
    Raster(FrameSequence),
}

/// Decode an upload at the given scale.
///
/// For videos the output artifact is registered in the arena under `attempt`
/// before FFmpeg runs, so a failed run leaves nothing untracked. For images
/// the decode happens on a blocking worker thread and nothing is written.
pub async fn decode(
    upload: &MediaUpload,
    scale: f64,
    arena: &mut ArtifactArena,
    attempt: u32,
) -> DecodeResult<DecodedFrames> {
    match upload.kind {
        MediaKind::Unsupported => Err(DecodeError::UnsupportedType),
        MediaKind::Video => decode_video(upload, scale, arena, attempt).await,
        MediaKind::Image => {
            let bytes = tokio::fs::read(&upload.path).await?;
            let seq = tokio::task::spawn_blocking(move || decode_image_blocking(&bytes, scale))
                .await
                .map_err(|e| {
                    DecodeError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
                })??;
            Ok(DecodedFrames::Raster(seq))
        }
    }
}

/// Sample a video into a GIF artifact via FFmpeg.
async fn decode_video(
    upload: &MediaUpload,
    scale: f64,
    arena: &mut ArtifactArena,
    attempt: u32,
) -> DecodeResult<DecodedFrames> {
    let info = probe_source(&upload.path).await?;
    let width = scaled_even_width(info.width, scale);

    let dest = arena.attempt_path(attempt);
    debug!(
        attempt,
        source_width = info.width,
        scaled_width = width,
        "Sampling video frames"
    );

    let cmd = FfmpegCommand::new(&upload.path, &dest).video_filter(format!(
        "fps={VIDEO_SAMPLE_FPS},scale={width}:-2:flags=lanczos"
    ));
    run_ffmpeg(&cmd).await?;

    Ok(DecodedFrames::Encoded(dest))
}

/// Decode image bytes into an RGBA frame sequence. CPU-bound, runs on a
/// blocking thread.
fn decode_image_blocking(bytes: &[u8], scale: f64) -> DecodeResult<FrameSequence> {
    let format = image::guess_format(bytes)
        .map_err(|_| DecodeError::corrupt_source("unrecognized image format"))?;

    let (mut images, frame_delay_ms) = if format == ImageFormat::Gif {
        decode_animated_gif(bytes)?
    } else {
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| DecodeError::corrupt_source(e.to_string()))?;
        (vec![img.to_rgba8()], FALLBACK_FRAME_DELAY_MS)
    };

    if images.is_empty() {
        return Err(DecodeError::corrupt_source("image has no frames"));
    }

    // Frames are resampled only on retries; the first attempt re-encodes at
    // native resolution.
    if scale < 1.0 {
        let (w, h) = (images[0].width(), images[0].height());
        let target_w = scaled_dimension(w, scale);
        let target_h = scaled_dimension(h, scale);
        images = images
            .into_iter()
            .map(|img| imageops::resize(&img, target_w, target_h, FilterType::Lanczos3))
            .collect();
    }

    Ok(FrameSequence {
        frames: images.into_iter().map(RasterFrame::from_rgba).collect(),
        frame_delay_ms,
        loop_count: LoopCount::Infinite,
    })
}

/// Decode every frame of an animated GIF, preserving the source's delay.
fn decode_animated_gif(bytes: &[u8]) -> DecodeResult<(Vec<RgbaImage>, u32)> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| DecodeError::corrupt_source(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| DecodeError::corrupt_source(e.to_string()))?;

    if frames.is_empty() {
        return Err(DecodeError::corrupt_source("animated image has no frames"));
    }

    let (numer, denom) = frames[0].delay().numer_denom_ms();
    let frame_delay_ms = if denom == 0 || numer == 0 {
        FALLBACK_FRAME_DELAY_MS
    } else {
        numer / denom
    };

    let images = frames.into_iter().map(|f| f.into_buffer()).collect();
    Ok((images, frame_delay_ms))
}

/// Scaled output width for the video path: rounded, forced even (the
/// transcoder's pixel formats want even dimensions), floored at 2.
fn scaled_even_width(width: u32, scale: f64) -> u32 {
    let w = (width as f64 * scale).round() as u32;
    let w = w - (w % 2);
    w.max(2)
}

/// Scaled dimension for raster frames, floored at 1.
fn scaled_dimension(dim: u32, scale: f64) -> u32 {
    ((dim as f64 * scale).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use stanbot_models::UserId;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        img.write_to(
            &mut Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
        bytes
    }

    fn gif_bytes(frames: &[[u8; 4]], width: u16, height: u16, delay_cs: u16) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[]).unwrap();
            encoder.set_repeat(gif::Repeat::Infinite).unwrap();
            for color in frames {
                let mut pixels: Vec<u8> = color
                    .iter()
                    .copied()
                    .cycle()
                    .take(width as usize * height as usize * 4)
                    .collect();
                let mut frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, 10);
                frame.delay = delay_cs;
                encoder.write_frame(&frame).unwrap();
            }
        }
        bytes
    }

    #[test]
    fn test_scaled_even_width() {
        assert_eq!(scaled_even_width(320, 1.0), 320);
        assert_eq!(scaled_even_width(321, 1.0), 320);
        assert_eq!(scaled_even_width(320, 0.85), 272);
        assert_eq!(scaled_even_width(3, 0.5), 2);
        assert_eq!(scaled_even_width(1, 0.1), 2);
    }

    #[test]
    fn test_still_image_decodes_to_single_frame() {
        let bytes = png_bytes(8, 6, [255, 0, 0, 255]);
        let seq = decode_image_blocking(&bytes, 1.0).unwrap();

        assert_eq!(seq.frames.len(), 1);
        assert_eq!(seq.dimensions(), Some((8, 6)));
        assert_eq!(seq.frame_delay_ms, FALLBACK_FRAME_DELAY_MS);
        assert_eq!(seq.loop_count, LoopCount::Infinite);
    }

    /// Index of the strongest RGB channel in a frame's first pixel.
    /// Quantization can nudge exact values, the dominant channel survives.
    fn dominant_channel(frame: &RasterFrame) -> usize {
        let rgb = &frame.pixels[0..3];
        (0..3).max_by_key(|&i| rgb[i]).unwrap()
    }

    #[test]
    fn test_animated_gif_preserves_delay_and_order() {
        let bytes = gif_bytes(
            &[[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]],
            4,
            4,
            20,
        );
        let seq = decode_image_blocking(&bytes, 1.0).unwrap();

        assert_eq!(seq.frames.len(), 3);
        assert_eq!(seq.frame_delay_ms, 200);

        // Red, then green, then blue: source order is preserved.
        assert_eq!(dominant_channel(&seq.frames[0]), 0);
        assert_eq!(dominant_channel(&seq.frames[1]), 1);
        assert_eq!(dominant_channel(&seq.frames[2]), 2);
    }

    #[test]
    fn test_scale_resizes_every_frame() {
        let bytes = gif_bytes(&[[10, 20, 30, 255], [40, 50, 60, 255]], 16, 16, 10);
        let seq = decode_image_blocking(&bytes, 0.5).unwrap();

        assert_eq!(seq.dimensions(), Some((8, 8)));
        for frame in &seq.frames {
            assert_eq!((frame.width, frame.height), (8, 8));
            assert_eq!(frame.pixels.len(), 8 * 8 * 4);
        }
    }

    #[test]
    fn test_unscaled_image_is_not_resampled() {
        let bytes = png_bytes(5, 5, [1, 2, 3, 255]);
        let seq = decode_image_blocking(&bytes, 1.0).unwrap();

        // Odd dimensions survive: no even-rounding on the in-memory path.
        assert_eq!(seq.dimensions(), Some((5, 5)));
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        let err = decode_image_blocking(b"definitely not an image", 1.0).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptSource(_)));
    }

    #[tokio::test]
    async fn test_unsupported_kind_fails_without_touching_fs() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();

        // Path does not exist; the kind check must fire first.
        let upload = MediaUpload::new(
            "/nonexistent/upload.bin",
            MediaKind::Unsupported,
            UserId(1),
            "upload.bin",
        );

        let err = decode(&upload, 1.0, &mut arena, 0).await.unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedType));
        assert_eq!(arena.live_count(), 0);

        arena.cleanup().await;
    }

    #[tokio::test]
    async fn test_image_decode_through_async_path() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.png");
        tokio::fs::write(&src, png_bytes(4, 4, [9, 9, 9, 255]))
            .await
            .unwrap();

        let mut arena = ArtifactArena::create(dir.path(), UserId(2)).await.unwrap();
        let upload = MediaUpload::new(&src, MediaKind::Image, UserId(2), "src.png");

        match decode(&upload, 1.0, &mut arena, 0).await.unwrap() {
            DecodedFrames::Raster(seq) => assert_eq!(seq.frames.len(), 1),
            DecodedFrames::Encoded(_) => panic!("image decode should stay in memory"),
        }

        // Image path registers nothing in the arena.
        assert_eq!(arena.live_count(), 0);
        arena.cleanup().await;
        assert!(src.exists(), "source upload must never be deleted");
    }
}
