//! End-to-end tests for the compression loop over real files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use stanbot_models::{MediaKind, MediaUpload, UserId};

use crate::compress::{compress_to_gif, CompressOptions};
use crate::encode::encode_gif_blocking;
use crate::error::{CompressError, DecodeError, StageError};
use crate::frames::{FrameSequence, LoopCount, RasterFrame};

fn solid_frame(width: u32, height: u32, color: [u8; 4]) -> RasterFrame {
    RasterFrame {
        pixels: color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect(),
        width,
        height,
    }
}

/// Deterministic per-pixel noise so the GIF barely compresses.
fn noise_frame(width: u32, height: u32, seed: &mut u64) -> RasterFrame {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        *seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        pixels.extend_from_slice(&[
            (*seed >> 16) as u8,
            (*seed >> 32) as u8,
            (*seed >> 48) as u8,
            255,
        ]);
    }
    RasterFrame {
        pixels,
        width,
        height,
    }
}

/// Write an animated GIF source file to convert.
fn write_gif_source(dir: &Path, name: &str, frames: Vec<RasterFrame>) -> PathBuf {
    let path = dir.join(name);
    let seq = FrameSequence {
        frames,
        frame_delay_ms: 100,
        loop_count: LoopCount::Infinite,
    };
    encode_gif_blocking(seq, &path).unwrap();
    path
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

#[tokio::test]
async fn test_small_image_fits_on_first_attempt() {
    let src_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let src = write_gif_source(
        src_dir.path(),
        "small.gif",
        vec![
            solid_frame(4, 4, [255, 0, 0, 255]),
            solid_frame(4, 4, [0, 0, 255, 255]),
        ],
    );
    let upload = MediaUpload::new(&src, MediaKind::Image, UserId(1), "small.gif");
    let options = CompressOptions::default().with_work_dir(work_dir.path());

    let result = compress_to_gif(&upload, &options).await.unwrap();

    assert!(result.fits_ceiling);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].attempt, 0);
    assert!((result.attempts[0].scale - 1.0).abs() < f64::EPSILON);

    assert!(result.path.exists());
    assert_eq!(
        result.size_bytes,
        std::fs::metadata(&result.path).unwrap().len()
    );

    // Only the returned artifact survives in the work dir.
    assert_eq!(entries(work_dir.path()), vec![result.path.clone()]);
    assert!(src.exists(), "caller input must never be deleted");
}

#[tokio::test]
async fn test_budget_exhausted_returns_oversized_artifact() {
    let src_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let src = write_gif_source(
        src_dir.path(),
        "src.gif",
        vec![
            solid_frame(16, 16, [10, 10, 10, 255]),
            solid_frame(16, 16, [200, 200, 200, 255]),
        ],
    );
    let upload = MediaUpload::new(&src, MediaKind::Image, UserId(2), "src.gif");

    // A one-byte ceiling can never be met; the loop must still terminate.
    let options = CompressOptions::default()
        .with_ceiling_bytes(1)
        .with_max_attempts(3)
        .with_work_dir(work_dir.path());

    let result = compress_to_gif(&upload, &options).await.unwrap();

    assert!(!result.fits_ceiling, "oversized result is a degraded success");
    assert_eq!(result.attempts.len(), 4, "max_attempts + 1 encode passes");
    assert!(result.attempts.iter().all(|a| !a.fits_ceiling));
    assert!(result.path.exists());

    // Scale decays geometrically across attempts.
    for pair in result.attempts.windows(2) {
        let ratio = pair[1].scale / pair[0].scale;
        assert!((ratio - 0.85).abs() < 1e-9);
    }

    assert_eq!(entries(work_dir.path()), vec![result.path.clone()]);
    assert!(src.exists());
}

#[tokio::test]
async fn test_scale_decays_until_fit() {
    let src_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let mut seed = 0x5eed;
    let src = write_gif_source(
        src_dir.path(),
        "noisy.gif",
        vec![
            noise_frame(64, 64, &mut seed),
            noise_frame(64, 64, &mut seed),
            noise_frame(64, 64, &mut seed),
        ],
    );
    let upload = MediaUpload::new(&src, MediaKind::Image, UserId(3), "noisy.gif");

    // Too small for 64x64 noise, comfortably met once the frames shrink.
    let options = CompressOptions::default()
        .with_ceiling_bytes(6000)
        .with_work_dir(work_dir.path());

    let result = compress_to_gif(&upload, &options).await.unwrap();

    assert!(result.fits_ceiling);
    assert!(result.attempts.len() >= 2, "first attempt cannot fit");
    assert!(result.size_bytes <= 6000);

    // Every attempt but the last was oversized.
    let (last, rest) = result.attempts.split_last().unwrap();
    assert!(last.fits_ceiling);
    assert!(rest.iter().all(|a| !a.fits_ceiling));

    assert_eq!(entries(work_dir.path()), vec![result.path.clone()]);
    assert!(src.exists());
}

#[tokio::test]
async fn test_unsupported_upload_fails_cleanly() {
    let work_dir = TempDir::new().unwrap();

    let upload = MediaUpload::new(
        "/nonexistent/file.xyz",
        MediaKind::Unsupported,
        UserId(4),
        "file.xyz",
    );
    let options = CompressOptions::default().with_work_dir(work_dir.path());

    let err = compress_to_gif(&upload, &options).await.unwrap_err();

    assert_eq!(err.attempt(), Some(0));
    assert!(matches!(
        err,
        CompressError::Stage {
            source: StageError::Decode(DecodeError::UnsupportedType),
            ..
        }
    ));

    // Error path leaves nothing behind.
    assert!(entries(work_dir.path()).is_empty());
}

#[tokio::test]
async fn test_corrupt_image_fails_cleanly() {
    let src_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let src = src_dir.path().join("broken.png");
    std::fs::write(&src, b"these are not image bytes").unwrap();

    let upload = MediaUpload::new(&src, MediaKind::Image, UserId(5), "broken.png");
    let options = CompressOptions::default().with_work_dir(work_dir.path());

    let err = compress_to_gif(&upload, &options).await.unwrap_err();

    assert_eq!(err.attempt(), Some(0));
    assert!(matches!(
        err,
        CompressError::Stage {
            source: StageError::Decode(DecodeError::CorruptSource(_)),
            ..
        }
    ));

    assert!(entries(work_dir.path()).is_empty());
    assert!(src.exists(), "caller input must never be deleted");
}
