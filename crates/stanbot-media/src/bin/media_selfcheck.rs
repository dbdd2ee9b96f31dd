use std::process::Command;

use stanbot_media::{compress_to_gif, encode_gif_blocking, CompressOptions};
use stanbot_media::{FrameSequence, LoopCount, RasterFrame};
use stanbot_models::{MediaKind, MediaUpload, UserId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = CompressOptions::from_env();

    println!(
        "media-selfcheck: starting with work_dir={}",
        options.work_dir.display()
    );
    ensure_workdir(&options).await?;
    ensure_tool("ffmpeg")?;
    ensure_tool("ffprobe")?;
    smoke_convert(&options).await?;

    println!("media-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(options: &CompressOptions) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&options.work_dir).await?;
    Ok(())
}

fn ensure_tool(name: &str) -> anyhow::Result<()> {
    let output = Command::new(name)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{name} not available: {e}"))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("{name} -version failed: {:?}", output.status));
    }
    Ok(())
}

/// Run a tiny conversion end to end without touching the transcoder.
async fn smoke_convert(options: &CompressOptions) -> anyhow::Result<()> {
    let src = options.work_dir.join("selfcheck_src.gif");

    let frame = |color: [u8; 4]| RasterFrame {
        pixels: color.iter().copied().cycle().take(8 * 8 * 4).collect(),
        width: 8,
        height: 8,
    };
    let seq = FrameSequence {
        frames: vec![frame([255, 0, 0, 255]), frame([0, 0, 255, 255])],
        frame_delay_ms: 100,
        loop_count: LoopCount::Infinite,
    };
    encode_gif_blocking(seq, &src)?;

    let upload = MediaUpload::new(
        &src,
        MediaKind::Image,
        UserId(std::process::id() as u64),
        "selfcheck_src.gif",
    );
    let result = compress_to_gif(&upload, options).await?;

    if !result.fits_ceiling {
        anyhow::bail!("selfcheck conversion exceeded the size ceiling");
    }

    tokio::fs::remove_file(&result.path).await?;
    tokio::fs::remove_file(&src).await?;
    Ok(())
}
