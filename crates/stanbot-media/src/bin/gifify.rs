//! Command-line GIF conversion for local testing.
//!
//! Runs the same pipeline the bot uses on an arbitrary local file:
//! `gifify <input> [--kind video|image|auto] [--ceiling-mib N]
//! [--max-attempts N] [--work-dir DIR]`

use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stanbot_media::{compress_to_gif, CompressOptions};
use stanbot_models::{MediaKind, MediaUpload, UserId};

const USAGE: &str = "usage: gifify <input> [--kind video|image|auto] [--ceiling-mib N] [--max-attempts N] [--work-dir DIR]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let (input, kind, options) = parse_args()?;

    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let kind = kind.unwrap_or_else(|| MediaKind::from_path(&input));

    let upload = MediaUpload::new(&input, kind, UserId(std::process::id() as u64), filename);
    println!("gifify: converting {} as {kind}", input.display());

    let result = compress_to_gif(&upload, &options).await?;

    for attempt in &result.attempts {
        println!(
            "  attempt {} at scale {:.3}: {} bytes{}",
            attempt.attempt,
            attempt.scale,
            attempt.output_size_bytes,
            if attempt.fits_ceiling { "" } else { " (over ceiling)" }
        );
    }

    println!("gifify: wrote {} ({} bytes)", result.path.display(), result.size_bytes);
    if !result.fits_ceiling {
        println!(
            "gifify: warning: result still exceeds the {} byte ceiling",
            options.ceiling_bytes
        );
    }

    Ok(())
}

fn parse_args() -> anyhow::Result<(PathBuf, Option<MediaKind>, CompressOptions)> {
    let mut args = std::env::args().skip(1);
    let mut input: Option<PathBuf> = None;
    let mut kind: Option<MediaKind> = None;
    let mut options = CompressOptions::from_env();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--kind" => {
                let value = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                kind = match value.as_str() {
                    "video" => Some(MediaKind::Video),
                    "image" => Some(MediaKind::Image),
                    "auto" => None,
                    other => anyhow::bail!("unknown kind {other:?}\n{USAGE}"),
                };
            }
            "--ceiling-mib" => {
                let value = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                let mib: u64 = value.parse()?;
                options = options.with_ceiling_bytes(mib * 1024 * 1024);
            }
            "--max-attempts" => {
                let value = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                options = options.with_max_attempts(value.parse()?);
            }
            "--work-dir" => {
                let value = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                options = options.with_work_dir(value);
            }
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            other => anyhow::bail!("unexpected argument {other:?}\n{USAGE}"),
        }
    }

    let input = input.ok_or_else(|| anyhow::anyhow!(USAGE))?;
    Ok((input, kind, options))
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("stanbot=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
