//! GIF serialization of an in-memory frame sequence.

use std::fs::File;
use std::io;
use std::path::Path;

use gif::{DisposalMethod, Encoder, Frame, Repeat};
use tracing::debug;

use crate::error::{EncodeError, EncodeResult};
use crate::frames::{FrameSequence, LoopCount};

/// Quantizer speed for RGBA frames, 1 (best) to 30 (fastest).
pub const GIF_QUANTIZE_SPEED: i32 = 10;

/// Encode a frame sequence into an animated GIF at `dest`.
///
/// Frames are written in order with the sequence's uniform delay and
/// restore-to-background disposal, which stops transparent regions from
/// ghosting between frames. CPU-bound; call through [`encode_gif`] from
/// async code.
pub fn encode_gif_blocking(seq: FrameSequence, dest: &Path) -> EncodeResult<()> {
    let Some((width, height)) = seq.dimensions() else {
        return Err(EncodeError::EmptySequence);
    };

    let canvas_w = u16_dimension(width)?;
    let canvas_h = u16_dimension(height)?;
    let delay_cs = (seq.frame_delay_ms / 10).clamp(1, u16::MAX as u32) as u16;

    let file = File::create(dest)?;
    let mut encoder = Encoder::new(file, canvas_w, canvas_h, &[])?;
    encoder.set_repeat(match seq.loop_count {
        LoopCount::Infinite => Repeat::Infinite,
        LoopCount::Finite(n) => Repeat::Finite(n),
    })?;

    let frame_count = seq.frames.len();
    for raster in seq.frames {
        if (raster.width, raster.height) != (width, height) {
            return Err(EncodeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame dimensions differ from canvas",
            )));
        }

        let mut pixels = raster.pixels;
        let mut frame = Frame::from_rgba_speed(canvas_w, canvas_h, &mut pixels, GIF_QUANTIZE_SPEED);
        frame.delay = delay_cs;
        frame.dispose = DisposalMethod::Background;
        encoder.write_frame(&frame)?;
    }

    debug!(
        frames = frame_count,
        width, height, delay_cs, "Encoded GIF"
    );
    Ok(())
}

/// Async wrapper around [`encode_gif_blocking`].
pub async fn encode_gif(seq: FrameSequence, dest: impl AsRef<Path>) -> EncodeResult<()> {
    let dest = dest.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || encode_gif_blocking(seq, &dest))
        .await
        .map_err(|e| EncodeError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?
}

fn u16_dimension(dim: u32) -> EncodeResult<u16> {
    u16::try_from(dim).map_err(|_| {
        EncodeError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("dimension {dim} exceeds GIF limit"),
        ))
    })
}
