// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composition — letterboxing a decoded page onto the canonical canvas.

use tracing::debug;

use monowerk_core::error::{MonowerkError, Result};
use monowerk_core::{PageSpec, Resolution};

use crate::buffer::{PixelBuffer, PixelLayout};

/// Draw a source page onto a white canonical canvas (2550 x 3300 @ 300 dpi),
/// anchored at the top-left corner.
///
/// A source that fits the canvas is drawn at native size. A source that
/// exceeds it in either dimension is scaled down preserving aspect ratio:
/// height is fitted first and width recomputed from the ratio; if that width
/// still overflows, the fit is redone by width instead. Scaling always uses
/// nearest-neighbor sampling — smoothing filters leave banding once the page
/// is thresholded to 1 bpp.
pub fn compose_page(src: &PixelBuffer) -> Result<PixelBuffer> {
    if src.layout() != PixelLayout::Bgr24 {
        return Err(MonowerkError::UnsupportedFormat(format!(
            "page composition needs Bgr24 input, got {:?}",
            src.layout()
        )));
    }
    if src.width() == 0 || src.height() == 0 {
        return Err(MonowerkError::UnsupportedFormat(
            "page composition needs a non-empty source".into(),
        ));
    }

    let spec = PageSpec::LETTER_300DPI;
    let mut canvas = PixelBuffer::new(
        spec.width,
        spec.height,
        PixelLayout::Bgr24,
        Resolution::uniform(spec.dpi as f32),
    );
    // White background; the padding bytes pick it up too, harmlessly.
    for y in 0..spec.height {
        canvas.row_mut(y).fill(0xFF);
    }

    let (out_w, out_h) = scaled_dimensions(src.width(), src.height(), &spec);
    debug!(
        src_w = src.width(),
        src_h = src.height(),
        out_w,
        out_h,
        "compositing page onto canonical canvas"
    );

    if out_w == src.width() && out_h == src.height() {
        // Native-size draw: straight row copies.
        let row_bytes = src.width() as usize * 3;
        for y in 0..src.height() {
            canvas.row_mut(y)[..row_bytes].copy_from_slice(&src.row(y)[..row_bytes]);
        }
    } else {
        // Nearest-neighbor downscale.
        for dy in 0..out_h {
            let sy = (dy as u64 * src.height() as u64 / out_h as u64) as u32;
            let src_row = src.row(sy);
            let dst_row = canvas.row_mut(dy);
            for dx in 0..out_w as usize {
                let sx = dx * src.width() as usize / out_w as usize;
                dst_row[dx * 3..dx * 3 + 3].copy_from_slice(&src_row[sx * 3..sx * 3 + 3]);
            }
        }
    }

    Ok(canvas)
}

/// Dimensions the source is drawn at: native when it fits the canvas,
/// otherwise the height-first aspect-preserving fit described above.
/// Intermediate values truncate, matching the original's integer casts.
fn scaled_dimensions(src_w: u32, src_h: u32, spec: &PageSpec) -> (u32, u32) {
    if src_h <= spec.height && src_w <= spec.width {
        return (src_w, src_h);
    }

    let ratio = src_h as f32 / src_w as f32;
    let mut out_h = spec.height;
    let mut out_w = (out_h as f32 / ratio) as u32;
    if out_w > spec.width {
        out_w = spec.width;
        out_h = (out_w as f32 * ratio) as u32;
    }
    (out_w.max(1), out_h.max(1))
}
