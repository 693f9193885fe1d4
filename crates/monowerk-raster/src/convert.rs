// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bit-depth conversion — 1 bpp thresholding, 8 bpp palette grayscale, and
// full-depth matrix grayscale. Every conversion allocates a fresh destination
// buffer and walks rows through the stride-aware accessors, so bottom-up
// sources come out in the right visual order.

use tracing::debug;

use monowerk_core::error::{MonowerkError, Result};

use crate::buffer::{PixelBuffer, PixelLayout};
use crate::luminance;

/// The 256-entry identity gray ramp: entry `i` is the opaque gray `(i,i,i)`,
/// so an index value doubles as its own gray level.
pub fn grayscale_palette() -> Vec<[u8; 3]> {
    (0..=255u8).map(|i| [i, i, i]).collect()
}

/// Reduce a 24-bpp color page to 1-bpp monochrome by luminance thresholding.
///
/// Pixels at or above the cutoff become white (bit set); everything else
/// stays black. Column `c` lands in byte `c / 8` under mask `0x80 >> (c % 8)`,
/// and the trailing bits of each row's last byte stay zero. The destination
/// keeps the source's dimensions and declared resolution.
///
/// Only `Bgr24` exposes the bare R/G/B byte triples this walk reads; any
/// other layout fails with `UnsupportedFormat`.
pub fn to_mono1(src: &PixelBuffer) -> Result<PixelBuffer> {
    if src.layout() != PixelLayout::Bgr24 {
        return Err(MonowerkError::UnsupportedFormat(format!(
            "1bpp threshold conversion needs Bgr24 input, got {:?}",
            src.layout()
        )));
    }

    let (width, height) = (src.width(), src.height());
    let mut dest = PixelBuffer::new(width, height, PixelLayout::Mono1, src.resolution());

    for y in 0..height {
        let src_row = src.row(y);
        let dst_row = dest.row_mut(y);
        for x in 0..width as usize {
            let px = &src_row[x * 3..x * 3 + 3];
            // Bgr24: [B, G, R].
            if luminance::is_white(px[2], px[1], px[0]) {
                dst_row[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    debug!(width, height, "1bpp threshold conversion complete");
    Ok(dest)
}

/// Reduce a color page to 8-bpp indexed grayscale carrying the identity
/// gray ramp as its palette.
///
/// Three-byte pixels reduce by plain luminance; four-byte pixels fold the
/// alpha channel in as a 0..=1 weight, with channels read through the
/// canonical byte order of the concrete layout. An `Indexed8` source passes
/// through untouched except that its palette is replaced with the gray ramp
/// (the content bytes are taken to already be gray indices).
pub fn to_gray8(src: &PixelBuffer) -> Result<PixelBuffer> {
    let (width, height) = (src.width(), src.height());

    if src.layout() == PixelLayout::Indexed8 {
        let mut dest = src.clone();
        dest.set_palette(Some(grayscale_palette()));
        return Ok(dest);
    }

    let mut dest = PixelBuffer::new(width, height, PixelLayout::Indexed8, src.resolution());
    dest.set_palette(Some(grayscale_palette()));

    match src.layout() {
        PixelLayout::Bgr24 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 3..x * 3 + 3];
                    dst_row[x] = luminance::gray_level(px[2], px[1], px[0]);
                }
            }
        }
        PixelLayout::Bgra32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 4..x * 4 + 4];
                    dst_row[x] = luminance::gray_level_alpha(px[3], px[2], px[1], px[0]);
                }
            }
        }
        PixelLayout::Argb32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 4..x * 4 + 4];
                    dst_row[x] = luminance::gray_level_alpha(px[0], px[1], px[2], px[3]);
                }
            }
        }
        other => {
            return Err(MonowerkError::UnsupportedFormat(format!(
                "8bpp grayscale conversion does not accept {:?}",
                other
            )));
        }
    }

    debug!(width, height, "8bpp grayscale conversion complete");
    Ok(dest)
}

/// Flatten hue while keeping the full storage depth: every pixel's R, G and
/// B are replaced by the broadcast matrix gray, alpha (where present) is
/// copied unchanged, and the output layout equals the input layout.
///
/// This is the conversion for consumers that demand a standard color pixel
/// format but want a gray appearance; it does not reduce storage.
pub fn to_gray32(src: &PixelBuffer) -> Result<PixelBuffer> {
    let (width, height) = (src.width(), src.height());
    let mut dest = PixelBuffer::new(width, height, src.layout(), src.resolution());

    match src.layout() {
        PixelLayout::Bgr24 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 3..x * 3 + 3];
                    let gray = luminance::matrix_gray(px[2], px[1], px[0]);
                    dst_row[x * 3..x * 3 + 3].copy_from_slice(&[gray, gray, gray]);
                }
            }
        }
        PixelLayout::Bgra32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 4..x * 4 + 4];
                    let gray = luminance::matrix_gray(px[2], px[1], px[0]);
                    dst_row[x * 4..x * 4 + 4].copy_from_slice(&[gray, gray, gray, px[3]]);
                }
            }
        }
        PixelLayout::Argb32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 4..x * 4 + 4];
                    let gray = luminance::matrix_gray(px[1], px[2], px[3]);
                    dst_row[x * 4..x * 4 + 4].copy_from_slice(&[px[0], gray, gray, gray]);
                }
            }
        }
        other => {
            return Err(MonowerkError::UnsupportedFormat(format!(
                "full-depth grayscale conversion does not accept {:?}",
                other
            )));
        }
    }

    debug!(width, height, "full-depth grayscale conversion complete");
    Ok(dest)
}

/// Redraw any supported layout onto a fresh 24-bpp Bgr24 canvas.
///
/// The working format every file-level operation funnels through before
/// thresholding: Indexed8 expands through its palette (gray ramp when none
/// is attached), Mono1 expands to 0/255, and the 32-bit layouts drop alpha.
pub fn to_bgr24(src: &PixelBuffer) -> Result<PixelBuffer> {
    let (width, height) = (src.width(), src.height());
    let mut dest = PixelBuffer::new(width, height, PixelLayout::Bgr24, src.resolution());

    match src.layout() {
        PixelLayout::Bgr24 => {
            for y in 0..height {
                let row_bytes = width as usize * 3;
                let src_row = &src.row(y)[..row_bytes];
                dest.row_mut(y)[..row_bytes].copy_from_slice(src_row);
            }
        }
        PixelLayout::Bgra32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    dst_row[x * 3..x * 3 + 3].copy_from_slice(&src_row[x * 4..x * 4 + 3]);
                }
            }
        }
        PixelLayout::Argb32 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let px = &src_row[x * 4..x * 4 + 4];
                    dst_row[x * 3..x * 3 + 3].copy_from_slice(&[px[3], px[2], px[1]]);
                }
            }
        }
        PixelLayout::Indexed8 => {
            let ramp;
            let palette = match src.palette() {
                Some(p) => p,
                None => {
                    ramp = grayscale_palette();
                    ramp.as_slice()
                }
            };
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let [r, g, b] = palette[src_row[x] as usize];
                    dst_row[x * 3..x * 3 + 3].copy_from_slice(&[b, g, r]);
                }
            }
        }
        PixelLayout::Mono1 => {
            for y in 0..height {
                let src_row = src.row(y);
                let dst_row = dest.row_mut(y);
                for x in 0..width as usize {
                    let value = if src_row[x / 8] & (0x80 >> (x % 8)) != 0 {
                        255
                    } else {
                        0
                    };
                    dst_row[x * 3..x * 3 + 3].copy_from_slice(&[value, value, value]);
                }
            }
        }
    }

    Ok(dest)
}
