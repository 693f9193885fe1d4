// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Luminance reduction — the scalar formulas every depth conversion shares.
// All conversions truncate toward zero when narrowing to a byte, matching
// the original engine's float-to-int casts.

/// ITU-R BT.601 red weight.
pub const WEIGHT_RED: f32 = 0.299;
/// ITU-R BT.601 green weight.
pub const WEIGHT_GREEN: f32 = 0.587;
/// ITU-R BT.601 blue weight.
pub const WEIGHT_BLUE: f32 = 0.114;

/// Black/white cutoff for 1-bpp thresholding. Fixed policy.
pub const LUMINANCE_CUTOFF: f32 = 125.0;

/// Weighted brightness of an R/G/B triple, in 0.0..=255.0.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    r as f32 * WEIGHT_RED + g as f32 * WEIGHT_GREEN + b as f32 * WEIGHT_BLUE
}

/// Threshold decision for 1-bpp output: `true` maps to a white bit.
pub fn is_white(r: u8, g: u8, b: u8) -> bool {
    luminance(r, g, b) >= LUMINANCE_CUTOFF
}

/// 8-bit gray level of an opaque pixel.
pub fn gray_level(r: u8, g: u8, b: u8) -> u8 {
    luminance(r, g, b) as u8
}

/// 8-bit gray level with the alpha channel folded in as a 0..=1 weight.
pub fn gray_level_alpha(a: u8, r: u8, g: u8, b: u8) -> u8 {
    ((a as f32 / 255.0) * luminance(r, g, b)) as u8
}

/// Broadcast gray level for the full-depth matrix conversion. Uses the
/// coarser 0.30/0.59/0.11 weights of the original's color matrix, not the
/// BT.601 triple above.
pub fn matrix_gray(r: u8, g: u8, b: u8) -> u8 {
    (r as f32 * 0.30 + g as f32 * 0.59 + b as f32 * 0.11) as u8
}
