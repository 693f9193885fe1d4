// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// monowerk-raster — Pixel-level processing for the Monowerk engine.
//
// Provides the stride-aware pixel buffer, luminance reduction, bit-depth
// conversion (1 bpp threshold, 8 bpp palette, full-depth matrix grayscale),
// canonical page composition, and standard-page classification.

pub mod buffer;
pub mod classify;
pub mod compose;
pub mod convert;
pub mod luminance;

// Re-export the primary types so callers can use `monowerk_raster::PixelBuffer` etc.
pub use buffer::{PixelBuffer, PixelLayout};
pub use classify::is_standard_page;
pub use compose::compose_page;
