// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard-page classification — decides from header metadata alone whether
// a page already matches the canonical geometry and can skip re-processing.

use monowerk_core::{PageMetadata, PageSpec};

/// Whether the page already renders at exactly the canonical 2550 x 3300.
///
/// Pages with differing horizontal and vertical resolution are normalized to
/// the canonical dpi first (`pixels / dpi * 300`); pages with equal
/// resolutions are compared by raw pixel dimensions. The comparison is exact
/// float equality — inherited policy; a page off by any fraction of a pixel
/// is reprocessed.
pub fn is_standard_page(meta: &PageMetadata) -> bool {
    let spec = PageSpec::LETTER_300DPI;

    let (display_width, display_height) = if meta.resolution.is_square() {
        (meta.width as f32, meta.height as f32)
    } else {
        (
            meta.width as f32 / meta.resolution.horizontal * spec.dpi as f32,
            meta.height as f32 / meta.resolution.vertical * spec.dpi as f32,
        )
    };

    display_width == spec.width as f32 && display_height == spec.height as f32
}
