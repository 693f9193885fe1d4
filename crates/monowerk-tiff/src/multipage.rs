// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-page assembly — stitching a sequence of single-page images into one
// multi-page TIFF, in input order, with page-count enforcement.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use monowerk_core::TiffCompression;
use monowerk_core::error::{MonowerkError, Result};
use monowerk_raster::buffer::{PixelBuffer, PixelLayout};
use monowerk_raster::convert;

use crate::codec::{EncodeParams, PageCodec};

/// One assembly invocation: ordered inputs, a destination, an optional page
/// budget, and the mono/compressed flag. Constructed per call, consumed
/// once, never persisted.
#[derive(Debug, Clone)]
pub struct MultiPageJob {
    /// Single-page source files, in output order.
    pub inputs: Vec<PathBuf>,
    /// Destination multi-page file.
    pub output: PathBuf,
    /// Stop after this many pages; extra inputs are dropped silently.
    pub expected_pages: Option<usize>,
    /// Reduce every page to 1 bpp and compress frames with CCITT Group 4.
    pub mono_compressed: bool,
}

/// Sequences single-page images into one multi-page container through an
/// explicitly supplied codec.
pub struct MultiPageAssembler<'a> {
    codec: &'a dyn PageCodec,
}

impl<'a> MultiPageAssembler<'a> {
    pub fn new(codec: &'a dyn PageCodec) -> Self {
        Self { codec }
    }

    /// Run one job and return the number of pages written.
    ///
    /// The first input is always written; subsequent inputs are appended
    /// while the page budget allows. An `expected_pages` smaller than the
    /// input count is a policy cut-off, not an error.
    #[instrument(skip(self, job), fields(
        inputs = job.inputs.len(),
        output = %job.output.display(),
        mono = job.mono_compressed,
    ))]
    pub fn assemble(&self, job: &MultiPageJob) -> Result<usize> {
        if job.inputs.is_empty() {
            return Err(MonowerkError::Assembly(
                "multi-page job has no input pages".into(),
            ));
        }

        let compression = if job.mono_compressed {
            TiffCompression::Ccitt4
        } else {
            TiffCompression::None
        };
        let params = EncodeParams::tiff(compression);

        let mut sink = self.codec.open_sink(&job.output, &params)?;
        let mut written = 0usize;
        for (index, path) in job.inputs.iter().enumerate() {
            if index > 0 {
                if let Some(budget) = job.expected_pages {
                    if index >= budget {
                        warn!(
                            dropped = job.inputs.len() - index,
                            budget, "page budget reached, dropping remaining inputs"
                        );
                        break;
                    }
                }
            }

            let page = self.codec.decode(path)?;
            let page = if job.mono_compressed {
                ensure_mono(page)?
            } else {
                page
            };
            sink.append_frame(&page, &params)?;
            written += 1;
        }

        let frames = sink.finish()?;
        info!(frames, "multi-page assembly complete");
        debug_assert_eq!(frames, written);
        Ok(written)
    }
}

/// Reduce any decoded page to Mono1 for G4 frames.
fn ensure_mono(page: PixelBuffer) -> Result<PixelBuffer> {
    match page.layout() {
        PixelLayout::Mono1 => Ok(page),
        PixelLayout::Bgr24 => convert::to_mono1(&page),
        _ => {
            let bgr = convert::to_bgr24(&page)?;
            convert::to_mono1(&bgr)
        }
    }
}
