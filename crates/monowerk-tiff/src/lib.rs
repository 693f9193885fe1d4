// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// monowerk-tiff — The codec seam and file-level operations of the Monowerk
// engine: decoding arbitrary raster files into pixel buffers, writing
// single- and multi-page TIFF containers (CCITT Group 4 for mono frames),
// assembling page sequences, and the conversion pipeline built on top.

pub mod codec;
pub mod container;
pub mod decode;
pub mod multipage;
pub mod pipeline;

// Re-export the primary types so callers can use `monowerk_tiff::TiffCodec` etc.
pub use codec::{EncodeParams, FrameSink, OutputFormat, PageCodec, TiffCodec};
pub use multipage::{MultiPageAssembler, MultiPageJob};
pub use pipeline::Pipeline;
