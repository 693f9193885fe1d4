// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File-level conversion pipeline — the operations callers actually invoke:
// mono-TIFF conversion, canonical-page standardization, standard-page
// probing, page counting, and JPEG export. Works on scoped temp copies so a
// caller's original file is never held open during processing.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use monowerk_core::error::Result;
use monowerk_core::{PipelineConfig, TiffCompression};
use monowerk_raster::buffer::PixelBuffer;
use monowerk_raster::{classify, compose, convert};

use crate::codec::{EncodeParams, PageCodec};

/// The conversion pipeline over an explicitly supplied codec.
pub struct Pipeline<'a> {
    codec: &'a dyn PageCodec,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(codec: &'a dyn PageCodec, config: PipelineConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // -- Mono conversion ------------------------------------------------------

    /// Convert any raster file into a 1-bpp CCITT Group 4 TIFF.
    ///
    /// The source is decoded, redrawn onto a 24-bpp working canvas at native
    /// size (resolution preserved), thresholded to mono, and saved.
    #[instrument(skip_all, fields(src = %src.as_ref().display(), dst = %dst.as_ref().display()))]
    pub fn convert_to_mono_tiff(
        &self,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
    ) -> Result<()> {
        let page = self.codec.decode(src.as_ref())?;
        let canvas = convert::to_bgr24(&page)?;
        let mono = convert::to_mono1(&canvas)?;
        self.codec.encode(
            &mono,
            dst.as_ref(),
            &EncodeParams::tiff(TiffCompression::Ccitt4),
        )?;
        info!(
            width = mono.width(),
            height = mono.height(),
            "mono TIFF written"
        );
        Ok(())
    }

    /// In-place variant: the source is fully decoded before the destination
    /// is touched, so a failure part-way leaves the prior file intact.
    pub fn convert_to_mono_tiff_in_place(&self, path: impl AsRef<Path>) -> Result<()> {
        self.convert_to_mono_tiff(path.as_ref(), path.as_ref())
    }

    // -- Canonical-page standardization ---------------------------------------

    /// Redraw a page onto the canonical white 2550 x 3300 canvas and save it
    /// as a 1-bpp CCITT Group 4 TIFF.
    ///
    /// Operates on a scoped temp copy of the source, removed on every exit
    /// path.
    #[instrument(skip_all, fields(src = %src.as_ref().display(), dst = %dst.as_ref().display()))]
    pub fn standardize_page(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
        let working = self.scoped_copy(src.as_ref())?;
        let page = self.codec.decode(working.path())?;
        let canvas = compose::compose_page(&convert::to_bgr24(&page)?)?;
        let mono = convert::to_mono1(&canvas)?;
        self.codec.encode(
            &mono,
            dst.as_ref(),
            &EncodeParams::tiff(TiffCompression::Ccitt4),
        )?;
        info!("page standardized to canonical canvas");
        Ok(())
    }

    /// Standardize only when needed: pages already at the canonical size are
    /// mono-converted without re-composition (when the configuration says
    /// to skip them).
    #[instrument(skip_all, fields(src = %src.as_ref().display(), dst = %dst.as_ref().display()))]
    pub fn process_page(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
        if self.config.skip_standard_pages && self.is_standard_page_file(src.as_ref())? {
            debug!("page already canonical, skipping composition");
            self.convert_to_mono_tiff(src, dst)
        } else {
            self.standardize_page(src, dst)
        }
    }

    // -- Probes ---------------------------------------------------------------

    /// Whether the file already renders at exactly the canonical page size.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn is_standard_page_file(&self, path: impl AsRef<Path>) -> Result<bool> {
        let working = self.scoped_copy(path.as_ref())?;
        let meta = self.codec.probe(working.path())?;
        Ok(classify::is_standard_page(&meta))
    }

    /// Number of frames in a (possibly multi-page) container.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn page_count(&self, path: impl AsRef<Path>) -> Result<usize> {
        let working = self.scoped_copy(path.as_ref())?;
        let meta = self.codec.probe(working.path())?;
        Ok(meta.frame_count)
    }

    // -- JPEG export ----------------------------------------------------------

    /// Save a page as JPEG at the configured quality.
    pub fn save_jpeg(&self, page: &PixelBuffer, path: impl AsRef<Path>) -> Result<()> {
        self.codec.encode(
            page,
            path.as_ref(),
            &EncodeParams::jpeg(self.config.jpeg_quality),
        )
    }

    // -- Internals ------------------------------------------------------------

    /// Copy a caller's file into a scoped working file so the original is
    /// never held open. The copy disappears on drop — success or failure —
    /// and cleanup problems are swallowed rather than masking the real error.
    fn scoped_copy(&self, path: &Path) -> Result<NamedTempFile> {
        let working = match &self.config.temp_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        std::fs::copy(path, working.path())?;
        debug!(original = %path.display(), "scoped working copy created");
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TiffCodec;
    use monowerk_core::Resolution;
    use monowerk_raster::buffer::PixelLayout;

    fn pipeline(codec: &TiffCodec) -> Pipeline<'_> {
        Pipeline::new(codec, PipelineConfig::default())
    }

    fn solid_bgr24(width: u32, height: u32, value: u8) -> PixelBuffer {
        let mut buf =
            PixelBuffer::new(width, height, PixelLayout::Bgr24, Resolution::uniform(300.0));
        for y in 0..height {
            let row_bytes = width as usize * 3;
            buf.row_mut(y)[..row_bytes].fill(value);
        }
        buf
    }

    #[test]
    fn mono_conversion_produces_an_all_white_bilevel_page() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.tif");
        let dst = dir.path().join("dst.tif");

        let codec = TiffCodec::new();
        codec
            .encode(
                &solid_bgr24(30, 20, 0xC8), // (200,200,200): luminance ~197.8
                &src,
                &EncodeParams::tiff(TiffCompression::None),
            )
            .unwrap();

        pipeline(&codec).convert_to_mono_tiff(&src, &dst).unwrap();

        let mono = codec.decode(&dst).unwrap();
        assert_eq!(mono.layout(), PixelLayout::Mono1);
        assert_eq!((mono.width(), mono.height()), (30, 20));
        for y in 0..20 {
            for x in 0..30 {
                assert!(mono.mono_bit(x, y));
            }
        }
    }

    #[test]
    fn in_place_conversion_replaces_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tif");

        let codec = TiffCodec::new();
        codec
            .encode(
                &solid_bgr24(12, 6, 0x00),
                &path,
                &EncodeParams::tiff(TiffCompression::None),
            )
            .unwrap();

        pipeline(&codec).convert_to_mono_tiff_in_place(&path).unwrap();

        let mono = codec.decode(&path).unwrap();
        assert_eq!(mono.layout(), PixelLayout::Mono1);
        assert!(!mono.mono_bit(0, 0)); // black source stays black
    }

    #[test]
    fn standardized_page_is_canonical_and_standard() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.tif");
        let dst = dir.path().join("standard.tif");

        let codec = TiffCodec::new();
        codec
            .encode(
                &solid_bgr24(100, 80, 0xFF),
                &src,
                &EncodeParams::tiff(TiffCompression::None),
            )
            .unwrap();

        let pipe = pipeline(&codec);
        pipe.standardize_page(&src, &dst).unwrap();

        let meta = codec.probe(&dst).unwrap();
        assert_eq!((meta.width, meta.height), (2550, 3300));
        assert_eq!(meta.resolution, Resolution::uniform(300.0));
        assert!(pipe.is_standard_page_file(&dst).unwrap());
        assert!(!pipe.is_standard_page_file(&src).unwrap());
    }

    #[test]
    fn page_count_reports_assembled_frames() {
        let dir = tempfile::tempdir().unwrap();
        let codec = TiffCodec::new();

        let mut inputs = Vec::new();
        for i in 0..4 {
            let path = dir.path().join(format!("p{i}.tif"));
            codec
                .encode(
                    &solid_bgr24(8, 8, 0xFF),
                    &path,
                    &EncodeParams::tiff(TiffCompression::None),
                )
                .unwrap();
            inputs.push(path);
        }

        let output = dir.path().join("book.tif");
        crate::multipage::MultiPageAssembler::new(&codec)
            .assemble(&crate::multipage::MultiPageJob {
                inputs,
                output: output.clone(),
                expected_pages: None,
                mono_compressed: true,
            })
            .unwrap();

        assert_eq!(pipeline(&codec).page_count(&output).unwrap(), 4);
    }

    #[test]
    fn process_page_skips_composition_for_canonical_sources() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("canonical.tif");
        let dst = dir.path().join("out.tif");

        let codec = TiffCodec::new();
        codec
            .encode(
                &solid_bgr24(2550, 3300, 0xFF),
                &src,
                &EncodeParams::tiff(TiffCompression::None),
            )
            .unwrap();

        let pipe = pipeline(&codec);
        pipe.process_page(&src, &dst).unwrap();

        // Either way the output is canonical; the skip path preserved the
        // source dimensions rather than re-composing.
        let meta = codec.probe(&dst).unwrap();
        assert_eq!((meta.width, meta.height), (2550, 3300));
    }

    #[test]
    fn missing_source_surfaces_an_error_and_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("out.tif");

        let codec = TiffCodec::new();
        let result = pipeline(&codec).convert_to_mono_tiff(dir.path().join("absent.tif"), &dst);
        assert!(result.is_err());
        assert!(!dst.exists());
    }
}
