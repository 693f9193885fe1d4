// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec seam — the contracts the conversion components depend on, and the
// TIFF-backed implementation. The codec is always handed in explicitly (never
// process-wide state), so tests can substitute a stub.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use monowerk_core::error::{MonowerkError, Result};
use monowerk_core::{PageMetadata, TiffCompression};
use monowerk_raster::buffer::{PixelBuffer, PixelLayout};
use monowerk_raster::convert;

use crate::container::TiffContainerWriter;
use crate::decode;

/// Output container format for a save operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tiff,
    Jpeg,
}

/// Parameters for a save operation.
#[derive(Debug, Clone, Copy)]
pub struct EncodeParams {
    pub format: OutputFormat,
    /// TIFF frame compression; ignored for JPEG output.
    pub compression: TiffCompression,
    /// JPEG quality 1-100; ignored for TIFF output.
    pub jpeg_quality: u8,
}

impl EncodeParams {
    /// TIFF output with the given frame compression.
    pub fn tiff(compression: TiffCompression) -> Self {
        Self {
            format: OutputFormat::Tiff,
            compression,
            jpeg_quality: 90,
        }
    }

    /// JPEG output at the given quality.
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: OutputFormat::Jpeg,
            compression: TiffCompression::None,
            jpeg_quality: quality,
        }
    }
}

/// An open multi-frame container being written.
///
/// Frames accumulate in a working file; nothing appears at the destination
/// until `finish` succeeds, so an abandoned sink never leaves a partial
/// output behind.
pub trait FrameSink {
    /// Append one page as the next frame.
    fn append_frame(&mut self, page: &PixelBuffer, params: &EncodeParams) -> Result<()>;

    /// Finalize the container and move it to its destination.
    /// Returns the number of frames written.
    fn finish(self: Box<Self>) -> Result<usize>;
}

/// The codec contract the conversion components depend on.
pub trait PageCodec {
    /// Header-level facts (dimensions, resolution, frame count) without
    /// decoding pixel data.
    fn probe(&self, path: &Path) -> Result<PageMetadata>;

    /// Decode the first frame into a pixel buffer. Bilevel sources come out
    /// as `Mono1`, 8-bit gray as `Indexed8`; everything else lands in
    /// `Bgr24`.
    fn decode(&self, path: &Path) -> Result<PixelBuffer>;

    /// Persist a single page. The destination only ever holds a complete
    /// file: a failed save leaves no destination, or the prior one intact.
    fn encode(&self, page: &PixelBuffer, path: &Path, params: &EncodeParams) -> Result<()>;

    /// Open a multi-frame sink for page-by-page assembly.
    fn open_sink(&self, path: &Path, params: &EncodeParams) -> Result<Box<dyn FrameSink>>;
}

/// The production codec: `image` for general raster decoding, `tiff` for
/// tag and frame reading, `fax` for the CCITT Group 4 bitstream, and this
/// crate's own container writer for output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffCodec;

impl TiffCodec {
    pub fn new() -> Self {
        Self
    }
}

impl PageCodec for TiffCodec {
    fn probe(&self, path: &Path) -> Result<PageMetadata> {
        decode::probe_path(path)
    }

    fn decode(&self, path: &Path) -> Result<PixelBuffer> {
        decode::decode_path(path)
    }

    #[instrument(skip(self, page), fields(path = %path.display(), format = ?params.format))]
    fn encode(&self, page: &PixelBuffer, path: &Path, params: &EncodeParams) -> Result<()> {
        match params.format {
            OutputFormat::Tiff => {
                let mut sink = self.open_sink(path, params)?;
                sink.append_frame(page, params)?;
                sink.finish()?;
                Ok(())
            }
            OutputFormat::Jpeg => encode_jpeg(page, path, params.jpeg_quality),
        }
    }

    fn open_sink(&self, path: &Path, _params: &EncodeParams) -> Result<Box<dyn FrameSink>> {
        let (file, temp_path) = working_file(path)?;
        Ok(Box::new(TiffFrameSink {
            writer: TiffContainerWriter::new(file)?,
            temp_path,
            dest: path.to_path_buf(),
        }))
    }
}

/// A temp file in the destination's directory, so the final rename never
/// crosses filesystems.
fn working_file(dest: &Path) -> Result<(File, tempfile::TempPath)> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (file, temp_path) = tempfile::NamedTempFile::new_in(parent)?.into_parts();
    Ok((file, temp_path))
}

struct TiffFrameSink {
    writer: TiffContainerWriter<File>,
    temp_path: tempfile::TempPath,
    dest: PathBuf,
}

impl FrameSink for TiffFrameSink {
    fn append_frame(&mut self, page: &PixelBuffer, params: &EncodeParams) -> Result<()> {
        self.writer.append_frame(page, params.compression)
    }

    fn finish(self: Box<Self>) -> Result<usize> {
        let TiffFrameSink {
            writer,
            temp_path,
            dest,
        } = *self;
        let frames = writer.frame_count();
        let file = writer.finish()?;
        drop(file);
        temp_path
            .persist(&dest)
            .map_err(|err| MonowerkError::Io(err.error))?;
        debug!(frames, dest = %dest.display(), "container finalized");
        Ok(frames)
    }
}

/// JPEG save with explicit quality, via the `image` crate's encoder.
fn encode_jpeg(page: &PixelBuffer, path: &Path, quality: u8) -> Result<()> {
    let bgr = if page.layout() == PixelLayout::Bgr24 {
        None
    } else {
        Some(convert::to_bgr24(page)?)
    };
    let source = bgr.as_ref().unwrap_or(page);

    let (width, height) = (source.width(), source.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        let row = source.row(y);
        for x in 0..width as usize {
            let px = &row[x * 3..x * 3 + 3];
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
    }
    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| MonowerkError::Encode("JPEG staging buffer mismatch".into()))?;

    let mut encoded = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, quality);
    img.write_with_encoder(encoder)
        .map_err(|err| MonowerkError::Encode(format!("JPEG encoding failed: {}", err)))?;

    let (mut file, temp_path) = working_file(path)?;
    use std::io::Write;
    file.write_all(&encoded)?;
    drop(file);
    temp_path
        .persist(path)
        .map_err(|err| MonowerkError::Io(err.error))?;
    Ok(())
}
