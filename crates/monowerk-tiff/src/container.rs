// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TIFF container writer — little-endian header plus a chain of per-frame
// IFDs, one strip per frame. Mono frames compress with CCITT Group 4
// through the `fax` encoder; palette and RGB frames are written
// uncompressed. The ecosystem encoders cannot produce 1-bit G4 pages, which
// is why the container lives here; the G4 bitstream itself is never
// hand-rolled.

use std::io::{Seek, SeekFrom, Write};

use fax::encoder::Encoder;
use fax::{BitWriter, Color, VecWriter};
use tracing::debug;

use monowerk_core::error::{MonowerkError, Result};
use monowerk_core::TiffCompression;
use monowerk_raster::buffer::{PixelBuffer, PixelLayout};
use monowerk_raster::convert;

// Field types from the TIFF 6.0 specification.
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

// Tags, ascending as they must appear in an IFD.
const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_RESOLUTION_UNIT: u16 = 296;
const TAG_COLOR_MAP: u16 = 320;

// Compression tag values.
const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_G4: u16 = 4;

// PhotometricInterpretation tag values.
const PHOTOMETRIC_MIN_IS_WHITE: u16 = 0;
const PHOTOMETRIC_MIN_IS_BLACK: u16 = 1;
const PHOTOMETRIC_RGB: u16 = 2;
const PHOTOMETRIC_PALETTE: u16 = 3;

const RESOLUTION_UNIT_INCH: u16 = 2;

/// One IFD entry before layout: tag, field type, logical count, and the
/// raw little-endian value bytes (inlined when they fit in four bytes,
/// placed out-of-line otherwise).
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    value: Vec<u8>,
}

impl IfdEntry {
    fn short(tag: u16, value: u16) -> Self {
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: 1,
            value: value.to_le_bytes().to_vec(),
        }
    }

    fn shorts(tag: u16, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: values.len() as u32,
            value: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            field_type: TYPE_LONG,
            count: 1,
            value: value.to_le_bytes().to_vec(),
        }
    }

    fn rational(tag: u16, dpi: f32) -> Self {
        // Integral resolutions store exactly; fractional ones keep three
        // decimal places.
        let (numerator, denominator) = if dpi.fract() == 0.0 {
            (dpi as u32, 1u32)
        } else {
            ((dpi * 1000.0) as u32, 1000u32)
        };
        let mut value = numerator.to_le_bytes().to_vec();
        value.extend_from_slice(&denominator.to_le_bytes());
        Self {
            tag,
            field_type: TYPE_RATIONAL,
            count: 1,
            value,
        }
    }
}

/// Multi-frame TIFF writer over any seekable byte sink.
///
/// Frames are appended one at a time; each append writes the frame's strip
/// and IFD and patches the previous IFD's next-directory link. `finish`
/// refuses an empty container.
pub struct TiffContainerWriter<W: Write + Seek> {
    writer: W,
    /// Position of the u32 that must be patched to point at the next IFD.
    link_pos: u64,
    frames: usize,
}

impl<W: Write + Seek> TiffContainerWriter<W> {
    /// Write the container header and return a writer ready for frames.
    pub fn new(mut writer: W) -> Result<Self> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(b"II")?; // little-endian
        writer.write_all(&42u16.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?; // first-IFD link, patched later
        Ok(Self {
            writer,
            link_pos: 4,
            frames: 0,
        })
    }

    /// Frames appended so far.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Append one page as the next frame.
    ///
    /// `Mono1` frames accept either compression; CCITT Group 4 is rejected
    /// for any other layout (bitonal-only scheme). 32-bit layouts must be
    /// reduced before they reach the container.
    pub fn append_frame(&mut self, page: &PixelBuffer, compression: TiffCompression) -> Result<()> {
        let frame = build_frame(page, compression)?;

        // Strip data, aligned to a word boundary.
        let strip_offset = self.align_to_word()?;
        self.writer.write_all(&frame.strip)?;

        let ifd_offset = self.align_to_word()?;
        let previous_link = self.link_pos;
        self.write_ifd(&frame, strip_offset as u32, ifd_offset)?;

        // Point the previous directory (or the header) at this IFD.
        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(previous_link))?;
        self.writer.write_all(&(ifd_offset as u32).to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(end))?;

        self.frames += 1;
        debug!(
            frame = self.frames,
            width = page.width(),
            height = page.height(),
            strip_bytes = frame.strip.len(),
            "frame appended"
        );
        Ok(())
    }

    /// Finalize the chain and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        if self.frames == 0 {
            return Err(MonowerkError::Encode(
                "multi-page container needs at least one frame".into(),
            ));
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn align_to_word(&mut self) -> Result<u64> {
        let pos = self.writer.seek(SeekFrom::End(0))?;
        if pos % 2 == 1 {
            self.writer.write_all(&[0])?;
            Ok(pos + 1)
        } else {
            Ok(pos)
        }
    }

    fn write_ifd(&mut self, frame: &FrameData, strip_offset: u32, ifd_offset: u64) -> Result<()> {
        let mut entries = vec![
            IfdEntry::long(TAG_IMAGE_WIDTH, frame.width),
            IfdEntry::long(TAG_IMAGE_LENGTH, frame.height),
            IfdEntry::shorts(TAG_BITS_PER_SAMPLE, &frame.bits_per_sample),
            IfdEntry::short(TAG_COMPRESSION, frame.compression),
            IfdEntry::short(TAG_PHOTOMETRIC, frame.photometric),
            IfdEntry::long(TAG_STRIP_OFFSETS, strip_offset),
            IfdEntry::short(TAG_SAMPLES_PER_PIXEL, frame.bits_per_sample.len() as u16),
            IfdEntry::long(TAG_ROWS_PER_STRIP, frame.height),
            IfdEntry::long(TAG_STRIP_BYTE_COUNTS, frame.strip.len() as u32),
            IfdEntry::rational(TAG_X_RESOLUTION, frame.h_res),
            IfdEntry::rational(TAG_Y_RESOLUTION, frame.v_res),
            IfdEntry::short(TAG_RESOLUTION_UNIT, RESOLUTION_UNIT_INCH),
        ];
        if let Some(map) = &frame.color_map {
            entries.push(IfdEntry::shorts(TAG_COLOR_MAP, map));
        }

        // Out-of-line values land after the entry table and next-IFD link.
        let mut overflow_offset =
            ifd_offset + 2 + entries.len() as u64 * 12 + 4;
        let mut overflow = Vec::new();

        let mut table = Vec::with_capacity(2 + entries.len() * 12 + 4);
        table.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for entry in &entries {
            table.extend_from_slice(&entry.tag.to_le_bytes());
            table.extend_from_slice(&entry.field_type.to_le_bytes());
            table.extend_from_slice(&entry.count.to_le_bytes());
            if entry.value.len() <= 4 {
                let mut inline = entry.value.clone();
                inline.resize(4, 0);
                table.extend_from_slice(&inline);
            } else {
                table.extend_from_slice(&(overflow_offset as u32).to_le_bytes());
                overflow_offset += entry.value.len() as u64;
                overflow.extend_from_slice(&entry.value);
            }
        }
        // Next-IFD link: terminates the chain until a later frame patches it.
        let link_pos = ifd_offset + 2 + entries.len() as u64 * 12;
        table.extend_from_slice(&0u32.to_le_bytes());
        table.extend_from_slice(&overflow);

        self.writer.write_all(&table)?;
        self.link_pos = link_pos;
        Ok(())
    }
}

struct FrameData {
    width: u32,
    height: u32,
    strip: Vec<u8>,
    compression: u16,
    photometric: u16,
    bits_per_sample: Vec<u16>,
    color_map: Option<Vec<u16>>,
    h_res: f32,
    v_res: f32,
}

/// Flatten a page into strip bytes plus the tag values describing them.
fn build_frame(page: &PixelBuffer, compression: TiffCompression) -> Result<FrameData> {
    let (width, height) = (page.width(), page.height());
    let resolution = page.resolution();

    let (strip, compression, photometric, bits_per_sample, color_map) = match page.layout() {
        PixelLayout::Mono1 => match compression {
            TiffCompression::Ccitt4 => (
                encode_g4(page)?,
                COMPRESSION_G4,
                // G4 colors are absolute; min-is-white is the fax convention.
                PHOTOMETRIC_MIN_IS_WHITE,
                vec![1],
                None,
            ),
            TiffCompression::None => (
                packed_mono_strip(page),
                COMPRESSION_NONE,
                // Raw bit 1 is white, so min (0) is black.
                PHOTOMETRIC_MIN_IS_BLACK,
                vec![1],
                None,
            ),
        },
        PixelLayout::Indexed8 => {
            if compression == TiffCompression::Ccitt4 {
                return Err(MonowerkError::Encode(
                    "CCITT Group 4 needs a bitonal frame, got Indexed8".into(),
                ));
            }
            (
                indexed_strip(page),
                COMPRESSION_NONE,
                PHOTOMETRIC_PALETTE,
                vec![8],
                Some(color_map_entries(page)),
            )
        }
        PixelLayout::Bgr24 => {
            if compression == TiffCompression::Ccitt4 {
                return Err(MonowerkError::Encode(
                    "CCITT Group 4 needs a bitonal frame, got Bgr24".into(),
                ));
            }
            (
                rgb_strip(page),
                COMPRESSION_NONE,
                PHOTOMETRIC_RGB,
                vec![8, 8, 8],
                None,
            )
        }
        other => {
            return Err(MonowerkError::UnsupportedFormat(format!(
                "{:?} frames are not written directly; reduce the depth first",
                other
            )));
        }
    };

    Ok(FrameData {
        width,
        height,
        strip,
        compression,
        photometric,
        bits_per_sample,
        color_map,
        h_res: resolution.horizontal,
        v_res: resolution.vertical,
    })
}

/// CCITT Group 4 strip for a Mono1 page.
fn encode_g4(page: &PixelBuffer) -> Result<Vec<u8>> {
    if page.width() > u16::MAX as u32 || page.height() > u16::MAX as u32 {
        return Err(MonowerkError::Encode(format!(
            "{}x{} exceeds the fax coder's line limits",
            page.width(),
            page.height()
        )));
    }

    let width = page.width();
    let mut encoder = Encoder::new(VecWriter::new());
    for y in 0..page.height() {
        let row = page.row(y);
        let line = (0..width as usize).map(|x| {
            if row[x / 8] & (0x80 >> (x % 8)) != 0 {
                Color::White
            } else {
                Color::Black
            }
        });
        encoder.encode_line(line, width as u16);
    }
    let writer = encoder.finish().expect("VecWriter writing is infallible");
    let data = writer.finish();
    Ok(data)
}

/// Tightly packed rows of a Mono1 page (stride padding stripped).
fn packed_mono_strip(page: &PixelBuffer) -> Vec<u8> {
    let row_bytes = PixelLayout::Mono1.min_row_bytes(page.width());
    let mut strip = Vec::with_capacity(row_bytes * page.height() as usize);
    for y in 0..page.height() {
        strip.extend_from_slice(&page.row(y)[..row_bytes]);
    }
    strip
}

/// Tightly packed rows of an Indexed8 page.
fn indexed_strip(page: &PixelBuffer) -> Vec<u8> {
    let row_bytes = page.width() as usize;
    let mut strip = Vec::with_capacity(row_bytes * page.height() as usize);
    for y in 0..page.height() {
        strip.extend_from_slice(&page.row(y)[..row_bytes]);
    }
    strip
}

/// Bgr24 rows re-ordered to the RGB sample order TIFF expects.
fn rgb_strip(page: &PixelBuffer) -> Vec<u8> {
    let width = page.width() as usize;
    let mut strip = Vec::with_capacity(width * page.height() as usize * 3);
    for y in 0..page.height() {
        let row = page.row(y);
        for x in 0..width {
            let px = &row[x * 3..x * 3 + 3];
            strip.extend_from_slice(&[px[2], px[1], px[0]]);
        }
    }
    strip
}

/// ColorMap tag payload: 256 red entries, then green, then blue, each
/// widened from 8 to 16 bits. Pages without an attached palette get the
/// identity gray ramp.
fn color_map_entries(page: &PixelBuffer) -> Vec<u16> {
    let ramp;
    let palette = match page.palette() {
        Some(p) => p,
        None => {
            ramp = convert::grayscale_palette();
            ramp.as_slice()
        }
    };
    let mut map = vec![0u16; 768];
    for (i, [r, g, b]) in palette.iter().enumerate().take(256) {
        map[i] = *r as u16 * 257;
        map[256 + i] = *g as u16 * 257;
        map[512 + i] = *b as u16 * 257;
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use monowerk_core::Resolution;
    use std::io::Cursor;

    fn mono_page(width: u32, height: u32, white: bool) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height, PixelLayout::Mono1, Resolution::uniform(300.0));
        if white {
            let row_bytes = PixelLayout::Mono1.min_row_bytes(width);
            for y in 0..height {
                buf.row_mut(y)[..row_bytes].fill(0xFF);
            }
        }
        buf
    }

    #[test]
    fn header_is_little_endian_tiff() {
        let mut writer = TiffContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        writer
            .append_frame(&mono_page(8, 2, true), TiffCompression::None)
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(&bytes[..4], b"II\x2A\x00");
        // The header link points past the header itself.
        let first_ifd = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert!(first_ifd >= 8);
    }

    #[test]
    fn empty_container_is_refused() {
        let writer = TiffContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(MonowerkError::Encode(_))
        ));
    }

    #[test]
    fn ccitt4_rejects_color_frames() {
        let mut writer = TiffContainerWriter::new(Cursor::new(Vec::new())).unwrap();
        let page = PixelBuffer::new(4, 4, PixelLayout::Bgr24, Resolution::SCREEN);
        assert!(matches!(
            writer.append_frame(&page, TiffCompression::Ccitt4),
            Err(MonowerkError::Encode(_))
        ));
    }

    #[test]
    fn uncompressed_mono_strip_is_tight() {
        // Width 12 -> 2 bytes per row regardless of the 4-byte stride.
        let page = mono_page(12, 3, true);
        let strip = packed_mono_strip(&page);
        assert_eq!(strip.len(), 6);
    }

    #[test]
    fn gray_color_map_is_identity_ramp_widened() {
        let page = PixelBuffer::new(2, 2, PixelLayout::Indexed8, Resolution::SCREEN);
        let map = color_map_entries(&page);
        assert_eq!(map.len(), 768);
        assert_eq!(map[0], 0);
        assert_eq!(map[255], 65535);
        assert_eq!(map[256 + 128], 128 * 257);
    }

    #[test]
    fn g4_round_trips_through_the_fax_decoder() {
        // Checkerboard-ish page: left half white, right half black.
        let (width, height) = (16u32, 4u32);
        let mut page = mono_page(width, height, false);
        for y in 0..height {
            page.row_mut(y)[0] = 0xFF;
        }

        let strip = encode_g4(&page).unwrap();
        let mut rows: Vec<Vec<bool>> = Vec::new();
        fax::decoder::decode_g4(
            strip.iter().copied(),
            width as u16,
            Some(height as u16),
            |transitions| {
                let mut row = vec![false; width as usize];
                let mut is_black = false;
                let mut pos = 0usize;
                for &t in transitions {
                    let end = (t as usize).min(width as usize);
                    if !is_black {
                        for cell in &mut row[pos..end] {
                            *cell = true;
                        }
                    }
                    pos = end;
                    is_black = !is_black;
                    if pos >= width as usize {
                        break;
                    }
                }
                if !is_black {
                    for cell in &mut row[pos..] {
                        *cell = true;
                    }
                }
                rows.push(row);
            },
        )
        .expect("fax decoder accepts its own encoder's output");

        assert_eq!(rows.len(), height as usize);
        for row in &rows {
            for (x, &white) in row.iter().enumerate() {
                assert_eq!(white, x < 8, "column {x}");
            }
        }
    }
}
