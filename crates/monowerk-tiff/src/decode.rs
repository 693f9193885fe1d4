// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoding — header probes and first-frame decodes. TIFFs go through the
// `tiff` crate for tags and strips (with `fax` inflating CCITT Group 4
// frames the ecosystem decoder cannot read); every other raster format goes
// through `image` and lands in Bgr24.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use monowerk_core::error::{MonowerkError, Result};
use monowerk_core::{PageMetadata, Resolution};
use monowerk_raster::buffer::{PixelBuffer, PixelLayout};
use monowerk_raster::convert;

/// TIFF magic: little-endian "II*\0" or big-endian "MM\0*".
fn is_tiff(bytes: &[u8]) -> bool {
    bytes.starts_with(b"II\x2A\x00") || bytes.starts_with(b"MM\x00\x2A")
}

fn decode_err(err: impl std::fmt::Display, path: &Path) -> MonowerkError {
    MonowerkError::Decode(format!("{}: {}", path.display(), err))
}

/// Header-level facts without decoding pixel data.
#[instrument(fields(path = %path.display()))]
pub(crate) fn probe_path(path: &Path) -> Result<PageMetadata> {
    let bytes = std::fs::read(path)?;
    if is_tiff(&bytes) {
        let mut decoder =
            Decoder::new(Cursor::new(bytes.as_slice())).map_err(|e| decode_err(e, path))?;
        let (width, height) = decoder.dimensions().map_err(|e| decode_err(e, path))?;
        let resolution = read_resolution(&mut decoder);

        let mut frame_count = 1;
        while decoder.more_images() {
            decoder.next_image().map_err(|e| decode_err(e, path))?;
            frame_count += 1;
        }

        debug!(width, height, frame_count, "TIFF probed");
        Ok(PageMetadata {
            width,
            height,
            resolution,
            frame_count,
        })
    } else {
        let reader = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| decode_err(e, path))?;
        let (width, height) = reader.into_dimensions().map_err(|e| decode_err(e, path))?;
        Ok(PageMetadata {
            width,
            height,
            resolution: Resolution::SCREEN,
            frame_count: 1,
        })
    }
}

/// Decode the first frame of a raster file.
///
/// Bilevel TIFFs come out as `Mono1` (bit 1 = white), 8-bit gray as
/// `Indexed8` with the gray ramp, palette TIFFs as `Indexed8` with their own
/// color table; everything else is redrawn into `Bgr24`.
#[instrument(fields(path = %path.display()))]
pub(crate) fn decode_path(path: &Path) -> Result<PixelBuffer> {
    let bytes = std::fs::read(path)?;
    if is_tiff(&bytes) {
        decode_tiff(&bytes, path)
    } else {
        let img = image::load_from_memory(&bytes).map_err(|e| decode_err(e, path))?;
        Ok(rgb8_to_bgr24(&img.to_rgb8(), Resolution::SCREEN))
    }
}

fn decode_tiff(bytes: &[u8], path: &Path) -> Result<PixelBuffer> {
    let mut decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| decode_err(e, path))?;
    let (width, height) = decoder.dimensions().map_err(|e| decode_err(e, path))?;
    if width == 0 || height == 0 {
        return Err(decode_err("image has a zero dimension", path));
    }
    let resolution = read_resolution(&mut decoder);

    // Bilevel and palette frames are dispatched on the raw tags: the
    // ecosystem decoder does not inflate 1-bit strips, and palette indices
    // must be kept rather than expanded.
    let bits = decoder
        .get_tag_u32_vec(Tag::BitsPerSample)
        .unwrap_or_else(|_| vec![1]);
    let photometric = decoder
        .get_tag_u32(Tag::PhotometricInterpretation)
        .unwrap_or(1);

    if bits == [1] {
        return decode_bilevel(&mut decoder, bytes, width, height, resolution, path);
    }
    if photometric == 3 && bits == [8] {
        let compression = decoder.get_tag_u32(Tag::Compression).unwrap_or(1);
        let data = if compression == 1 {
            read_raw_strips(&mut decoder, bytes, width as usize, height, path)?
        } else {
            read_u8_frame(&mut decoder, path)?
        };
        let palette = read_color_map(&mut decoder);
        let mut buf = PixelBuffer::new(width, height, PixelLayout::Indexed8, resolution);
        buf.set_palette(palette);
        copy_tight_rows(&mut buf, &data, width as usize);
        return Ok(buf);
    }

    let color_type = decoder.colortype().map_err(|e| decode_err(e, path))?;
    match color_type {
        ColorType::Gray(8) => {
            let data = read_u8_frame(&mut decoder, path)?;
            let mut buf = PixelBuffer::new(width, height, PixelLayout::Indexed8, resolution);
            buf.set_palette(Some(convert::grayscale_palette()));
            copy_tight_rows(&mut buf, &data, width as usize);
            Ok(buf)
        }
        ColorType::RGB(8) => {
            let data = read_u8_frame(&mut decoder, path)?;
            let mut buf = PixelBuffer::new(width, height, PixelLayout::Bgr24, resolution);
            for y in 0..height {
                let src = &data[y as usize * width as usize * 3..];
                let row = buf.row_mut(y);
                for x in 0..width as usize {
                    let px = &src[x * 3..x * 3 + 3];
                    row[x * 3..x * 3 + 3].copy_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            Ok(buf)
        }
        ColorType::RGBA(8) => {
            let data = read_u8_frame(&mut decoder, path)?;
            let mut buf = PixelBuffer::new(width, height, PixelLayout::Bgr24, resolution);
            for y in 0..height {
                let src = &data[y as usize * width as usize * 4..];
                let row = buf.row_mut(y);
                for x in 0..width as usize {
                    let px = &src[x * 4..x * 4 + 4];
                    row[x * 3..x * 3 + 3].copy_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            Ok(buf)
        }
        other => {
            // Depths outside the supported set (16-bit, CMYK, ...): let the
            // general decoder flatten them if it can.
            debug!(?other, "unsupported native TIFF color type, re-decoding");
            let img = image::load_from_memory(bytes).map_err(|e| decode_err(e, path))?;
            Ok(rgb8_to_bgr24(&img.to_rgb8(), resolution))
        }
    }
}

/// Bilevel frames: strips are pulled straight from the file, because the
/// ecosystem decoder does not inflate 1-bit data. Uncompressed strips copy
/// over (re-orienting to bit 1 = white); CCITT Group 4 strips inflate
/// through `fax`.
fn decode_bilevel<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    bytes: &[u8],
    width: u32,
    height: u32,
    resolution: Resolution,
    path: &Path,
) -> Result<PixelBuffer> {
    let compression = decoder
        .get_tag_u32(Tag::Compression)
        .unwrap_or(1);
    let photometric = decoder
        .get_tag_u32(Tag::PhotometricInterpretation)
        .unwrap_or(0);
    let offsets = decoder
        .get_tag_u32_vec(Tag::StripOffsets)
        .map_err(|e| decode_err(e, path))?;
    let counts = decoder
        .get_tag_u32_vec(Tag::StripByteCounts)
        .map_err(|e| decode_err(e, path))?;
    let rows_per_strip = decoder
        .get_tag_u32(Tag::RowsPerStrip)
        .unwrap_or(height);

    if offsets.len() != counts.len() {
        return Err(decode_err("strip offsets and byte counts disagree", path));
    }

    let mut buf = PixelBuffer::new(width, height, PixelLayout::Mono1, resolution);
    let row_bytes = PixelLayout::Mono1.min_row_bytes(width);

    match compression {
        1 => {
            // Raw packed bits. Photometric 0 stores white as 0, so flip to
            // our bit-1-is-white convention when needed.
            let mut y = 0u32;
            for (&offset, &count) in offsets.iter().zip(&counts) {
                let strip = bytes
                    .get(offset as usize..(offset + count) as usize)
                    .ok_or_else(|| decode_err("strip data out of bounds", path))?;
                for chunk in strip.chunks(row_bytes) {
                    if y >= height {
                        break;
                    }
                    let row = buf.row_mut(y);
                    if photometric == 0 {
                        for (dst, &src) in row.iter_mut().zip(chunk) {
                            *dst = !src;
                        }
                        mask_row_tail(row, width, row_bytes);
                    } else {
                        row[..chunk.len()].copy_from_slice(chunk);
                    }
                    y += 1;
                }
            }
        }
        4 => {
            if width > u16::MAX as u32 {
                return Err(decode_err(
                    "bilevel page exceeds the fax coder's line limit",
                    path,
                ));
            }
            let mut y = 0u32;
            for (&offset, &count) in offsets.iter().zip(&counts) {
                let strip = bytes
                    .get(offset as usize..(offset + count) as usize)
                    .ok_or_else(|| decode_err("strip data out of bounds", path))?;
                let strip_rows = rows_per_strip.min(height - y);
                let mut local = Vec::with_capacity(strip_rows as usize);
                fax::decoder::decode_g4(
                    strip.iter().copied(),
                    width as u16,
                    Some(strip_rows as u16),
                    |transitions| {
                        local.push(transitions_to_packed_row(transitions, width));
                    },
                )
                .ok_or_else(|| decode_err("CCITT Group 4 strip is malformed", path))?;
                for packed in local {
                    if y >= height {
                        break;
                    }
                    buf.row_mut(y)[..row_bytes].copy_from_slice(&packed[..row_bytes]);
                    y += 1;
                }
            }
        }
        other => {
            return Err(decode_err(
                format!("bilevel compression scheme {} is not supported", other),
                path,
            ));
        }
    }

    Ok(buf)
}

/// Convert fax color-change positions into a packed row with bit 1 = white.
/// Transition positions alternate starting from an initial white run.
fn transitions_to_packed_row(transitions: &[u16], width: u32) -> Vec<u8> {
    let row_bytes = PixelLayout::Mono1.min_row_bytes(width);
    let mut row = vec![0u8; row_bytes];
    let mut is_black = false;
    let mut pos = 0u32;

    let mut set_white_run = |row: &mut [u8], start: u32, end: u32| {
        for c in start..end {
            row[c as usize / 8] |= 0x80 >> (c % 8);
        }
    };

    for &t in transitions {
        let end = (t as u32).min(width);
        if !is_black {
            set_white_run(&mut row, pos, end);
        }
        pos = end;
        is_black = !is_black;
        if pos >= width {
            break;
        }
    }
    if !is_black && pos < width {
        set_white_run(&mut row, pos, width);
    }
    row
}

/// Zero any bits past `width` that a byte-wise invert may have set.
fn mask_row_tail(row: &mut [u8], width: u32, row_bytes: usize) {
    let tail_bits = (row_bytes * 8) as u32 - width;
    if tail_bits > 0 && row_bytes > 0 {
        row[row_bytes - 1] &= 0xFFu8 << tail_bits;
    }
    for byte in &mut row[row_bytes..] {
        *byte = 0;
    }
}

/// Concatenate uncompressed strips (single-byte samples) straight from the
/// file bytes.
fn read_raw_strips<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    bytes: &[u8],
    row_bytes: usize,
    height: u32,
    path: &Path,
) -> Result<Vec<u8>> {
    let offsets = decoder
        .get_tag_u32_vec(Tag::StripOffsets)
        .map_err(|e| decode_err(e, path))?;
    let counts = decoder
        .get_tag_u32_vec(Tag::StripByteCounts)
        .map_err(|e| decode_err(e, path))?;
    if offsets.len() != counts.len() {
        return Err(decode_err("strip offsets and byte counts disagree", path));
    }

    let expected = row_bytes * height as usize;
    let mut data = Vec::with_capacity(expected);
    for (&offset, &count) in offsets.iter().zip(&counts) {
        let strip = bytes
            .get(offset as usize..(offset + count) as usize)
            .ok_or_else(|| decode_err("strip data out of bounds", path))?;
        data.extend_from_slice(strip);
    }
    if data.len() < expected {
        return Err(decode_err("strips are short of the image size", path));
    }
    Ok(data)
}

fn read_u8_frame<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Vec<u8>> {
    match decoder.read_image().map_err(|e| decode_err(e, path))? {
        DecodingResult::U8(data) => Ok(data),
        _ => Err(decode_err("non-8-bit sample representation", path)),
    }
}

/// X/Y resolution tags, falling back to the screen default.
fn read_resolution<R: Read + Seek>(decoder: &mut Decoder<R>) -> Resolution {
    let horizontal = decoder.get_tag_f32(Tag::XResolution).ok().unwrap_or(96.0);
    let vertical = decoder.get_tag_f32(Tag::YResolution).ok().unwrap_or(96.0);
    Resolution {
        horizontal,
        vertical,
    }
}

/// ColorMap tag (3 x 256 16-bit planes) narrowed to 8-bit palette entries.
fn read_color_map<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Vec<[u8; 3]>> {
    let raw = decoder.get_tag_u32_vec(Tag::ColorMap).ok()?;
    if raw.len() < 768 {
        return None;
    }
    let mut palette = Vec::with_capacity(256);
    for i in 0..256 {
        palette.push([
            (raw[i] >> 8) as u8,
            (raw[256 + i] >> 8) as u8,
            (raw[512 + i] >> 8) as u8,
        ]);
    }
    Some(palette)
}

/// Copy tightly packed single-byte-sample rows into a stride-padded buffer.
fn copy_tight_rows(buf: &mut PixelBuffer, data: &[u8], row_bytes: usize) {
    for y in 0..buf.height() {
        let start = y as usize * row_bytes;
        buf.row_mut(y)[..row_bytes].copy_from_slice(&data[start..start + row_bytes]);
    }
}

/// Re-pack an `image` RGB frame as Bgr24.
fn rgb8_to_bgr24(img: &image::RgbImage, resolution: Resolution) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut buf = PixelBuffer::new(width, height, PixelLayout::Bgr24, resolution);
    let data = img.as_raw();
    for y in 0..height {
        let src = &data[y as usize * width as usize * 3..];
        let row = buf.row_mut(y);
        for x in 0..width as usize {
            let px = &src[x * 3..x * 3 + 3];
            row[x * 3..x * 3 + 3].copy_from_slice(&[px[2], px[1], px[0]]);
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeParams, PageCodec, TiffCodec};
    use monowerk_core::TiffCompression;

    fn checker_mono(width: u32, height: u32) -> PixelBuffer {
        let mut buf =
            PixelBuffer::new(width, height, PixelLayout::Mono1, Resolution::uniform(300.0));
        for y in 0..height {
            let row = buf.row_mut(y);
            for x in 0..width {
                if (x + y) % 2 == 0 {
                    row[x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
        }
        buf
    }

    #[test]
    fn g4_page_round_trips_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tif");
        let page = checker_mono(21, 9);

        let codec = TiffCodec::new();
        codec
            .encode(&page, &path, &EncodeParams::tiff(TiffCompression::Ccitt4))
            .unwrap();

        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Mono1);
        assert_eq!(decoded.width(), 21);
        assert_eq!(decoded.height(), 9);
        for y in 0..9 {
            for x in 0..21 {
                assert_eq!(decoded.mono_bit(x, y), page.mono_bit(x, y), "bit ({x},{y})");
            }
        }
    }

    #[test]
    fn uncompressed_mono_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tif");
        let page = checker_mono(10, 4);

        let codec = TiffCodec::new();
        codec
            .encode(&page, &path, &EncodeParams::tiff(TiffCompression::None))
            .unwrap();

        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Mono1);
        for y in 0..4 {
            for x in 0..10 {
                assert_eq!(decoded.mono_bit(x, y), page.mono_bit(x, y));
            }
        }
    }

    #[test]
    fn probe_reads_dimensions_and_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tif");
        let page = checker_mono(40, 30);

        let codec = TiffCodec::new();
        codec
            .encode(&page, &path, &EncodeParams::tiff(TiffCompression::Ccitt4))
            .unwrap();

        let meta = codec.probe(&path).unwrap();
        assert_eq!(meta.width, 40);
        assert_eq!(meta.height, 30);
        assert_eq!(meta.frame_count, 1);
        assert_eq!(meta.resolution, Resolution::uniform(300.0));
    }

    #[test]
    fn indexed_frame_round_trips_with_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.tif");

        let mut page = PixelBuffer::new(6, 2, PixelLayout::Indexed8, Resolution::uniform(300.0));
        page.row_mut(0)[..6].copy_from_slice(&[0, 50, 100, 150, 200, 250]);
        page.row_mut(1)[..6].copy_from_slice(&[250, 200, 150, 100, 50, 0]);
        page.set_palette(Some(convert::grayscale_palette()));

        let codec = TiffCodec::new();
        codec
            .encode(&page, &path, &EncodeParams::tiff(TiffCompression::None))
            .unwrap();

        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Indexed8);
        assert_eq!(&decoded.row(0)[..6], &[0, 50, 100, 150, 200, 250]);
        let palette = decoded.palette().expect("palette TIFF keeps its color table");
        assert_eq!(palette[100], [100, 100, 100]);
    }

    #[test]
    fn rgb_frame_round_trips_to_bgr24() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.tif");

        let mut page = PixelBuffer::new(2, 1, PixelLayout::Bgr24, Resolution::uniform(300.0));
        page.row_mut(0)[..6].copy_from_slice(&[10, 20, 30, 40, 50, 60]); // B,G,R,B,G,R

        let codec = TiffCodec::new();
        codec
            .encode(&page, &path, &EncodeParams::tiff(TiffCompression::None))
            .unwrap();

        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Bgr24);
        assert_eq!(&decoded.row(0)[..6], &[10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let codec = TiffCodec::new();
        let err = codec.decode(Path::new("/nonexistent/page.tif")).unwrap_err();
        assert!(matches!(err, MonowerkError::Io(_)));
    }
}
