//! Image writers for decoded rasters.
//!
//! The decoders hand over a [`Raster`] (indices + mask) and a [`Palette`];
//! everything here only serialises them.  Netpbm headers are written in
//! the usual `P? W H [255]` text form followed by binary data.

mod map;

pub use map::{BACKGROUND, MAX_MAP_SIDE, ONE_SIDED, SECRET, TWO_SIDED, draw_map, map_palette};

use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};
use thiserror::Error;

use crate::wad::{Palette, Raster, WadError};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Wad(#[from] WadError),

    #[error("map would be {width}x{height} pixels (at most {max} per side); use a larger scale")]
    MapTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },

    /// Pixel / mask buffers disagree with the declared size.
    #[error("raster {width}x{height} has {pixels} pixels and {mask} mask entries")]
    Shape {
        width: usize,
        height: usize,
        pixels: usize,
        mask: usize,
    },
}

/// Output container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Format {
    /// Bitmap of the transparency mask.
    Pbm,
    /// Raw palette indices as gray levels.
    Pgm,
    #[default]
    Ppm,
    /// RGBA, alpha taken from the mask.
    Png,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Pbm => "pbm",
            Format::Pgm => "pgm",
            Format::Ppm => "ppm",
            Format::Png => "png",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pbm" => Ok(Format::Pbm),
            "pgm" => Ok(Format::Pgm),
            "ppm" => Ok(Format::Ppm),
            "png" => Ok(Format::Png),
            _ => Err(format!("unknown format `{s}` (expected pbm, pgm, ppm or png)")),
        }
    }
}

fn check_shape(raster: &Raster) -> Result<(), ExportError> {
    let (width, height, pixels, mask) = raster.parts();
    if pixels.len() != width * height || mask.len() != pixels.len() {
        return Err(ExportError::Shape {
            width,
            height,
            pixels: pixels.len(),
            mask: mask.len(),
        });
    }
    Ok(())
}

/*====================================================================*/
/*                           Netpbm                                   */
/*====================================================================*/

/// P4: opaque pixels black, transparent ones white.
pub fn write_pbm<W: Write>(out: &mut W, raster: &Raster) -> Result<(), ExportError> {
    check_shape(raster)?;
    write!(out, "P4\n{} {}\n", raster.width, raster.height)?;
    if raster.width == 0 {
        return Ok(());
    }
    let mut row = Vec::with_capacity(raster.width.div_ceil(8));
    for line in raster.mask.chunks(raster.width) {
        row.clear();
        row.extend(line.chunks(8).map(|bits| {
            bits.iter()
                .enumerate()
                .fold(0u8, |acc, (i, &on)| acc | (u8::from(on) << (7 - i)))
        }));
        out.write_all(&row)?;
    }
    Ok(())
}

/// P5: palette indices written as gray levels, mask ignored.
pub fn write_pgm<W: Write>(out: &mut W, raster: &Raster) -> Result<(), ExportError> {
    check_shape(raster)?;
    write!(out, "P5\n{} {}\n255\n", raster.width, raster.height)?;
    out.write_all(&raster.pixels)?;
    Ok(())
}

/// P6: resolved colours, magenta where transparent.
pub fn write_ppm<W: Write>(
    out: &mut W,
    raster: &Raster,
    palette: Option<&Palette>,
) -> Result<(), ExportError> {
    check_shape(raster)?;
    write!(out, "P6\n{} {}\n255\n", raster.width, raster.height)?;
    let rgb: Vec<u8> = raster
        .to_rgb(palette)
        .into_iter()
        .flat_map(|c| [c.r, c.g, c.b])
        .collect();
    out.write_all(&rgb)?;
    Ok(())
}

/*====================================================================*/
/*                              PNG                                   */
/*====================================================================*/

/// RGBA PNG; transparent pixels get alpha 0.
pub fn write_png<W: Write>(
    out: &mut W,
    raster: &Raster,
    palette: Option<&Palette>,
) -> Result<(), ExportError> {
    check_shape(raster)?;
    let shape_err = || ExportError::Shape {
        width: raster.width,
        height: raster.height,
        pixels: raster.pixels.len(),
        mask: raster.mask.len(),
    };
    let width = u32::try_from(raster.width).map_err(|_| shape_err())?;
    let height = u32::try_from(raster.height).map_err(|_| shape_err())?;

    let rgba: Vec<u8> = raster
        .to_rgb(palette)
        .into_iter()
        .zip(&raster.mask)
        .flat_map(|(c, &opaque)| [c.r, c.g, c.b, if opaque { 0xff } else { 0 }])
        .collect();

    let mut encoder = png::Encoder::new(out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba)?;
    writer.finish()?;
    Ok(())
}

/// Dispatch on `format`.
pub fn write_raster<W: Write>(
    out: &mut W,
    format: Format,
    raster: &Raster,
    palette: Option<&Palette>,
) -> Result<(), ExportError> {
    match format {
        Format::Pbm => write_pbm(out, raster),
        Format::Pgm => write_pgm(out, raster),
        Format::Ppm => write_ppm(out, raster, palette),
        Format::Png => write_png(out, raster, palette),
    }
}

/*====================================================================*/
/*                         Palette dumps                              */
/*====================================================================*/

/// 16×16 raster holding every palette index once, row-major.
pub fn palette_swatch() -> Raster {
    Raster::opaque(16, 16, (0..=255u8).collect())
}

/// One `rrggbb` line per colour.
pub fn write_hex<W: Write>(out: &mut W, palette: &Palette) -> Result<(), ExportError> {
    for line in palette.hex_lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/*====================================================================*/
/*                               Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::wad::Rgb;

    fn checker() -> Raster {
        // 3×2, transparent in the middle column
        let mut r = Raster::blank(3, 2);
        for y in 0..2 {
            r.set(0, y, 10);
            r.set(2, y, 20);
        }
        r
    }

    #[test]
    fn pbm_packs_mask_bits() {
        let mut out = Vec::new();
        write_pbm(&mut out, &checker()).unwrap();
        assert_eq!(out, b"P4\n3 2\n\xa0\xa0");
    }

    #[test]
    fn pgm_writes_indices() {
        let mut out = Vec::new();
        write_pgm(&mut out, &checker()).unwrap();
        assert_eq!(out, b"P5\n3 2\n255\n\x0a\x00\x14\x0a\x00\x14");
    }

    #[test]
    fn ppm_resolves_colours() {
        let mut pal = Palette::grayscale();
        pal.0[20] = Rgb::new(1, 2, 3);
        let mut out = Vec::new();
        write_ppm(&mut out, &checker(), Some(&pal)).unwrap();

        let header = b"P6\n3 2\n255\n";
        assert_eq!(&out[..header.len()], header);
        let body = &out[header.len()..];
        assert_eq!(body.len(), 3 * 6);
        assert_eq!(&body[0..9], &[10, 10, 10, 255, 0, 255, 1, 2, 3]);
    }

    #[test]
    fn png_has_signature() {
        let mut out = Vec::new();
        write_raster(&mut out, Format::Png, &checker(), None).unwrap();
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn bad_shape_rejected() {
        let mut r = checker();
        r.pixels.pop();
        let err = write_pgm(&mut Vec::new(), &r).unwrap_err();
        assert!(matches!(err, ExportError::Shape { pixels: 5, .. }));
    }

    #[test]
    fn swatch_and_hex_dump() {
        let swatch = palette_swatch();
        assert_eq!(swatch.get(15, 15), Some(255));
        assert_eq!(swatch.get(1, 2), Some(33));

        let mut out = Vec::new();
        write_hex(&mut out, &Palette::grayscale()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 256);
        assert_eq!(text.lines().nth(16), Some("101010"));
    }

    #[test]
    fn format_names() {
        assert_eq!("PNG".parse::<Format>().unwrap(), Format::Png);
        assert_eq!(Format::Pgm.extension(), "pgm");
        assert!("gif".parse::<Format>().is_err());
    }
}
