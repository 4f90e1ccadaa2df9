//! Doom picture ("patch") format and the flat pixel buffers it decodes to.
//!
//! On disk a picture is an 8-byte header, one `u32` offset per column
//! (relative to the lump start) and, per column, a run of *posts*:
//!
//! ```text
//! top_delta:u8  length:u8  unused:u8  data[length]  unused:u8
//! ...
//! 0xFF                                   <- column terminator
//! ```
//!
//! Nothing in the format bounds the offsets or the post geometry, so every
//! seek, read and pixel write is checked here.

use log::{debug, warn};
use smallvec::SmallVec;
use std::io::{Read, Seek};

use super::bytes::ByteReader;
use super::error::{Result, WadError};
use super::palette::{Palette, Rgb};
use super::wad::Wad;

/// Size of the fixed picture header.
pub const HEADER_SIZE: usize = 8;
/// `top_delta` value that ends a column.
pub const POST_END: u8 = 0xFF;
/// Widest picture the column table can describe.
pub const MAX_WIDTH: u16 = 255;

/// Flats are raw 64×64 index maps.
pub const FLAT_SIDE: usize = 64;
pub const FLAT_SIZE: usize = FLAT_SIDE * FLAT_SIDE;

/*=======================================================================*/
/*                              Decoded form                             */
/*=======================================================================*/

/// One opaque run inside a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// First row covered by `data`.
    pub top_delta: u8,
    pub data: Vec<u8>,
}

/// Posts of one column; most columns hold one or two.
pub type Column = SmallVec<[Post; 2]>;

/// What to do with a header width of 256 or more.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WidthPolicy {
    /// Fail with `WidthOverflow`.
    #[default]
    Reject,
    /// Read `width % 256` columns and record the raw width.
    Truncate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    pub width: u16,
    pub height: u16,
    pub left_offset: i16,
    pub top_offset: i16,
    pub column_offsets: Vec<u32>,
    pub columns: Vec<Column>,
    /// Raw header width when it was truncated under `WidthPolicy::Truncate`.
    pub truncated_from: Option<u16>,
}

impl Picture {
    /// Decode with the default policy: wide pictures are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, WidthPolicy::Reject)
    }

    pub fn decode_with(bytes: &[u8], policy: WidthPolicy) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        /*----------- 1. header ------------------------------------------*/
        let width = r.u16()?;
        let height = r.u16()?;
        let left_offset = r.i16()?;
        let top_offset = r.i16()?;

        /*----------- 2. column count ------------------------------------*/
        let safe_width = width % 256;
        let truncated_from = if width > MAX_WIDTH {
            match policy {
                WidthPolicy::Reject => {
                    return Err(WadError::WidthOverflow {
                        width,
                        truncated: safe_width,
                    });
                }
                WidthPolicy::Truncate => {
                    warn!("picture width {width} truncated to {safe_width} columns");
                    Some(width)
                }
            }
        } else {
            None
        };

        /*----------- 3. column offset table -----------------------------*/
        let column_offsets = (0..safe_width)
            .map(|_| r.u32())
            .collect::<Result<Vec<_>>>()?;

        /*----------- 4. posts -------------------------------------------*/
        let columns = column_offsets
            .iter()
            .map(|&ofs| read_column(&mut r, ofs))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "picture {width}x{height} ({} posts)",
            columns.iter().map(|c| c.len()).sum::<usize>()
        );

        Ok(Self {
            width,
            height,
            left_offset,
            top_offset,
            column_offsets,
            columns,
            truncated_from,
        })
    }

    /// Lay the posts out into a `width × height` index buffer.
    ///
    /// A post reaching past the last row is an error, not a clipped write.
    /// A truncated picture is as wide as the columns actually decoded.
    pub fn rasterize(&self) -> Result<Raster> {
        let width = self.columns.len();
        let mut raster = Raster::blank(width, usize::from(self.height));
        let len = raster.pixels.len();

        for (x, column) in self.columns.iter().enumerate() {
            for post in column {
                let top = usize::from(post.top_delta);
                for (j, &value) in post.data.iter().enumerate() {
                    let idx = x + (top + j) * width;
                    if idx >= len {
                        return Err(WadError::IndexOutOfRange {
                            what: "picture pixel",
                            index: idx,
                            len,
                        });
                    }
                    raster.pixels[idx] = value;
                    raster.mask[idx] = true;
                }
            }
        }
        Ok(raster)
    }
}

/// Read posts starting at `offset` until the terminator.
fn read_column(r: &mut ByteReader<'_>, offset: u32) -> Result<Column> {
    r.seek(offset as usize)?;
    let mut posts = Column::new();
    loop {
        let top_delta = r.u8()?;
        if top_delta == POST_END {
            return Ok(posts);
        }
        let length = usize::from(r.u8()?);
        r.skip(1)?;
        let data = r.take(length)?.to_vec();
        r.skip(1)?;
        posts.push(Post { top_delta, data });
    }
}

/// Decode a 4096-byte flat into a fully opaque 64×64 raster.
pub fn decode_flat(bytes: &[u8]) -> Result<Raster> {
    if bytes.len() != FLAT_SIZE {
        return Err(WadError::MalformedLump {
            record: "flat",
            len: bytes.len(),
            stride: FLAT_SIZE,
        });
    }
    Ok(Raster::opaque(FLAT_SIDE, FLAT_SIDE, bytes.to_vec()))
}

/*=======================================================================*/
/*                                 Raster                                */
/*=======================================================================*/

/// Palette-index pixels plus a transparency mask, row-major.
///
/// This is what image writers consume: see [`Raster::parts`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    /// `true` where a pixel was written.
    pub mask: Vec<bool>,
}

impl Raster {
    /// Value of pixels no post has written.
    pub const UNSET: u8 = 0;

    /// Fully transparent raster.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Self::UNSET; width * height],
            mask: vec![false; width * height],
        }
    }

    pub fn opaque(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        let mask = vec![true; pixels.len()];
        Self {
            width,
            height,
            pixels,
            mask,
        }
    }

    /// Palette index at `(x, y)`; `None` when transparent or outside.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        self.mask[idx].then_some(self.pixels[idx])
    }

    /// Write an opaque pixel; coordinates outside the raster are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            self.pixels[idx] = value;
            self.mask[idx] = true;
        }
    }

    pub fn opaque_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// `(width, height, pixels, mask)` for image writers.
    pub fn parts(&self) -> (usize, usize, &[u8], &[bool]) {
        (self.width, self.height, &self.pixels, &self.mask)
    }

    /// Resolve colours: magenta where transparent, `palette[v]` elsewhere.
    /// Without a palette, index `v` is shown as gray `(v, v, v)`.
    pub fn to_rgb(&self, palette: Option<&Palette>) -> Vec<Rgb> {
        let gray;
        let palette = match palette {
            Some(p) => p,
            None => {
                gray = Palette::grayscale();
                &gray
            }
        };
        self.pixels
            .iter()
            .zip(&self.mask)
            .map(|(&v, &opaque)| if opaque { palette[v] } else { Rgb::MAGENTA })
            .collect()
    }
}

/*=======================================================================*/
/*                     Convenience helpers on `Wad`                      */
/*=======================================================================*/
impl<R: Read + Seek> Wad<R> {
    /// Decode lump `index` as a picture.
    pub fn load_picture(&mut self, index: usize, policy: WidthPolicy) -> Result<Picture> {
        Picture::decode_with(&self.lump(index)?, policy)
    }
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
