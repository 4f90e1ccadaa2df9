//! PLAYPAL palettes, player-colour translations and COLORMAP light tables.

use std::{
    fmt,
    io::{Read, Seek},
    ops::Index,
    str::FromStr,
};

use super::error::{Result, WadError};
use super::wad::Wad;

/// One palette block: 256 RGB triples.
pub const PALETTE_SIZE: usize = 256 * 3;
/// One COLORMAP light table.
pub const COLORMAP_SIZE: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Colour written for transparent pixels.
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(v: u8) -> Self {
        Self::new(v, v, v)
    }
}

/*=======================================================================*/
/*                                Palette                                */
/*=======================================================================*/

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette(pub [Rgb; 256]);

/// Identity grayscale: index `v` maps to `(v, v, v)`.
impl Default for Palette {
    fn default() -> Self {
        Self::grayscale()
    }
}

impl Index<u8> for Palette {
    type Output = Rgb;
    fn index(&self, idx: u8) -> &Rgb {
        &self.0[usize::from(idx)]
    }
}

impl Palette {
    pub fn grayscale() -> Self {
        Palette(std::array::from_fn(|i| Rgb::gray(i as u8)))
    }

    /// Build from exactly `PALETTE_SIZE` bytes.
    fn from_block(block: &[u8]) -> Self {
        Palette(std::array::from_fn(|i| {
            Rgb::new(block[i * 3], block[i * 3 + 1], block[i * 3 + 2])
        }))
    }

    pub fn colors(&self) -> &[Rgb; 256] {
        &self.0
    }

    /// The 768-byte lump form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }

    /// One lowercase `rrggbb` string per colour.
    pub fn hex_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.0
            .iter()
            .map(|c| format!("{:02x}{:02x}{:02x}", c.r, c.g, c.b))
    }

    /// Copy of this palette where entries `start..start + len` take the
    /// colour found `shift` entries away.  A read outside `0..256` is an
    /// error, never a wrap-around.
    pub fn shift_range(&self, start: usize, len: usize, shift: i32) -> Result<Palette> {
        let mut out = self.clone();
        for dst in start..start + len {
            let src = dst as i64 + i64::from(shift);
            if dst >= 256 || !(0..256).contains(&src) {
                return Err(WadError::IndexOutOfRange {
                    what: "palette shift target",
                    index: dst,
                    len: 256,
                });
            }
            out.0[dst] = self.0[src as usize];
        }
        Ok(out)
    }

    pub fn translate(&self, hue: Hue) -> Result<Palette> {
        let (start, shift) = hue.shift();
        self.shift_range(start, Hue::RAMP_LEN, shift)
    }
}

/// Number of whole palette blocks in a PLAYPAL-style lump.
pub fn palette_count(bytes: &[u8]) -> usize {
    bytes.len() / PALETTE_SIZE
}

/// Extract palette `index` from a lump of back-to-back 768-byte blocks.
pub fn decode_palette_block(bytes: &[u8], index: usize) -> Result<Palette> {
    if bytes.is_empty() || bytes.len() % PALETTE_SIZE != 0 || index >= palette_count(bytes) {
        return Err(WadError::PaletteIndexOutOfRange {
            index,
            len: bytes.len(),
        });
    }
    let start = index * PALETTE_SIZE;
    Ok(Palette::from_block(&bytes[start..start + PALETTE_SIZE]))
}

/// Every palette in the lump.
pub fn decode_palettes(bytes: &[u8]) -> Result<Vec<Palette>> {
    (0..palette_count(bytes).max(1))
        .map(|i| decode_palette_block(bytes, i))
        .collect()
}

/*=======================================================================*/
/*                          Player colour ramps                          */
/*=======================================================================*/

/// Recolouring of a colour ramp, as used for multiplayer colours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hue {
    Indigo,
    Brown,
    Red,
    /// Replaces the red ramp rather than the green one.
    Green,
    Yellow,
}

impl Hue {
    pub const ALL: [Hue; 5] = [Hue::Indigo, Hue::Brown, Hue::Red, Hue::Green, Hue::Yellow];

    /// Length of every recoloured ramp; the last entry of each 16-colour
    /// ramp (127, 191) keeps its colour.
    pub const RAMP_LEN: usize = 15;

    const GREEN_RAMP: usize = 112;
    const RED_RAMP: usize = 176;

    /// First replaced entry and the distance to the source ramp.
    pub fn shift(self) -> (usize, i32) {
        match self {
            Hue::Indigo => (Self::GREEN_RAMP, -16),
            Hue::Brown => (Self::GREEN_RAMP, -48),
            Hue::Red => (Self::GREEN_RAMP, -80),
            Hue::Yellow => (Self::GREEN_RAMP, 48),
            Hue::Green => (Self::RED_RAMP, -64),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Hue::Indigo => "indigo",
            Hue::Brown => "brown",
            Hue::Red => "red",
            Hue::Green => "green",
            Hue::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Hue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Hue::ALL
            .into_iter()
            .find(|h| h.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown hue `{s}` (expected indigo, brown, red, green or yellow)"))
    }
}

/*=======================================================================*/
/*                               Colormaps                               */
/*=======================================================================*/

/// One 256-entry palette-index remapping table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Colormap(pub [u8; 256]);

impl Default for Colormap {
    fn default() -> Self {
        Colormap(std::array::from_fn(|i| i as u8))
    }
}

impl Index<u8> for Colormap {
    type Output = u8;
    fn index(&self, idx: u8) -> &u8 {
        &self.0[usize::from(idx)]
    }
}

impl Colormap {
    /// Add `amount` to entries `start..stop`.  Results outside `0..=255`
    /// fail instead of wrapping.
    pub fn shift(&self, start: usize, stop: usize, amount: i16) -> Result<Colormap> {
        if start > stop || stop > COLORMAP_SIZE {
            return Err(WadError::IndexOutOfRange {
                what: "colormap range end",
                index: stop.max(start),
                len: COLORMAP_SIZE,
            });
        }
        let mut out = self.clone();
        for i in start..stop {
            let v = i32::from(self.0[i]) + i32::from(amount);
            out.0[i] = u8::try_from(v).map_err(|_| WadError::IndexOutOfRange {
                what: "colormap value",
                index: i,
                len: COLORMAP_SIZE,
            })?;
        }
        Ok(out)
    }

    pub fn apply(&self, pixels: &mut [u8]) {
        for p in pixels {
            *p = self[*p];
        }
    }
}

/// Extract light table `index` from a COLORMAP lump.
pub fn decode_colormap(bytes: &[u8], index: usize) -> Result<Colormap> {
    let count = bytes.len() / COLORMAP_SIZE;
    if index >= count {
        return Err(WadError::IndexOutOfRange {
            what: "colormap",
            index,
            len: count,
        });
    }
    let mut table = [0u8; COLORMAP_SIZE];
    table.copy_from_slice(&bytes[index * COLORMAP_SIZE..(index + 1) * COLORMAP_SIZE]);
    Ok(Colormap(table))
}

/*=======================================================================*/
/*                     Convenience helpers on `Wad`                      */
/*=======================================================================*/
impl<R: Read + Seek> Wad<R> {
    /// Palette `index` of the archive's `PLAYPAL` lump.
    pub fn load_palette(&mut self, index: usize) -> Result<Palette> {
        decode_palette_block(&self.lump_by_name("PLAYPAL")?, index)
    }

    /// Light table `index` of the archive's `COLORMAP` lump.
    pub fn load_colormap(&mut self, index: usize) -> Result<Colormap> {
        decode_colormap(&self.lump_by_name("COLORMAP")?, index)
    }
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
