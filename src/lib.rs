//! Read Doom-format WAD archives and decode the lumps inside them:
//! level geometry, PLAYPAL palettes, COLORMAP tables, flats and
//! column-encoded pictures.
//!
//! ```no_run
//! use wadder::wad::{Wad, WidthPolicy};
//!
//! let mut wad = Wad::open("doom1.wad")?;
//! let palette = wad.load_palette(0)?;
//! let index = wad.find_lump("TITLEPIC").expect("TITLEPIC");
//! let raster = wad.load_picture(index, WidthPolicy::Reject)?.rasterize()?;
//! let rgb = raster.to_rgb(Some(&palette));
//! # Ok::<(), wadder::wad::WadError>(())
//! ```

pub mod app;
pub mod config;
pub mod export;
pub mod wad;
