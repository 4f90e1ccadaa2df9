//! WAD archive reader and decoders for the lumps it carries.

mod bytes;
mod error;
mod level;
mod palette;
mod picture;
#[allow(clippy::module_inception)]
mod wad;

#[cfg(test)]
pub(crate) mod test_support;

pub use bytes::{ByteReader, LumpName, decode_records, read_exact_at};
pub use error::{Result, WadError};
pub use level::{
    Bounds, Level, Linedef, LinedefFlags, NO_SIDEDEF, Sidedef, SidedefId, Thing, ThingFlags,
    Vertex, VertexId, decode_linedefs, decode_sidedefs, decode_things, decode_vertices,
};
pub use palette::{
    COLORMAP_SIZE, Colormap, Hue, PALETTE_SIZE, Palette, Rgb, decode_colormap,
    decode_palette_block, decode_palettes, palette_count,
};
pub use picture::{
    Column, FLAT_SIZE, Picture, Post, Raster, WidthPolicy, decode_flat,
};
pub use wad::{
    DIR_ENTRY_SIZE, DirectoryEntry, HEADER_SIZE, MAP_ENTRY_COUNT, MAP_LUMPS, Wad, WadHeader,
    WadKind,
};
