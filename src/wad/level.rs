use bincode::Decode;
use bitflags::bitflags;
use log::debug;
use std::io::{Read, Seek};

use super::bytes::{LumpName, decode_records};
use super::error::{Result, WadError};
use super::wad::{MAP_LUMPS, Wad};

/*=======================================================================*/
/*                         Binary record layouts                         */
/*=======================================================================*/

pub const VERTEX_SIZE: usize = 4;
pub const LINEDEF_SIZE: usize = 14;
pub const SIDEDEF_SIZE: usize = 30;
pub const THING_SIZE: usize = 10;

/// `Linedef::front_sidedef` / `back_sidedef` value meaning "no side".
pub const NO_SIDEDEF: u16 = 0xFFFF;

pub type VertexId = u16;
pub type SidedefId = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode)]
pub struct Linedef {
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub flags: u16,
    pub special_type: u16,
    pub tag: u16,
    pub front_sidedef: SidedefId,
    pub back_sidedef: SidedefId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode)]
pub struct Sidedef {
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_texture: LumpName,
    pub lower_texture: LumpName,
    pub middle_texture: LumpName,
    pub sector: i16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode)]
pub struct Thing {
    pub x: i16,
    pub y: i16,
    pub angle: i16,
    pub type_: i16,
    pub flags: i16,
}

/*=======================================================================*/
/*                               Flag views                              */
/*=======================================================================*/

bitflags! {
    /// Linedef flag bits as stored in vanilla maps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE      = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0008;
        const LOWER_UNPEGGED  = 0x0010;
        const SECRET          = 0x0020;
        const BLOCK_SOUND     = 0x0040;
        const NOT_ON_MAP      = 0x0080;
        const ALREADY_ON_MAP  = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThingFlags: u16 {
        const SKILL_EASY      = 0x0001;
        const SKILL_MEDIUM    = 0x0002;
        const SKILL_HARD      = 0x0004;
        const AMBUSH          = 0x0008;
        const MULTIPLAYER     = 0x0010;
    }
}

impl Linedef {
    pub fn flags(&self) -> LinedefFlags {
        LinedefFlags::from_bits_retain(self.flags)
    }

    pub fn front(&self) -> Option<SidedefId> {
        (self.front_sidedef != NO_SIDEDEF).then_some(self.front_sidedef)
    }

    pub fn back(&self) -> Option<SidedefId> {
        (self.back_sidedef != NO_SIDEDEF).then_some(self.back_sidedef)
    }
}

impl Thing {
    pub fn flags(&self) -> ThingFlags {
        ThingFlags::from_bits_retain(self.flags as u16)
    }
}

/*=======================================================================*/
/*                             Lump decoders                             */
/*=======================================================================*/

pub fn decode_vertices(bytes: &[u8]) -> Result<Vec<Vertex>> {
    decode_records(bytes, "VERTEXES", VERTEX_SIZE)
}

pub fn decode_linedefs(bytes: &[u8]) -> Result<Vec<Linedef>> {
    decode_records(bytes, "LINEDEFS", LINEDEF_SIZE)
}

pub fn decode_sidedefs(bytes: &[u8]) -> Result<Vec<Sidedef>> {
    decode_records(bytes, "SIDEDEFS", SIDEDEF_SIZE)
}

pub fn decode_things(bytes: &[u8]) -> Result<Vec<Thing>> {
    decode_records(bytes, "THINGS", THING_SIZE)
}

/*=======================================================================*/
/*                     Aggregate returned by `load_level`                */
/*=======================================================================*/

/// Axis-aligned box around every vertex of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i16,
    pub min_y: i16,
    pub max_x: i16,
    pub max_y: i16,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        (i32::from(self.max_x) - i32::from(self.min_x)) as u32
    }

    pub fn height(&self) -> u32 {
        (i32::from(self.max_y) - i32::from(self.min_y)) as u32
    }
}

/// Decoded geometry of one map.  Cross references (vertex and sidedef
/// indices) are *not* checked at decode time; use the accessors below.
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub things: Vec<Thing>,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub vertices: Vec<Vertex>,
}

impl Level {
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices
            .get(usize::from(id))
            .ok_or(WadError::IndexOutOfRange {
                what: "vertex",
                index: usize::from(id),
                len: self.vertices.len(),
            })
    }

    pub fn sidedef(&self, id: SidedefId) -> Result<&Sidedef> {
        self.sidedefs
            .get(usize::from(id))
            .ok_or(WadError::IndexOutOfRange {
                what: "sidedef",
                index: usize::from(id),
                len: self.sidedefs.len(),
            })
    }

    /// Start and end vertex of `line`.
    pub fn endpoints(&self, line: &Linedef) -> Result<(Vertex, Vertex)> {
        Ok((*self.vertex(line.start_vertex)?, *self.vertex(line.end_vertex)?))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.vertices.first()?;
        let init = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.vertices.iter().fold(init, |b, v| Bounds {
            min_x: b.min_x.min(v.x),
            min_y: b.min_y.min(v.y),
            max_x: b.max_x.max(v.x),
            max_y: b.max_y.max(v.y),
        }))
    }
}

/*=======================================================================*/
/*                     Convenience helpers on `Wad`                      */
/*=======================================================================*/
impl<R: Read + Seek> Wad<R> {
    /// Return the index `marker + offset` if that entry is called `name`.
    fn idx_of(&self, marker: usize, offset: usize, name: &'static str) -> Result<usize> {
        let idx = marker + offset;
        let map = self.entry(marker)?.name.to_string();
        match self.directory().get(idx) {
            Some(e) if e.name.as_str() == name => Ok(idx),
            _ => Err(WadError::MissingMapLump {
                map,
                expected: name,
                index: idx,
            }),
        }
    }

    /// Decode the geometry lumps of the map whose marker sits at `marker`.
    pub fn load_level(&mut self, marker: usize) -> Result<Level> {
        let name = self.entry(marker)?.name.to_string();

        // --- fixed lump order after marker -------------------------------
        let things_idx = self.idx_of(marker, 1, MAP_LUMPS[0])?;
        let linedefs_idx = self.idx_of(marker, 2, MAP_LUMPS[1])?;
        let sidedefs_idx = self.idx_of(marker, 3, MAP_LUMPS[2])?;
        let vertices_idx = self.idx_of(marker, 4, MAP_LUMPS[3])?;

        // --- decode each lump -------------------------------------------
        let things = decode_things(&self.lump(things_idx)?)?;
        let linedefs = decode_linedefs(&self.lump(linedefs_idx)?)?;
        let sidedefs = decode_sidedefs(&self.lump(sidedefs_idx)?)?;
        let vertices = decode_vertices(&self.lump(vertices_idx)?)?;

        debug!(
            "{name}: {} things, {} linedefs, {} sidedefs, {} vertices",
            things.len(),
            linedefs.len(),
            sidedefs.len(),
            vertices.len()
        );

        Ok(Level {
            name,
            things,
            linedefs,
            sidedefs,
            vertices,
        })
    }
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
