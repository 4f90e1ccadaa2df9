//! Top-down drawing of a level's linedefs.

use super::ExportError;
use crate::wad::{Level, Linedef, LinedefFlags, Palette, Raster, Rgb, Vertex};

pub const BACKGROUND: u8 = 0;
pub const ONE_SIDED: u8 = 1;
pub const TWO_SIDED: u8 = 2;
pub const SECRET: u8 = 3;

/// Largest width or height `draw_map` will allocate.
pub const MAX_MAP_SIDE: usize = 8192;

/// Colours for the indices [`draw_map`] emits; every other entry is black.
pub fn map_palette() -> Palette {
    let mut pal = Palette([Rgb::new(0, 0, 0); 256]);
    pal.0[ONE_SIDED as usize] = Rgb::gray(176);
    pal.0[TWO_SIDED as usize] = Rgb::new(255, 0, 0);
    pal.0[SECRET as usize] = Rgb::new(255, 0, 255);
    pal
}

fn class(line: &Linedef) -> u8 {
    let flags = line.flags();
    if flags.contains(LinedefFlags::SECRET) {
        SECRET
    } else if flags.contains(LinedefFlags::TWO_SIDED) {
        TWO_SIDED
    } else {
        ONE_SIDED
    }
}

/// Rasterise every linedef of `level`, north up, one pixel per `scale`
/// map units.  A level without vertices yields a single background pixel.
///
/// Extents above [`MAX_MAP_SIDE`] pixels fail with `MapTooLarge`; a larger
/// `scale` brings them down.
pub fn draw_map(level: &Level, scale: u16) -> Result<Raster, ExportError> {
    let scale = i32::from(scale.max(1));
    let Some(b) = level.bounds() else {
        return Ok(Raster::opaque(1, 1, vec![BACKGROUND]));
    };

    let width = (b.width() as i32 / scale + 1) as usize;
    let height = (b.height() as i32 / scale + 1) as usize;
    if width > MAX_MAP_SIDE || height > MAX_MAP_SIDE {
        return Err(ExportError::MapTooLarge {
            width,
            height,
            max: MAX_MAP_SIDE,
        });
    }
    let mut raster = Raster::opaque(width, height, vec![BACKGROUND; width * height]);

    let to_px = |v: Vertex| {
        (
            (i32::from(v.x) - i32::from(b.min_x)) / scale,
            (i32::from(b.max_y) - i32::from(v.y)) / scale,
        )
    };

    for line in &level.linedefs {
        let (a, c) = level.endpoints(line)?;
        plot_line(&mut raster, to_px(a), to_px(c), class(line));
    }
    Ok(raster)
}

/// Bresenham, both endpoints inclusive.
fn plot_line(raster: &mut Raster, (mut x0, mut y0): (i32, i32), (x1, y1): (i32, i32), v: u8) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 {
            raster.set(x0 as usize, y0 as usize, v);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wad::{NO_SIDEDEF, WadError};

    fn line(a: u16, b: u16, flags: u16) -> Linedef {
        Linedef {
            start_vertex: a,
            end_vertex: b,
            flags,
            special_type: 0,
            tag: 0,
            front_sidedef: 0,
            back_sidedef: NO_SIDEDEF,
        }
    }

    fn square() -> Level {
        Level {
            name: "E1M1".into(),
            things: vec![],
            sidedefs: vec![],
            vertices: vec![
                Vertex { x: 0, y: 0 },
                Vertex { x: 64, y: 0 },
                Vertex { x: 64, y: 32 },
                Vertex { x: 0, y: 32 },
            ],
            linedefs: vec![
                line(0, 1, 0x01),
                line(1, 2, 0x04),
                line(2, 3, 0x20),
                line(3, 0, 0x01),
            ],
        }
    }

    #[test]
    fn draws_classes_with_y_up() {
        let r = draw_map(&square(), 1).unwrap();
        assert_eq!((r.width, r.height), (65, 33));
        // bottom edge (y = 0) lands on the last row
        assert_eq!(r.get(10, 32), Some(ONE_SIDED));
        assert_eq!(r.get(64, 10), Some(TWO_SIDED));
        assert_eq!(r.get(10, 0), Some(SECRET));
        assert_eq!(r.get(10, 10), Some(BACKGROUND));
    }

    #[test]
    fn scale_divides_extent() {
        let r = draw_map(&square(), 4).unwrap();
        assert_eq!((r.width, r.height), (17, 9));
        assert_eq!(r.get(16, 4), Some(TWO_SIDED));
    }

    #[test]
    fn diagonal_is_connected() {
        let mut lvl = square();
        lvl.linedefs = vec![line(0, 2, 0)];
        let r = draw_map(&lvl, 1).unwrap();
        assert_eq!(r.get(0, 32), Some(ONE_SIDED));
        assert_eq!(r.get(64, 0), Some(ONE_SIDED));
        // one pixel per column for an x-major line
        for x in 0..65 {
            assert_eq!((0..33).filter(|&y| r.get(x, y) == Some(ONE_SIDED)).count(), 1);
        }
    }

    #[test]
    fn bad_vertex_reference_fails() {
        let mut lvl = square();
        lvl.linedefs.push(line(0, 9, 0));
        assert!(matches!(
            draw_map(&lvl, 1),
            Err(ExportError::Wad(WadError::IndexOutOfRange { what: "vertex", index: 9, .. }))
        ));
    }

    #[test]
    fn extreme_bounds_need_a_larger_scale() {
        let mut lvl = square();
        lvl.vertices = vec![
            Vertex { x: i16::MIN, y: i16::MIN },
            Vertex { x: i16::MAX, y: i16::MAX },
        ];
        lvl.linedefs = vec![line(0, 1, 0)];
        assert!(matches!(
            draw_map(&lvl, 1),
            Err(ExportError::MapTooLarge { width: 65536, height: 65536, max: MAX_MAP_SIDE })
        ));

        let r = draw_map(&lvl, 16).unwrap();
        assert_eq!((r.width, r.height), (4096, 4096));
        assert_eq!(r.get(0, 4095), Some(ONE_SIDED));
        assert_eq!(r.get(4095, 0), Some(ONE_SIDED));
    }

    #[test]
    fn empty_level_is_one_pixel() {
        let lvl = Level {
            name: "MAP01".into(),
            things: vec![],
            linedefs: vec![],
            sidedefs: vec![],
            vertices: vec![],
        };
        let r = draw_map(&lvl, 1).unwrap();
        assert_eq!(r.pixels, vec![BACKGROUND]);
        assert_eq!(map_palette()[SECRET], Rgb::new(255, 0, 255));
    }
}
