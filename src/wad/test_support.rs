//! In-memory fixtures for unit tests: synthetic WAD files and patch lumps.

use std::io::Cursor;

use super::wad::Wad;

/// Assemble a WAD image lump by lump.  Lump data is laid out right after
/// the header, the directory goes last.
pub struct WadBuilder {
    magic: [u8; 4],
    lumps: Vec<(String, Vec<u8>)>,
}

impl WadBuilder {
    pub fn new() -> Self {
        Self {
            magic: *b"IWAD",
            lumps: Vec::new(),
        }
    }

    pub fn magic(mut self, magic: &[u8; 4]) -> Self {
        self.magic = *magic;
        self
    }

    pub fn lump(mut self, name: &str, data: &[u8]) -> Self {
        self.lumps.push((name.to_owned(), data.to_vec()));
        self
    }

    pub fn marker(self, name: &str) -> Self {
        self.lump(name, &[])
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.magic);
        out.extend(&(self.lumps.len() as u32).to_le_bytes());
        out.extend(&0u32.to_le_bytes()); // patched below

        let mut dir: Vec<u8> = Vec::new();
        for (name, data) in &self.lumps {
            let pos = out.len() as u32;
            out.extend_from_slice(data);
            dir.extend(&pos.to_le_bytes());
            dir.extend(&(data.len() as u32).to_le_bytes());
            dir.extend(&encode_name(name));
        }

        let dir_offset = out.len() as u32;
        out[8..12].copy_from_slice(&dir_offset.to_le_bytes());
        out.extend(dir);
        out
    }

    pub fn open(&self) -> Wad<Cursor<Vec<u8>>> {
        Wad::from_reader(Cursor::new(self.build())).expect("synthetic WAD opens")
    }
}

pub fn encode_name(name: &str) -> [u8; 8] {
    let mut raw = [0u8; 8];
    let n = name.len().min(8);
    raw[..n].copy_from_slice(&name.as_bytes()[..n]);
    raw
}

/// Encode a patch lump.  `columns[i]` lists `(top_delta, pixels)` posts;
/// every column gets its own terminator.
pub fn patch_bytes(width: u16, height: u16, columns: &[Vec<(u8, Vec<u8>)>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(&width.to_le_bytes());
    out.extend(&height.to_le_bytes());
    out.extend(&0i16.to_le_bytes());
    out.extend(&0i16.to_le_bytes());

    let table_at = out.len();
    out.resize(table_at + columns.len() * 4, 0);

    for (i, posts) in columns.iter().enumerate() {
        let ofs = out.len() as u32;
        out[table_at + i * 4..table_at + i * 4 + 4].copy_from_slice(&ofs.to_le_bytes());
        for (top, data) in posts {
            out.push(*top);
            out.push(data.len() as u8);
            out.push(0); // unused
            out.extend(data);
            out.push(0); // unused
        }
        out.push(0xff);
    }
    out
}
