//! # Doom-format WAD archive
//!
//! * Parses the 12-byte header and the flat directory of 16-byte entries.
//! * Lumps are fetched on demand from the backing `Read + Seek` source, so
//!   opening a 25 MiB IWAD only costs the directory.
//! * An optional read-through cache keeps fetched lumps in memory.
//!
//! Both "IWAD" and "PWAD" are accepted; any other first byte is tolerated
//! as long as bytes 1..4 read `WAD`.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
    sync::Arc,
};

use super::bytes::{ByteReader, LumpName, read_exact_at, stream_len};
use super::error::{Result, WadError};

/// Size (in bytes) of the file header.
pub const HEADER_SIZE: usize = 12;
/// Size (in bytes) of one directory entry.
pub const DIR_ENTRY_SIZE: usize = 16;

/// Lumps following a map marker, in on-disk order.
pub const MAP_LUMPS: [&str; 10] = [
    "THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS", "REJECT",
    "BLOCKMAP",
];
/// A full map: the marker plus `MAP_LUMPS`.
pub const MAP_ENTRY_COUNT: usize = MAP_LUMPS.len() + 1;

/*=======================================================================*/
/*                                 Header                                */
/*=======================================================================*/

/// What the first signature byte says about the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WadKind {
    /// "IWAD" – main game data.
    Internal,
    /// "PWAD" – add-on / patch data.
    Patch,
    /// "?WAD" with some other first byte.
    NonStandard,
}

impl fmt::Display for WadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WadKind::Internal => "Internal WAD",
            WadKind::Patch => "Patch WAD",
            WadKind::NonStandard => "non-standard WAD",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WadHeader {
    pub signature: [u8; 4],
    pub lump_count: u32,
    pub directory_offset: u32,
}

impl WadHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let mut signature = [0u8; 4];
        signature.copy_from_slice(r.take(4)?);
        if &signature[1..] != b"WAD" {
            return Err(WadError::InvalidSignature(signature));
        }
        Ok(Self {
            signature,
            lump_count: r.u32()?,
            directory_offset: r.u32()?,
        })
    }

    pub fn kind(&self) -> WadKind {
        match self.signature[0] {
            b'I' => WadKind::Internal,
            b'P' => WadKind::Patch,
            _ => WadKind::NonStandard,
        }
    }

    /// Directory size in bytes as claimed by the header.
    pub fn directory_len(&self) -> u64 {
        u64::from(self.lump_count) * DIR_ENTRY_SIZE as u64
    }
}

/*=======================================================================*/
/*                            Directory entries                          */
/*=======================================================================*/

/// One entry in the lump directory (16 bytes on disk).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Offset to lump data from the beginning of the file.
    pub position: u32,
    /// Size of the lump in bytes.
    pub size: u32,
    pub name: LumpName,
}

impl DirectoryEntry {
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            position: r.u32()?,
            size: r.u32()?,
            name: r.name()?,
        })
    }

    /// One past the last byte of the lump.
    pub fn end(&self) -> u64 {
        u64::from(self.position) + u64::from(self.size)
    }
}

/*=======================================================================*/
/*                                  Wad                                  */
/*=======================================================================*/

/// An opened archive: parsed header + directory, and the source lumps are
/// read from.
#[derive(Debug)]
pub struct Wad<R = BufReader<File>> {
    header: WadHeader,
    /// Directory entries in the exact order they appear in the file.
    entries: Vec<DirectoryEntry>,
    /// exact name → index (later lumps shadow earlier ones)
    by_name: HashMap<String, usize>,
    source: R,
    file_len: u64,
    cache: Option<HashMap<usize, Arc<[u8]>>>,
}

impl Wad<BufReader<File>> {
    /// Open a WAD file read-only and parse its directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let wad = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(
            "opened {} ({}, {} lumps)",
            path.display(),
            wad.kind(),
            wad.len()
        );
        Ok(wad)
    }
}

impl<R: Read + Seek> Wad<R> {
    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    pub fn from_reader(mut source: R) -> Result<Self> {
        let file_len = stream_len(&mut source)?;

        /*----------- 1. read and validate header ------------------------*/
        let header = WadHeader::parse(&read_exact_at(&mut source, 0, HEADER_SIZE)?)?;
        if header.kind() == WadKind::NonStandard {
            warn!(
                "non-standard WAD signature {:?}",
                String::from_utf8_lossy(&header.signature)
            );
        }

        /*----------- 2. sanity-check directory bounds -------------------*/
        let dir_offset = u64::from(header.directory_offset);
        let dir_len = header.directory_len();
        if dir_offset + dir_len > file_len {
            return Err(WadError::TruncatedData {
                offset: dir_offset,
                needed: dir_len,
                available: file_len.saturating_sub(dir_offset),
            });
        }

        /*----------- 3. parse directory entries -------------------------*/
        let dir = read_exact_at(&mut source, dir_offset, dir_len as usize)?;
        let mut cursor = ByteReader::new(&dir);
        let entries = (0..header.lump_count)
            .map(|_| DirectoryEntry::parse(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        /*----------- 4. build reverse index -----------------------------*/
        let mut by_name = HashMap::with_capacity(entries.len());
        // scan *backwards* so later lumps override earlier ones
        for (i, e) in entries.iter().enumerate().rev() {
            by_name.entry(e.name.to_string()).or_insert(i);
        }

        debug!(
            "directory: {} entries at offset {}",
            entries.len(),
            header.directory_offset
        );

        Ok(Self {
            header,
            entries,
            by_name,
            source,
            file_len,
            cache: None,
        })
    }

    /// Keep every fetched lump in memory, keyed by directory index.
    ///
    /// The cache is never invalidated on its own: if the file may have
    /// changed on disk, call [`Wad::clear_cache`].
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(HashMap::new());
        self
    }

    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }

    // ---------------------------------------------------------------------
    // Directory queries
    // ---------------------------------------------------------------------

    pub fn header(&self) -> &WadHeader {
        &self.header
    }

    pub fn kind(&self) -> WadKind {
        self.header.kind()
    }

    /// Directory as a read-only slice, on-disk order.
    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Result<&DirectoryEntry> {
        self.entries.get(index).ok_or(WadError::IndexOutOfRange {
            what: "directory",
            index,
            len: self.entries.len(),
        })
    }

    /// Every entry whose name starts with `prefix` (case-sensitive), in
    /// directory order.
    pub fn find<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (usize, &'a DirectoryEntry)> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.name.starts_with(prefix))
    }

    /// Find the last lump called exactly `name`.
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Directory index of the map marker called exactly `map_name`.
    pub fn locate_map(&self, map_name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.name.as_bytes() == map_name.as_bytes())
            .ok_or_else(|| WadError::NotFound(map_name.to_owned()))
    }

    /// The marker at `index` plus the ten lumps that make up its map.
    pub fn map_entries(&self, index: usize) -> Result<&[DirectoryEntry]> {
        let end = index + MAP_ENTRY_COUNT;
        if end > self.entries.len() {
            return Err(WadError::IndexOutOfRange {
                what: "map lump",
                index: end - 1,
                len: self.entries.len(),
            });
        }
        Ok(&self.entries[index..end])
    }

    /// Return directory indices of every map marker (`E#M#`, `MAP##`).
    pub fn level_indices(&self) -> Vec<usize> {
        static RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(E[1-4]M[1-9]|MAP[0-3][0-9])$").expect("static map-marker regex")
        });

        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.size == 0 && RE.is_match(e.name.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    // ---------------------------------------------------------------------
    // Lump data
    // ---------------------------------------------------------------------

    /// Read the bytes described by `entry`.  The result is always exactly
    /// `entry.size` bytes long; a short file is `TruncatedData`.
    pub fn read_entry(&mut self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        let start = u64::from(entry.position);
        if entry.end() > self.file_len {
            return Err(WadError::TruncatedData {
                offset: start,
                needed: u64::from(entry.size),
                available: self.file_len.saturating_sub(start),
            });
        }
        debug!(
            "reading lump {} ({} bytes @ {})",
            entry.name, entry.size, entry.position
        );
        read_exact_at(&mut self.source, start, entry.size as usize)
    }

    /// Bytes of lump `index`, served from the cache when enabled.
    pub fn lump(&mut self, index: usize) -> Result<Arc<[u8]>> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&index)) {
            return Ok(Arc::clone(hit));
        }
        let entry = *self.entry(index)?;
        let bytes: Arc<[u8]> = self.read_entry(&entry)?.into();
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(index, Arc::clone(&bytes));
        }
        Ok(bytes)
    }

    /// Bytes of the last lump called exactly `name`.
    pub fn lump_by_name(&mut self, name: &str) -> Result<Arc<[u8]>> {
        let index = self
            .find_lump(name)
            .ok_or_else(|| WadError::NotFound(name.to_owned()))?;
        self.lump(index)
    }

    // ---------------------------------------------------------------------
    // Reporting
    // ---------------------------------------------------------------------

    /// Human-readable header summary.
    pub fn report(&self) -> String {
        format!(
            "signature: {} ({})\ntotal number of lumps: {}\nlocation of directory: {}",
            String::from_utf8_lossy(&self.header.signature),
            self.kind(),
            self.header.lump_count,
            self.header.directory_offset
        )
    }
}

// ==========================================================================
// Tests
// ==========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wad::test_support::{WadBuilder, encode_name};
    use std::io::Cursor;

    /*------------------------------------------------------------------*/
    /* 1. Header sanity                                                 */
    /*------------------------------------------------------------------*/
    #[test]
    fn reads_header_and_directory() {
        let wad = WadBuilder::new()
            .lump("PLAYPAL", &[0u8; 768])
            .lump("COLORMAP", &[0u8; 256])
            .open();
        assert_eq!(wad.kind(), WadKind::Internal);
        assert_eq!(wad.header().lump_count, 2);
        assert_eq!(wad.len(), 2);
        assert_eq!(wad.directory()[0].name.as_str(), "PLAYPAL");
        assert_eq!(wad.directory()[0].position, HEADER_SIZE as u32);
        assert_eq!(wad.directory()[1].size, 256);
    }

    #[test]
    fn pwad_and_nonstandard_signatures_accepted() {
        let wad = WadBuilder::new().magic(b"PWAD").open();
        assert_eq!(wad.kind(), WadKind::Patch);
        let wad = WadBuilder::new().magic(b"XWAD").open();
        assert_eq!(wad.kind(), WadKind::NonStandard);
        assert!(wad.is_empty());
    }

    /*------------------------------------------------------------------*/
    /* 2. Bad-magic guard                                               */
    /*------------------------------------------------------------------*/
    #[test]
    fn rejects_garbage_signature() {
        let bytes = WadBuilder::new().magic(b"IWAX").build();
        let err = Wad::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, WadError::InvalidSignature(sig) if &sig == b"IWAX"));
    }

    #[test]
    fn short_header_is_truncated() {
        let err = Wad::from_reader(Cursor::new(b"IWAD\x01\0".to_vec())).unwrap_err();
        assert!(matches!(err, WadError::TruncatedData { needed: 12, .. }));
    }

    /*------------------------------------------------------------------*/
    /* 3. Directory-bounds guard                                        */
    /*------------------------------------------------------------------*/
    #[test]
    fn directory_past_eof_is_truncated() {
        // header claims two entries but only one follows
        let mut wad = Vec::<u8>::new();
        wad.extend_from_slice(b"IWAD");
        wad.extend(&2u32.to_le_bytes()); // num_lumps
        wad.extend(&12u32.to_le_bytes()); // dir_offset
        wad.extend(&0u32.to_le_bytes());
        wad.extend(&0u32.to_le_bytes());
        wad.extend(b"ONLY\0\0\0\0");

        let err = Wad::from_reader(Cursor::new(wad)).unwrap_err();
        assert!(matches!(
            err,
            WadError::TruncatedData {
                offset: 12,
                needed: 32,
                available: 16
            }
        ));
    }

    /*------------------------------------------------------------------*/
    /* 4. Entry encoding                                                */
    /*------------------------------------------------------------------*/
    #[test]
    fn directory_entry_roundtrip() {
        for (pos, size, name) in [
            (12u32, 4u32, "E1M1"),
            (0xdead_beef, 0, "EIGHTCHR"),
            (7, 1, "A"),
        ] {
            let mut raw = Vec::new();
            raw.extend(&pos.to_le_bytes());
            raw.extend(&size.to_le_bytes());
            raw.extend(&encode_name(name));

            let e = DirectoryEntry::parse(&mut ByteReader::new(&raw)).unwrap();
            assert_eq!((e.position, e.size, e.name.as_str()), (pos, size, name));
            assert_eq!(e.name, LumpName::new(name));
        }
    }

    /*------------------------------------------------------------------*/
    /* 5. Lookups                                                       */
    /*------------------------------------------------------------------*/
    #[test]
    fn find_returns_prefixed_entries_in_order() {
        let wad = WadBuilder::new()
            .marker("MAP01")
            .lump("THINGS", &[0u8; 10])
            .marker("MAP02")
            .open();
        let hits: Vec<_> = wad.find("MAP").map(|(i, e)| (i, e.name.as_str())).collect();
        assert_eq!(hits, vec![(0, "MAP01"), (2, "MAP02")]);
        assert_eq!(wad.find("map").count(), 0);
        assert_eq!(wad.find("").count(), 3);
    }

    #[test]
    fn later_lumps_shadow_earlier_ones() {
        let mut wad = WadBuilder::new()
            .lump("PLAYPAL", &[1])
            .lump("PLAYPAL", &[2])
            .open();
        assert_eq!(wad.find_lump("PLAYPAL"), Some(1));
        assert_eq!(&*wad.lump_by_name("PLAYPAL").unwrap(), &[2]);
        assert!(matches!(
            wad.lump_by_name("COLORMAP").unwrap_err(),
            WadError::NotFound(n) if n == "COLORMAP"
        ));
    }

    #[test]
    fn locate_map_and_its_lumps() {
        let mut b = WadBuilder::new().lump("PLAYPAL", &[0u8; 768]).marker("E1M1");
        for name in MAP_LUMPS {
            b = b.lump(name, &[]);
        }
        let wad = b.marker("E1M2").lump("THINGS", &[]).open();

        let idx = wad.locate_map("E1M1").unwrap();
        assert_eq!(idx, 1);
        let lumps = wad.map_entries(idx).unwrap();
        assert_eq!(lumps.len(), MAP_ENTRY_COUNT);
        assert_eq!(lumps[10].name.as_str(), "BLOCKMAP");

        assert_eq!(wad.level_indices(), vec![1, 12]);

        let short = wad.locate_map("E1M2").unwrap();
        assert!(matches!(
            wad.map_entries(short).unwrap_err(),
            WadError::IndexOutOfRange { .. }
        ));
        assert!(matches!(
            wad.locate_map("E1M").unwrap_err(),
            WadError::NotFound(_)
        ));
    }

    /*------------------------------------------------------------------*/
    /* 6. Lump fetch                                                    */
    /*------------------------------------------------------------------*/
    #[test]
    fn lump_len_matches_directory() {
        let mut wad = WadBuilder::new()
            .lump("A", &[1, 2, 3])
            .marker("B")
            .lump("C", &[9; 40])
            .open();
        for i in 0..wad.len() {
            let size = wad.directory()[i].size as usize;
            assert_eq!(wad.lump(i).unwrap().len(), size);
        }
        assert!(matches!(
            wad.lump(3).unwrap_err(),
            WadError::IndexOutOfRange { index: 3, len: 3, .. }
        ));
    }

    #[test]
    fn lump_past_eof_is_truncated() {
        let mut wad = WadBuilder::new().lump("A", &[1, 2, 3]).open();
        let bogus = DirectoryEntry {
            position: 1_000, // way past EOF
            size: 4,
            name: LumpName::new("BAD"),
        };
        assert!(matches!(
            wad.read_entry(&bogus).unwrap_err(),
            WadError::TruncatedData {
                offset: 1_000,
                needed: 4,
                available: 0
            }
        ));
    }

    #[test]
    fn cache_serves_same_bytes() {
        let mut wad = WadBuilder::new().lump("A", &[5; 8]).open().with_cache();
        let first = wad.lump(0).unwrap();
        let second = wad.lump(0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        wad.clear_cache();
        let third = wad.lump(0).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn opens_file_on_disk() {
        let bytes = WadBuilder::new().magic(b"PWAD").lump("DEMO1", &[7; 3]).build();
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(tmp.path(), &bytes).unwrap();

        let mut wad = Wad::open(tmp.path()).unwrap();
        assert_eq!(wad.kind(), WadKind::Patch);
        assert_eq!(&*wad.lump(0).unwrap(), &[7, 7, 7]);
        assert!(wad.report().contains("Patch WAD"));
    }
}
