use std::io;
use thiserror::Error;

/// Everything that can go wrong while opening a WAD or decoding its lumps.
///
/// Decoders never recover internally: the first structural violation is
/// returned with enough context (offsets, sizes, indices) to diagnose it.
#[derive(Error, Debug)]
pub enum WadError {
    /// Underlying I/O failure – propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer bytes available than a field or record requires.
    #[error("truncated data at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedData {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Header bytes 1..4 are not `WAD`.
    #[error("invalid WAD signature {0:?}")]
    InvalidSignature([u8; 4]),

    /// Lump length is not a whole number of records.
    #[error("malformed {record} lump: {len} bytes is not a multiple of {stride}")]
    MalformedLump {
        record: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Picture header claims 256 or more columns.
    #[error("picture width {width} exceeds 255 columns (truncates to {truncated})")]
    WidthOverflow { width: u16, truncated: u16 },

    #[error("palette {index} out of range for a {len}-byte palette lump")]
    PaletteIndexOutOfRange { index: usize, len: usize },

    #[error("lump `{0}` not found")]
    NotFound(String),

    #[error("map {map}: expected `{expected}` at directory index {index}")]
    MissingMapLump {
        map: String,
        expected: &'static str,
        index: usize,
    },

    #[error("record {index}: {source}")]
    BadRecord {
        index: usize,
        source: bincode::error::DecodeError,
    },
}

pub type Result<T, E = WadError> = std::result::Result<T, E>;
