//! Bounds-checked little-endian primitives.
//!
//! * `ByteReader` walks an in-memory lump.
//! * `read_exact_at` pulls a byte range out of a seekable stream.
//! * `decode_records` turns a fixed-stride lump into typed records with
//!   **bincode 2** (fixed-int, little-endian).
//!
//! This is the only module that knows about byte order.

use bincode::{Decode, config, decode_from_slice};
use byteorder::{ByteOrder, LittleEndian as LE};
use std::{
    fmt,
    io::{Read, Seek, SeekFrom},
};

use super::error::{Result, WadError};

/*=======================================================================*/
/*                               Lump names                              */
/*=======================================================================*/

/// Eight-byte ASCII name, NUL-padded on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Decode)]
pub struct LumpName(pub [u8; 8]);

impl LumpName {
    /// Build a name from a string, truncating to eight bytes and padding
    /// with NULs.
    pub fn new(name: &str) -> Self {
        let mut raw = [0u8; 8];
        let src = name.as_bytes();
        let n = src.len().min(raw.len());
        raw[..n].copy_from_slice(&src[..n]);
        Self(raw)
    }

    /// Name bytes with the trailing NUL padding removed.
    pub fn as_bytes(&self) -> &[u8] {
        trim_nuls(&self.0)
    }

    /// Printable view; non-UTF-8 names collapse to `"?"`.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("?")
    }

    /// Case-sensitive prefix match on as many bytes as `prefix` supplies.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_bytes().starts_with(prefix.as_bytes())
    }
}

impl fmt::Display for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for LumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LumpName({:?})", self.to_string())
    }
}

/// Drop trailing NULs; interior bytes are kept as stored.
fn trim_nuls(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &raw[..end]
}

/*=======================================================================*/
/*                               ByteReader                              */
/*=======================================================================*/

/// Cursor over a byte slice.  Every read checks the remaining length and
/// fails with `TruncatedData` instead of returning partial values.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Move to absolute offset `pos`.  Seeking exactly to the end is
    /// allowed; the next read then fails.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.bytes.len() {
            return Err(WadError::IndexOutOfRange {
                what: "seek offset",
                index: pos,
                len: self.bytes.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(WadError::TruncatedData {
                offset: self.pos as u64,
                needed: n as u64,
                available: self.remaining() as u64,
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LE::read_u16(self.take(2)?))
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(LE::read_i16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LE::read_u32(self.take(4)?))
    }

    /// Eight-byte NUL-padded lump / texture name.
    pub fn name(&mut self) -> Result<LumpName> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(LumpName(raw))
    }

    /// Fixed-length ASCII field with trailing NULs stripped.
    pub fn ascii(&mut self, n: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(trim_nuls(self.take(n)?)).into_owned())
    }
}

/*=======================================================================*/
/*                           Stream helpers                              */
/*=======================================================================*/

/// Read exactly `len` bytes at `offset`.  A short read is `TruncatedData`,
/// never a shorter buffer.
pub fn read_exact_at<R: Read + Seek>(src: &mut R, offset: u64, len: usize) -> Result<Vec<u8>> {
    src.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    let read = src.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(WadError::TruncatedData {
            offset,
            needed: len as u64,
            available: read as u64,
        });
    }
    Ok(buf)
}

/// Total length of a seekable stream; the cursor is left at the start.
pub fn stream_len<R: Seek>(src: &mut R) -> Result<u64> {
    let len = src.seek(SeekFrom::End(0))?;
    src.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/*=======================================================================*/
/*                         Fixed-stride records                          */
/*=======================================================================*/

/// Decode a lump made of back-to-back `stride`-byte records.
///
/// An empty lump yields an empty vector; a trailing partial record is
/// `MalformedLump`.
pub fn decode_records<T>(bytes: &[u8], record: &'static str, stride: usize) -> Result<Vec<T>>
where
    T: Decode<()>,
{
    if bytes.len() % stride != 0 {
        return Err(WadError::MalformedLump {
            record,
            len: bytes.len(),
            stride,
        });
    }

    let cfg = config::standard()
        .with_fixed_int_encoding()
        .with_little_endian();

    bytes
        .chunks_exact(stride)
        .enumerate()
        .map(|(index, chunk)| {
            decode_from_slice::<T, _>(chunk, cfg)
                .map(|(val, _)| val)
                .map_err(|source| WadError::BadRecord { index, source })
        })
        .collect()
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
