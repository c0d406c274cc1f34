//! SYSCONF item table — entry lookup and in-place payload mutation.
//!
//! # Layout
//!
//! | Field | Offset | Size |
//! |-------|--------|------|
//! | Lookup pointer | `EOF - 8` | 2 B |
//! | Item count | `4` (legacy header) | 2 B |
//! | Item offsets | header + 2 | `2 * count` B |
//! | Item metadata | item offset | 1 B, skipped |
//! | Item name | item offset + 1 | key length |
//! | Item payload | item offset + 1 + key length | 1 B |
//!
//! # Resolution
//!
//! The lookup pointer is an optional cache kept by the system menu.  When it
//! is non-zero it names a location that holds the offset of an item.  That
//! item's name is checked against the key before the pointer is trusted; a
//! mismatch (or a pointer that runs off the end of the blob) only means the
//! cache is stale, and [`TableReader::resolve_offset`] falls back to a linear
//! scan of the legacy table at offset 4.
//!
//! # Mutation
//!
//! Only the single payload byte is ever written.  Counts, offsets and names
//! are never touched.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::TableError;

/// Distance of the lookup pointer from end-of-file.
pub const TRAILER_SIZE:         u64 = 8;
/// Absolute offset of the legacy table header.
pub const LEGACY_HEADER_OFFSET: u64 = 4;
/// Leading metadata bytes skipped before an item's name.
pub const ITEM_METADATA_LEN:    u64 = 1;
/// Name of the display aspect ratio entry.
pub const ASPECT_RATIO_KEY:     &[u8; 6] = b"IPL.AR";

/// Byte order of the 16-bit table fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Native order of the console (PowerPC).
    #[default]
    Big,
    Little,
}

/// Absolute offset of an item's payload given the item's own offset.
pub fn payload_offset(item_offset: u64, key_len: usize) -> u64 {
    item_offset + ITEM_METADATA_LEN + key_len as u64
}

// ── TableEntry ────────────────────────────────────────────────────────────────

/// One row of the legacy item table, as returned by [`TableReader::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Position in the offset array.
    pub index:          usize,
    pub item_offset:    u64,
    /// Raw name bytes; only as many as were requested.
    pub name:           Vec<u8>,
    pub payload_offset: u64,
}

impl TableEntry {
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

// ── TableReader ───────────────────────────────────────────────────────────────

/// Resolves named entries inside a SYSCONF blob held by any seekable handle.
///
/// The reader holds no cached table state; every call re-reads what it needs
/// from the handle.
pub struct TableReader<R> {
    inner:      R,
    byte_order: ByteOrder,
}

impl<R: Read + Seek> TableReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_byte_order(inner, ByteOrder::default())
    }

    pub fn with_byte_order(inner: R, byte_order: ByteOrder) -> Self {
        Self { inner, byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder { self.byte_order }

    pub fn into_inner(self) -> R { self.inner }

    fn read_u16(&mut self) -> io::Result<u16> {
        match self.byte_order {
            ByteOrder::Big    => self.inner.read_u16::<BigEndian>(),
            ByteOrder::Little => self.inner.read_u16::<LittleEndian>(),
        }
    }

    fn read_u16_at(&mut self, at: u64) -> io::Result<u16> {
        self.inner.seek(SeekFrom::Start(at))?;
        self.read_u16()
    }

    fn read_name_at(&mut self, item_offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(item_offset + ITEM_METADATA_LEN))?;
        let mut name = vec![0u8; len];
        self.inner.read_exact(&mut name)?;
        Ok(name)
    }

    /// Read the trailer's lookup pointer.  Returns 0 when the blob is too
    /// short to carry a trailer at all.
    pub fn lookup_pointer(&mut self) -> io::Result<u16> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        if end < TRAILER_SIZE {
            return Ok(0);
        }
        self.inner.seek(SeekFrom::Start(end - TRAILER_SIZE))?;
        self.read_u16()
    }

    /// Resolve `key` through the trailer lookup pointer.
    ///
    /// `Ok(None)` means the fast path is unavailable or stale; only I/O
    /// failures other than running past end-of-file are errors.
    pub fn resolve_fast(&mut self, key: &[u8]) -> Result<Option<u64>, TableError> {
        let pointer = self.lookup_pointer()?;
        if pointer == 0 {
            debug!("lookup pointer absent");
            return Ok(None);
        }

        let item_offset = match stale_on_eof(self.read_u16_at(pointer as u64))? {
            Some(o) => o as u64,
            None => {
                debug!(pointer, "lookup pointer runs past end of blob");
                return Ok(None);
            }
        };

        let name = match stale_on_eof(self.read_name_at(item_offset, key.len()))? {
            Some(n) => n,
            None => {
                debug!(pointer, item_offset, "indexed item runs past end of blob");
                return Ok(None);
            }
        };

        if name == key {
            let offset = payload_offset(item_offset, key.len());
            debug!(pointer, item_offset, offset, "fast path hit");
            Ok(Some(offset))
        } else {
            debug!(
                pointer,
                item_offset,
                found = %String::from_utf8_lossy(&name),
                "lookup pointer is stale"
            );
            Ok(None)
        }
    }

    /// Read the legacy header: item count followed by that many offsets.
    pub fn item_offsets(&mut self) -> io::Result<Vec<u16>> {
        self.inner.seek(SeekFrom::Start(LEGACY_HEADER_OFFSET))?;
        let count = self.read_u16()? as usize;
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(self.read_u16()?);
        }
        Ok(offsets)
    }

    /// Resolve `key` by walking every item of the legacy table in file order.
    pub fn resolve_by_scan(&mut self, key: &[u8]) -> Result<u64, TableError> {
        let offsets = self.item_offsets()?;
        debug!(count = offsets.len(), "scanning item table");

        for item_offset in offsets {
            let item_offset = item_offset as u64;
            let name = self.read_name_at(item_offset, key.len())?;
            trace!(item_offset, name = %String::from_utf8_lossy(&name), "scan");
            if name == key {
                let offset = payload_offset(item_offset, key.len());
                debug!(item_offset, offset, "scan hit");
                return Ok(offset);
            }
        }

        Err(TableError::not_found(key))
    }

    /// Fast path first, scan on miss.  A stale index never surfaces here.
    pub fn resolve_offset(&mut self, key: &[u8]) -> Result<u64, TableError> {
        if let Some(offset) = self.resolve_fast(key)? {
            return Ok(offset);
        }
        self.resolve_by_scan(key)
    }

    pub fn read_payload_byte(&mut self, offset: u64) -> Result<u8, TableError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(self.inner.read_u8()?)
    }

    /// List every item of the legacy table, reading `name_len` name bytes
    /// from each.
    pub fn entries(&mut self, name_len: usize) -> Result<Vec<TableEntry>, TableError> {
        let offsets = self.item_offsets()?;
        let mut entries = Vec::with_capacity(offsets.len());
        for (index, item_offset) in offsets.into_iter().enumerate() {
            let item_offset = item_offset as u64;
            let name = self.read_name_at(item_offset, name_len)?;
            entries.push(TableEntry {
                index,
                item_offset,
                name,
                payload_offset: payload_offset(item_offset, name_len),
            });
        }
        Ok(entries)
    }
}

impl<R: Read + Write + Seek> TableReader<R> {
    /// Overwrite the single payload byte at `offset`.
    pub fn write_payload_byte(&mut self, offset: u64, value: u8) -> Result<(), TableError> {
        self.write_u8_at(offset, value)
            .map_err(|source| TableError::Write { offset, source })
    }

    fn write_u8_at(&mut self, offset: u64, value: u8) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(&[value])?;
        self.inner.flush()
    }
}

fn stale_on_eof<T>(result: io::Result<T>) -> Result<Option<T>, TableError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    const BLOB_LEN: usize = 0x100;

    /// Lay out a blob with the legacy header at 4, one item per
    /// `(offset, name, payload)`, and `lookup` as the trailer pointer.
    fn blob(items: &[(u16, &str, u8)], lookup: u16) -> Vec<u8> {
        let mut buf = vec![0u8; BLOB_LEN];
        buf[0..4].copy_from_slice(b"SCv0");
        buf[4..6].copy_from_slice(&(items.len() as u16).to_be_bytes());
        for (i, (offset, name, payload)) in items.iter().enumerate() {
            let at = 6 + i * 2;
            buf[at..at + 2].copy_from_slice(&offset.to_be_bytes());
            let o = *offset as usize;
            buf[o] = 0x3f;
            buf[o + 1..o + 1 + name.len()].copy_from_slice(name.as_bytes());
            buf[o + 1 + name.len()] = *payload;
        }
        buf[BLOB_LEN - 8..BLOB_LEN - 6].copy_from_slice(&lookup.to_be_bytes());
        buf
    }

    fn three_items(lookup: u16) -> Vec<u8> {
        blob(
            &[(0x20, "IPL.SS", 0x01), (0x40, "IPL.AR", 0x00), (0x60, "IPL.PC", 0x07)],
            lookup,
        )
    }

    /// Point the trailer at a slot holding `item_offset`.
    fn with_index(mut buf: Vec<u8>, slot: u16, item_offset: u16) -> Vec<u8> {
        let s = slot as usize;
        buf[s..s + 2].copy_from_slice(&item_offset.to_be_bytes());
        buf[BLOB_LEN - 8..BLOB_LEN - 6].copy_from_slice(&slot.to_be_bytes());
        buf
    }

    #[test]
    fn scan_finds_middle_item() {
        let mut r = TableReader::new(Cursor::new(three_items(0)));
        assert_eq!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap(), 0x47);
        assert_eq!(r.read_payload_byte(0x47).unwrap(), 0);
    }

    #[test]
    fn toggle_in_place_concrete() {
        let mut r = TableReader::new(Cursor::new(three_items(0)));
        let off = r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap();
        r.write_payload_byte(off, 1).unwrap();
        assert_eq!(r.read_payload_byte(off).unwrap(), 1);

        let buf = r.into_inner().into_inner();
        let mut expected = three_items(0);
        expected[0x47] = 1;
        assert_eq!(buf, expected);
    }

    #[test]
    fn fast_path_matches_scan() {
        let buf = with_index(three_items(0), 0x90, 0x40);
        let mut r = TableReader::new(Cursor::new(buf));
        assert_eq!(r.lookup_pointer().unwrap(), 0x90);
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), Some(0x47));
        assert_eq!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap(), 0x47);
        assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), 0x47);
    }

    #[test]
    fn zero_pointer_falls_back() {
        let mut r = TableReader::new(Cursor::new(three_items(0)));
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), None);
        assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), 0x47);
    }

    #[test]
    fn stale_pointer_falls_back() {
        // Index points at IPL.SS instead.
        let buf = with_index(three_items(0), 0x90, 0x20);
        let mut r = TableReader::new(Cursor::new(buf));
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), None);
        assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), 0x47);
    }

    #[test]
    fn pointer_past_eof_is_stale() {
        let mut r = TableReader::new(Cursor::new(three_items(0xfff0)));
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), None);
        assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), 0x47);

        let buf = with_index(three_items(0), 0x90, 0xfff0);
        let mut r = TableReader::new(Cursor::new(buf));
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), None);
    }

    #[test]
    fn not_found_propagates() {
        let buf = blob(&[(0x20, "IPL.SS", 0), (0x40, "IPL.PC", 0)], 0);
        let mut r = TableReader::new(Cursor::new(buf.clone()));
        assert!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap_err().is_not_found());

        let buf = with_index(buf, 0x90, 0x20);
        let mut r = TableReader::new(Cursor::new(buf));
        match r.resolve_offset(ASPECT_RATIO_KEY) {
            Err(TableError::EntryNotFound { key }) => assert_eq!(key, "IPL.AR"),
            other => panic!("expected EntryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_not_found() {
        let mut r = TableReader::new(Cursor::new(blob(&[], 0)));
        assert!(r.item_offsets().unwrap().is_empty());
        assert!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_table_reads_no_offsets() {
        // Header claims zero items and the blob ends right after the count.
        let buf = vec![b'S', b'C', b'v', b'0', 0x00, 0x00];
        let mut r = TableReader::new(Cursor::new(buf));
        assert!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap_err().is_not_found());
        assert!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap_err().is_not_found());
    }

    #[test]
    fn truncated_table_is_io_fault() {
        // Count of 5 but the blob ends after the first offset.
        let buf = vec![0, 0, 0, 0, 0x00, 0x05, 0x00, 0x20];
        let mut r = TableReader::new(Cursor::new(buf));
        assert!(matches!(r.resolve_by_scan(ASPECT_RATIO_KEY), Err(TableError::Io(_))));
    }

    #[test]
    fn read_past_end_is_io_fault() {
        let mut r = TableReader::new(Cursor::new(three_items(0)));
        assert!(matches!(r.read_payload_byte(BLOB_LEN as u64), Err(TableError::Io(_))));
    }

    #[test]
    fn short_write_is_io_fault() {
        // A fixed-size slice cannot grow, so writing at its end writes 0 bytes.
        let mut buf = three_items(0);
        let mut r = TableReader::new(Cursor::new(buf.as_mut_slice()));
        let err = r.write_payload_byte(BLOB_LEN as u64, 1).unwrap_err();
        assert!(matches!(err, TableError::Write { offset, .. } if offset == BLOB_LEN as u64));
        assert!(err.is_io_fault());
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::WriteZero);
        r.write_payload_byte(0x47, 1).unwrap();
        assert_eq!(buf[0x47], 1);
    }

    #[test]
    fn little_endian_fields() {
        let mut buf = vec![0u8; 0x40];
        buf[4..6].copy_from_slice(&1u16.to_le_bytes());
        buf[6..8].copy_from_slice(&0x20u16.to_le_bytes());
        buf[0x21..0x27].copy_from_slice(ASPECT_RATIO_KEY);
        let mut r = TableReader::with_byte_order(Cursor::new(buf), ByteOrder::Little);
        assert_eq!(r.byte_order(), ByteOrder::Little);
        assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), 0x27);
    }

    #[test]
    fn entries_lists_table_in_order() {
        let mut r = TableReader::new(Cursor::new(three_items(0)));
        let entries = r.entries(6).unwrap();
        let names: Vec<String> = entries.iter().map(|e| e.name_lossy()).collect();
        assert_eq!(names, ["IPL.SS", "IPL.AR", "IPL.PC"]);
        assert_eq!(entries[2].index, 2);
        assert_eq!(entries[2].item_offset, 0x60);
        assert_eq!(entries[2].payload_offset, 0x67);
    }

    #[test]
    fn blob_shorter_than_trailer_has_no_pointer() {
        let mut r = TableReader::new(Cursor::new(vec![0u8; 5]));
        assert_eq!(r.lookup_pointer().unwrap(), 0);
        assert_eq!(r.resolve_fast(ASPECT_RATIO_KEY).unwrap(), None);
    }

    proptest! {
        #[test]
        fn scan_is_position_independent(n in 1usize..12, k_seed in any::<usize>()) {
            let k = k_seed % n;
            let names: Vec<String> = (0..n)
                .map(|i| if i == k { "IPL.AR".to_string() } else { format!("ITM.{i:02}") })
                .collect();
            let items: Vec<(u16, &str, u8)> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (0x30 + (i as u16) * 0x0c, name.as_str(), 0u8))
                .collect();
            let mut r = TableReader::new(Cursor::new(blob(&items, 0)));
            let expected = payload_offset(0x30 + (k as u64) * 0x0c, 6);
            prop_assert_eq!(r.resolve_by_scan(ASPECT_RATIO_KEY).unwrap(), expected);
            prop_assert_eq!(r.resolve_offset(ASPECT_RATIO_KEY).unwrap(), expected);
        }
    }
}
