//! The sfnt header, its table directory, and checksums.

use crate::{Error, Result, Tag};

record! {
    /// Locates a table in the font file.
    pub struct TableRecord {
        tag: Tag,
        checksum: u32,
        offset: u32,
        length: u32,
    }
}

record! {
    /// The sfnt header that precedes the table records.
    pub struct FontHeader {
        version: u32,
        num_tables: u16,
        search_range: u16,
        entry_selector: u16,
        range_shift: u16,
    }
}

impl FontHeader {
    /// A header for `num_tables` tables with its binary search fields filled in.
    pub fn new(version: u32, num_tables: u16) -> Result<Self> {
        let (search_range, entry_selector, range_shift) = search_params(num_tables, 16)?;
        Ok(Self { version, num_tables, search_range, entry_selector, range_shift })
    }
}

/// The magic number the whole-file checksum is subtracted from.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

/// The offset of the checksum adjustment field in the head table.
pub const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// Compute the `(searchRange, entrySelector, rangeShift)` triple used by
/// binary-searchable arrays of `count` units of `unit` bytes each.
pub fn search_params(count: u16, unit: u16) -> Result<(u16, u16, u16)> {
    if count == 0 {
        return Ok((0, 0, 0));
    }

    let entry_selector = u16::BITS - 1 - count.leading_zeros();
    let search_range = (1u32 << entry_selector) * u32::from(unit);
    let range_shift = u32::from(count) * u32::from(unit) - search_range;
    let narrow = |v: u32| u16::try_from(v).map_err(|_| Error::Overflow);
    Ok((narrow(search_range)?, entry_selector as u16, narrow(range_shift)?))
}

/// Calculate a checksum over the sliced data as a sum of u32s. If the data
/// length is not a multiple of four, it is treated as if padded with zero to a
/// length that is a multiple of four.
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    for chunk in data.chunks(4) {
        let mut bytes = [0; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(bytes));
    }
    sum
}

/// Round an offset up to the next multiple of four.
pub fn long_align(offset: usize) -> Result<usize> {
    offset.checked_add(3).map(|v| v & !3).ok_or(Error::Overflow)
}

/// The table records of a font under construction.
///
/// Records are unique by tag. Deleted records keep their slot with the
/// [`Tag::DELETED`] tag until the directory is compacted.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    records: Vec<TableRecord>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Fails if a live record with the same tag exists.
    pub fn insert(&mut self, record: TableRecord) -> Result<()> {
        if record.tag == Tag::DELETED || self.find(record.tag).is_some() {
            return Err(Error::InvalidData);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn find(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.iter().find(|record| record.tag == tag && tag != Tag::DELETED)
    }

    pub fn find_mut(&mut self, tag: Tag) -> Option<&mut TableRecord> {
        self.records.iter_mut().find(|record| record.tag == tag && tag != Tag::DELETED)
    }

    /// Locate a table, failing if it is absent.
    pub fn get(&self, tag: Tag) -> Result<TableRecord> {
        self.find(tag).copied().ok_or(Error::MissingTable(tag))
    }

    /// Mark a table for deletion. Deleting an absent table does nothing.
    pub fn mark_deleted(&mut self, tag: Tag) {
        if let Some(record) = self.find_mut(tag) {
            record.tag = Tag::DELETED;
        }
    }

    /// Whether another live record shares the bytes at `offset`.
    pub fn is_shared(&self, tag: Tag, offset: u32) -> bool {
        self.live().any(|record| record.tag != tag && record.offset == offset)
    }

    fn live(&self) -> impl Iterator<Item = &TableRecord> + '_ {
        self.records.iter().filter(|record| record.tag != Tag::DELETED)
    }

    /// Drop deleted records and return the live ones sorted by offset.
    pub fn compact_by_offset(&mut self) -> Vec<TableRecord> {
        self.records.retain(|record| record.tag != Tag::DELETED);
        let mut records = self.records.clone();
        records.sort_by_key(|record| (record.offset, record.tag));
        records
    }

}
