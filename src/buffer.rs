//! The buffer the output font is constructed in.

use crate::codec::Record;
use crate::directory::{long_align, Directory, FontHeader, TableRecord};
use crate::util::{add, to_u32};
use crate::{Error, Face, Result, Tag};

/// An owned, growable byte buffer.
///
/// All writes are bounds-checked against the current length, and growth goes
/// through `try_reserve` so that allocation failure is reported instead of
/// aborting.
#[derive(Debug, Default)]
pub struct FontBuffer {
    data: Vec<u8>,
}

impl FontBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve(capacity).map_err(|_| Error::OutOfMemory)?;
        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get a range of the buffer.
    pub fn get(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.get(offset..add(offset, len)?).ok_or(Error::OutOfBounds)
    }

    /// Get a mutable range of the buffer.
    pub fn get_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = add(offset, len)?;
        self.data.get_mut(offset..end).ok_or(Error::OutOfBounds)
    }

    /// Grow the buffer with zeros up to `len`.
    pub fn grow(&mut self, len: usize) -> Result<()> {
        if len > self.data.len() {
            self.data
                .try_reserve(len - self.data.len())
                .map_err(|_| Error::OutOfMemory)?;
            self.data.resize(len, 0);
        }
        Ok(())
    }

    /// Pad with zeros to the next long-word boundary.
    pub fn long_align(&mut self) -> Result<usize> {
        let aligned = long_align(self.data.len())?;
        self.grow(aligned)?;
        Ok(aligned)
    }

    /// Append bytes at the next long-word boundary and return their offset.
    pub fn append_aligned(&mut self, bytes: &[u8]) -> Result<usize> {
        let offset = self.long_align()?;
        self.grow(add(offset, bytes.len())?)?;
        self.write(offset, bytes)?;
        Ok(offset)
    }

    /// Overwrite bytes within the current length.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.get_mut(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Move a range towards the front of the buffer.
    pub fn move_down(&mut self, from: usize, len: usize, to: usize) -> Result<()> {
        if to > from {
            return Err(Error::InvalidOffset);
        }
        self.get(from, len)?;
        self.data.copy_within(from..from + len, to);
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// A font under construction: a buffer plus the directory describing it.
///
/// The header and directory space is reserved at the front. Tables are first
/// copied verbatim from the input and then replaced one by one. A replacement
/// that fits is written in place and may leave a gap behind it; one that
/// doesn't is moved to the end. The gaps are removed when the font is
/// assembled.
#[derive(Debug)]
pub struct OutputFont {
    pub(crate) buf: FontBuffer,
    pub(crate) dir: Directory,
    pub(crate) version: u32,
}

impl OutputFont {
    /// Copy the tables of `face` for which `keep` returns `true`.
    ///
    /// One spare directory slot is reserved for a table that is added later.
    pub fn new(face: &Face, keep: impl Fn(Tag) -> bool) -> Result<Self> {
        let mut records: Vec<TableRecord> =
            face.records.iter().filter(|record| keep(record.tag)).copied().collect();
        records.sort_by_key(|record| (record.offset, record.tag));

        let total: usize = records.iter().map(|record| record.length as usize + 3).sum();
        let header_len = add(FontHeader::SIZE, (records.len() + 1) * TableRecord::SIZE)?;
        let mut buf = FontBuffer::with_capacity(add(header_len, total)?)?;
        buf.grow(header_len)?;

        let mut dir = Directory::new();
        let mut previous: Option<(TableRecord, u32)> = None;
        for record in records {
            // Tables that share their bytes keep sharing them.
            let offset = match previous {
                Some((prev, offset))
                    if prev.offset == record.offset && prev.length == record.length =>
                {
                    offset
                }
                _ => {
                    let data = face.table(record.tag).ok_or(Error::InvalidOffset)?;
                    to_u32(buf.append_aligned(data)?)?
                }
            };
            dir.insert(TableRecord { offset, ..record })?;
            previous = Some((record, offset));
        }

        Ok(Self { buf, dir, version: face.version })
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.dir.find(tag).is_some()
    }

    /// The current bytes of a table.
    pub fn table(&self, tag: Tag) -> Result<&[u8]> {
        let record = self.dir.get(tag)?;
        self.buf.get(record.offset as usize, record.length as usize)
    }

    /// Replace the contents of a table.
    pub fn update(&mut self, tag: Tag, bytes: &[u8]) -> Result<()> {
        let record = self.dir.get(tag)?;
        let offset = if bytes.len() <= record.length as usize
            && !self.dir.is_shared(tag, record.offset)
        {
            let start = record.offset as usize;
            self.buf.write(start, bytes)?;
            // Zero what's left of the old table so the gap is clean.
            let freed = record.length as usize - bytes.len();
            self.buf.get_mut(add(start, bytes.len())?, freed)?.fill(0);
            record.offset
        } else {
            to_u32(self.buf.append_aligned(bytes)?)?
        };

        let record = self.dir.find_mut(tag).ok_or(Error::MissingTable(tag))?;
        record.offset = offset;
        record.length = to_u32(bytes.len())?;
        Ok(())
    }

    /// Add a table that does not exist yet.
    pub fn insert(&mut self, tag: Tag, bytes: &[u8]) -> Result<()> {
        let offset = to_u32(self.buf.append_aligned(bytes)?)?;
        let length = to_u32(bytes.len())?;
        self.dir.insert(TableRecord { tag, checksum: 0, offset, length })
    }

    /// Let `tag` share the bytes of `target`.
    pub fn alias(&mut self, tag: Tag, target: Tag) -> Result<()> {
        let target = self.dir.get(target)?;
        let record = self.dir.find_mut(tag).ok_or(Error::MissingTable(tag))?;
        record.offset = target.offset;
        record.length = target.length;
        Ok(())
    }

    /// Mark a table for deletion.
    pub fn delete(&mut self, tag: Tag) {
        self.dir.mark_deleted(tag);
    }
}
