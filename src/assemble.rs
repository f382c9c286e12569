//! Final assembly: gap compaction, directory and checksums.

use crate::buffer::OutputFont;
use crate::codec::Record;
use crate::directory::{
    checksum, long_align, FontHeader, TableRecord, CHECKSUM_ADJUSTMENT_OFFSET,
    CHECKSUM_MAGIC,
};
use crate::stream::Writer;
use crate::util::{add, to_u16, to_u32};
use crate::{Result, Tag};
use rustc_hash::FxHashMap;

/// Turn the font under construction into a finished font file.
///
/// Deleted tables are dropped and the remaining ones are moved towards the
/// front in ascending offset order so that no gaps remain between them. The
/// directory is then written sorted by tag, and all checksums are computed.
pub fn finish(mut font: OutputFont) -> Result<Vec<u8>> {
    let records = font.dir.compact_by_offset();
    let header_len = add(FontHeader::SIZE, records.len() * TableRecord::SIZE)?;

    let mut cursor = header_len;
    let mut moved: FxHashMap<u32, u32> = FxHashMap::default();
    let mut placed = Vec::with_capacity(records.len());

    for record in records {
        let offset = match moved.get(&record.offset) {
            Some(&offset) => offset,
            None => {
                let len = record.length as usize;
                font.buf.move_down(record.offset as usize, len, cursor)?;
                let end = add(cursor, len)?;
                let next = long_align(end)?;
                font.buf.grow(next)?;
                font.buf.get_mut(end, next - end)?.fill(0);
                let offset = to_u32(cursor)?;
                moved.insert(record.offset, offset);
                cursor = next;
                offset
            }
        };

        if offset != record.offset {
            log::trace!("moved {} from {} to {}", record.tag, record.offset, offset);
        }

        placed.push(TableRecord { offset, ..record });
    }

    font.buf.truncate(cursor);

    // The adjustment is part of head and must be zero while checksumming.
    let head = placed.iter().find(|record| record.tag == Tag::HEAD).copied();
    if let Some(head) = head {
        let at = add(head.offset as usize, CHECKSUM_ADJUSTMENT_OFFSET)?;
        font.buf.get_mut(at, 4)?.fill(0);
    }

    for record in &mut placed {
        record.checksum = checksum(font.buf.get(record.offset as usize, record.length as usize)?);
    }

    placed.sort_by_key(|record| record.tag);

    let mut w = Writer::with_capacity(header_len);
    w.write(FontHeader::new(font.version, to_u16(placed.len())?)?);
    for record in &placed {
        w.write(*record);
    }
    font.buf.write(0, &w.finish())?;

    if let Some(head) = head {
        let at = add(head.offset as usize, CHECKSUM_ADJUSTMENT_OFFSET)?;
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(font.buf.as_slice()));
        font.buf.write(at, &adjustment.to_be_bytes())?;
    }

    log::debug!("assembled font with {} tables, {} bytes", placed.len(), cursor);
    Ok(font.buf.into_vec())
}
