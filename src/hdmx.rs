//! The `hdmx` table stores integer advance widths per pixel size. Each
//! device record has one byte per glyph, padded to a long-word boundary.

use super::*;
use crate::stream::Writer;

const HEADER_SIZE: usize = 8;

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let hdmx = ctx.out.table(Tag::HDMX)?;
    let sub = if ctx.compacts() {
        compact(hdmx, ctx.num_glyphs, ctx.mapper.remapped_gids())?
    } else {
        zero_unused(hdmx, ctx.num_glyphs, &ctx.keep)?
    };

    if sub.len() > hdmx.len() {
        log::warn!("hdmx would grow, keeping the original");
        return Ok(TableOutcome::Original);
    }

    log::debug!("hdmx: {} -> {} bytes", hdmx.len(), sub.len());
    ctx.out.update(Tag::HDMX, &sub)?;
    Ok(TableOutcome::Rewritten)
}

/// A parsed table header.
struct Header {
    version: u16,
    count: usize,
    /// The size of a device record, including padding.
    size: usize,
}

fn header(data: &[u8], num_glyphs: u16) -> Result<Header> {
    let mut r = Reader::new(data);
    let version = r.read::<u16>()?;
    let count = r.read::<i16>()?;
    let size = r.read::<i32>()?;

    let count = usize::try_from(count).map_err(|_| Error::InvalidData)?;
    let size = usize::try_from(size).map_err(|_| Error::InvalidData)?;
    if size < 2 + usize::from(num_glyphs) {
        return Err(Error::InvalidData);
    }

    let end = crate::util::add(HEADER_SIZE, crate::util::mul(count, size)?)?;
    if end > data.len() {
        return Err(Error::OutOfBounds);
    }

    Ok(Header { version, count, size })
}

/// Keep the record size, clear the widths of dropped glyphs and recompute
/// each record's maximum width.
fn zero_unused(data: &[u8], num_glyphs: u16, keep: &KeepList) -> Result<Vec<u8>> {
    let header = header(data, num_glyphs)?;
    let mut sub = data.to_vec();

    for i in 0..header.count {
        let start = HEADER_SIZE + i * header.size;
        let record = &mut sub[start..start + 2 + usize::from(num_glyphs)];
        let (head, widths) = record.split_at_mut(2);
        let mut max = 0;
        for (glyph, width) in (0..num_glyphs).zip(widths.iter_mut()) {
            if keep.is_kept(glyph) {
                max = max.max(*width);
            } else {
                *width = 0;
            }
        }
        head[1] = max;
    }

    Ok(sub)
}

/// Keep only the widths of the given glyphs, in the given order.
fn compact(data: &[u8], num_glyphs: u16, glyphs: &[u16]) -> Result<Vec<u8>> {
    let header = header(data, num_glyphs)?;
    let size = crate::directory::long_align(2 + glyphs.len())?;

    let mut w = Writer::with_capacity(HEADER_SIZE + header.count * size);
    w.write::<u16>(header.version);
    w.write::<i16>(header.count as i16);
    w.write::<i32>(i32::try_from(size).map_err(|_| Error::Overflow)?);

    for i in 0..header.count {
        let record = &data[HEADER_SIZE + i * header.size..];
        let widths = &record[2..2 + usize::from(num_glyphs)];
        let mut max = 0;
        w.write::<u8>(record[0]);
        let at = w.len();
        w.write::<u8>(0);
        for &glyph in glyphs {
            let width = *widths.get(usize::from(glyph)).ok_or(Error::InvalidData)?;
            max = max.max(width);
            w.write::<u8>(width);
        }
        w.patch::<u8>(at, max)?;
        w.align(4);
    }

    Ok(w.finish())
}
