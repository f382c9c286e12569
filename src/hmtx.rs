//! The `hmtx` and `vmtx` tables store an advance and a side bearing per
//! glyph. The first `numberOfLongMetrics` entries have both; the remaining
//! glyphs only have a side bearing and share the advance of the last long
//! entry. The count lives in the `hhea`/`vhea` table.

use super::*;
use crate::stream::Writer;

/// A metrics table and the header that holds its long metric count.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Metrics {
    header: Tag,
    table: Tag,
}

pub(crate) const HORIZONTAL: Metrics = Metrics { header: Tag::HHEA, table: Tag::HMTX };
pub(crate) const VERTICAL: Metrics = Metrics { header: Tag::VHEA, table: Tag::VMTX };

/// The offset of the long metric count in `hhea` and `vhea`.
const NUM_LONG_METRICS_OFFSET: usize = 34;

pub(crate) fn subset(ctx: &mut Context, metrics: Metrics) -> Result<TableOutcome> {
    let header = ctx.out.table(metrics.header)?.to_vec();
    let num_long = u16::read_at(&header, NUM_LONG_METRICS_OFFSET)?;
    let data = ctx.out.table(metrics.table)?;
    let table = MetricsTable::new(data, num_long, ctx.num_glyphs)?;

    let (sub, new_long) = if ctx.compacts() {
        table.compact(ctx.mapper.remapped_gids())?
    } else {
        table.zero_unused(&ctx.keep)?
    };

    if sub.len() > data.len() {
        log::warn!("{} would grow, keeping the original", metrics.table);
        return Ok(TableOutcome::Original);
    }

    if sub == data && new_long == num_long {
        return Ok(TableOutcome::Original);
    }

    log::debug!(
        "{}: {} -> {} bytes, {num_long} -> {new_long} long metrics",
        metrics.table,
        data.len(),
        sub.len()
    );

    ctx.out.update(metrics.table, &sub)?;
    let mut header = header;
    header[NUM_LONG_METRICS_OFFSET..NUM_LONG_METRICS_OFFSET + 2]
        .copy_from_slice(&new_long.to_be_bytes());
    ctx.out.update(metrics.header, &header)?;

    Ok(TableOutcome::Rewritten)
}

/// A parsed metrics table.
struct MetricsTable<'a> {
    data: &'a [u8],
    num_long: u16,
    num_glyphs: u16,
}

impl<'a> MetricsTable<'a> {
    fn new(data: &'a [u8], num_long: u16, num_glyphs: u16) -> Result<Self> {
        if num_long == 0 && num_glyphs > 0 {
            return Err(Error::InvalidData);
        }
        if data.len() < usize::from(num_long) * 4 {
            return Err(Error::OutOfBounds);
        }
        Ok(Self { data, num_long, num_glyphs })
    }

    /// The advance and side bearing of a glyph.
    fn get(&self, glyph: u16) -> Result<(u16, i16)> {
        if glyph < self.num_long {
            let at = usize::from(glyph) * 4;
            return Ok((u16::read_at(self.data, at)?, i16::read_at(self.data, at + 2)?));
        }

        let last = self.num_long.checked_sub(1).ok_or(Error::InvalidData)?;
        let advance = u16::read_at(self.data, usize::from(last) * 4)?;
        let at = usize::from(self.num_long) * 4 + usize::from(glyph - self.num_long) * 2;
        // Some fonts leave out trailing side bearings.
        let bearing = i16::read_at(self.data, at).unwrap_or(0);
        Ok((advance, bearing))
    }

    /// Keep every slot, clearing the metrics of dropped glyphs. The long
    /// prefix is shortened to end at the highest kept glyph.
    fn zero_unused(&self, keep: &KeepList) -> Result<(Vec<u8>, u16)> {
        let highest = keep.max_glyph().unwrap_or(0);
        // At least one long entry remains, unless the font has no glyphs.
        let new_long = self.num_long.min(highest.saturating_add(1)).max(self.num_long.min(1));

        let mut w = Writer::with_capacity(self.data.len());
        for glyph in 0..new_long {
            let (advance, bearing) = self.get(glyph)?;
            if keep.is_kept(glyph) {
                w.write::<u16>(advance);
                w.write::<i16>(bearing);
            } else if glyph + 1 == new_long {
                // The remaining glyphs inherit this advance.
                w.write::<u16>(advance);
                w.write::<i16>(0);
            } else {
                w.write::<u32>(0);
            }
        }

        for glyph in new_long..self.num_glyphs {
            let bearing = if keep.is_kept(glyph) { self.get(glyph)?.1 } else { 0 };
            w.write::<i16>(bearing);
        }

        Ok((w.finish(), new_long))
    }

    /// Keep only the given glyphs, in the given order. Trailing entries with
    /// the same advance are folded into the short format.
    fn compact(&self, glyphs: &[u16]) -> Result<(Vec<u8>, u16)> {
        let metrics = glyphs.iter().map(|&g| self.get(g)).collect::<Result<Vec<_>>>()?;

        let mut new_long = metrics.len();
        while new_long > 1 && metrics[new_long - 1].0 == metrics[new_long - 2].0 {
            new_long -= 1;
        }

        let mut w = Writer::with_capacity(metrics.len() * 4);
        for (i, &(advance, bearing)) in metrics.iter().enumerate() {
            if i < new_long {
                w.write::<u16>(advance);
            }
            w.write::<i16>(bearing);
        }

        Ok((w.finish(), crate::util::to_u16(new_long)?))
    }
}
