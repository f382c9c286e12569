//! The `kern` table holds pairwise kerning values. Both the Microsoft
//! (version 0) and the Apple (version 1) layout are supported. Only format 0
//! subtables list plain glyph pairs; pairs with a dropped glyph are removed
//! from those, and all other subtables are copied as they are.

use super::*;
use crate::directory::search_params;
use crate::stream::Writer;
use crate::util::{add, mul, to_u16};

/// The size of a format 0 header: pair count plus the search fields.
const PAIRS_HEADER_SIZE: usize = 8;

record! {
    struct KernPair {
        left: u16,
        right: u16,
        value: i16,
    }
}

/// The two table layouts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Layout {
    Microsoft,
    Apple,
}

impl Layout {
    /// The size of a subtable header.
    fn header_size(self) -> usize {
        match self {
            Layout::Microsoft => 6,
            Layout::Apple => 8,
        }
    }
}

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let kern = ctx.out.table(Tag::KERN)?;
    let keep = &ctx.keep;
    let mapper = &ctx.mapper;
    let sub = rewrite(kern, |glyph| if keep.is_kept(glyph) { mapper.get(glyph) } else { None })?;

    if sub.len() > kern.len() {
        log::warn!("kern would grow, keeping the original");
        return Ok(TableOutcome::Original);
    }

    log::debug!("kern: {} -> {} bytes", kern.len(), sub.len());
    ctx.out.update(Tag::KERN, &sub)?;
    Ok(TableOutcome::Rewritten)
}

/// Rewrite a kern table, mapping every glyph through `map`. Pairs with a
/// glyph that maps to `None` are dropped.
fn rewrite(data: &[u8], map: impl Fn(u16) -> Option<u16>) -> Result<Vec<u8>> {
    let mut r = Reader::new(data);
    let (layout, count) = match r.read::<u16>()? {
        0 => (Layout::Microsoft, u32::from(r.read::<u16>()?)),
        1 if r.read::<u16>()? == 0 => (Layout::Apple, r.read::<u32>()?),
        version => return Err(Error::Unsupported(Tag::KERN, version)),
    };

    let mut w = Writer::with_capacity(data.len());
    w.extend(&data[..r.offset()]);

    for _ in 0..count {
        let start = r.offset();
        let (len, format) = match layout {
            Layout::Microsoft => {
                r.skip(2)?; // version
                let len = usize::from(r.read::<u16>()?);
                (len, r.read::<u16>()? >> 8)
            }
            Layout::Apple => {
                let len = r.read::<u32>()? as usize;
                (len, r.read::<u16>()? & 0xFF)
            }
        };

        if format != 0 {
            let subtable = crate::util::slice(data, start, len)?;
            w.extend(subtable);
            w.align(2);
            r.jump(add(start, len)?);
            continue;
        }

        // The length field of big Microsoft subtables overflows, so the pair
        // count decides where the subtable ends.
        let body = add(start, layout.header_size())?;
        let num_pairs = usize::from(u16::read_at(data, body)?);
        r.jump(add(body, PAIRS_HEADER_SIZE)?);

        let mut pairs = Vec::with_capacity(num_pairs);
        for _ in 0..num_pairs {
            let pair = r.read::<KernPair>()?;
            if let (Some(left), Some(right)) = (map(pair.left), map(pair.right)) {
                pairs.push(KernPair { left, right, ..pair });
            }
        }
        pairs.sort_by_key(|pair| (pair.left, pair.right));

        write_pairs(&mut w, layout, &data[start..body], &pairs)?;
    }

    Ok(w.finish())
}

/// Write a format 0 subtable, reusing the original subtable header.
fn write_pairs(w: &mut Writer, layout: Layout, header: &[u8], pairs: &[KernPair]) -> Result<()> {
    let count = to_u16(pairs.len())?;
    let len = add(layout.header_size() + PAIRS_HEADER_SIZE, mul(pairs.len(), 6)?)?;

    let start = w.len();
    w.extend(header);
    match layout {
        // Wraps for subtables with more than 10920 pairs, like in the
        // fonts that have them.
        Layout::Microsoft => w.patch::<u16>(start + 2, len as u16)?,
        Layout::Apple => w.patch::<u32>(start, crate::util::to_u32(len)?)?,
    }

    let (search_range, entry_selector, range_shift) = search_params(count, 6)?;
    w.write::<u16>(count);
    w.write::<u16>(search_range);
    w.write::<u16>(entry_selector);
    w.write::<u16>(range_shift);
    for pair in pairs {
        w.write(*pair);
    }

    Ok(())
}
