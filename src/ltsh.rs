//! The `LTSH` table lists, per glyph, the pixel size from which on its
//! advance scales linearly.

use super::*;
use crate::stream::Writer;

/// The threshold of a glyph that is always linear.
const ALWAYS_LINEAR: u8 = 1;

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let ltsh = ctx.out.table(Tag::LTSH)?;
    let mut r = Reader::new(ltsh);
    let version = r.read::<u16>()?;
    let count = r.read::<u16>()?;
    let pels = r.read_bytes(usize::from(count))?;

    let mut w = Writer::with_capacity(ltsh.len());
    w.write::<u16>(version);
    if ctx.compacts() {
        let glyphs = ctx.mapper.remapped_gids();
        w.write::<u16>(crate::util::to_u16(glyphs.len())?);
        for &glyph in glyphs {
            w.write::<u8>(*pels.get(usize::from(glyph)).ok_or(Error::InvalidData)?);
        }
    } else {
        w.write::<u16>(count);
        for (glyph, &pel) in (0..count).zip(pels) {
            w.write::<u8>(if ctx.keep.is_kept(glyph) { pel } else { ALWAYS_LINEAR });
        }
    }

    let sub = w.finish();
    log::debug!("LTSH: {} -> {} bytes", ltsh.len(), sub.len());
    ctx.out.update(Tag::LTSH, &sub)?;
    Ok(TableOutcome::Rewritten)
}
