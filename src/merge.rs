//! The private `TTFD` table records which glyphs of the original font a
//! subset contains, so that more glyphs can be merged into it later.

use super::*;
use crate::stream::Writer;
use crate::util::to_u16;

/// A full-size font with every glyph slot, of which only some are filled.
pub(crate) const FORMAT_MERGEABLE: u16 = 1;

/// A font with renumbered glyphs that only has the structural tables.
pub(crate) const FORMAT_DELTA: u16 = 2;

const VERSION: u16 = 0;

record! {
    struct MergeHeader {
        version: u16,
        format: u16,
        /// The checksum adjustment of the original font.
        checksum_adjustment: u32,
        num_glyphs: u16,
        max_glyph: u16,
        count: u16,
    }
}

/// Add the merge record to the output font.
pub(crate) fn write(ctx: &mut Context, format: u16) -> Result<()> {
    let glyphs: Vec<u16> = ctx.keep.kept().collect();
    let header = MergeHeader {
        version: VERSION,
        format,
        checksum_adjustment: head::checksum_adjustment(ctx.expect_table(Tag::HEAD)?)?,
        num_glyphs: ctx.num_glyphs,
        max_glyph: ctx.keep.max_glyph().unwrap_or(0),
        count: to_u16(glyphs.len())?,
    };

    let mut w = Writer::with_capacity(14 + 2 * glyphs.len());
    w.write(header);
    glyphs.iter().for_each(|&glyph| w.write::<u16>(glyph));

    log::debug!("TTFD: format {format}, {} glyphs", glyphs.len());
    ctx.out.insert(Tag::TTFD, &w.finish())
}
