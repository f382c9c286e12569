//! The `head` table mostly contains information that can be reused from the
//! old table. The `loca` format is patched in by the glyph rewrite, and the
//! checksum adjustment is zeroed here and recalculated in the very end.

use super::*;
use crate::directory::CHECKSUM_ADJUSTMENT_OFFSET;

/// The smallest head table that has every field we touch.
const MIN_SIZE: usize = 54;

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let mut head = ctx.expect_table(Tag::HEAD)?.to_vec();
    if head.len() < MIN_SIZE {
        return Err(Error::InvalidData);
    }

    head[CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4].fill(0);
    ctx.out.update(Tag::HEAD, &head)?;
    Ok(TableOutcome::Rewritten)
}

/// The checksum adjustment stored in a head table.
pub(crate) fn checksum_adjustment(head: &[u8]) -> Result<u32> {
    u32::read_at(head, CHECKSUM_ADJUSTMENT_OFFSET)
}
