//! The `post` table contains PostScript information and, depending on the
//! version, glyph names. Glyph names are not needed for embedding, so the
//! table is normalized to version 3.0, which is the fixed header only.

use super::*;

const VERSION_3: u32 = 0x00030000;

/// The size of the header shared by all versions.
const HEADER_SIZE: usize = 32;

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let post = ctx.out.table(Tag::POST)?;
    let mut sub = crate::util::slice(post, 0, HEADER_SIZE)?.to_vec();
    if u32::read_at(&sub, 0)? == VERSION_3 && post.len() == HEADER_SIZE {
        return Ok(TableOutcome::Original);
    }

    sub[..4].copy_from_slice(&VERSION_3.to_be_bytes());
    log::debug!("post: {} -> {} bytes", post.len(), sub.len());
    ctx.out.update(Tag::POST, &sub)?;
    Ok(TableOutcome::Rewritten)
}
