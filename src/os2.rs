use super::*;

/// The offset of `usFirstCharIndex`, followed by `usLastCharIndex`.
const FIRST_CHAR_OFFSET: usize = 64;

/// Patch the character range of the OS/2 table to what the cmap rewrite left.
pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let Some((first, last)) = ctx.char_range else {
        return Ok(TableOutcome::Original);
    };

    let mut os2 = ctx.out.table(Tag::OS2)?.to_vec();
    let Some(old) = patch_char_range(&mut os2, first, last)? else {
        return Ok(TableOutcome::Original);
    };

    log::debug!("OS/2: character range {old:?} -> ({first:#x}, {last:#x})");
    ctx.out.update(Tag::OS2, &os2)?;
    Ok(TableOutcome::Rewritten)
}

/// Write the first and last character into the table. The fields are
/// 16-bit, so codes beyond the BMP are clamped.
///
/// Returns the previous range, or `None` if nothing changed.
fn patch_char_range(os2: &mut [u8], first: u32, last: u32) -> Result<Option<(u16, u16)>> {
    let clamp = |c: u32| u16::try_from(c).unwrap_or(u16::MAX);
    let range = crate::util::slice(os2, FIRST_CHAR_OFFSET, 4)?;
    let old = (u16::read_at(range, 0)?, u16::read_at(range, 2)?);
    let new = (clamp(first), clamp(last));
    if old == new {
        return Ok(None);
    }

    let end = FIRST_CHAR_OFFSET + 4;
    os2[FIRST_CHAR_OFFSET..FIRST_CHAR_OFFSET + 2].copy_from_slice(&new.0.to_be_bytes());
    os2[FIRST_CHAR_OFFSET + 2..end].copy_from_slice(&new.1.to_be_bytes());
    Ok(Some(old))
}
