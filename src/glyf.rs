//! The `glyf` table contains the main description of the glyphs. In order to
//! subset it, there are 4 things we need to do:
//! 1. We need to form the glyph closure. Glyphs can reference other glyphs, meaning that
//!    if a user for example requests the glyph 1, and this glyph references the glyph 2, then
//!    we need to include both of them in our subset. This happens while building the
//!    keep-list.
//! 2. We need to remove glyph descriptions that are not needed for the subset. When glyphs
//!    are renumbered, composite glyphs need to reference the new glyph IDs.
//! 3. We need to calculate which format to use in the `loca` table.
//! 4. We need to update the `loca` table itself with the new offsets, and tell the `head`
//!    table which format we picked.

use super::*;
use crate::directory::CHECKSUM_ADJUSTMENT_OFFSET;
use crate::keep::GlyphReferences;
use crate::stream::Writer;

/// The largest glyph data size the short loca format can address.
const MAX_SHORT_LOCA_SIZE: usize = 2 * u16::MAX as usize;

/// The offset of the `indexToLocFormat` field in the head table.
const INDEX_TO_LOC_FORMAT_OFFSET: usize = 50;

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Rebuild glyf and loca around the kept glyphs.
pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let table = Table::new(&ctx.face, ctx.num_glyphs)?;
    let old_glyphs: Vec<u16> = if ctx.compacts() {
        ctx.keep.kept().collect()
    } else {
        (0..ctx.num_glyphs).collect()
    };

    let mut sub_glyf = Writer::new();
    let mut offsets = Vec::with_capacity(old_glyphs.len() + 1);

    for old in old_glyphs {
        offsets.push(sub_glyf.len());
        if !ctx.keep.is_kept(old) {
            continue;
        }

        let data = table.glyph_data(old)?;
        if ctx.compacts() && is_composite(data)? {
            sub_glyf.extend(&remap_components(data, &ctx.mapper)?);
        } else {
            sub_glyf.extend(data);
        }

        // Short loca offsets are halved, so every glyph must start on an
        // even offset.
        sub_glyf.align(2);
    }

    // Write the final offset.
    offsets.push(sub_glyf.len());

    ctx.long_loca = sub_glyf.len() > MAX_SHORT_LOCA_SIZE;
    let mut sub_loca = Writer::with_capacity(offsets.len() * 4);
    for offset in offsets {
        if ctx.long_loca {
            sub_loca.write::<u32>(crate::util::to_u32(offset)?);
        } else {
            sub_loca.write::<u16>((offset / 2) as u16);
        }
    }

    let glyf = sub_glyf.finish();
    log::debug!(
        "glyf: {} -> {} bytes, {} loca",
        table.glyf.len(),
        glyf.len(),
        if ctx.long_loca { "long" } else { "short" }
    );

    ctx.out.update(Tag::GLYF, &glyf)?;
    ctx.out.update(Tag::LOCA, &sub_loca.finish())?;

    let mut head = ctx.out.table(Tag::HEAD)?.to_vec();
    let format: i16 = if ctx.long_loca { 1 } else { 0 };
    slice_mut(&mut head, INDEX_TO_LOC_FORMAT_OFFSET, 2)?.copy_from_slice(&format.to_be_bytes());
    slice_mut(&mut head, CHECKSUM_ADJUSTMENT_OFFSET, 4)?.fill(0);
    ctx.out.update(Tag::HEAD, &head)?;

    Ok(TableOutcome::Rewritten)
}

fn slice_mut(data: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    data.get_mut(offset..crate::util::add(offset, len)?).ok_or(Error::OutOfBounds)
}

/// A glyf + loca table.
pub(crate) struct Table<'a> {
    loca: &'a [u8],
    glyf: &'a [u8],
    long: bool,
    num_glyphs: u16,
}

impl<'a> Table<'a> {
    pub fn new(face: &Face<'a>, num_glyphs: u16) -> Result<Self> {
        let head = face.expect_table(Tag::HEAD)?;
        let long = i16::read_at(head, INDEX_TO_LOC_FORMAT_OFFSET)? != 0;
        let loca = face.expect_table(Tag::LOCA)?;
        let glyf = face.expect_table(Tag::GLYF)?;
        Ok(Table { loca, glyf, long, num_glyphs })
    }

    #[cfg(test)]
    pub fn from_parts(loca: &'a [u8], glyf: &'a [u8], num_glyphs: u16) -> Self {
        Table { loca, glyf, long: false, num_glyphs }
    }

    /// The byte range of a glyph in the glyf table.
    fn location(&self, glyph: u16) -> Result<(usize, usize)> {
        if glyph >= self.num_glyphs {
            return Err(Error::InvalidData);
        }

        let index = glyph as usize;
        let (start, end) = if self.long {
            (
                u32::read_at(self.loca, index * 4)? as usize,
                u32::read_at(self.loca, index * 4 + 4)? as usize,
            )
        } else {
            (
                u16::read_at(self.loca, index * 2)? as usize * 2,
                u16::read_at(self.loca, index * 2 + 2)? as usize * 2,
            )
        };

        if start > end || end > self.glyf.len() {
            return Err(Error::InvalidOffset);
        }

        Ok((start, end))
    }

    /// The outline data of a glyph. Empty for blank glyphs.
    pub fn glyph_data(&self, glyph: u16) -> Result<&'a [u8]> {
        let (start, end) = self.location(glyph)?;
        Ok(&self.glyf[start..end])
    }

    /// Whether a glyph has no outline at all.
    pub fn is_blank(&self, glyph: u16) -> Result<bool> {
        self.location(glyph).map(|(start, end)| start == end)
    }

    /// The glyphs a composite glyph is built from. Empty for simple glyphs.
    pub fn components(&self, glyph: u16) -> Result<Vec<u16>> {
        let data = self.glyph_data(glyph)?;
        if !is_composite(data)? {
            return Ok(vec![]);
        }
        Ok(composite(data)?.components.iter().map(|c| c.glyph).collect())
    }
}

impl GlyphReferences for Table<'_> {
    fn referenced(&self, glyph: u16, _: &KeepList, out: &mut Vec<u16>) -> Result<()> {
        out.extend(self.components(glyph)?);
        Ok(())
    }
}

/// Whether glyph data describes a composite glyph.
pub(crate) fn is_composite(data: &[u8]) -> Result<bool> {
    if data.is_empty() {
        return Ok(false);
    }
    Ok(i16::read_at(data, 0)? < 0)
}

/// A component reference inside a composite glyph.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Component {
    pub glyph: u16,
    /// Where the glyph index is stored in the glyph data.
    pub glyph_offset: usize,
}

/// A parsed composite glyph.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Composite {
    pub components: Vec<Component>,
    pub instructions: u16,
}

/// Parse the component list of a composite glyph.
pub(crate) fn composite(data: &[u8]) -> Result<Composite> {
    let mut r = Reader::new(data);
    r.skip(10)?; // number of contours + bounding box

    let mut components = vec![];
    let mut flags;
    loop {
        flags = r.read::<u16>()?;
        let glyph_offset = r.offset();
        let glyph = r.read::<u16>()?;
        components.push(Component { glyph, glyph_offset });

        r.skip(if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 })?;
        if flags & WE_HAVE_A_SCALE != 0 {
            r.skip(2)?;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            r.skip(4)?;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            r.skip(8)?;
        }

        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    let instructions =
        if flags & WE_HAVE_INSTRUCTIONS != 0 { r.read::<u16>()? } else { 0 };

    Ok(Composite { components, instructions })
}

/// Counts of a simple glyph.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub(crate) struct SimpleStats {
    pub points: u16,
    pub contours: u16,
    pub instructions: u16,
}

/// Read the point, contour and instruction counts of a simple glyph.
pub(crate) fn simple_stats(data: &[u8]) -> Result<SimpleStats> {
    if data.is_empty() {
        return Ok(SimpleStats::default());
    }

    let mut r = Reader::new(data);
    let contours = r.read::<i16>()?;
    if contours < 0 {
        return Err(Error::InvalidData);
    }

    r.skip(8)?; // bounding box
    let mut points = 0;
    for _ in 0..contours {
        points = r.read::<u16>()?;
    }

    let points = if contours > 0 { points.checked_add(1).ok_or(Error::Overflow)? } else { 0 };
    let instructions = r.read::<u16>()?;
    Ok(SimpleStats { points, contours: contours as u16, instructions })
}

/// Rewrite the component glyph ids of a composite glyph.
fn remap_components(data: &[u8], mapper: &GlyphRemapper) -> Result<Vec<u8>> {
    let mut data = data.to_vec();
    for component in composite(&data)?.components {
        let new = mapper.get(component.glyph).ok_or(Error::InvalidData)?;
        slice_mut(&mut data, component.glyph_offset, 2)?.copy_from_slice(&new.to_be_bytes());
    }
    Ok(data)
}
