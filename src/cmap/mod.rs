//! The `cmap` table maps character codes to glyph indices. Every subtable we
//! understand is rebuilt around the kept glyphs:
//! - Formats 0 and 6 are fixed arrays and are rewritten in place, zeroing the
//!   dropped entries. Format 6 also shrinks its window.
//! - Formats 4 and 12 are regenerated from the surviving mappings.
//!
//! Subtables that are shared between several encoding records are rewritten
//! once. Encoding records pointing to any other format are dropped.

use super::*;
use crate::codec::Record;
use crate::stream::Writer;
use crate::util::to_u32;
use crate::Error::InvalidOffset;
use rustc_hash::FxHashMap;

mod subtable0;
mod subtable12;
mod subtable4;
mod subtable6;

use subtable0::Subtable0;
use subtable12::Subtable12;
use subtable4::Subtable4;
use subtable6::Subtable6;

record! {
    struct EncodingRecord {
        platform_id: u16,
        encoding_id: u16,
        subtable_offset: u32,
    }
}

/// The header of the cmap table: version and number of encoding records.
const HEADER_SIZE: usize = 4;

/// A parsed cmap subtable of a supported format.
pub(crate) enum Subtable<'a> {
    Format0(Subtable0<'a>),
    Format4(Subtable4<'a>),
    Format6(Subtable6),
    Format12(Subtable12),
}

impl<'a> Subtable<'a> {
    /// Parse a subtable. `data` is the subtable as delimited by
    /// [`subtable_data`]. Returns `None` for unsupported formats.
    pub fn parse(data: &'a [u8]) -> Result<Option<Self>> {
        Ok(Some(match u16::read_at(data, 0)? {
            0 => Self::Format0(Subtable0::read_at(data, 0)?),
            4 => Self::Format4(Subtable4::read_at(data, 0)?),
            6 => Self::Format6(Subtable6::read_at(data, 0)?),
            12 => Self::Format12(Subtable12::read_at(data, 0)?),
            _ => return Ok(None),
        }))
    }
}

impl Mappings for Subtable<'_> {
    fn glyph_index(&self, code: u32) -> Option<u16> {
        match self {
            Self::Format0(table) => table.glyph_index(code),
            Self::Format4(table) => table.glyph_index(code),
            Self::Format6(table) => table.glyph_index(code),
            Self::Format12(table) => table.glyph_index(code),
        }
    }

    fn codepoints(&self, f: impl FnMut(u32)) {
        match self {
            Self::Format0(table) => table.codepoints(f),
            Self::Format4(table) => table.codepoints(f),
            Self::Format6(table) => table.codepoints(f),
            Self::Format12(table) => table.codepoints(f),
        }
    }
}

/// Character to glyph lookups shared by all subtable formats.
pub(crate) trait Mappings {
    /// Returns the glyph a code maps to. May return 0 for unmapped codes.
    fn glyph_index(&self, code: u32) -> Option<u16>;

    /// Calls `f` for each code the table covers.
    fn codepoints(&self, f: impl FnMut(u32));

    /// Returns the glyph a code maps to, if it is not glyph 0.
    fn lookup(&self, code: u32) -> Option<u16> {
        self.glyph_index(code).filter(|&g| g != 0)
    }

    /// All mappings to a glyph other than 0, sorted by character code.
    fn mappings(&self) -> Vec<(u32, u16)> {
        let mut mappings = vec![];
        self.codepoints(|code| {
            if let Some(glyph) = self.lookup(code) {
                mappings.push((code, glyph));
            }
        });
        mappings.sort_unstable();
        mappings.dedup_by_key(|(code, _)| *code);
        mappings
    }
}

/// The bytes of the subtable at `offset`.
///
/// The 16-bit length of a format 4 subtable wraps around for large tables,
/// so such a subtable extends up to the next subtable or the end of the cmap.
fn subtable_data<'a>(
    cmap: &'a [u8],
    records: &[EncodingRecord],
    offset: u32,
) -> Result<&'a [u8]> {
    let data = cmap.get(offset as usize..).ok_or(InvalidOffset)?;
    let next = records
        .iter()
        .map(|record| record.subtable_offset)
        .filter(|&other| other > offset)
        .min();
    let bound = next.map_or(data.len(), |next| (next - offset) as usize);

    let len = match u16::read_at(data, 0)? {
        0 => 262,
        4 => bound,
        6 => 10 + 2 * usize::from(u16::read_at(data, 8)?),
        8 | 10 | 12 | 13 => u32::read_at(data, 4)? as usize,
        14 => u32::read_at(data, 2)? as usize,
        _ => usize::from(u16::read_at(data, 2)?),
    };

    Ok(&data[..len.min(data.len())])
}

/// Find the subtable for a platform and encoding.
pub(crate) fn find<'a>(cmap: &'a [u8], selector: CmapSelector) -> Result<Subtable<'a>> {
    let missing = Error::MissingCmapSubtable {
        platform: selector.platform,
        encoding: selector.encoding,
    };

    let mut r = Reader::new(cmap);
    r.skip(2)?; // version
    let count = r.read::<u16>()?;
    let records = r.read_vector::<EncodingRecord>(usize::from(count))?;
    for record in &records {
        if record.platform_id == selector.platform && record.encoding_id == selector.encoding
        {
            let data = subtable_data(cmap, &records, record.subtable_offset)?;
            return Subtable::parse(data)?.ok_or(missing);
        }
    }

    Err(missing)
}

/// The encodings the reported character range is taken from, in order of
/// preference.
const RANGE_ENCODINGS: [(u16, u16); 3] = [(3, 1), (3, 10), (3, 0)];

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let cmap = ctx.expect_table(Tag::CMAP)?;
    let mut r = Reader::new(cmap);
    let version = r.read::<u16>()?;
    let count = r.read::<u16>()?;
    let records = r.read_vector::<EncodingRecord>(usize::from(count))?;

    // The rewritten bytes of each subtable, keyed by original offset. `None`
    // marks a subtable of a format we drop.
    let mut rewritten: FxHashMap<u32, Option<Vec<u8>>> = FxHashMap::default();
    for record in &records {
        if rewritten.contains_key(&record.subtable_offset) {
            continue;
        }

        let data = subtable_data(cmap, &records, record.subtable_offset)?;
        let new = subset_subtable(ctx, data)?;
        if new.is_none() {
            log::warn!(
                "dropping cmap subtable ({}, {}) of unsupported format {}",
                record.platform_id,
                record.encoding_id,
                u16::read_at(data, 0)?,
            );
        }
        rewritten.insert(record.subtable_offset, new);
    }

    ctx.char_range = char_range(&records, |offset| match rewritten.get(&offset) {
        Some(Some(data)) => Ok(Some(data.as_slice())),
        _ => Ok(None),
    })?;

    let kept: Vec<EncodingRecord> = records
        .iter()
        .filter(|record| matches!(rewritten.get(&record.subtable_offset), Some(Some(_))))
        .copied()
        .collect();

    // Lay the subtables out in ascending original offset order, so that no
    // gaps remain between them.
    let mut offsets: Vec<u32> = kept.iter().map(|record| record.subtable_offset).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut subtables = Writer::new();
    let mut moved = FxHashMap::default();
    let start = HEADER_SIZE + kept.len() * EncodingRecord::SIZE;
    for offset in offsets {
        if let Some(Some(data)) = rewritten.get(&offset) {
            moved.insert(offset, to_u32(start + subtables.len())?);
            subtables.extend(data);
        }
    }

    let mut sub_cmap = Writer::with_capacity(start + subtables.len());
    sub_cmap.write::<u16>(version);
    sub_cmap.write::<u16>(crate::util::to_u16(kept.len())?);
    for record in kept {
        let subtable_offset = *moved.get(&record.subtable_offset).ok_or(InvalidOffset)?;
        sub_cmap.write(EncodingRecord { subtable_offset, ..record });
    }
    sub_cmap.extend(&subtables.finish());

    let data = sub_cmap.finish();
    if data.len() > cmap.len() && !ctx.compacts() {
        log::warn!("rewritten cmap would grow from {} to {} bytes", cmap.len(), data.len());
        ctx.char_range =
            char_range(&records, |offset| subtable_data(cmap, &records, offset).map(Some))?;
        return Ok(TableOutcome::Original);
    }

    log::debug!("cmap: {} -> {} bytes", cmap.len(), data.len());
    ctx.out.update(Tag::CMAP, &data)?;
    Ok(TableOutcome::Rewritten)
}

/// Rewrite a single subtable. Returns `None` for unsupported formats.
fn subset_subtable(ctx: &Context, original: &[u8]) -> Result<Option<Vec<u8>>> {
    let Some(table) = Subtable::parse(original)? else {
        return Ok(None);
    };

    let new = match table {
        Subtable::Format0(_) => subtable0::subset(ctx, original)?,
        Subtable::Format6(_) => subtable6::subset(ctx, original)?,
        Subtable::Format4(table) => subtable4::subset(&table, &kept_mappings(ctx, &table))?,
        Subtable::Format12(table) => {
            subtable12::subset(&table, &kept_mappings(ctx, &table))?
        }
    };

    // Glyph ids are renumbered in compact mode, so the original bytes would
    // refer to the wrong glyphs.
    if new.len() > original.len() && !ctx.compacts() {
        log::warn!(
            "regenerated cmap subtable would grow from {} to {} bytes, keeping it",
            original.len(),
            new.len()
        );
        return Ok(Some(original.to_vec()));
    }

    Ok(Some(new))
}

/// The surviving mappings of a subtable, with glyph ids in the output
/// numbering.
fn kept_mappings(ctx: &Context, table: &impl Mappings) -> Vec<(u32, u16)> {
    table
        .mappings()
        .into_iter()
        .filter(|&(_, glyph)| ctx.keep.is_kept(glyph))
        .filter_map(|(code, glyph)| Some((code, ctx.mapper.get(glyph)?)))
        .collect()
}

/// Map a glyph id of a fixed array subtable into the output.
fn kept_glyph(ctx: &Context, glyph: u16) -> u16 {
    if glyph != 0 && ctx.keep.is_kept(glyph) {
        ctx.mapper.get(glyph).unwrap_or(0)
    } else {
        0
    }
}

/// The smallest and largest code in the preferred Microsoft subtable.
fn char_range<'a>(
    records: &[EncodingRecord],
    subtable: impl Fn(u32) -> Result<Option<&'a [u8]>>,
) -> Result<Option<(u32, u32)>> {
    for (platform, encoding) in RANGE_ENCODINGS {
        let Some(record) = records
            .iter()
            .find(|r| r.platform_id == platform && r.encoding_id == encoding)
        else {
            continue;
        };
        let Some(data) = subtable(record.subtable_offset)? else {
            continue;
        };

        if let Some(table) = Subtable::parse(data)? {
            let mappings = table.mappings();
            return Ok(mappings.first().zip(mappings.last()).map(|(a, b)| (a.0, b.0)));
        }
    }

    Ok(None)
}
