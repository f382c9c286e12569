//! Embedded bitmaps live in a location table (`EBLC`/`bloc`) that indexes
//! into a data table (`EBDT`/`bdat`), plus an optional scaling table
//! (`EBSC`/`bsca`) that refers to strikes by their pixel size.
//!
//! Both the location and the data table are rebuilt from scratch:
//! 1. Every index subtable of every strike is narrowed to the kept glyphs.
//! 2. A strike whose index would grow past its old size is dropped, as is a
//!    strike that loses all of its subtables.
//! 3. The images of the kept glyphs are copied into a new data table. Image
//!    blocks that are shared by several subtables are copied once.
//! 4. Scaling records that point to a dropped strike are removed.

use super::*;
use crate::stream::Writer;
use crate::util::{add, to_u32};
use index::Plan;
use rustc_hash::FxHashMap;

mod index;

/// The tables of one bitmap encoding.
#[derive(Debug, Copy, Clone)]
pub(crate) struct BitmapTables {
    location: Tag,
    data: Tag,
    scale: Tag,
}

pub(crate) const MICROSOFT: BitmapTables =
    BitmapTables { location: Tag::EBLC, data: Tag::EBDT, scale: Tag::EBSC };

pub(crate) const APPLE: BitmapTables =
    BitmapTables { location: Tag::BLOC, data: Tag::BDAT, scale: Tag::BSCA };

/// How many bytes a strike's index data may grow before the strike is
/// dropped. Fixed-size ranges that lose glyphs in the middle are the only
/// subtables that grow when rewritten.
const MAX_INDEX_GROWTH: usize = 0;

const LOCATION_HEADER_SIZE: usize = 8;
const DATA_HEADER_SIZE: usize = 4;

/// The size of a scaling record.
const BITMAP_SCALE_SIZE: usize = 28;

/// A strike's record in the location table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct BitmapSize {
    index_subtable_array_offset: u32,
    index_tables_size: u32,
    number_of_index_subtables: u32,
    color_ref: u32,
    /// Horizontal and vertical line metrics, kept as they are.
    line_metrics: [u8; 24],
    start_glyph_index: u16,
    end_glyph_index: u16,
    ppem_x: u8,
    ppem_y: u8,
    bit_depth: u8,
    flags: i8,
}

impl BitmapSize {
    const SIZE: usize = 48;
}

impl Structure<'_> for BitmapSize {
    fn read(r: &mut Reader) -> Result<Self> {
        Ok(Self {
            index_subtable_array_offset: r.read()?,
            index_tables_size: r.read()?,
            number_of_index_subtables: r.read()?,
            color_ref: r.read()?,
            line_metrics: r.read()?,
            start_glyph_index: r.read()?,
            end_glyph_index: r.read()?,
            ppem_x: r.read()?,
            ppem_y: r.read()?,
            bit_depth: r.read()?,
            flags: r.read()?,
        })
    }

    fn write(&self, w: &mut Writer) {
        w.write(self.index_subtable_array_offset);
        w.write(self.index_tables_size);
        w.write(self.number_of_index_subtables);
        w.write(self.color_ref);
        w.write(self.line_metrics);
        w.write(self.start_glyph_index);
        w.write(self.end_glyph_index);
        w.write(self.ppem_x);
        w.write(self.ppem_y);
        w.write(self.bit_depth);
        w.write(self.flags);
    }
}

pub(crate) fn subset(ctx: &mut Context, tables: BitmapTables) -> Result<TableOutcome> {
    if tables.location == APPLE.location && mirrors_microsoft(ctx)? {
        return Ok(TableOutcome::Rewritten);
    }

    let location = ctx.out.table(tables.location)?;
    let data = ctx.out.table(tables.data)?;
    let keep = &ctx.keep;
    let Some(rebuilt) = rebuild(location, data, |glyph| keep.is_kept(glyph))? else {
        log::debug!("{}: no strike left", tables.location);
        for tag in [tables.location, tables.data, tables.scale] {
            ctx.out.delete(tag);
        }
        return Ok(TableOutcome::Rewritten);
    };

    if rebuilt.location.len() > location.len() || rebuilt.data.len() > data.len() {
        log::warn!("{} would grow, keeping the original bitmaps", tables.location);
        return Ok(TableOutcome::Original);
    }

    log::debug!(
        "{}: {} -> {} bytes, {}: {} -> {} bytes, {} strikes",
        tables.location,
        location.len(),
        rebuilt.location.len(),
        tables.data,
        data.len(),
        rebuilt.data.len(),
        rebuilt.sizes.len(),
    );

    ctx.out.update(tables.location, &rebuilt.location)?;
    ctx.out.update(tables.data, &rebuilt.data)?;

    if ctx.out.contains(tables.scale) {
        let scale = filter_scales(ctx.out.table(tables.scale)?, &rebuilt.sizes)?;
        match scale {
            Some(scale) => ctx.out.update(tables.scale, &scale)?,
            None => ctx.out.delete(tables.scale),
        }
    }

    Ok(TableOutcome::Rewritten)
}

/// If the Apple tables share their bytes with the Microsoft ones, let them
/// share the rewritten bytes too. Returns whether they did.
fn mirrors_microsoft(ctx: &mut Context) -> Result<bool> {
    let shares = |apple: Tag, microsoft: Tag| {
        match (ctx.face.record(apple), ctx.face.record(microsoft)) {
            (Some(a), Some(m)) => a.offset == m.offset && a.length == m.length,
            _ => false,
        }
    };

    if !shares(APPLE.location, MICROSOFT.location) || !shares(APPLE.data, MICROSOFT.data) {
        return Ok(false);
    }

    let pairs = [
        (APPLE.location, MICROSOFT.location),
        (APPLE.data, MICROSOFT.data),
        (APPLE.scale, MICROSOFT.scale),
    ];

    for (apple, microsoft) in pairs {
        if !ctx.out.contains(apple) || !shares(apple, microsoft) {
            continue;
        }
        if ctx.out.contains(microsoft) {
            ctx.out.alias(apple, microsoft)?;
        } else {
            ctx.out.delete(apple);
        }
    }

    log::debug!("{} shares its bytes with {}", APPLE.location, MICROSOFT.location);
    Ok(true)
}

/// Rewritten location and data tables.
#[derive(Debug)]
struct Rebuilt {
    location: Vec<u8>,
    data: Vec<u8>,
    /// The kept strikes.
    sizes: Vec<BitmapSize>,
}

/// Rebuild a location and data table pair for the kept glyphs. Returns
/// `None` if no strike is left.
fn rebuild(location: &[u8], data: &[u8], keep: impl Fn(u16) -> bool) -> Result<Option<Rebuilt>> {
    let mut r = Reader::new(location);
    let version = r.read::<u32>()?;
    let num_sizes = r.read::<u32>()?;

    let mut strikes: Vec<(BitmapSize, Vec<Plan>)> = vec![];
    for _ in 0..num_sizes {
        let size = r.read::<BitmapSize>()?;
        if let Some(plans) = plan_strike(location, &size, &keep)? {
            strikes.push((size, plans));
        }
    }

    if strikes.is_empty() {
        return Ok(None);
    }

    let mut new_data = Writer::with_capacity(data.len());
    new_data.extend(crate::util::slice(data, 0, DATA_HEADER_SIZE)?);
    let mut copied: FxHashMap<(u32, Vec<(u32, u32)>), u32> = FxHashMap::default();

    let mut sizes = Vec::with_capacity(strikes.len());
    let mut blocks = Vec::with_capacity(strikes.len());
    let mut offset = LOCATION_HEADER_SIZE + strikes.len() * BitmapSize::SIZE;

    for (size, plans) in strikes {
        let mut image_offsets = Vec::with_capacity(plans.len());
        for plan in &plans {
            let ranges: Vec<(u32, u32)> =
                plan.images.iter().map(|image| (image.start, image.end)).collect();
            let key = (plan.source, ranges);
            let image_offset = match copied.get(&key) {
                Some(&offset) => offset,
                None => {
                    let offset = to_u32(new_data.len())?;
                    for &(start, end) in &key.1 {
                        let len = (end - start) as usize;
                        new_data.extend(crate::util::slice(data, start as usize, len)?);
                    }
                    copied.insert(key, offset);
                    offset
                }
            };
            image_offsets.push(image_offset);
        }

        let block = index::write_array(&plans, &image_offsets)?;
        sizes.push(BitmapSize {
            index_subtable_array_offset: to_u32(offset)?,
            index_tables_size: to_u32(block.len())?,
            number_of_index_subtables: to_u32(plans.len())?,
            start_glyph_index: plans.iter().map(|p| p.first).min().unwrap_or(0),
            end_glyph_index: plans.iter().map(|p| p.last).max().unwrap_or(0),
            ..size
        });
        offset = add(offset, block.len())?;
        blocks.push(block);
    }

    let mut new_location = Writer::with_capacity(offset);
    new_location.write::<u32>(version);
    new_location.write::<u32>(to_u32(sizes.len())?);
    sizes.iter().for_each(|size| new_location.write(*size));
    blocks.iter().for_each(|block| new_location.extend(block));

    Ok(Some(Rebuilt { location: new_location.finish(), data: new_data.finish(), sizes }))
}

/// Plan the index subtables of a strike. Returns `None` if the strike is
/// dropped.
fn plan_strike(
    location: &[u8],
    size: &BitmapSize,
    keep: &impl Fn(u16) -> bool,
) -> Result<Option<Vec<Plan>>> {
    let subtables = index::parse_array(
        location,
        size.index_subtable_array_offset as usize,
        size.number_of_index_subtables,
    )?;

    let mut plans = vec![];
    for subtable in &subtables {
        if let Some(plan) = subtable.plan(keep)? {
            plans.push(plan);
        }
    }

    if plans.is_empty() {
        log::debug!("dropping empty {}x{} strike", size.ppem_x, size.ppem_y);
        return Ok(None);
    }

    let budget = add(size.index_tables_size as usize, MAX_INDEX_GROWTH)?;
    if index::array_size(&plans) > budget {
        log::warn!(
            "dropping {}x{} strike, its index would grow past {} bytes",
            size.ppem_x,
            size.ppem_y,
            size.index_tables_size
        );
        return Ok(None);
    }

    Ok(Some(plans))
}

/// Remove scaling records whose substitute strike is gone. Returns `None`
/// if no record is left.
fn filter_scales(scale: &[u8], sizes: &[BitmapSize]) -> Result<Option<Vec<u8>>> {
    let mut r = Reader::new(scale);
    let version = r.read::<u32>()?;
    let count = r.read::<u32>()?;

    let mut kept = vec![];
    for _ in 0..count {
        let record = r.read_bytes(BITMAP_SCALE_SIZE)?;
        let (substitute_x, substitute_y) = (record[26], record[27]);
        if sizes.iter().any(|s| s.ppem_x == substitute_x && s.ppem_y == substitute_y) {
            kept.push(record);
        }
    }

    if kept.is_empty() {
        return Ok(None);
    }

    let mut w = Writer::with_capacity(8 + kept.len() * BITMAP_SCALE_SIZE);
    w.write::<u32>(version);
    w.write::<u32>(to_u32(kept.len())?);
    kept.iter().for_each(|record| w.extend(record));
    Ok(Some(w.finish()))
}
