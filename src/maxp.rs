//! The `maxp` table holds the glyph count and, for TrueType outlines, a
//! number of maxima over all glyphs. The maxima that depend on the outlines
//! are recomputed from the kept glyphs; the rest concern the hinting
//! interpreter and are kept.

use super::*;
use crate::glyf::{self, Table};
use rustc_hash::FxHashMap;

/// Version 0.5 only has the glyph count.
const VERSION_0_5: u32 = 0x00005000;

/// Composites nested deeper than this are treated as cyclic.
const MAX_COMPONENT_DEPTH: u16 = 64;

record! {
    /// A version 1.0 maxp table.
    struct MaxpV1 {
        version: u32,
        num_glyphs: u16,
        max_points: u16,
        max_contours: u16,
        max_composite_points: u16,
        max_composite_contours: u16,
        max_zones: u16,
        max_twilight_points: u16,
        max_storage: u16,
        max_function_defs: u16,
        max_instruction_defs: u16,
        max_stack_elements: u16,
        max_size_of_instructions: u16,
        max_component_elements: u16,
        max_component_depth: u16,
    }
}

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let mut maxp = ctx.expect_table(Tag::MAXP)?.to_vec();
    let version = u32::read_at(&maxp, 0)?;
    let num_glyphs = ctx.mapper.num_gids().unwrap_or(ctx.num_glyphs);

    if version == VERSION_0_5 {
        codec::write_at(&mut maxp, 0, &MaxpV0_5 { version, num_glyphs })?;
        ctx.out.update(Tag::MAXP, &maxp)?;
        return Ok(TableOutcome::Rewritten);
    }

    let (mut record, _) = codec::read_at::<MaxpV1>(&maxp, 0)?;
    let table = Table::new(&ctx.face, ctx.num_glyphs)?;
    let maxima = Maxima::compute(&table, ctx.keep.kept())?;

    record.num_glyphs = num_glyphs;
    record.max_points = maxima.points;
    record.max_contours = maxima.contours;
    record.max_composite_points = maxima.composite_points;
    record.max_composite_contours = maxima.composite_contours;
    record.max_size_of_instructions = maxima.instructions;
    record.max_component_elements = maxima.component_elements;
    record.max_component_depth = maxima.component_depth;

    log::debug!("maxp: {num_glyphs} glyphs, {maxima:?}");
    codec::write_at(&mut maxp, 0, &record)?;
    ctx.out.update(Tag::MAXP, &maxp)?;
    Ok(TableOutcome::Rewritten)
}

record! {
    struct MaxpV0_5 {
        version: u32,
        num_glyphs: u16,
    }
}

/// The outline maxima over a set of glyphs.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
struct Maxima {
    points: u16,
    contours: u16,
    composite_points: u16,
    composite_contours: u16,
    instructions: u16,
    component_elements: u16,
    component_depth: u16,
}

/// The totals of a composite glyph, summed over its simple leaves. `depth`
/// counts the composite levels from the glyph down to its deepest leaf.
#[derive(Debug, Default, Copy, Clone)]
struct Totals {
    points: u16,
    contours: u16,
    depth: u16,
}

impl Maxima {
    fn compute(table: &Table, glyphs: impl Iterator<Item = u16>) -> Result<Self> {
        let mut maxima = Self::default();
        let mut cache = FxHashMap::default();
        for glyph in glyphs {
            let data = table.glyph_data(glyph)?;
            if glyf::is_composite(data)? {
                let composite = glyf::composite(data)?;
                let totals = composite_totals(table, glyph, 1, &mut cache)?;
                maxima.composite_points = maxima.composite_points.max(totals.points);
                maxima.composite_contours = maxima.composite_contours.max(totals.contours);
                maxima.component_depth = maxima.component_depth.max(totals.depth);
                maxima.instructions = maxima.instructions.max(composite.instructions);
                let elements = crate::util::to_u16(composite.components.len())?;
                maxima.component_elements = maxima.component_elements.max(elements);
            } else {
                let stats = glyf::simple_stats(data)?;
                maxima.points = maxima.points.max(stats.points);
                maxima.contours = maxima.contours.max(stats.contours);
                maxima.instructions = maxima.instructions.max(stats.instructions);
            }
        }
        Ok(maxima)
    }
}

/// Totals are cached per glyph, as components may be shared many times
/// over. `depth` is the nesting level the glyph is reached at.
fn composite_totals(
    table: &Table,
    glyph: u16,
    depth: u16,
    cache: &mut FxHashMap<u16, Totals>,
) -> Result<Totals> {
    if let Some(&totals) = cache.get(&glyph) {
        return Ok(totals);
    }

    if depth > MAX_COMPONENT_DEPTH {
        return Err(Error::InvalidData);
    }

    let mut totals = Totals { depth: 1, ..Totals::default() };
    for component in table.components(glyph)? {
        let data = table.glyph_data(component)?;
        let (points, contours) = if glyf::is_composite(data)? {
            let nested = composite_totals(table, component, depth + 1, cache)?;
            totals.depth = totals.depth.max(nested.depth + 1);
            (nested.points, nested.contours)
        } else {
            let stats = glyf::simple_stats(data)?;
            (stats.points, stats.contours)
        };

        totals.points = totals.points.checked_add(points).ok_or(Error::Overflow)?;
        totals.contours = totals.contours.checked_add(contours).ok_or(Error::Overflow)?;
    }

    cache.insert(glyph, totals);
    Ok(totals)
}
