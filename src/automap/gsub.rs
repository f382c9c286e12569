//! Substitutions from the `GSUB` table.
//!
//! Every lookup is visited, no matter which script or feature it belongs to.
//! Contextual lookups (types 5 and 6) only refer to other lookups, which are
//! visited on their own, so they add nothing here.

use super::*;

const SINGLE: u16 = 1;
const MULTIPLE: u16 = 2;
const ALTERNATE: u16 = 3;
const LIGATURE: u16 = 4;
const EXTENSION: u16 = 7;
const REVERSE_CHAINING: u16 = 8;

pub(super) fn collect(data: &[u8], map: &mut Automap) -> Result<()> {
    let lookup_list = offset16(data, 0, 8)?;
    let count = u16::read_at(data, lookup_list)?;
    for i in 0..usize::from(count) {
        let lookup = offset16(data, lookup_list, lookup_list + 2 + 2 * i)?;
        let mut r = Reader::new_at(data, lookup);
        let kind = r.read::<u16>()?;
        r.skip(2)?; // lookup flag
        let subtables = r.read::<u16>()?;
        for j in 0..usize::from(subtables) {
            let subtable = offset16(data, lookup, lookup + 6 + 2 * j)?;
            collect_subtable(data, kind, subtable, map)?;
        }
    }
    Ok(())
}

fn collect_subtable(data: &[u8], kind: u16, offset: usize, map: &mut Automap) -> Result<()> {
    let format = u16::read_at(data, offset)?;
    match (kind, format) {
        (SINGLE, 1) => {
            let covered = coverage(data, offset16(data, offset, offset + 2)?)?;
            let delta = i16::read_at(data, offset + 4)?;
            for glyph in covered {
                map.add_substitute(glyph, glyph.wrapping_add(delta as u16));
            }
        }
        (SINGLE, 2) => {
            let covered = coverage(data, offset16(data, offset, offset + 2)?)?;
            let mut r = Reader::new_at(data, offset + 4);
            let count = r.read::<u16>()?;
            let substitutes = r.read_vector::<u16>(usize::from(count))?;
            for (glyph, substitute) in covered.into_iter().zip(substitutes) {
                map.add_substitute(glyph, substitute);
            }
        }
        (MULTIPLE, 1) | (ALTERNATE, 1) => {
            // A sequence table and an alternate set have the same shape.
            let covered = coverage(data, offset16(data, offset, offset + 2)?)?;
            let count = u16::read_at(data, offset + 4)?;
            for (i, glyph) in covered.into_iter().take(usize::from(count)).enumerate() {
                let set = offset16(data, offset, offset + 6 + 2 * i)?;
                let mut r = Reader::new_at(data, set);
                let len = r.read::<u16>()?;
                for substitute in r.read_vector::<u16>(usize::from(len))? {
                    map.add_substitute(glyph, substitute);
                }
            }
        }
        (LIGATURE, 1) => {
            let covered = coverage(data, offset16(data, offset, offset + 2)?)?;
            let count = u16::read_at(data, offset + 4)?;
            for (i, first) in covered.into_iter().take(usize::from(count)).enumerate() {
                let set = offset16(data, offset, offset + 6 + 2 * i)?;
                let ligatures = u16::read_at(data, set)?;
                for k in 0..usize::from(ligatures) {
                    let ligature = offset16(data, set, set + 2 + 2 * k)?;
                    let mut r = Reader::new_at(data, ligature);
                    let glyph = r.read::<u16>()?;
                    let len = r.read::<u16>()?;
                    let mut components = vec![first];
                    components.extend(r.read_vector::<u16>(usize::from(len.saturating_sub(1)))?);
                    map.add_ligature(glyph, components);
                }
            }
        }
        (EXTENSION, 1) => {
            let kind = u16::read_at(data, offset + 2)?;
            let target = crate::util::add(offset, u32::read_at(data, offset + 4)? as usize)?;
            if kind == EXTENSION {
                return Err(Error::InvalidData);
            }
            collect_subtable(data, kind, target, map)?;
        }
        (REVERSE_CHAINING, 1) => {
            let covered = coverage(data, offset16(data, offset, offset + 2)?)?;
            let mut r = Reader::new_at(data, offset + 4);
            let backtrack = r.read::<u16>()?;
            r.skip(2 * usize::from(backtrack))?;
            let lookahead = r.read::<u16>()?;
            r.skip(2 * usize::from(lookahead))?;
            let count = r.read::<u16>()?;
            let substitutes = r.read_vector::<u16>(usize::from(count))?;
            for (glyph, substitute) in covered.into_iter().zip(substitutes) {
                map.add_substitute(glyph, substitute);
            }
        }
        (SINGLE..=REVERSE_CHAINING, _) if kind != 5 && kind != 6 => {
            log::debug!("skipping GSUB lookup type {kind} with unknown format {format}");
        }
        _ => {}
    }
    Ok(())
}
