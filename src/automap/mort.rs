//! Noncontextual substitutions from the AAT `mort` and `morx` tables.
//!
//! Both tables are a list of chains of subtables. Only noncontextual
//! subtables map glyphs to glyphs directly, through an AAT lookup table.

use super::*;
use crate::util::add;

/// The subtable type of noncontextual glyph substitution.
const NONCONTEXTUAL: u32 = 4;

/// A glyph value that deletes the glyph in `morx`.
const DELETED_GLYPH: u16 = 0xFFFF;

/// Collect substitutions from a `mort` table or, if `extended`, a `morx`
/// table.
pub(super) fn collect(data: &[u8], extended: bool, map: &mut Automap) -> Result<()> {
    let mut r = Reader::new(data);
    r.skip(4)?; // version (+ unused)
    let chains = r.read::<u32>()?;

    for _ in 0..chains {
        let chain = r.offset();
        r.skip(4)?; // default flags
        let chain_len = r.read::<u32>()? as usize;
        let (features, subtables) = if extended {
            (r.read::<u32>()? as usize, r.read::<u32>()?)
        } else {
            (usize::from(r.read::<u16>()?), u32::from(r.read::<u16>()?))
        };
        r.skip(crate::util::mul(features, 12)?)?;

        for _ in 0..subtables {
            let start = r.offset();
            let (len, kind, header) = if extended {
                let len = r.read::<u32>()? as usize;
                let coverage = r.read::<u32>()?;
                (len, coverage & 0xFF, 12)
            } else {
                let len = usize::from(r.read::<u16>()?);
                let coverage = r.read::<u16>()?;
                (len, u32::from(coverage & 0x7), 8)
            };

            if len < header {
                return Err(Error::InvalidData);
            }

            let end = add(start, len)?;
            if kind == NONCONTEXTUAL {
                let table = data.get(start + header..end).ok_or(Error::OutOfBounds)?;
                for (glyph, value) in lookup(table)? {
                    if value != DELETED_GLYPH {
                        map.add_substitute(glyph, value);
                    }
                }
            }
            r.jump(end);
        }

        r.jump(add(chain, chain_len)?);
    }

    Ok(())
}

/// Read all `(glyph, value)` pairs of an AAT lookup table with 16-bit values.
fn lookup(data: &[u8]) -> Result<Vec<(u16, u16)>> {
    let mut r = Reader::new(data);
    let format = r.read::<u16>()?;
    let mut pairs = vec![];

    match format {
        // Simple array, indexed by glyph.
        0 => {
            let mut glyph = 0u16;
            while !r.at_end() {
                pairs.push((glyph, r.read::<u16>()?));
                glyph = glyph.checked_add(1).ok_or(Error::InvalidData)?;
            }
        }
        // Segments, with one value or an array of values each.
        2 | 4 => {
            let (unit, count) = binary_search_header(&mut r, 6)?;
            for i in 0..count {
                let at = 12 + i * unit;
                let last = u16::read_at(data, at)?;
                let first = u16::read_at(data, at + 2)?;
                if last == 0xFFFF && first == 0xFFFF {
                    break;
                }
                if first > last {
                    return Err(Error::InvalidData);
                }

                let value = u16::read_at(data, at + 4)?;
                for (k, glyph) in (first..=last).enumerate() {
                    let value = if format == 2 {
                        value
                    } else {
                        u16::read_at(data, usize::from(value) + 2 * k)?
                    };
                    pairs.push((glyph, value));
                }
            }
        }
        // Single glyphs.
        6 => {
            let (unit, count) = binary_search_header(&mut r, 4)?;
            for i in 0..count {
                let at = 12 + i * unit;
                let glyph = u16::read_at(data, at)?;
                if glyph == 0xFFFF {
                    break;
                }
                pairs.push((glyph, u16::read_at(data, at + 2)?));
            }
        }
        // Trimmed array.
        8 => {
            let first = r.read::<u16>()?;
            let count = r.read::<u16>()?;
            for k in 0..count {
                let glyph = first.checked_add(k).ok_or(Error::InvalidData)?;
                pairs.push((glyph, r.read::<u16>()?));
            }
        }
        _ => return Err(Error::Unsupported(Tag::MORX, format)),
    }

    Ok(pairs)
}

/// Read the binary search header of a lookup table, returning the unit size
/// and the number of units.
fn binary_search_header(r: &mut Reader, min_unit: usize) -> Result<(usize, usize)> {
    let unit = usize::from(r.read::<u16>()?);
    let count = usize::from(r.read::<u16>()?);
    r.skip(6)?; // search range + entry selector + range shift
    if unit < min_unit {
        return Err(Error::InvalidData);
    }
    Ok((unit, count))
}
