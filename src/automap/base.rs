//! Reference glyphs from the `BASE` table. Format 2 baseline coordinates are
//! measured against a point of some glyph, which must stay in the font.

use super::*;

/// The base coordinate format that refers to a glyph.
const GLYPH_COORD: u16 = 2;

pub(super) fn collect(data: &[u8], anchors: &mut Vec<u16>) -> Result<()> {
    // Horizontal and vertical axes.
    for at in [4, 6] {
        let axis = u16::read_at(data, at)?;
        if axis != 0 {
            collect_axis(data, usize::from(axis), anchors)?;
        }
    }
    Ok(())
}

fn collect_axis(data: &[u8], axis: usize, anchors: &mut Vec<u16>) -> Result<()> {
    let list = offset16(data, axis, axis + 2)?;
    if list == axis {
        return Ok(());
    }

    let count = u16::read_at(data, list)?;
    for i in 0..usize::from(count) {
        let script = offset16(data, list, list + 2 + 6 * i + 4)?;
        let mut r = Reader::new_at(data, script);
        let values = r.read::<u16>()?;
        let default_min_max = r.read::<u16>()?;
        let lang_systems = r.read::<u16>()?;

        if values != 0 {
            let values = script + usize::from(values);
            let mut r = Reader::new_at(data, values + 2);
            let coords = r.read::<u16>()?;
            for _ in 0..coords {
                let coord = values + usize::from(r.read::<u16>()?);
                collect_coord(data, coord, anchors)?;
            }
        }

        if default_min_max != 0 {
            collect_min_max(data, script + usize::from(default_min_max), anchors)?;
        }

        for _ in 0..lang_systems {
            r.skip(4)?; // tag
            let min_max = r.read::<u16>()?;
            if min_max != 0 {
                collect_min_max(data, script + usize::from(min_max), anchors)?;
            }
        }
    }

    Ok(())
}

fn collect_min_max(data: &[u8], table: usize, anchors: &mut Vec<u16>) -> Result<()> {
    let mut r = Reader::new_at(data, table);
    let mut coords = vec![r.read::<u16>()?, r.read::<u16>()?];
    let features = r.read::<u16>()?;
    for _ in 0..features {
        r.skip(4)?; // tag
        coords.push(r.read::<u16>()?);
        coords.push(r.read::<u16>()?);
    }

    for coord in coords.into_iter().filter(|&c| c != 0) {
        collect_coord(data, table + usize::from(coord), anchors)?;
    }
    Ok(())
}

fn collect_coord(data: &[u8], coord: usize, anchors: &mut Vec<u16>) -> Result<()> {
    if u16::read_at(data, coord)? == GLYPH_COORD {
        anchors.push(u16::read_at(data, coord + 4)?);
    }
    Ok(())
}
