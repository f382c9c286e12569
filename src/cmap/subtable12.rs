use super::*;
use crate::codec::Record;

/// Codes past the last Unicode scalar value are never enumerated.
const LAST_CODE: u32 = 0x10FFFF;

/// The fixed part of the subtable, before the groups.
const HEADER_SIZE: usize = 16;

record! {
    /// Consecutive codes mapping to consecutive glyphs.
    struct MapGroup {
        first_code: u32,
        last_code: u32,
        first_glyph: u32,
    }
}

/// A format 12 subtable: sorted groups of sequential mappings, covering the
/// whole Unicode range.
pub(crate) struct Subtable12 {
    language: u32,
    groups: Vec<MapGroup>,
}

impl Mappings for Subtable12 {
    fn glyph_index(&self, code: u32) -> Option<u16> {
        let i = self.groups.partition_point(|group| group.last_code < code);
        let group = self.groups.get(i).filter(|group| group.first_code <= code)?;
        let glyph = group.first_glyph.checked_add(code - group.first_code)?;
        u16::try_from(glyph).ok()
    }

    fn codepoints(&self, mut f: impl FnMut(u32)) {
        self.groups
            .iter()
            .flat_map(|group| group.first_code..=group.last_code.min(LAST_CODE))
            .for_each(&mut f);
    }
}

impl Structure<'_> for Subtable12 {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        r.skip(8)?; // format, reserved and length
        let language = r.read::<u32>()?;
        let count = r.read::<u32>()?;
        let groups = r.read_vector::<MapGroup>(count as usize)?;
        Ok(Self { language, groups })
    }

    fn write(&self, w: &mut Writer) {
        w.write::<u16>(12);
        w.write::<u16>(0);
        w.write::<u32>((HEADER_SIZE + MapGroup::SIZE * self.groups.len()) as u32);
        w.write::<u32>(self.language);
        w.write::<u32>(self.groups.len() as u32);
        self.groups.iter().for_each(|&group| w.write(group));
    }
}

/// Build a format 12 subtable from the surviving mappings, sorted by code.
pub(crate) fn subset(table: &Subtable12, mappings: &[(u32, u16)]) -> Result<Vec<u8>> {
    let mut groups: Vec<MapGroup> = vec![];
    for &(code, glyph) in mappings {
        let glyph = u32::from(glyph);
        match groups.last_mut() {
            Some(group)
                if group.last_code.checked_add(1) == Some(code)
                    && group.first_glyph + (code - group.first_code) == glyph =>
            {
                group.last_code = code;
            }
            _ => groups.push(MapGroup { first_code: code, last_code: code, first_glyph: glyph }),
        }
    }

    let table = Subtable12 { language: table.language, groups };
    let mut w = Writer::with_capacity(HEADER_SIZE + MapGroup::SIZE * table.groups.len());
    w.write(table);
    Ok(w.finish())
}
