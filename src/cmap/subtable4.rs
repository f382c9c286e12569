use super::*;
use crate::directory::search_params;
use crate::util::to_u16;

/// A format 4 subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Subtable4<'a> {
    language: u16,
    end_codes: Vec<u16>,
    start_codes: Vec<u16>,
    id_deltas: Vec<i16>,
    id_range_offsets: Vec<u16>,
    /// The data starting at the id range offsets, which the offsets are
    /// relative to. The glyph id array follows the offsets and runs to the
    /// end of the data.
    glyph_id_array: &'a [u8],
}

impl Mappings for Subtable4<'_> {
    /// Returns a glyph index for a code point.
    fn glyph_index(&self, code_point: u32) -> Option<u16> {
        // This subtable supports code points only in a u16 range.
        let code_point = u16::try_from(code_point).ok()?;

        // A custom binary search.
        let mut start = 0;
        let mut end = self.start_codes.len();
        while end > start {
            let index = (start + end) / 2;
            let end_value = *self.end_codes.get(index)?;
            if end_value >= code_point {
                let start_value = *self.start_codes.get(index)?;
                if start_value > code_point {
                    end = index;
                } else {
                    let id_range_offset = *self.id_range_offsets.get(index)?;
                    let id_delta = *self.id_deltas.get(index)?;
                    if id_range_offset == 0 {
                        return Some(code_point.wrapping_add(id_delta as u16));
                    } else if id_range_offset == 0xFFFF {
                        // Some malformed fonts have 0xFFFF as the last offset,
                        // which is invalid and should be ignored.
                        return None;
                    }

                    let delta = (u32::from(code_point) - u32::from(start_value)) * 2;
                    let pos = index * 2 + delta as usize + usize::from(id_range_offset);
                    let glyph_array_value = u16::read_at(self.glyph_id_array, pos).ok()?;

                    // 0 indicates missing glyph.
                    if glyph_array_value == 0 {
                        return None;
                    }

                    return Some(glyph_array_value.wrapping_add(id_delta as u16));
                }
            } else {
                start = index + 1;
            }
        }

        None
    }

    /// Calls `f` for each codepoint defined in this table.
    fn codepoints(&self, mut f: impl FnMut(u32)) {
        for (start, end) in self.start_codes.iter().zip(&self.end_codes) {
            // OxFFFF value is special and indicates codes end.
            if *start == *end && *start == 0xFFFF {
                break;
            }

            for code_point in *start..=*end {
                f(u32::from(code_point));
            }
        }
    }
}

impl<'a> Structure<'a> for Subtable4<'a> {
    fn read(r: &mut Reader<'a>) -> Result<Self> {
        r.skip(4)?; // format + length
        let language = r.read::<u16>()?;
        let seg_count_x2 = r.read::<u16>()?;

        if seg_count_x2 < 2 {
            return Err(Error::InvalidData);
        }

        let seg_count = usize::from(seg_count_x2 / 2);
        r.skip(6)?; // search range + entry selector + range shift
        let end_codes = r.read_vector::<u16>(seg_count)?;
        r.skip(2)?; // reserved pad
        let start_codes = r.read_vector::<u16>(seg_count)?;
        let id_deltas = r.read_vector::<i16>(seg_count)?;

        let glyph_id_array = r.tail()?;
        let id_range_offsets = r.read_vector::<u16>(seg_count)?;

        Ok(Subtable4 {
            language,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets,
            glyph_id_array,
        })
    }

    fn write(&self, w: &mut Writer) {
        let seg_count = self.end_codes.len() as u16;
        let glyph_ids =
            self.glyph_id_array.get(2 * self.id_range_offsets.len()..).unwrap_or_default();
        let (search_range, entry_selector, range_shift) =
            search_params(seg_count, 2).unwrap_or_default();
        // Lengths of tables past 64 KiB wrap around.
        let length = 16 + 8 * self.end_codes.len() + glyph_ids.len();
        w.write::<u16>(4);
        w.write::<u16>(length as u16);
        w.write::<u16>(self.language);
        w.write::<u16>(2 * seg_count);
        w.write::<u16>(search_range);
        w.write::<u16>(entry_selector);
        w.write::<u16>(range_shift);
        self.end_codes.iter().for_each(|&v| w.write::<u16>(v));
        w.write::<u16>(0);
        self.start_codes.iter().for_each(|&v| w.write::<u16>(v));
        self.id_deltas.iter().for_each(|&v| w.write::<i16>(v));
        self.id_range_offsets.iter().for_each(|&v| w.write::<u16>(v));
        w.extend(glyph_ids);
    }
}

/// One segment of a regenerated subtable.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    /// Glyphs follow from the codes by a constant delta.
    Delta { start: u16, end: u16, delta: i16 },
    /// Glyphs are listed one by one in the glyph id array.
    Array { start: u16, glyphs: Vec<u16> },
}

impl Segment {
    fn start(&self) -> u16 {
        match self {
            Self::Delta { start, .. } | Self::Array { start, .. } => *start,
        }
    }

    fn end(&self) -> u16 {
        match self {
            Self::Delta { end, .. } => *end,
            Self::Array { start, glyphs } => start + (glyphs.len() as u16 - 1),
        }
    }
}

/// Create a subsetted version of a format 4 subtable from its surviving
/// mappings.
pub(crate) fn subset(table: &Subtable4, mappings: &[(u32, u16)]) -> Result<Vec<u8>> {
    let mappings: Vec<(u16, u16)> = mappings
        .iter()
        .filter_map(|&(code, glyph)| Some((u16::try_from(code).ok()?, glyph)))
        .collect();
    build(table.language, &mappings)
}

/// Build a format 4 subtable from mappings sorted by code.
///
/// Runs of consecutive codes become either one segment per constant delta
/// or a single segment backed by the glyph id array, whichever is smaller.
fn build(language: u16, mappings: &[(u16, u16)]) -> Result<Vec<u8>> {
    let delta = |(c, g): (u16, u16)| g.wrapping_sub(c) as i16;

    let mut segments = vec![];
    let mut rest = mappings;
    while let Some(&first) = rest.first() {
        // Code 0xFFFF is reserved for the terminating segment.
        if first.0 == 0xFFFF {
            break;
        }

        let len = rest
            .windows(2)
            .position(|w| w[0].0.checked_add(1) != Some(w[1].0) || w[1].0 == 0xFFFF)
            .map_or(rest.len(), |i| i + 1);
        let (run, tail) = rest.split_at(len);
        rest = tail;

        let mut deltas = vec![];
        let mut cur = Segment::Delta { start: run[0].0, end: run[0].0, delta: delta(run[0]) };
        for &pair in &run[1..] {
            if let Segment::Delta { end, delta: d, .. } = &mut cur {
                if *d == delta(pair) {
                    *end = pair.0;
                    continue;
                }
            }
            let next = Segment::Delta { start: pair.0, end: pair.0, delta: delta(pair) };
            deltas.push(std::mem::replace(&mut cur, next));
        }
        deltas.push(cur);

        if 8 + 2 * run.len() < 8 * deltas.len() {
            let glyphs = run.iter().map(|&(_, g)| g).collect();
            segments.push(Segment::Array { start: run[0].0, glyphs });
        } else {
            segments.extend(deltas);
        }
    }

    // "For the search to terminate, the final start code and endCode values must
    // be 0xFFFF. This segment need not contain any valid mappings. (It can just map the
    // single character code 0xFFFF to missingGlyph). However, the segment must be present."
    segments.push(Segment::Delta { start: 0xFFFF, end: 0xFFFF, delta: 1 });

    let array_len: usize = segments
        .iter()
        .map(|s| match s {
            Segment::Array { glyphs, .. } => glyphs.len(),
            Segment::Delta { .. } => 0,
        })
        .sum();
    let length = to_u16(16 + 8 * segments.len() + 2 * array_len)?;

    // The offsets are relative to their own position.
    let mut id_range_offsets = Vec::with_capacity(segments.len());
    let mut array_pos = 0;
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Delta { .. } => id_range_offsets.push(0),
            Segment::Array { glyphs, .. } => {
                id_range_offsets.push(to_u16(2 * (segments.len() - i) + 2 * array_pos)?);
                array_pos += glyphs.len();
            }
        }
    }

    let mut array = Writer::with_capacity(2 * (segments.len() + array_len));
    id_range_offsets.iter().for_each(|&v| array.write::<u16>(v));
    for segment in &segments {
        if let Segment::Array { glyphs, .. } = segment {
            glyphs.iter().for_each(|&g| array.write::<u16>(g));
        }
    }
    let array = array.finish();

    let table = Subtable4 {
        language,
        end_codes: segments.iter().map(Segment::end).collect(),
        start_codes: segments.iter().map(Segment::start).collect(),
        id_deltas: segments
            .iter()
            .map(|segment| match segment {
                Segment::Delta { delta, .. } => *delta,
                Segment::Array { .. } => 0,
            })
            .collect(),
        id_range_offsets,
        glyph_id_array: &array,
    };

    let mut w = Writer::with_capacity(usize::from(length));
    w.write(table);
    Ok(w.finish())
}
