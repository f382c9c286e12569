//! Glyphs that are only reachable indirectly.
//!
//! A requested glyph may be replaced by another one during shaping, e.g. by a
//! GSUB substitution or an AAT metamorphosis. Justification and baseline
//! tables also name glyphs that the layout engine may insert on its own. All
//! of these need to survive subsetting, or the text can't be laid out the way
//! the font intends.
//!
//! Layout tables are optional for the subsetter: a table that cannot be
//! parsed is skipped with a warning instead of failing the whole call.

use super::*;
use crate::keep::GlyphReferences;
use rustc_hash::FxHashMap;

mod base;
mod gsub;
mod jstf;
mod mort;

/// A ligature and the glyphs it is formed from.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Ligature {
    glyph: u16,
    /// All components, including the first one.
    components: Vec<u16>,
}

/// Indirect glyph references collected from the layout tables of a face.
#[derive(Debug, Default)]
pub(crate) struct Automap {
    /// Glyphs a glyph may be substituted with.
    substitutes: FxHashMap<u16, Vec<u16>>,
    ligatures: Vec<Ligature>,
    /// The ligatures each glyph is a component of, as indices into
    /// `ligatures`.
    by_component: FxHashMap<u16, Vec<usize>>,
    /// Glyphs that are always kept.
    anchors: Vec<u16>,
}

impl Automap {
    /// Collect the references of every layout table in the face.
    pub fn new(face: &Face) -> Self {
        let mut map = Self::default();
        map.collect(face, Tag::GSUB, gsub::collect);
        map.collect(face, Tag::MORT, |data, map| mort::collect(data, false, map));
        map.collect(face, Tag::MORX, |data, map| mort::collect(data, true, map));
        map.collect(face, Tag::JSTF, |data, map| jstf::collect(data, &mut map.anchors));
        map.collect(face, Tag::BASE, |data, map| base::collect(data, &mut map.anchors));

        map.anchors.sort_unstable();
        map.anchors.dedup();
        log::debug!(
            "automap: {} substituted glyphs, {} ligatures, {} anchors",
            map.substitutes.len(),
            map.ligatures.len(),
            map.anchors.len()
        );

        map
    }

    fn collect(
        &mut self,
        face: &Face,
        tag: Tag,
        f: impl FnOnce(&[u8], &mut Self) -> Result<()>,
    ) {
        let Some(data) = face.table(tag) else { return };
        if let Err(err) = f(data, self) {
            log::warn!("ignoring malformed {tag} table for automap: {err}");
        }
    }

    /// Glyphs that are kept regardless of the request.
    pub fn anchors(&self) -> &[u16] {
        &self.anchors
    }

    /// Record that `from` may be replaced by `to`.
    fn add_substitute(&mut self, from: u16, to: u16) {
        if from != to {
            self.substitutes.entry(from).or_default().push(to);
        }
    }

    fn add_ligature(&mut self, glyph: u16, components: Vec<u16>) {
        let index = self.ligatures.len();
        for &component in &components {
            let entry = self.by_component.entry(component).or_default();
            if entry.last() != Some(&index) {
                entry.push(index);
            }
        }
        self.ligatures.push(Ligature { glyph, components });
    }
}

impl GlyphReferences for Automap {
    fn referenced(&self, glyph: u16, keep: &KeepList, out: &mut Vec<u16>) -> Result<()> {
        if let Some(substitutes) = self.substitutes.get(&glyph) {
            out.extend(substitutes);
        }

        // A ligature is only needed once all of its components are.
        for &index in self.by_component.get(&glyph).into_iter().flatten() {
            let ligature = &self.ligatures[index];
            if ligature.components.iter().all(|&c| c == glyph || keep.is_kept(c)) {
                out.push(ligature.glyph);
            }
        }

        Ok(())
    }
}

/// Read a coverage table: the glyphs, in coverage index order.
fn coverage(data: &[u8], offset: usize) -> Result<Vec<u16>> {
    let mut r = Reader::new_at(data, offset);
    match r.read::<u16>()? {
        1 => {
            let count = r.read::<u16>()?;
            r.read_vector::<u16>(usize::from(count))
        }
        2 => {
            let count = r.read::<u16>()?;
            let mut glyphs = vec![];
            for _ in 0..count {
                let start = r.read::<u16>()?;
                let end = r.read::<u16>()?;
                r.skip(2)?; // start coverage index
                // Ranges must be sorted and disjoint.
                if start > end || glyphs.last().is_some_and(|&last| start <= last) {
                    return Err(Error::InvalidData);
                }
                glyphs.extend(start..=end);
            }
            Ok(glyphs)
        }
        _ => Err(Error::InvalidData),
    }
}

/// Resolve a 16-bit offset relative to `base`.
fn offset16(data: &[u8], base: usize, at: usize) -> Result<usize> {
    let offset = u16::read_at(data, at)?;
    crate::util::add(base, usize::from(offset))
}
