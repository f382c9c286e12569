use crate::{Error, Result};
use rustc_hash::FxHashMap;

/// A structure that allows to remap glyph ids to new numbers so that they
/// form a contiguous sequence of numbers.
#[derive(Debug, Clone, Default)]
struct Remapper {
    /// The map that maps numbers from their old value to their new value.
    forward: FxHashMap<u16, u16>,
    /// The vector that stores the "reverse" mapping, i.e. given a new number,
    /// it allows to map back to the old one.
    backward: Vec<u16>,
}

impl Remapper {
    /// Remap a value, either returning the previously assigned number if it
    /// already has been remapped, or assigning the next free number.
    fn remap(&mut self, old: u16) -> Result<u16> {
        if let Some(&new) = self.forward.get(&old) {
            return Ok(new);
        }

        let new = u16::try_from(self.backward.len()).map_err(|_| Error::Overflow)?;
        self.forward.insert(old, new);
        self.backward.push(old);
        Ok(new)
    }
}

/// A remapper that allows to assign a new ordering to a subset of glyphs.
/// For example, let's say that we want to subset a font that only contains the
/// glyphs 4, 9 and 16. In this case, the remapper yields a remapping
/// that assigns the following glyph IDs:
/// 0 -> 0 (The .notdef glyph will always be included)
/// 4 -> 1
/// 9 -> 2
/// 16 -> 3
/// This is needed when the output font only has slots for the kept glyphs.
/// When every glyph keeps its slot, the identity remapper is used instead.
#[derive(Debug, Clone)]
pub struct GlyphRemapper(Kind);

#[derive(Debug, Clone)]
enum Kind {
    Custom(Remapper),
    Identity,
}

impl GlyphRemapper {
    /// Create a new remapper that maps each glyph to itself.
    pub fn identity() -> Self {
        Self(Kind::Identity)
    }

    /// Create a remapper from a set of glyphs. The mapping is monotonically
    /// increasing and .notdef always maps to 0.
    pub fn new_from_glyphs(glyphs: impl Iterator<Item = u16>) -> Result<Self> {
        let mut sorted: Vec<u16> = glyphs.collect();
        sorted.push(0);
        sorted.sort_unstable();
        sorted.dedup();

        let mut remapper = Remapper::default();
        for glyph in sorted {
            remapper.remap(glyph)?;
        }

        Ok(Self(Kind::Custom(remapper)))
    }

    /// Get the number of glyphs in the new numbering, if it is known.
    pub fn num_gids(&self) -> Option<u16> {
        match &self.0 {
            // A full remapper covers at most 65536 glyphs, so this can only
            // be out of range if glyph 0xFFFF was mapped.
            Kind::Custom(custom) => u16::try_from(custom.backward.len()).ok(),
            Kind::Identity => None,
        }
    }

    /// Get the mapping of a glyph ID, if it has been remapped.
    pub fn get(&self, old: u16) -> Option<u16> {
        match &self.0 {
            Kind::Custom(custom) => custom.forward.get(&old).copied(),
            Kind::Identity => Some(old),
        }
    }

    /// The old glyph ids, in the order of their new ids. Empty for the
    /// identity remapper.
    pub fn remapped_gids(&self) -> &[u16] {
        match &self.0 {
            Kind::Custom(custom) => &custom.backward,
            Kind::Identity => &[],
        }
    }
}
