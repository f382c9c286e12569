//! Deciding which glyphs end up in the subset.
//!
//! The client's request is resolved to glyph ids first. The list is then
//! expanded in waves: every wave looks only at the glyphs the previous wave
//! added and pulls in everything they reference, e.g. the components of
//! composite glyphs or the results of glyph substitutions. Once a wave adds
//! nothing, the keep-list is final.

use super::*;
use crate::automap::Automap;
use crate::cmap::{self, Mappings};

/// The wave the client's request and the always-kept glyphs are placed in.
const FIRST_WAVE: u32 = 1;

/// U+00B7 MIDDLE DOT.
const MIDDLE_DOT: u32 = 0x00B7;

/// U+2219 BULLET OPERATOR. Some renderers draw it in place of the middle
/// dot, so it is kept along with it.
const BULLET_OPERATOR: u32 = 0x2219;

/// Fonts whose first character is at or above this are symbol fonts, which
/// map their single-byte codes into the private use area.
const SYMBOL_FIRST_CHAR: u16 = 0xF000;

/// The offset of `usFirstCharIndex` in the OS/2 table.
const OS2_FIRST_CHAR_OFFSET: usize = 64;

/// The keep decision for one glyph.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct GlyphState {
    pub kept: bool,
    /// The wave the glyph was first kept in. Zero if it is not kept.
    pub wave: u32,
}

/// The keep decision for every glyph of a font.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeepList {
    states: Vec<GlyphState>,
}

impl KeepList {
    /// A keep-list with every glyph dropped.
    pub fn new(num_glyphs: u16) -> Self {
        Self { states: vec![GlyphState::default(); usize::from(num_glyphs)] }
    }

    /// Keep a glyph, recording the wave it was added in.
    ///
    /// Returns whether the glyph was newly kept. Glyph ids outside of the
    /// font are ignored.
    pub fn mark(&mut self, glyph: u16, wave: u32) -> bool {
        match self.states.get_mut(usize::from(glyph)) {
            Some(state) if !state.kept => {
                *state = GlyphState { kept: true, wave };
                true
            }
            _ => false,
        }
    }

    pub fn is_kept(&self, glyph: u16) -> bool {
        self.states.get(usize::from(glyph)).is_some_and(|state| state.kept)
    }

    #[cfg(test)]
    pub fn state(&self, glyph: u16) -> Option<GlyphState> {
        self.states.get(usize::from(glyph)).copied()
    }

    /// The glyphs that were added in a wave, in ascending order.
    pub fn glyphs_in_wave(&self, wave: u32) -> Vec<u16> {
        self.kept().filter(|&glyph| self.states[usize::from(glyph)].wave == wave).collect()
    }

    /// All kept glyphs, in ascending order.
    pub fn kept(&self) -> impl Iterator<Item = u16> + '_ {
        // The list has at most 65536 entries, so the ids fit.
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.kept)
            .map(|(glyph, _)| glyph as u16)
    }

    /// The number of kept glyphs, saturating at `u16::MAX`.
    pub fn count(&self) -> u16 {
        u16::try_from(self.kept().count()).unwrap_or(u16::MAX)
    }

    /// The highest kept glyph.
    pub fn max_glyph(&self) -> Option<u16> {
        self.kept().last()
    }
}

/// Something that makes a glyph depend on other glyphs.
pub trait GlyphReferences {
    /// Push the glyphs that `glyph` pulls into the subset. The current
    /// keep-list is available for references that need several glyphs to
    /// be kept, like ligatures.
    fn referenced(&self, glyph: u16, keep: &KeepList, out: &mut Vec<u16>) -> Result<()>;
}

/// Expand the keep-list wave by wave until it reaches a fixed point.
///
/// Returns the number of waves that were scanned.
pub fn expand(keep: &mut KeepList, sources: &[&dyn GlyphReferences]) -> Result<u32> {
    let mut wave = FIRST_WAVE;
    let mut out = vec![];

    loop {
        let current = keep.glyphs_in_wave(wave);
        if current.is_empty() {
            return Ok(wave - FIRST_WAVE);
        }

        let mut added = 0;
        for glyph in current {
            out.clear();
            for source in sources {
                source.referenced(glyph, keep, &mut out)?;
            }

            for &referenced in &out {
                if keep.mark(referenced, wave + 1) {
                    added += 1;
                }
            }
        }

        log::trace!("wave {wave} added {added} glyphs");
        wave += 1;
    }
}

/// Build the keep-list for a subsetting request.
pub(crate) fn build(face: &Face, options: &Options, num_glyphs: u16) -> Result<KeepList> {
    face.expect_table(Tag::MAXP)?;
    let glyphs = glyf::Table::new(face, num_glyphs)?;
    let mut keep = KeepList::new(num_glyphs);

    match &options.selection {
        Selection::Chars(chars) => resolve_chars(face, options, chars, &mut keep)?,
        Selection::Glyphs(ids) => {
            for &glyph in ids {
                if glyph >= num_glyphs {
                    log::debug!("ignoring glyph {glyph}, the font has {num_glyphs}");
                }
                keep.mark(glyph, FIRST_WAVE);
            }
        }
    }

    // The missing glyph and the null glyph.
    keep.mark(0, FIRST_WAVE);
    keep.mark(1, FIRST_WAVE);

    // An empty glyf table trips up some consumers.
    let mut all_blank = true;
    for glyph in keep.kept() {
        if !glyphs.is_blank(glyph)? {
            all_blank = false;
            break;
        }
    }

    if all_blank {
        for glyph in 0..num_glyphs {
            if !glyphs.is_blank(glyph)? {
                log::debug!("all requested glyphs are blank, also keeping glyph {glyph}");
                keep.mark(glyph, FIRST_WAVE);
                break;
            }
        }
    }

    let automap = options.automap.then(|| Automap::new(face));
    let mut sources: Vec<&dyn GlyphReferences> = Vec::with_capacity(2);
    sources.push(&glyphs);
    if let Some(automap) = &automap {
        for &anchor in automap.anchors() {
            keep.mark(anchor, FIRST_WAVE);
        }
        sources.push(automap);
    }

    let waves = expand(&mut keep, &sources)?;
    log::trace!("keep-list settled after {waves} waves");
    Ok(keep)
}

/// Resolve character codes through the selected cmap subtable.
fn resolve_chars(
    face: &Face,
    options: &Options,
    chars: &[u32],
    keep: &mut KeepList,
) -> Result<()> {
    let table = cmap::find(face.expect_table(Tag::CMAP)?, options.cmap)?;
    let symbol = face
        .table(Tag::OS2)
        .and_then(|os2| u16::read_at(os2, OS2_FIRST_CHAR_OFFSET).ok())
        .is_some_and(|first| first >= SYMBOL_FIRST_CHAR);

    let resolve = |code: u32| {
        if symbol && code < 0x100 {
            table.lookup(u32::from(SYMBOL_FIRST_CHAR) | code).or_else(|| table.lookup(code))
        } else {
            table.lookup(code)
        }
    };

    for &code in chars {
        match resolve(code) {
            Some(glyph) => {
                keep.mark(glyph, FIRST_WAVE);
            }
            None => log::debug!("character {code:#x} is not mapped"),
        }
    }

    if options.cmap.is_microsoft_unicode()
        && chars.contains(&MIDDLE_DOT)
        && !chars.contains(&BULLET_OPERATOR)
        && resolve(MIDDLE_DOT).is_some()
    {
        if let Some(glyph) = resolve(BULLET_OPERATOR) {
            keep.mark(glyph, FIRST_WAVE);
        }
    }

    Ok(())
}
