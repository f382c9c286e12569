/*!
Subsets TrueType fonts for embedding in documents.

Given a full TrueType/OpenType font and the characters or glyphs a document
actually uses, this crate produces a smaller, valid font containing only the
needed glyphs together with a consistently reduced copy of every auxiliary
table.

# Example
In the example below, we keep only the glyphs needed to render "Hello".

```no_run
use fontsub::{subset, Options, Selection};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let data = std::fs::read("fonts/NotoSans-Regular.ttf")?;
let chars = "Hello".chars().map(u32::from).collect();
let options = Options::default().with_selection(Selection::Chars(chars));
let sub = subset(&data, &options)?;
std::fs::write("target/Noto-Small.ttf", sub)?;
# Ok(())
# }
```

With the default [`Profile::Subset`], glyph indices are not changed: dropped
glyphs keep their slot but lose their outlines and metrics, which keeps the
font valid for any document that already refers to glyphs by index. The
[`Profile::Delta`] profile renumbers the surviving glyphs instead and keeps
only the tables that describe them.

Subsetting never makes a font bigger. If the subsetted result would exceed the
size of the input, the input is returned unchanged.
*/

#![deny(unsafe_code)]
#![deny(missing_docs)]

#[macro_use]
mod codec;
mod assemble;
mod automap;
mod bitmap;
mod buffer;
mod cmap;
mod directory;
mod glyf;
mod hdmx;
mod head;
mod hmtx;
mod keep;
mod kern;
mod ltsh;
mod maxp;
mod merge;
mod name;
mod os2;
mod post;
mod remapper;
mod stream;
mod util;

use crate::buffer::OutputFont;
use crate::directory::TableRecord;
use crate::keep::KeepList;
use crate::remapper::GlyphRemapper;
use crate::stream::{Reader, Structure};
use std::fmt::{self, Debug, Display, Formatter};

/// Subset a font.
///
/// - The `data` must be a TrueType font or a font collection, in which case
///   [`Options::index`] selects the font.
/// - If the subsetted font would be bigger than `data`, a copy of `data` is
///   returned instead.
pub fn subset(data: &[u8], options: &Options) -> Result<Vec<u8>> {
    subset_with_report(data, options).map(|sub| sub.data)
}

/// Subset a font and report what was kept.
pub fn subset_with_report(data: &[u8], options: &Options) -> Result<Subsetted> {
    let face = parse(data, options.index)?;

    let maxp = face.expect_table(Tag::MAXP)?;
    let num_glyphs = u16::read_at(maxp, 4)?;

    let keep = keep::build(&face, options, num_glyphs)?;
    let kept_glyphs = keep.count();
    let max_glyph = keep.max_glyph().unwrap_or(0);
    log::debug!("keeping {kept_glyphs} of {num_glyphs} glyphs, highest is {max_glyph}");

    let mapper = match options.profile {
        Profile::Delta => GlyphRemapper::new_from_glyphs(keep.kept())?,
        Profile::Subset | Profile::Mergeable => GlyphRemapper::identity(),
    };

    let out = OutputFont::new(&face, |tag| options.profile.keeps_table(tag))?;
    let mut ctx = Context {
        face,
        options,
        num_glyphs,
        keep,
        mapper,
        out,
        long_loca: false,
        char_range: None,
    };

    // The order matters: the glyph rewrite patches the head table, maxp is
    // computed from the rewritten glyphs, and OS/2 needs the cmap results.
    ctx.process(Tag::HEAD)?;
    ctx.process(Tag::GLYF)?;
    ctx.process(Tag::MAXP)?;
    ctx.process(Tag::CMAP)?;
    ctx.process(Tag::OS2)?;

    if ctx.process(Tag::HMTX)? == TableOutcome::Rewritten {
        ctx.process(Tag::HDMX)?;
    } else {
        log::debug!("hmtx left untouched, so hdmx is too");
    }

    ctx.process(Tag::VMTX)?;
    ctx.process(Tag::LTSH)?;
    ctx.process(Tag::KERN)?;
    ctx.process(Tag::NAME)?;
    ctx.process(Tag::POST)?;
    ctx.process(Tag::EBLC)?;
    ctx.process(Tag::BLOC)?;

    if let Some(format) = options.profile.merge_format() {
        merge::write(&mut ctx, format)?;
    }

    let font = assemble::finish(ctx.out)?;
    if font.len() > data.len() {
        log::warn!(
            "subsetted font would grow from {} to {} bytes, keeping the original",
            data.len(),
            font.len()
        );
        return Ok(Subsetted {
            data: data.to_vec(),
            kept_glyphs,
            max_glyph,
            outcome: Outcome::Unchanged,
        });
    }

    Ok(Subsetted { data: font, kept_glyphs, max_glyph, outcome: Outcome::Subsetted })
}

/// Resolve a font index inside a collection to the offset of that font's
/// header. For a plain font, only index 0 is valid and the offset is 0.
pub fn font_offset(data: &[u8], index: u32) -> Result<usize> {
    let kind = u32::read_at(data, 0).map(FontKind::from_version)?;
    match kind {
        Some(FontKind::Collection) => {
            let count = u32::read_at(data, 8)?;
            if index >= count {
                return Err(Error::InvalidOffset);
            }
            let pos = 12usize
                .checked_add(4usize.checked_mul(index as usize).ok_or(Error::Overflow)?)
                .ok_or(Error::Overflow)?;
            let offset = u32::read_at(data, pos)? as usize;
            if offset >= data.len() {
                return Err(Error::InvalidOffset);
            }
            Ok(offset)
        }
        Some(_) if index == 0 => Ok(0),
        Some(_) => Err(Error::InvalidOffset),
        None => Err(Error::UnknownKind),
    }
}

/// Parse a font face from TrueType data.
fn parse(data: &[u8], index: u32) -> Result<Face<'_>> {
    let offset = font_offset(data, index)?;
    let mut r = Reader::new_at(data, offset);
    let version = r.read::<u32>()?;
    match FontKind::from_version(version) {
        Some(FontKind::TrueType) | Some(FontKind::OpenType) => {}
        Some(FontKind::Collection) | None => return Err(Error::UnknownKind),
    }

    // Read number of table records.
    let count = r.read::<u16>()?;
    r.skip(6)?; // search range + entry selector + range shift

    let mut records = r.read_vector::<TableRecord>(count as usize)?;
    for record in &records {
        let end = (record.offset as usize)
            .checked_add(record.length as usize)
            .ok_or(Error::Overflow)?;
        if end > data.len() {
            return Err(Error::InvalidOffset);
        }
    }

    records.sort_by_key(|record| record.tag);
    Ok(Face { data, version, records })
}

/// Which glyphs to keep.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Selection {
    /// Character codes, resolved through the cmap subtable chosen by
    /// [`Options::cmap`].
    Chars(Vec<u32>),
    /// Explicit glyph indices.
    Glyphs(Vec<u16>),
}

/// The shape of the output font.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Profile {
    /// Keep every table and every glyph slot. Dropped glyphs lose their
    /// outlines and metrics.
    Subset,
    /// Like [`Profile::Subset`], but also record which glyphs were kept so
    /// that more glyphs can be merged into the font later.
    Mergeable,
    /// Keep only the structural and glyph tables, renumber the kept glyphs
    /// and record their original indices for a later merge.
    Delta,
}

/// The tables a [`Profile::Delta`] font is made of.
const DELTA_TABLES: &[Tag] = &[
    Tag::HEAD,
    Tag::HHEA,
    Tag::MAXP,
    Tag::HMTX,
    Tag::VHEA,
    Tag::VMTX,
    Tag::LOCA,
    Tag::GLYF,
    Tag::CMAP,
    Tag::OS2,
    Tag::POST,
    Tag::NAME,
    Tag::CVT,
    Tag::FPGM,
    Tag::PREP,
    Tag::HDMX,
    Tag::LTSH,
];

impl Profile {
    /// Whether a table of the input font is carried into the output.
    fn keeps_table(self, tag: Tag) -> bool {
        match self {
            Profile::Subset | Profile::Mergeable => tag != Tag::TTFD,
            Profile::Delta => DELTA_TABLES.contains(&tag),
        }
    }

    /// The format number of the merge record, if this profile writes one.
    fn merge_format(self) -> Option<u16> {
        match self {
            Profile::Subset => None,
            Profile::Mergeable => Some(merge::FORMAT_MERGEABLE),
            Profile::Delta => Some(merge::FORMAT_DELTA),
        }
    }

    /// Whether glyphs are renumbered so that only kept glyphs have slots.
    fn compacts(self) -> bool {
        self == Profile::Delta
    }
}

/// Selects a cmap subtable by platform and encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CmapSelector {
    /// The platform ID, 3 for Microsoft.
    pub platform: u16,
    /// The platform-specific encoding ID, 1 for Unicode BMP.
    pub encoding: u16,
}

impl CmapSelector {
    /// The Microsoft Unicode BMP subtable.
    pub const MICROSOFT_UNICODE: Self = Self { platform: 3, encoding: 1 };

    /// Whether this selects a Microsoft Unicode subtable.
    fn is_microsoft_unicode(self) -> bool {
        self.platform == 3 && (self.encoding == 1 || self.encoding == 10)
    }
}

impl Default for CmapSelector {
    fn default() -> Self {
        Self::MICROSOFT_UNICODE
    }
}

/// Subsetting options.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Options {
    /// The font index inside a collection. Should be 0 for plain fonts.
    pub index: u32,
    /// The characters or glyphs to keep.
    pub selection: Selection,
    /// The shape of the output font.
    pub profile: Profile,
    /// Only keep Microsoft name records of this language. `None` keeps all.
    pub language: Option<u16>,
    /// The cmap subtable character codes are resolved through.
    pub cmap: CmapSelector,
    /// Whether to also keep glyphs that are only reachable through glyph
    /// substitution, justification, baseline and metamorphosis tables.
    pub automap: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            index: 0,
            selection: Selection::Glyphs(vec![]),
            profile: Profile::Subset,
            language: None,
            cmap: CmapSelector::default(),
            automap: true,
        }
    }
}

impl Options {
    /// Set the font index inside a collection.
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Set the characters or glyphs to keep.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the output profile.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the name table language filter.
    pub fn with_language(mut self, language: Option<u16>) -> Self {
        self.language = language;
        self
    }

    /// Set the cmap subtable used to resolve characters.
    pub fn with_cmap(mut self, platform: u16, encoding: u16) -> Self {
        self.cmap = CmapSelector { platform, encoding };
        self
    }

    /// Enable or disable the automap expansion.
    pub fn with_automap(mut self, automap: bool) -> Self {
        self.automap = automap;
        self
    }
}

/// A subsetted font and what was kept.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Subsetted {
    /// The output font.
    pub data: Vec<u8>,
    /// The number of glyphs kept.
    pub kept_glyphs: u16,
    /// The highest glyph index kept, in the numbering of the input font.
    pub max_glyph: u16,
    /// Whether the font was actually subsetted.
    pub outcome: Outcome,
}

/// How a subsetting call ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The output is a subsetted font.
    Subsetted,
    /// The subsetted font would have been bigger than the input, so the
    /// output is a copy of the input.
    Unchanged,
}

/// Whether a table was rewritten or kept as it was.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum TableOutcome {
    Rewritten,
    /// The rewrite was skipped, e.g. because it would have exceeded the
    /// original size. The original bytes stay in place.
    Original,
}

/// Subsetting context.
struct Context<'a> {
    /// Original face.
    face: Face<'a>,
    /// The options of this call.
    options: &'a Options,
    /// The number of glyphs in the original face.
    num_glyphs: u16,
    /// Which glyphs to keep.
    keep: KeepList,
    /// Maps original glyph ids to output glyph ids.
    mapper: GlyphRemapper,
    /// The font under construction.
    out: OutputFont,
    /// Whether the long loca format was chosen.
    long_loca: bool,
    /// The smallest and largest character left in the Microsoft cmap.
    char_range: Option<(u32, u32)>,
}

impl<'a> Context<'a> {
    /// Expect a table of the original face.
    fn expect_table(&self, tag: Tag) -> Result<&'a [u8]> {
        self.face.expect_table(tag)
    }

    /// Whether glyphs are renumbered.
    fn compacts(&self) -> bool {
        self.options.profile.compacts()
    }

    /// Process a table.
    fn process(&mut self, tag: Tag) -> Result<TableOutcome> {
        if !self.out.contains(tag) {
            return Ok(TableOutcome::Original);
        }

        let outcome = match tag {
            Tag::HEAD => head::subset(self)?,
            Tag::GLYF => glyf::subset(self)?,
            Tag::MAXP => maxp::subset(self)?,
            Tag::CMAP => cmap::subset(self)?,
            Tag::OS2 => os2::subset(self)?,
            Tag::HMTX => hmtx::subset(self, hmtx::HORIZONTAL)?,
            Tag::VMTX => hmtx::subset(self, hmtx::VERTICAL)?,
            Tag::HDMX => hdmx::subset(self)?,
            Tag::LTSH => ltsh::subset(self)?,
            Tag::KERN => kern::subset(self)?,
            Tag::NAME => name::subset(self)?,
            Tag::POST => post::subset(self)?,
            Tag::EBLC => bitmap::subset(self, bitmap::MICROSOFT)?,
            Tag::BLOC => bitmap::subset(self, bitmap::APPLE)?,
            _ => TableOutcome::Original,
        };

        if outcome == TableOutcome::Original {
            log::debug!("{tag} kept as is");
        }

        Ok(outcome)
    }
}

/// A font face with TrueType tables.
struct Face<'a> {
    data: &'a [u8],
    version: u32,
    /// Sorted by tag.
    records: Vec<TableRecord>,
}

impl<'a> Face<'a> {
    fn record(&self, tag: Tag) -> Option<&TableRecord> {
        let i = self.records.binary_search_by(|record| record.tag.cmp(&tag)).ok()?;
        self.records.get(i)
    }

    fn table(&self, tag: Tag) -> Option<&'a [u8]> {
        let record = self.record(tag)?;
        let start = record.offset as usize;
        let end = start + (record.length as usize);
        self.data.get(start..end)
    }

    fn expect_table(&self, tag: Tag) -> Result<&'a [u8]> {
        self.table(tag).ok_or(Error::MissingTable(tag))
    }
}

/// What kind of contents the font has.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum FontKind {
    /// TrueType outlines.
    TrueType,
    /// An OpenType wrapper. Only usable if it carries TrueType outlines.
    OpenType,
    /// A font collection.
    Collection,
}

impl FontKind {
    fn from_version(version: u32) -> Option<Self> {
        match version {
            0x00010000 | 0x74727565 => Some(FontKind::TrueType),
            0x4F54544F => Some(FontKind::OpenType),
            0x74746366 => Some(FontKind::Collection),
            _ => None,
        }
    }
}

/// A 4-byte OpenType tag.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    // Required tables.
    const CMAP: Self = Self(*b"cmap");
    const HEAD: Self = Self(*b"head");
    const HHEA: Self = Self(*b"hhea");
    const HMTX: Self = Self(*b"hmtx");
    const MAXP: Self = Self(*b"maxp");
    const NAME: Self = Self(*b"name");
    const OS2: Self = Self(*b"OS/2");
    const POST: Self = Self(*b"post");

    // TrueType.
    const GLYF: Self = Self(*b"glyf");
    const LOCA: Self = Self(*b"loca");
    const PREP: Self = Self(*b"prep");
    const FPGM: Self = Self(*b"fpgm");
    const CVT: Self = Self(*b"cvt ");

    // Metrics.
    const VHEA: Self = Self(*b"vhea");
    const VMTX: Self = Self(*b"vmtx");
    const HDMX: Self = Self(*b"hdmx");
    const LTSH: Self = Self(*b"LTSH");
    const KERN: Self = Self(*b"kern");

    // Layout tables consulted for automap.
    const GSUB: Self = Self(*b"GSUB");
    const JSTF: Self = Self(*b"JSTF");
    const BASE: Self = Self(*b"BASE");
    const MORT: Self = Self(*b"mort");
    const MORX: Self = Self(*b"morx");

    // Bitmap fonts.
    const EBDT: Self = Self(*b"EBDT");
    const EBLC: Self = Self(*b"EBLC");
    const EBSC: Self = Self(*b"EBSC");
    const BDAT: Self = Self(*b"bdat");
    const BLOC: Self = Self(*b"bloc");
    const BSCA: Self = Self(*b"bsca");

    /// The private merge record.
    const TTFD: Self = Self(*b"TTFD");

    /// Marks a deleted directory entry until the directory is compacted.
    const DELETED: Self = Self([0; 4]);
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(std::str::from_utf8(&self.0).unwrap_or("..."))
    }
}

/// The result type for everything.
pub type Result<T> = std::result::Result<T, Error>;

/// Subsetting failed because the font is malformed or unsupported.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The file contains an unknown kind of font.
    #[error("unknown font kind")]
    UnknownKind,
    /// An offset pointed outside of the data.
    #[error("invalid offset")]
    InvalidOffset,
    /// A read or write went past the end of its buffer.
    #[error("read or write out of bounds")]
    OutOfBounds,
    /// Parsed data was invalid.
    #[error("invalid data")]
    InvalidData,
    /// A table is missing.
    ///
    /// Most tables are optional and only rewritten if present. This error
    /// occurs if a table that the subsetter depends on is missing, e.g.,
    /// `glyf` is present but `loca` is missing.
    #[error("missing {0} table")]
    MissingTable(Tag),
    /// The requested cmap subtable does not exist.
    #[error("no cmap subtable for platform {platform} and encoding {encoding}")]
    MissingCmapSubtable {
        /// The requested platform.
        platform: u16,
        /// The requested encoding.
        encoding: u16,
    },
    /// A table uses a format the subsetter cannot handle.
    #[error("unsupported {0} format {1}")]
    Unsupported(Tag, u16),
    /// A size or offset calculation overflowed.
    #[error("arithmetic overflow")]
    Overflow,
    /// Memory for the output font could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
}
