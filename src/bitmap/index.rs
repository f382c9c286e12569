//! Index subtables locate the images of a glyph range in the data table.
//!
//! There are five encodings:
//! 1. a range with a 32-bit offset per glyph,
//! 2. a range of equally sized images that share their metrics,
//! 3. a range with a 16-bit offset per glyph,
//! 4. sparse glyph/offset pairs,
//! 5. sparse glyphs with equally sized images and shared metrics.
//!
//! A subtable is parsed into the list of its glyph images and then planned
//! anew for the kept glyphs. Ranges that lose glyphs in the middle either
//! keep empty slots for them or become sparse, whichever is smaller.

use crate::codec::Record;
use crate::stream::{Reader, Structure, Writer};
use crate::util::{add, mul, to_u32};
use crate::{Error, Result, Tag};

record! {
    /// An entry of a strike's index subtable array.
    pub struct IndexSubTableRecord {
        first_glyph: u16,
        last_glyph: u16,
        additional_offset: u32,
    }
}

record! {
    /// The header every index subtable starts with.
    pub struct IndexSubHeader {
        index_format: u16,
        image_format: u16,
        image_data_offset: u32,
    }
}

const HEADER_SIZE: usize = 8;

/// The size of the big glyph metrics shared by formats 2 and 5.
const METRICS_SIZE: usize = 8;

/// The image of one glyph, as a byte range of the data table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlyphImage {
    pub glyph: u16,
    pub start: u32,
    pub end: u32,
}

/// Images that share their size and metrics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Fixed {
    pub image_size: u32,
    pub metrics: [u8; METRICS_SIZE],
}

/// A parsed index subtable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Subtable {
    pub header: IndexSubHeader,
    /// Set for formats 2 and 5.
    pub fixed: Option<Fixed>,
    /// In glyph order. Range formats list every glyph of the range.
    pub images: Vec<GlyphImage>,
}

impl Subtable {
    /// Parse the subtable at `offset` that covers `first..=last`.
    pub fn parse(data: &[u8], offset: usize, first: u16, last: u16) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidData);
        }

        let mut r = Reader::new_at(data, offset);
        let header = r.read::<IndexSubHeader>()?;
        let base = header.image_data_offset;
        let count = usize::from(last - first) + 1;
        let image = |glyph: u16, start: u32, end: u32| -> Result<GlyphImage> {
            if start > end {
                return Err(Error::InvalidData);
            }
            let start = base.checked_add(start).ok_or(Error::Overflow)?;
            let end = base.checked_add(end).ok_or(Error::Overflow)?;
            Ok(GlyphImage { glyph, start, end })
        };
        let nth = |i: usize, size: u32| -> Result<(u32, u32)> {
            let start = to_u32(mul(i, size as usize)?)?;
            Ok((start, start.checked_add(size).ok_or(Error::Overflow)?))
        };

        let mut images = Vec::with_capacity(count.min(data.len()));
        let mut fixed = None;
        match header.index_format {
            1 | 3 => {
                let offsets: Vec<u32> = if header.index_format == 1 {
                    r.read_vector::<u32>(count + 1)?
                } else {
                    r.read_vector::<u16>(count + 1)?.into_iter().map(u32::from).collect()
                };
                for (glyph, pair) in (first..=last).zip(offsets.windows(2)) {
                    images.push(image(glyph, pair[0], pair[1])?);
                }
            }
            2 => {
                let f = read_fixed(&mut r)?;
                for (i, glyph) in (first..=last).enumerate() {
                    let (start, end) = nth(i, f.image_size)?;
                    images.push(image(glyph, start, end)?);
                }
                fixed = Some(f);
            }
            4 => {
                let num_glyphs = r.read::<u32>()? as usize;
                let mut previous: Option<(u16, u32)> = None;
                for _ in 0..=num_glyphs {
                    let glyph = r.read::<u16>()?;
                    let offset = u32::from(r.read::<u16>()?);
                    if let Some((prev, start)) = previous {
                        images.push(image(prev, start, offset)?);
                    }
                    previous = Some((glyph, offset));
                }
            }
            5 => {
                let f = read_fixed(&mut r)?;
                let num_glyphs = r.read::<u32>()? as usize;
                for (i, glyph) in r.read_vector::<u16>(num_glyphs)?.into_iter().enumerate() {
                    let (start, end) = nth(i, f.image_size)?;
                    images.push(image(glyph, start, end)?);
                }
                fixed = Some(f);
            }
            format => return Err(Error::Unsupported(Tag::EBLC, format)),
        }

        // Sparse formats list their glyphs in strictly ascending order.
        if images.windows(2).any(|pair| pair[0].glyph >= pair[1].glyph) {
            return Err(Error::InvalidData);
        }

        Ok(Self { header, fixed, images })
    }

    /// Plan the subtable for the kept glyphs. Returns `None` if no glyph of
    /// the subtable is kept.
    pub fn plan(&self, keep: impl Fn(u16) -> bool) -> Result<Option<Plan>> {
        let kept: Vec<GlyphImage> =
            self.images.iter().copied().filter(|image| keep(image.glyph)).collect();
        let (Some(first), Some(last)) = (kept.first(), kept.last()) else {
            return Ok(None);
        };

        let (first, last) = (first.glyph, last.glyph);
        let span = usize::from(last - first) + 1;
        let contiguous = kept.len() == span;
        let image_format = self.header.image_format;
        let sparse = |layout: Layout| Plan {
            image_format,
            first,
            last,
            layout,
            images: kept.clone(),
            source: self.header.image_data_offset,
        };

        let plan = match (self.header.index_format, self.fixed) {
            (1 | 3, _) => {
                // Dropped glyphs inside the range keep an empty image.
                let ranged: Vec<GlyphImage> = self
                    .images
                    .iter()
                    .filter(|image| (first..=last).contains(&image.glyph))
                    .map(|&image| {
                        if keep(image.glyph) {
                            image
                        } else {
                            GlyphImage { end: image.start, ..image }
                        }
                    })
                    .collect();

                let total: u64 = kept.iter().map(|i| u64::from(i.end - i.start)).sum();
                let range = Plan {
                    images: ranged,
                    ..sparse(if total <= u64::from(u16::MAX) {
                        Layout::Offsets16
                    } else {
                        Layout::Offsets32
                    })
                };

                let pairs = sparse(Layout::Pairs);
                if !contiguous && pairs.size() < range.size() && total <= u64::from(u16::MAX) {
                    pairs
                } else {
                    range
                }
            }
            (2, Some(fixed)) if contiguous => sparse(Layout::Fixed(fixed)),
            (2 | 5, Some(fixed)) => sparse(Layout::FixedSparse(fixed)),
            (4, _) => sparse(Layout::Pairs),
            (format, _) => return Err(Error::Unsupported(Tag::EBLC, format)),
        };

        Ok(Some(plan))
    }
}

fn read_fixed(r: &mut Reader) -> Result<Fixed> {
    let image_size = r.read::<u32>()?;
    let metrics = r.read::<[u8; METRICS_SIZE]>()?;
    Ok(Fixed { image_size, metrics })
}

/// How a rewritten subtable is encoded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Layout {
    Offsets32,
    Fixed(Fixed),
    Offsets16,
    Pairs,
    FixedSparse(Fixed),
}

impl Layout {
    fn index_format(self) -> u16 {
        match self {
            Layout::Offsets32 => 1,
            Layout::Fixed(_) => 2,
            Layout::Offsets16 => 3,
            Layout::Pairs => 4,
            Layout::FixedSparse(_) => 5,
        }
    }
}

/// A subtable ready to be written.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Plan {
    pub image_format: u16,
    pub first: u16,
    pub last: u16,
    pub layout: Layout,
    /// The images to copy, in order. Range layouts have one per glyph.
    pub images: Vec<GlyphImage>,
    /// The image data offset of the source subtable.
    pub source: u32,
}

impl Plan {
    /// The size of the encoded subtable, including padding.
    pub fn size(&self) -> usize {
        let n = self.images.len();
        let size = match self.layout {
            Layout::Offsets32 => HEADER_SIZE + 4 * (n + 1),
            Layout::Fixed(_) => HEADER_SIZE + 4 + METRICS_SIZE,
            Layout::Offsets16 => HEADER_SIZE + 2 * (n + 1),
            Layout::Pairs => HEADER_SIZE + 4 + 4 * (n + 1),
            Layout::FixedSparse(_) => HEADER_SIZE + 4 + METRICS_SIZE + 4 + 2 * n,
        };
        (size + 3) & !3
    }

    /// The number of image bytes the subtable refers to.
    #[cfg(test)]
    pub fn image_len(&self) -> Result<u32> {
        self.images.iter().try_fold(0u32, |sum, image| {
            sum.checked_add(image.end - image.start).ok_or(Error::Overflow)
        })
    }

    /// Encode the subtable with its images placed at `image_data_offset` of
    /// the new data table, in order.
    pub fn encode(&self, image_data_offset: u32, w: &mut Writer) -> Result<()> {
        let start = w.len();
        w.write(IndexSubHeader {
            index_format: self.layout.index_format(),
            image_format: self.image_format,
            image_data_offset,
        });

        let mut offsets = Vec::with_capacity(self.images.len() + 1);
        let mut offset = 0u32;
        offsets.push(offset);
        for image in &self.images {
            offset = offset.checked_add(image.end - image.start).ok_or(Error::Overflow)?;
            offsets.push(offset);
        }

        match self.layout {
            Layout::Offsets32 => offsets.iter().for_each(|&o| w.write::<u32>(o)),
            Layout::Offsets16 => {
                for o in offsets {
                    w.write::<u16>(u16::try_from(o).map_err(|_| Error::Overflow)?);
                }
            }
            Layout::Fixed(fixed) => {
                w.write::<u32>(fixed.image_size);
                w.write(fixed.metrics);
            }
            Layout::Pairs => {
                w.write::<u32>(to_u32(self.images.len())?);
                let glyphs = self.images.iter().map(|image| image.glyph).chain([0]);
                for (glyph, o) in glyphs.zip(offsets) {
                    w.write::<u16>(glyph);
                    w.write::<u16>(u16::try_from(o).map_err(|_| Error::Overflow)?);
                }
            }
            Layout::FixedSparse(fixed) => {
                w.write::<u32>(fixed.image_size);
                w.write(fixed.metrics);
                w.write::<u32>(to_u32(self.images.len())?);
                self.images.iter().for_each(|image| w.write::<u16>(image.glyph));
            }
        }

        w.align(4);
        debug_assert_eq!(w.len() - start, self.size());
        Ok(())
    }
}

/// Read the index subtable array of a strike and parse every subtable.
pub fn parse_array(data: &[u8], offset: usize, count: u32) -> Result<Vec<Subtable>> {
    let mut r = Reader::new_at(data, offset);
    let mut subtables = Vec::with_capacity((count as usize).min(data.len() / 8));
    for _ in 0..count {
        let record = r.read::<IndexSubTableRecord>()?;
        let at = add(offset, record.additional_offset as usize)?;
        subtables.push(Subtable::parse(data, at, record.first_glyph, record.last_glyph)?);
    }
    Ok(subtables)
}

/// Write the index subtable array followed by the subtables. Returns the
/// encoded block.
pub fn write_array(plans: &[Plan], image_offsets: &[u32]) -> Result<Vec<u8>> {
    let array_size = plans.len() * IndexSubTableRecord::SIZE;
    let mut w = Writer::with_capacity(array_size + plans.iter().map(Plan::size).sum::<usize>());

    let mut offset = array_size;
    for plan in plans {
        w.write(IndexSubTableRecord {
            first_glyph: plan.first,
            last_glyph: plan.last,
            additional_offset: to_u32(offset)?,
        });
        offset = add(offset, plan.size())?;
    }

    for (plan, &image_offset) in plans.iter().zip(image_offsets) {
        plan.encode(image_offset, &mut w)?;
    }

    Ok(w.finish())
}

/// The size of the block [`write_array`] produces.
pub fn array_size(plans: &[Plan]) -> usize {
    plans.len() * IndexSubTableRecord::SIZE + plans.iter().map(Plan::size).sum::<usize>()
}
