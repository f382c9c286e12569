//! The `name` table holds the font's strings. Microsoft records can be
//! filtered down to one language, and the string storage is rebuilt so that
//! identical strings are stored once.

use super::*;
use crate::stream::Writer;
use crate::util::{slice, to_u16};
use rustc_hash::FxHashMap;

const MICROSOFT: u16 = 3;

record! {
    struct NameRecord {
        platform_id: u16,
        encoding_id: u16,
        language_id: u16,
        name_id: u16,
        length: u16,
        string_offset: u16,
    }
}

record! {
    /// A language tag of a version 1 table.
    struct LangTagRecord {
        length: u16,
        lang_tag_offset: u16,
    }
}

pub(crate) fn subset(ctx: &mut Context) -> Result<TableOutcome> {
    let name = ctx.out.table(Tag::NAME)?;
    let sub = rewrite(name, ctx.options.language)?;

    if sub.len() > name.len() {
        log::warn!("name would grow, keeping the original");
        return Ok(TableOutcome::Original);
    }

    log::debug!("name: {} -> {} bytes", name.len(), sub.len());
    ctx.out.update(Tag::NAME, &sub)?;
    Ok(TableOutcome::Rewritten)
}

/// String storage that stores every distinct string once.
#[derive(Default)]
struct Storage<'a> {
    data: Vec<u8>,
    offsets: FxHashMap<&'a [u8], u16>,
}

impl<'a> Storage<'a> {
    fn add(&mut self, string: &'a [u8]) -> Result<u16> {
        if let Some(&offset) = self.offsets.get(string) {
            return Ok(offset);
        }
        let offset = to_u16(self.data.len())?;
        self.data.extend_from_slice(string);
        self.offsets.insert(string, offset);
        Ok(offset)
    }
}

fn rewrite(data: &[u8], language: Option<u16>) -> Result<Vec<u8>> {
    let mut r = Reader::new(data);
    let version = r.read::<u16>()?;
    let count = r.read::<u16>()?;
    let storage_offset = usize::from(r.read::<u16>()?);
    if version > 1 {
        return Err(Error::Unsupported(Tag::NAME, version));
    }

    let records = r.read_vector::<NameRecord>(usize::from(count))?;
    let lang_tags = if version == 1 {
        let count = r.read::<u16>()?;
        r.read_vector::<LangTagRecord>(usize::from(count))?
    } else {
        vec![]
    };

    let string = |offset: u16, len: u16| {
        slice(data, storage_offset + usize::from(offset), usize::from(len))
    };

    let mut storage = Storage::default();
    let mut kept = vec![];
    for record in records {
        if record.platform_id == MICROSOFT
            && language.is_some_and(|language| language != record.language_id)
        {
            continue;
        }
        let offset = storage.add(string(record.string_offset, record.length)?)?;
        kept.push(NameRecord { string_offset: offset, ..record });
    }

    let mut tags = vec![];
    for tag in lang_tags {
        let offset = storage.add(string(tag.lang_tag_offset, tag.length)?)?;
        tags.push(LangTagRecord { lang_tag_offset: offset, ..tag });
    }

    let mut header = 6 + kept.len() * 12;
    if version == 1 {
        header += 2 + tags.len() * 4;
    }

    let mut w = Writer::with_capacity(header + storage.data.len());
    w.write::<u16>(version);
    w.write::<u16>(to_u16(kept.len())?);
    w.write::<u16>(to_u16(header)?);
    kept.iter().for_each(|record| w.write(*record));
    if version == 1 {
        w.write::<u16>(to_u16(tags.len())?);
        tags.iter().for_each(|tag| w.write(*tag));
    }
    w.extend(&storage.data);

    Ok(w.finish())
}
