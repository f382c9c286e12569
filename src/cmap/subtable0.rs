use super::*;

/// A format 0 subtable: one byte per code in 0..256.
pub(crate) struct Subtable0<'a> {
    language: u16,
    glyphs: &'a [u8],
}

impl Mappings for Subtable0<'_> {
    fn glyph_index(&self, code: u32) -> Option<u16> {
        let code = usize::try_from(code).ok()?;
        self.glyphs.get(code).map(|&g| u16::from(g))
    }

    fn codepoints(&self, mut f: impl FnMut(u32)) {
        (0..self.glyphs.len() as u32).for_each(&mut f);
    }
}

impl<'a> Structure<'a> for Subtable0<'a> {
    fn read(r: &mut Reader<'a>) -> Result<Self> {
        r.skip(4)?; // format + length
        let language = r.read::<u16>()?;
        Ok(Self { language, glyphs: r.read_bytes(256)? })
    }

    fn write(&self, w: &mut Writer) {
        w.write::<u16>(0);
        w.write::<u16>(6 + self.glyphs.len() as u16);
        w.write::<u16>(self.language);
        w.extend(self.glyphs);
    }
}

/// Zero the entries of dropped glyphs in place.
pub(crate) fn subset(ctx: &Context, data: &[u8]) -> Result<Vec<u8>> {
    let table = Subtable0::read_at(data, 0)?;
    let glyphs = table
        .glyphs
        .iter()
        // Renumbering never increases an id, so it still fits in a byte.
        .map(|&glyph| u8::try_from(kept_glyph(ctx, u16::from(glyph))))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| Error::Overflow)?;

    let mut w = Writer::with_capacity(data.len());
    w.write(Subtable0 { language: table.language, glyphs: &glyphs });
    Ok(w.finish())
}
