use super::*;

/// A format 6 subtable: a dense array over a window of codes.
pub(crate) struct Subtable6 {
    language: u16,
    first_code: u16,
    glyphs: Vec<u16>,
}

impl Mappings for Subtable6 {
    fn glyph_index(&self, code: u32) -> Option<u16> {
        let index = code.checked_sub(u32::from(self.first_code))?;
        self.glyphs.get(usize::try_from(index).ok()?).copied()
    }

    fn codepoints(&self, mut f: impl FnMut(u32)) {
        let first = u32::from(self.first_code);
        (first..first + self.glyphs.len() as u32).for_each(&mut f);
    }
}

impl Structure<'_> for Subtable6 {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        r.skip(4)?; // format + length
        let language = r.read::<u16>()?;
        let first_code = r.read::<u16>()?;
        let count = r.read::<u16>()?;
        let glyphs = r.read_vector::<u16>(usize::from(count))?;
        Ok(Self { language, first_code, glyphs })
    }

    fn write(&self, w: &mut Writer) {
        w.write::<u16>(6);
        w.write::<u16>(10 + 2 * self.glyphs.len() as u16);
        w.write::<u16>(self.language);
        w.write::<u16>(self.first_code);
        w.write::<u16>(self.glyphs.len() as u16);
        self.glyphs.iter().for_each(|&g| w.write::<u16>(g));
    }
}

/// Zero the entries of dropped glyphs and shrink the window to the smallest
/// span that still has surviving entries.
pub(crate) fn subset(ctx: &Context, data: &[u8]) -> Result<Vec<u8>> {
    let table = Subtable6::read_at(data, 0)?;
    let glyphs: Vec<u16> = table.glyphs.iter().map(|&g| kept_glyph(ctx, g)).collect();

    let first = glyphs.iter().position(|&g| g != 0);
    let last = glyphs.iter().rposition(|&g| g != 0);
    let (first_code, window) = match first.zip(last) {
        Some((first, last)) => {
            let code = u32::from(table.first_code) + first as u32;
            (u16::try_from(code).map_err(|_| Error::Overflow)?, &glyphs[first..=last])
        }
        None => (0, &glyphs[..0]),
    };

    // The window never grows, so its length still fits the header.
    let sub = Subtable6 { language: table.language, first_code, glyphs: window.to_vec() };
    let mut w = Writer::with_capacity(10 + 2 * window.len());
    w.write(sub);
    Ok(w.finish())
}
