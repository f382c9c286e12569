//! Extender glyphs from the `JSTF` table. The layout engine may insert these
//! anywhere to justify a line.

use super::*;

pub(super) fn collect(data: &[u8], anchors: &mut Vec<u16>) -> Result<()> {
    let count = u16::read_at(data, 4)?;
    for i in 0..usize::from(count) {
        // Each record is a script tag followed by an offset.
        let script = offset16(data, 0, 6 + 6 * i + 4)?;
        let extenders = u16::read_at(data, script)?;
        if extenders == 0 {
            continue;
        }

        let mut r = Reader::new_at(data, script + usize::from(extenders));
        let len = r.read::<u16>()?;
        anchors.extend(r.read_vector::<u16>(usize::from(len))?);
    }
    Ok(())
}
