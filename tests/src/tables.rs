use fontsub::{Options, Profile};
use ttf_parser::GlyphId;

use crate::font::*;
use crate::*;

fn head_adjustment(font: &[u8]) -> u32 {
    u32_at(table(font, b"head").unwrap(), 8)
}

fn tags(font: &[u8]) -> Vec<[u8; 4]> {
    let count = usize::from(u16_at(font, 4));
    (0..count).map(|i| font[12 + 16 * i..16 + 16 * i].try_into().unwrap()).collect()
}

#[test]
fn checksums_are_consistent() {
    let data = default_font();
    for profile in [Profile::Subset, Profile::Mergeable, Profile::Delta] {
        let options = Options::default()
            .with_selection(chars("Hello, World!"))
            .with_profile(profile);
        let sub = run(&data, &options).data;

        assert_eq!(sub.len() % 4, 0);
        assert_eq!(checksum(&sub), 0xB1B0AFBA);

        let mut zeroed = sub.clone();
        let count = usize::from(u16_at(&sub, 4));
        for i in 0..count {
            let record = 12 + 16 * i;
            if &sub[record..record + 4] == b"head" {
                let offset = u32_at(&sub, record + 8) as usize;
                zeroed[offset + 8..offset + 12].fill(0);
            }
        }

        let adjustment = 0xB1B0AFBAu32.wrapping_sub(checksum(&zeroed));
        assert_eq!(head_adjustment(&sub), adjustment);

        for i in 0..count {
            let record = 12 + 16 * i;
            let offset = u32_at(&sub, record + 8) as usize;
            let length = u32_at(&sub, record + 12) as usize;
            assert_eq!(u32_at(&sub, record + 4), checksum(&zeroed[offset..offset + length]));
        }
    }
}

#[test]
fn directory_is_sorted_and_searchable() {
    let data = default_font();
    let options = Options::default().with_selection(chars("A"));
    let sub = run(&data, &options).data;

    let tags = tags(&sub);
    assert!(tags.windows(2).all(|w| w[0] < w[1]));
    let (range, selector, shift) = search_params(tags.len() as u16, 16);
    assert_eq!(u16_at(&sub, 6), range);
    assert_eq!(u16_at(&sub, 8), selector);
    assert_eq!(u16_at(&sub, 10), shift);
}

#[test]
fn kern_drops_pairs_of_dropped_glyphs() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([10, 30]));
    let sub = run(&data, &options).data;

    let kern = table(&sub, b"kern").unwrap();
    assert_eq!(u16_at(kern, 2), 1);
    // Subtable length, pair count and the search fields for one pair.
    assert_eq!(u16_at(kern, 6), 20);
    assert_eq!(
        [u16_at(kern, 10), u16_at(kern, 12), u16_at(kern, 14), u16_at(kern, 16)],
        [1, 6, 0, 0]
    );
    assert_eq!([u16_at(kern, 18), u16_at(kern, 20)], [10, 30]);
    assert_eq!(u16_at(kern, 22) as i16, -40);

    let face = ttf_parser::Face::parse(&sub, 0).unwrap();
    let subtable = face.tables().kern.unwrap().subtables.into_iter().next().unwrap();
    assert_eq!(subtable.glyphs_kerning(GlyphId(10), GlyphId(30)), Some(-40));
    assert_eq!(subtable.glyphs_kerning(GlyphId(10), GlyphId(20)), None);
}

#[test]
fn bitmap_strike_without_glyphs_is_dropped() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([36, 37]));
    let sub = run(&data, &options).data;

    let strikes = read_strikes(table(&sub, b"EBLC").unwrap(), table(&sub, b"EBDT").unwrap());
    assert_eq!(strikes.len(), 1);
    assert_eq!(strikes[0].ppem, 12);
    let expected: Vec<_> = [36, 37].map(|g| (g, bitmap_image(12, g).to_vec())).into();
    assert_eq!(strikes[0].images, expected);
}

#[test]
fn bitmap_strikes_keep_images_of_kept_glyphs() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([36, 38, 452]));
    let sub = run(&data, &options).data;

    let eblc = table(&sub, b"EBLC").unwrap();
    let ebdt = table(&sub, b"EBDT").unwrap();
    assert!(ebdt.len() < table(&data, b"EBDT").unwrap().len());

    let strikes = read_strikes(eblc, ebdt);
    let images = |ppem: u8, kept: &[u16]| Strike {
        ppem,
        images: kept.iter().map(|&g| (g, bitmap_image(ppem, g).to_vec())).collect(),
    };
    assert_eq!(strikes, vec![images(12, &[36, 38]), images(16, &[452])]);
}

#[test]
fn bitmaps_are_not_part_of_delta_fonts() {
    let data = default_font();
    let options = Options::default()
        .with_selection(glyphs([36, 37]))
        .with_profile(Profile::Delta);
    let sub = run(&data, &options).data;

    let allowed: [&[u8; 4]; 18] = [
        b"head", b"hhea", b"maxp", b"hmtx", b"vhea", b"vmtx", b"loca", b"glyf", b"cmap",
        b"OS/2", b"post", b"name", b"cvt ", b"fpgm", b"prep", b"hdmx", b"LTSH", b"TTFD",
    ];
    let tags = tags(&sub);
    assert!(tags.iter().all(|tag| allowed.contains(&tag)), "{tags:?}");
    for tag in [b"EBLC", b"EBDT", b"kern", b"GSUB"] {
        assert!(table(&sub, tag).is_none());
    }
}

#[test]
fn os2_char_range_follows_cmap() {
    let data = default_font();
    let os2 = table(&data, b"OS/2").unwrap();
    assert_eq!((u16_at(os2, 64), u16_at(os2, 66)), (0x20, 0x2219));

    let options = Options::default().with_selection(glyphs([0, 1, 2, COMPOSITE]));
    let sub = run(&data, &options).data;
    let os2 = table(&sub, b"OS/2").unwrap();
    assert_eq!((u16_at(os2, 64), u16_at(os2, 66)), (0x5E, 0x5E));

    let options = Options::default().with_selection(chars("B\u{B7}"));
    let sub = run(&data, &options).data;
    let os2 = table(&sub, b"OS/2").unwrap();
    assert_eq!((u16_at(os2, 64), u16_at(os2, 66)), (0x42, 0x2219));
}

#[test]
fn maxp_is_recomputed() {
    let data = default_font();
    for (profile, num_glyphs) in [(Profile::Subset, NUM_GLYPHS), (Profile::Delta, 6)] {
        let options = Options::default()
            .with_selection(glyphs([COMPOSITE]))
            .with_profile(profile);
        let sub = run(&data, &options).data;

        let maxp = table(&sub, b"maxp").unwrap();
        let fields: Vec<u16> = (4..32).step_by(2).map(|at| u16_at(maxp, at)).collect();
        assert_eq!(fields[0], num_glyphs);
        // Points, contours, composite points and composite contours.
        assert_eq!(&fields[1..5], &[3, 1, 6, 2]);
        // Instructions, component elements and depth.
        assert_eq!(&fields[11..14], &[0, 2, 2]);
    }

    let options = Options::default().with_selection(glyphs([4]));
    let sub = run(&data, &options).data;
    let maxp = table(&sub, b"maxp").unwrap();
    assert_eq!([u16_at(maxp, 10), u16_at(maxp, 12), u16_at(maxp, 28)], [0, 0, 0]);
}

#[test]
fn hmtx_clears_dropped_glyphs() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([0, 1, 2, COMPOSITE]));
    let sub = run(&data, &options).data;

    // The long metrics end at the highest kept glyph.
    let hhea = table(&sub, b"hhea").unwrap();
    assert_eq!(u16_at(hhea, 34), 103);
    let hmtx = table(&sub, b"hmtx").unwrap();
    assert_eq!(hmtx.len(), 103 * 4 + (usize::from(NUM_GLYPHS) - 103) * 2);

    let face = ttf_parser::Face::parse(&sub, 0).unwrap();
    assert_eq!(face.glyph_hor_advance(GlyphId(COMPOSITE)), Some(advance(COMPOSITE)));
    assert_eq!(face.glyph_hor_advance(GlyphId(50)), Some(0));
    assert_eq!(face.glyph_hor_advance(GlyphId(102)), Some(advance(102)));
}

#[test]
fn hmtx_compacts_renumbered_glyphs() {
    let data = default_font();
    let options = Options::default()
        .with_selection(glyphs([450, 460]))
        .with_profile(Profile::Delta);
    let sub = run(&data, &options).data;

    // Both glyphs share the advance of the last long metric, so only three
    // long metrics remain.
    let hhea = table(&sub, b"hhea").unwrap();
    assert_eq!(u16_at(hhea, 34), 3);
    let face = ttf_parser::Face::parse(&sub, 0).unwrap();
    assert_eq!(face.glyph_hor_advance(GlyphId(3)), Some(advance(460)));
    assert_eq!(face.glyph_hor_side_bearing(GlyphId(3)), Some((460 % 3) as i16));
}

#[test]
fn hdmx_and_ltsh_follow_profiles() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([COMPOSITE]));
    let sub = run(&data, &options).data;

    let hdmx = table(&sub, b"hdmx").unwrap();
    let size = u32_at(hdmx, 4) as usize;
    for (i, ppem) in HDMX_SIZES.into_iter().enumerate() {
        let record = &hdmx[8 + i * size..8 + (i + 1) * size];
        assert_eq!(record[0], ppem);
        assert_eq!(record[2 + 65], hdmx_width(ppem, 65));
        assert_eq!(record[2 + 50], 0);
        let widest = [0, 1, 65, 100, 101, 102].map(|g| hdmx_width(ppem, g));
        assert_eq!(record[1], widest.into_iter().max().unwrap());
    }

    let ltsh = table(&sub, b"LTSH").unwrap();
    assert_eq!(u16_at(ltsh, 2), NUM_GLYPHS);
    assert_eq!(ltsh[4 + 65], 10);
    assert_eq!(ltsh[4 + 50], 1);

    let options = options.with_profile(Profile::Delta);
    let sub = run(&data, &options).data;

    let hdmx = table(&sub, b"hdmx").unwrap();
    assert_eq!(u16_at(hdmx, 2), 2);
    assert_eq!(u32_at(hdmx, 4), 8);
    assert_eq!(hdmx.len(), 8 + 2 * 8);
    assert_eq!(&hdmx[8 + 2..8 + 8], &[6, 7, 11, 6, 7, 8]);

    let ltsh = table(&sub, b"LTSH").unwrap();
    assert_eq!(u16_at(ltsh, 2), 6);
    assert_eq!(&ltsh[4..], &[10, 11, 10, 10, 11, 12]);
}

#[test]
fn name_filters_languages() {
    let data = default_font();
    let options = Options::default().with_selection(chars("A")).with_language(Some(0x409));
    let sub = run(&data, &options).data;

    let face = ttf_parser::Face::parse(&sub, 0).unwrap();
    let languages: Vec<u16> = face.names().into_iter().map(|name| name.language_id).collect();
    assert_eq!(languages, vec![0, 0x409, 0x409]);

    // Without a filter, only the duplicate string is folded.
    let options = Options::default().with_selection(chars("A"));
    let sub = run(&data, &options).data;
    let name = table(&sub, b"name").unwrap();
    assert_eq!(u16_at(name, 2), 4);
    assert_eq!(name.len(), table(&data, b"name").unwrap().len() - 8);
}

#[test]
fn post_is_normalized() {
    let data = default_font();
    let options = Options::default().with_selection(chars("A"));
    let sub = run(&data, &options).data;

    let post = table(&sub, b"post").unwrap();
    assert_eq!(post.len(), 32);
    assert_eq!(u32_at(post, 0), 0x00030000);
    assert_eq!(&post[4..], &table(&data, b"post").unwrap()[4..32]);
}

#[test]
fn merge_record_lists_kept_glyphs() {
    let data = default_font();
    let adjustment = head_adjustment(&data);

    let options = Options::default()
        .with_selection(glyphs([COMPOSITE]))
        .with_profile(Profile::Delta);
    let sub = run(&data, &options).data;
    let ttfd = table(&sub, b"TTFD").unwrap();
    let words: Vec<u16> = (0..ttfd.len()).step_by(2).map(|at| u16_at(ttfd, at)).collect();
    assert_eq!(u32_at(ttfd, 4), adjustment);
    assert_eq!(&words[..2], &[0, 2]);
    assert_eq!(&words[4..], &[500, 102, 6, 0, 1, 65, 100, 101, 102]);

    let options = options.with_profile(Profile::Mergeable);
    let sub = run(&data, &options).data;
    let ttfd = table(&sub, b"TTFD").unwrap();
    assert_eq!(u16_at(ttfd, 2), 1);
    assert_eq!(u16_at(ttfd, 12), 6);

    let options = options.with_profile(Profile::Subset);
    let sub = run(&data, &options).data;
    assert!(table(&sub, b"TTFD").is_none());
}

#[test]
fn cmap_keeps_only_kept_glyphs() {
    let data = default_font();
    let options = Options::default()
        .with_selection(chars("AZ"))
        .with_profile(Profile::Delta);
    let sub = run(&data, &options).data;

    let face = ttf_parser::Face::parse(&sub, 0).unwrap();
    let cmap = face.tables().cmap.unwrap();
    for subtable in cmap.subtables {
        let mut codes = vec![];
        subtable.codepoints(|c| codes.push(c));
        for code in codes {
            let glyph = subtable.glyph_index(code).map_or(0, |g| g.0);
            assert!(glyph < 4, "{code:#x} maps to {glyph}");
            if code == 0x41 {
                assert_eq!(glyph, 2);
            }
        }
    }

    // The format 6 window shrinks to A to Z.
    let table = table(&sub, b"cmap").unwrap();
    let count = usize::from(u16_at(table, 2));
    let format6 = (0..count)
        .map(|i| u32_at(table, 4 + 8 * i + 4) as usize)
        .find(|&offset| u16_at(table, offset) == 6)
        .unwrap();
    assert_eq!([u16_at(table, format6 + 6), u16_at(table, format6 + 8)], [0x41, 26]);
}
