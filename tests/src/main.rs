use std::collections::HashMap;

use fontsub::{subset_with_report, Options, Outcome, Profile, Selection, Subsetted};
use ttf_parser::GlyphId;

use crate::font::FontBuilder;

mod tables;
mod ttf;

struct TestContext<'a> {
    original_face: ttf_parser::Face<'a>,
    new_face: ttf_parser::Face<'a>,
    /// Original glyph id to output glyph id, for every kept glyph.
    gid_map: HashMap<u16, u16>,
}

fn default_font() -> Vec<u8> {
    FontBuilder::default().build()
}

fn glyphs(glyphs: impl IntoIterator<Item = u16>) -> Selection {
    Selection::Glyphs(glyphs.into_iter().collect())
}

fn chars(text: &str) -> Selection {
    Selection::Chars(text.chars().map(u32::from).collect())
}

fn run(data: &[u8], options: &Options) -> Subsetted {
    let sub = subset_with_report(data, options).unwrap();
    assert_eq!(sub.outcome, Outcome::Subsetted);
    sub
}

/// Subset a font, check that exactly the `expected` glyphs were kept and
/// compare the result with the original through ttf-parser.
fn run_ttf_test(data: &[u8], options: &Options, expected: &[u16]) -> Subsetted {
    let sub = run(data, options);
    assert_eq!(usize::from(sub.kept_glyphs), expected.len());
    assert_eq!(Some(&sub.max_glyph), expected.iter().max());

    let gid_map: HashMap<u16, u16> = match options.profile {
        Profile::Delta => {
            let mut sorted = expected.to_vec();
            sorted.sort_unstable();
            sorted.into_iter().zip(0..).collect()
        }
        Profile::Subset | Profile::Mergeable => expected.iter().map(|&g| (g, g)).collect(),
    };

    let ctx = TestContext {
        original_face: ttf_parser::Face::parse(data, 0).unwrap(),
        new_face: ttf_parser::Face::parse(&sub.data, 0).unwrap(),
        gid_map,
    };

    check_cmap(&ctx);
    check_face_metrics(&ctx);
    check_glyph_metrics(&ctx);
    check_dropped_glyphs(&ctx);
    sub
}

/// Check that every code that was mapped to a kept glyph is mapped to its new
/// id, and that no code maps to a dropped glyph.
fn check_cmap(ctx: &TestContext) {
    let original = ctx.original_face.tables().cmap.unwrap();
    let new = ctx.new_face.tables().cmap.unwrap();

    for subtable in original.subtables {
        let counterpart = new
            .subtables
            .into_iter()
            .find(|s| s.platform_id == subtable.platform_id && s.encoding_id == subtable.encoding_id)
            .unwrap();

        let mut codes = vec![];
        subtable.codepoints(|c| codes.push(c));
        for code in codes {
            let Some(glyph) = subtable.glyph_index(code).filter(|g| g.0 != 0) else {
                continue;
            };
            let mapped = ctx.gid_map.get(&glyph.0).copied();
            let current = counterpart.glyph_index(code).map(|g| g.0).filter(|&g| g != 0);
            assert_eq!((code, mapped), (code, current));
        }
    }
}

fn check_face_metrics(ctx: &TestContext) {
    macro_rules! same {
        ($method:ident) => {
            assert_eq!(ctx.original_face.$method(), ctx.new_face.$method());
        };
    }

    same!(units_per_em);
    same!(ascender);
    same!(descender);
    same!(line_gap);
    same!(height);
    same!(x_height);
    same!(capital_height);
    same!(underline_metrics);
    same!(strikeout_metrics);
    same!(subscript_metrics);
    same!(superscript_metrics);
    same!(typographic_ascender);
    same!(typographic_descender);
    same!(is_regular);
    same!(is_italic);
    same!(is_monospaced);
}

fn check_glyph_metrics(ctx: &TestContext) {
    for (&glyph, &mapped) in &ctx.gid_map {
        macro_rules! same {
            ($method:ident) => {
                assert_eq!(
                    ctx.original_face.$method(GlyphId(glyph)),
                    ctx.new_face.$method(GlyphId(mapped)),
                    "{} of glyph {glyph}",
                    stringify!($method),
                );
            };
        }

        same!(glyph_bounding_box);
        same!(glyph_hor_advance);
        same!(glyph_hor_side_bearing);
    }
}

/// Dropped glyphs keep their slot, but lose their outline.
fn check_dropped_glyphs(ctx: &TestContext) {
    for glyph in 0..ctx.new_face.number_of_glyphs() {
        if !ctx.gid_map.values().any(|&g| g == glyph) {
            assert_eq!(ctx.new_face.glyph_bounding_box(GlyphId(glyph)), None, "glyph {glyph}");
        }
    }
}
