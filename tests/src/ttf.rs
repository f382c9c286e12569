use fontsub::{font_offset, subset, subset_with_report, Error, Options, Outcome, Profile};
use skrifa::instance::{LocationRef, Size};
use skrifa::MetadataProvider;
use ttf_parser::GlyphId;

use crate::font::*;
use crate::*;

/// The closure of glyph 65 under composite references.
const CLOSURE: [u16; 4] = [COMPOSITE, NESTED_COMPOSITE, LEAVES[0], LEAVES[1]];

fn has_outline(data: &[u8], glyph: u16) -> bool {
    let face = ttf_parser::Face::parse(data, 0).unwrap();
    face.glyph_bounding_box(GlyphId(glyph)).is_some()
}

#[test]
fn subset_keeps_composite_closure() {
    let data = default_font();
    let options = Options::default().with_selection(glyphs([0, 1, 2, COMPOSITE]));
    let sub = run_ttf_test(&data, &options, &[0, 1, 2, 65, 100, 101, 102]);

    let face = ttf_parser::Face::parse(&sub.data, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), NUM_GLYPHS);
    assert!(sub.data.len() < data.len());
}

#[test]
fn delta_renumbers_glyphs() {
    let data = default_font();
    let options = Options::default()
        .with_selection(glyphs([COMPOSITE]))
        .with_profile(Profile::Delta);
    let sub = run_ttf_test(&data, &options, &[0, 1, 65, 100, 101, 102]);

    let face = ttf_parser::Face::parse(&sub.data, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 6);
    assert_eq!(face.glyph_index('^'), Some(GlyphId(2)));
    assert_eq!(face.glyph_index('A'), None);
}

#[test]
fn skrifa_reads_delta_fonts() {
    let data = default_font();
    let options = Options::default()
        .with_selection(glyphs([COMPOSITE]))
        .with_profile(Profile::Delta);
    let sub = subset(&data, &options).unwrap();

    let font = skrifa::FontRef::new(&sub).unwrap();
    let glyph = skrifa::GlyphId::new(2);
    assert_eq!(font.charmap().map('^'), Some(glyph));

    let metrics = font.glyph_metrics(Size::unscaled(), LocationRef::default());
    assert_eq!(metrics.advance_width(glyph), Some(f32::from(advance(COMPOSITE))));
    assert!(font.outline_glyphs().get(glyph).is_some());
}

#[test]
fn mergeable_keeps_every_slot() {
    let data = default_font();
    let options = Options::default()
        .with_selection(chars("Hi"))
        .with_profile(Profile::Mergeable);
    let sub = run_ttf_test(&data, &options, &[0, 1, 43, 76]);

    let face = ttf_parser::Face::parse(&sub.data, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), NUM_GLYPHS);
}

#[test]
fn middle_dot_keeps_bullet_operator() {
    let data = default_font();
    let options = Options::default().with_selection(chars("\u{B7}"));
    run_ttf_test(&data, &options, &[0, 1, MIDDLE_DOT, BULLET_OPERATOR]);

    // Only the middle dot pulls in the bullet operator.
    let options = Options::default().with_selection(chars("A"));
    run_ttf_test(&data, &options, &[0, 1, 36]);
}

#[test]
fn blank_request_keeps_first_outline() {
    let data = default_font();
    let options = Options::default().with_selection(chars(" "));
    let sub = run_ttf_test(&data, &options, &[0, 1, 3, 4]);
    assert!(has_outline(&sub.data, 4));
    assert!(!table(&sub.data, b"glyf").unwrap().is_empty());
}

#[test]
fn supplementary_chars_resolve_through_format_12() {
    let data = default_font();
    let options = Options::default()
        .with_selection(chars("\u{1F600}"))
        .with_cmap(3, 10);
    let sub = run_ttf_test(&data, &options, &[0, 1, EMOJI]);

    let face = ttf_parser::Face::parse(&sub.data, 0).unwrap();
    assert_eq!(face.glyph_index('\u{1F600}'), Some(GlyphId(EMOJI)));
}

#[test]
fn round_trip_with_every_glyph() {
    let data = default_font();
    let all: Vec<u16> = (0..NUM_GLYPHS).collect();
    let options = Options::default().with_selection(glyphs(all.iter().copied()));
    let sub = run_ttf_test(&data, &options, &all);

    let original = ttf_parser::Face::parse(&data, 0).unwrap();
    let face = ttf_parser::Face::parse(&sub.data, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), original.number_of_glyphs());
    for c in (0x20..=0x7E).chain([0xB7, 0x2219, 0x1F600]).filter_map(char::from_u32) {
        assert_eq!(face.glyph_index(c), original.glyph_index(c));
    }
}

#[test]
fn growing_output_is_returned_unchanged() {
    let data = FontBuilder { post_names: false, ..FontBuilder::default() }.build();
    let options = Options::default()
        .with_selection(glyphs(0..NUM_GLYPHS))
        .with_profile(Profile::Mergeable);

    let sub = subset_with_report(&data, &options).unwrap();
    assert_eq!(sub.outcome, Outcome::Unchanged);
    assert_eq!(sub.data, data);
    assert_eq!(sub.kept_glyphs, NUM_GLYPHS);
}

#[test]
fn automap_follows_substitutions() {
    let data = default_font();
    let (first, second, ligature) = LIGATURE;
    let (from, to) = SINGLE;

    let options = Options::default().with_selection(glyphs([first, second]));
    run_ttf_test(&data, &options, &[0, 1, first, second, ligature]);

    let options = Options::default().with_selection(glyphs([first]));
    run_ttf_test(&data, &options, &[0, 1, first]);

    let options = Options::default().with_selection(glyphs([from]));
    run_ttf_test(&data, &options, &[0, 1, from, to]);

    let options = Options::default().with_selection(glyphs([from])).with_automap(false);
    run_ttf_test(&data, &options, &[0, 1, from]);
}

#[test]
fn symbol_fonts_resolve_through_private_use_area() {
    let data = FontBuilder { symbol: true, ..FontBuilder::default() }.build();
    let options = Options::default().with_selection(chars("A")).with_cmap(3, 0);
    let sub = run(&data, &options);
    assert_eq!(sub.kept_glyphs, 3);
    assert!(has_outline(&sub.data, 36));

    let os2 = table(&sub.data, b"OS/2").unwrap();
    assert_eq!((u16_at(os2, 64), u16_at(os2, 66)), (0xF041, 0xF041));
}

#[test]
fn missing_cmap_subtable_is_an_error() {
    let data = default_font();
    let options = Options::default().with_selection(chars("A")).with_cmap(0, 5);
    assert_eq!(
        subset(&data, &options),
        Err(Error::MissingCmapSubtable { platform: 0, encoding: 5 })
    );
}

#[test]
fn rejects_other_data() {
    assert_eq!(subset(b"\x00\x00\x00\x00", &Options::default()), Err(Error::UnknownKind));
    assert_eq!(subset(&[0, 1], &Options::default()), Err(Error::OutOfBounds));
}

/// Wrap a font into a collection with one member.
fn collection(font: &[u8]) -> Vec<u8> {
    let mut data = font.to_vec();
    let count = usize::from(u16_at(font, 4));
    for i in 0..count {
        let at = 12 + 16 * i + 8;
        let offset = u32_at(&data, at) + 16;
        data[at..at + 4].copy_from_slice(&offset.to_be_bytes());
    }

    let mut header = W::default();
    header.bytes(b"ttcf").u32(0x00010000).u32(1).u32(16);
    header.bytes(&data);
    header.0
}

#[test]
fn subsets_collection_members() {
    let data = collection(&default_font());
    assert_eq!(font_offset(&data, 0), Ok(16));
    assert_eq!(font_offset(&data, 1), Err(Error::InvalidOffset));

    let options = Options::default().with_selection(glyphs(CLOSURE));
    let sub = run(&data, &options);
    assert_eq!(sub.kept_glyphs, 6);
    assert_eq!(u32_at(&sub.data, 0), 0x00010000);
    assert!(has_outline(&sub.data, COMPOSITE));

    let options = options.with_index(1);
    assert_eq!(subset(&data, &options), Err(Error::InvalidOffset));
}

#[test]
fn subsetting_twice_is_stable() {
    let data = default_font();
    let options = Options::default().with_selection(chars("Hello"));
    let once = run(&data, &options);
    let twice = run(&once.data, &options);
    assert_eq!(once.kept_glyphs, twice.kept_glyphs);
    assert_eq!(once.max_glyph, twice.max_glyph);
    assert!(twice.data.len() <= once.data.len());
}
