//! Integration tests for font resource sharing and lifetime.

mod common;

use std::sync::Arc;

use common::{MISSING_TYPEFACE, fixture_context, init_logging};
use horizon_lattice_font::{FontError, FontFlags, FontOptions, MAX_ATLAS_SIZE, Size};

#[test]
fn test_same_key_shares_resource() {
    init_logging();
    let (backend, loader, context) = fixture_context(None);

    let a = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();
    let b = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();

    assert!(Arc::ptr_eq(a.resource(), b.resource()));
    assert_eq!(loader.opens(), 1);
    assert_eq!(backend.textures_created(), 1);
    assert_eq!(context.registry().live_count(), 1);
}

#[test]
fn test_point_size_is_not_part_of_identity() {
    let (_, loader, context) = fixture_context(None);

    let large = context.load_font("Sans.ttf", 48.0, FontOptions::new()).unwrap();
    let small = context.load_font("Sans.ttf", 12.0, FontOptions::new()).unwrap();

    assert!(Arc::ptr_eq(large.resource(), small.resource()));
    // The glyphs keep the size they were built at, each handle its own
    assert_eq!(small.resource().point_size(), 48.0);
    assert_eq!(large.size(), 48.0);
    assert_eq!(small.size(), 12.0);
    assert_eq!(loader.opens(), 1);
}

#[test]
fn test_shared_resource_scales_by_requested_size() {
    let (_, _, context) = fixture_context(None);

    let mut large = context.load_font("Sans.ttf", 64.0, FontOptions::new()).unwrap();
    let mut small = context.load_font("Sans.ttf", 16.0, FontOptions::new()).unwrap();
    assert!(Arc::ptr_eq(large.resource(), small.resource()));

    // "BA" lays out 14x12 in atlas pixels
    assert_eq!(large.measure("BA", 1.0).unwrap(), Size::new(7.0, 6.0));
    assert_eq!(small.measure("BA", 1.0).unwrap(), Size::new(28.0, 24.0));
}

#[test]
fn test_each_key_field_separates_resources() {
    let (backend, loader, context) = fixture_context(None);

    let base = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();
    let other_face = context.load_font("Serif.ttf", 32.0, FontOptions::new()).unwrap();
    let other_size = context
        .load_font("Sans.ttf", 32.0, FontOptions::new().with_atlas_size(256))
        .unwrap();
    let other_flags = context
        .load_font("Sans.ttf", 32.0, FontOptions::new().upper_case())
        .unwrap();

    let fonts = [&base, &other_face, &other_size, &other_flags];
    for (i, a) in fonts.iter().enumerate() {
        for b in &fonts[i + 1..] {
            assert!(!Arc::ptr_eq(a.resource(), b.resource()));
        }
    }
    assert_eq!(loader.opens(), 4);
    assert_eq!(backend.live_textures(), 4);
    assert_eq!(backend.texture_size(other_size.resource().texture()), Some((256, 256)));
}

#[test]
fn test_resource_rebuilt_after_last_font_drops() {
    let (backend, loader, context) = fixture_context(None);

    let a = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();
    let b = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();
    let first_texture = a.resource().texture();

    drop(a);
    // Still referenced by b
    assert_eq!(backend.live_textures(), 1);
    assert_eq!(context.registry().live_count(), 1);

    drop(b);
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(context.registry().live_count(), 0);

    let c = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();
    assert_eq!(loader.opens(), 2);
    assert_ne!(c.resource().texture(), first_texture);
}

#[test]
fn test_zero_atlas_size_uses_default() {
    let (backend, _, context) = fixture_context(None);
    let font = context
        .load_font("Sans.ttf", 32.0, FontOptions::new().with_atlas_size(0))
        .unwrap();
    assert_eq!(font.resource().key().atlas_width, 128);
    assert_eq!(backend.texture_size(font.resource().texture()), Some((128, 128)));
}

#[test]
fn test_packed_options() {
    let (_, _, context) = fixture_context(None);
    let packed = context
        .load_font_packed("Sans.ttf", 32.0, 256 | FontFlags::UPPER_CASE.bits())
        .unwrap();
    let explicit = context
        .load_font(
            "Sans.ttf",
            32.0,
            FontOptions::new().upper_case().with_atlas_size(256),
        )
        .unwrap();
    assert!(Arc::ptr_eq(packed.resource(), explicit.resource()));
}

#[test]
fn test_construction_errors_propagate() {
    let (backend, _, context) = fixture_context(None);

    let missing = context.load_font(MISSING_TYPEFACE, 32.0, FontOptions::new());
    assert!(matches!(missing, Err(FontError::TypefaceLoad { .. })));

    let wrapping = context.load_font_packed("Sans.ttf", 16.0, 0x00ff_ffc0);
    assert!(matches!(wrapping, Err(FontError::InvalidAtlasSize { .. })));

    let oversized = context.load_font(
        "Sans.ttf",
        16.0,
        FontOptions::new().with_atlas_size(MAX_ATLAS_SIZE + 1),
    );
    assert!(matches!(
        oversized,
        Err(FontError::InvalidAtlasSize { width, .. }) if width == MAX_ATLAS_SIZE + 1
    ));

    assert_eq!(context.registry().live_count(), 0);
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn test_cramped_atlas_keeps_the_glyphs_that_fit() {
    init_logging();
    let (backend, _, context) = fixture_context(None);

    // Five shelves of 6x10 cells hold upper case and part of lower case
    let mut font = context
        .load_font("Sans.ttf", 32.0, FontOptions::new().with_atlas_size(64))
        .unwrap();
    assert_eq!(backend.texture_size(font.resource().texture()), Some((64, 64)));

    let placed = font.measure("A", 1.0).unwrap();
    assert!(placed.width > 0.0);
    assert_eq!(font.measure("9", 1.0).unwrap(), Size::ZERO);
    assert_eq!(font.measure("A9", 1.0).unwrap(), placed);
    assert_eq!(font.measure("qz", 1.0).unwrap(), font.measure("q", 1.0).unwrap());
}

#[test]
fn test_builtin_and_typeface_coexist() {
    let (backend, _, context) = fixture_context(None);
    let builtin = context.builtin_font().unwrap();
    let typeface = context.load_font("Sans.ttf", 32.0, FontOptions::new()).unwrap();

    assert!(!Arc::ptr_eq(builtin.resource(), typeface.resource()));
    assert!(builtin.resource().typeface().is_none());
    assert_eq!(backend.live_textures(), 2);
}
