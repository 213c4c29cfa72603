//! CPU-side glyph atlas with shelf-based packing.
//!
//! Glyph bitmaps are packed into horizontal shelves. The atlas never evicts:
//! a typeface atlas is filled once, when its font resource is built, and then
//! uploaded to the GPU as a single texture.

use tracing::warn;

use crate::error::{FontError, FontResult};

/// Largest accepted atlas edge length in pixels, wgpu's default 2D texture
/// limit.
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Padding between allocations to prevent texture bleeding.
const GLYPH_PADDING: u32 = 1;

/// Byte length of a `width` x `height` bitmap, or `None` if the dimensions
/// are out of range.
fn bitmap_len(width: u32, height: u32, channels: u32) -> Option<usize> {
    let in_range = |edge: u32| (1..=MAX_ATLAS_SIZE).contains(&edge);
    if !in_range(width) || !in_range(height) || !(1..=4).contains(&channels) {
        return None;
    }
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels as usize)
}

/// A shelf (horizontal row) in the atlas.
#[derive(Debug)]
struct Shelf {
    /// Y position of this shelf in the atlas.
    y: u32,
    /// Height of this shelf, padding included.
    height: u32,
    /// Current X position for the next allocation.
    cursor_x: u32,
}

impl Shelf {
    fn new(y: u32, height: u32) -> Self {
        Self {
            y,
            height,
            cursor_x: GLYPH_PADDING,
        }
    }

    /// Try to allocate space in this shelf.
    fn try_allocate(&mut self, width: u32, height: u32, atlas_width: u32) -> Option<(u32, u32)> {
        if height + GLYPH_PADDING > self.height {
            return None;
        }

        let padded_width = width + GLYPH_PADDING;
        if self.cursor_x + padded_width > atlas_width {
            return None;
        }

        let x = self.cursor_x;
        self.cursor_x += padded_width;
        Some((x, self.y))
    }
}

/// A rectangle allocated in a [`GlyphAtlas`], in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A single texture's worth of glyph bitmaps.
pub struct GlyphAtlas {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<u8>,
    shelves: Vec<Shelf>,
    next_shelf_y: u32,
}

impl GlyphAtlas {
    /// Create an empty atlas of `width` x `height` pixels with `channels`
    /// bytes per pixel.
    ///
    /// Edges must be between 1 and [`MAX_ATLAS_SIZE`], channels between 1
    /// and 4.
    pub fn new(width: u32, height: u32, channels: u32) -> FontResult<Self> {
        let len = bitmap_len(width, height, channels)
            .ok_or(FontError::InvalidAtlasSize { width, height })?;

        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
            shelves: Vec::new(),
            next_shelf_y: GLYPH_PADDING,
        })
    }

    /// Wrap an existing single-channel bitmap.
    ///
    /// The whole bitmap is considered allocated.
    pub fn from_bitmap(width: u32, height: u32, data: Vec<u8>) -> FontResult<Self> {
        if bitmap_len(width, height, 1) != Some(data.len()) {
            return Err(FontError::InvalidAtlasSize { width, height });
        }
        Ok(Self::filled(width, height, data))
    }

    /// Wrap a bitmap whose dimensions are known to be consistent.
    pub(crate) fn filled(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            channels: 1,
            data,
            shelves: Vec::new(),
            next_shelf_y: height,
        }
    }

    /// Atlas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Atlas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Raw pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the pixel data, returning the previous bitmap.
    ///
    /// Used to swap a coverage bitmap for its distance field. The new data
    /// must have the same length.
    pub fn replace_data(&mut self, data: Vec<u8>) -> FontResult<Vec<u8>> {
        if data.len() != self.data.len() {
            return Err(FontError::InvalidAtlasSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(std::mem::replace(&mut self.data, data))
    }

    /// Reserve a `width` x `height` region.
    ///
    /// Zero-sized requests (whitespace glyphs) always succeed and occupy no
    /// space. Returns `None` when the atlas is full.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRegion> {
        if width == 0 || height == 0 {
            return Some(AtlasRegion::default());
        }

        let padded_height = height + GLYPH_PADDING;
        if width + 2 * GLYPH_PADDING > self.width || padded_height + GLYPH_PADDING > self.height {
            return None;
        }

        // Best fit by height among existing shelves
        let mut best: Option<(usize, u32)> = None;
        for (idx, shelf) in self.shelves.iter().enumerate() {
            if padded_height <= shelf.height && shelf.cursor_x + width + GLYPH_PADDING <= self.width
            {
                let waste = shelf.height - padded_height;
                if best.is_none_or(|(_, w)| waste < w) {
                    best = Some((idx, waste));
                }
            }
        }

        if let Some((idx, _)) = best {
            let (x, y) = self.shelves[idx].try_allocate(width, height, self.width)?;
            return Some(AtlasRegion { x, y, width, height });
        }

        if self.next_shelf_y + padded_height > self.height {
            return None;
        }

        let mut shelf = Shelf::new(self.next_shelf_y, padded_height);
        let (x, y) = shelf.try_allocate(width, height, self.width)?;
        self.next_shelf_y += padded_height;
        self.shelves.push(shelf);
        Some(AtlasRegion { x, y, width, height })
    }

    /// Allocate space for a glyph bitmap and copy it in.
    ///
    /// A glyph that does not fit is logged and left out; the atlas is not
    /// modified and `None` is returned.
    pub fn add_glyph(
        &mut self,
        codepoint: char,
        width: u32,
        height: u32,
        bitmap: &[u8],
    ) -> Option<AtlasRegion> {
        let Some(region) = self.allocate(width, height) else {
            warn!(
                target: "horizon_lattice_font::glyph",
                ?codepoint,
                width,
                height,
                atlas_width = self.width,
                atlas_height = self.height,
                "glyph does not fit into atlas, skipping"
            );
            return None;
        };
        self.write(region, bitmap);
        Some(region)
    }

    /// Copy a tightly packed bitmap into `region`.
    pub fn write(&mut self, region: AtlasRegion, bitmap: &[u8]) {
        let channels = self.channels as usize;
        let row_len = region.width as usize * channels;
        for row in 0..region.height as usize {
            let src = &bitmap[row * row_len..(row + 1) * row_len];
            let dst_start =
                ((region.y as usize + row) * self.width as usize + region.x as usize) * channels;
            self.data[dst_start..dst_start + row_len].copy_from_slice(src);
        }
    }

    /// Normalized UV rectangle of `region`.
    ///
    /// Returns (u_min, v_min, u_max, v_max).
    pub fn uv_rect(&self, region: AtlasRegion) -> (f32, f32, f32, f32) {
        let w = self.width as f32;
        let h = self.height as f32;
        (
            region.x as f32 / w,
            region.y as f32 / h,
            (region.x + region.width) as f32 / w,
            (region.y + region.height) as f32 / h,
        )
    }

    /// Fraction of the atlas covered by shelves.
    pub fn usage(&self) -> f32 {
        let used: u32 = self.shelves.iter().map(|s| s.cursor_x * s.height).sum();
        used as f32 / (self.width * self.height) as f32
    }
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("usage", &format!("{:.1}%", self.usage() * 100.0))
            .finish()
    }
}
