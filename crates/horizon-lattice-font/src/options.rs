//! Font request options and context configuration.

use bitflags::bitflags;

use crate::distance_field::DistanceFieldCacheConfig;
use crate::glyph::Repertoire;

/// Atlas size used when a request leaves it unspecified.
pub const DEFAULT_ATLAS_SIZE: u32 = 128;

/// Glyph size that a text scale of 1.0 corresponds to, in pixels.
pub const BASE_GLYPH_SIZE: f32 = 32.0;

/// Bits of a packed option word that carry flags.
const PACKED_FLAG_MASK: u32 = 0x3f;

/// Bits of a packed option word that carry the atlas size.
const PACKED_SIZE_MASK: u32 = 0x00ff_ffc0;

bitflags! {
    /// Rendering flags of a font. Part of the font resource identity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u32 {
        /// Convert the atlas to a signed distance field and draw with the
        /// distance-field program.
        const DISTANCE_FIELD = 0b0000_0001;
        /// Rasterize only upper case letters, digits and space.
        const UPPER_CASE = 0b0000_0010;
    }
}

/// Options for loading a typeface.
///
/// Two requests with equal typeface and options share one font resource,
/// whatever their point size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontOptions {
    /// Rendering flags.
    pub flags: FontFlags,
    /// Edge length of the square glyph atlas in pixels.
    pub atlas_size: u32,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            flags: FontFlags::empty(),
            atlas_size: DEFAULT_ATLAS_SIZE,
        }
    }
}

impl FontOptions {
    /// Options with no flags and the default atlas size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the packed option word used by older callers.
    ///
    /// The low 6 bits are flags and bits 6..24 the atlas size, which must be
    /// a multiple of 64. A zero size selects [`DEFAULT_ATLAS_SIZE`].
    /// Unknown flag bits are dropped.
    pub fn from_packed(bits: u32) -> Self {
        let atlas_size = match bits & PACKED_SIZE_MASK {
            0 => DEFAULT_ATLAS_SIZE,
            size => size,
        };
        Self {
            flags: FontFlags::from_bits_truncate(bits & PACKED_FLAG_MASK),
            atlas_size,
        }
    }

    /// Encode back into the packed option word.
    pub fn to_packed(self) -> u32 {
        (self.atlas_size & PACKED_SIZE_MASK) | self.flags.bits()
    }

    /// Enable distance-field rendering.
    #[must_use]
    pub fn distance_field(mut self) -> Self {
        self.flags |= FontFlags::DISTANCE_FIELD;
        self
    }

    /// Restrict the repertoire to upper case.
    #[must_use]
    pub fn upper_case(mut self) -> Self {
        self.flags |= FontFlags::UPPER_CASE;
        self
    }

    /// Set the atlas edge length in pixels.
    #[must_use]
    pub fn with_atlas_size(mut self, size: u32) -> Self {
        self.atlas_size = size;
        self
    }

    /// Character set to rasterize for these options.
    pub fn repertoire(&self) -> Repertoire {
        if self.flags.contains(FontFlags::UPPER_CASE) {
            Repertoire::UpperCase
        } else {
            Repertoire::Full
        }
    }
}

impl From<FontFlags> for FontOptions {
    fn from(flags: FontFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }
}

/// Configuration for a [`FontContext`](crate::FontContext).
#[derive(Debug, Clone)]
pub struct FontContextConfig {
    /// Distance-field cache settings.
    pub distance_field: DistanceFieldCacheConfig,
    /// Atlas size for requests that specify none.
    /// Default: 128.
    pub default_atlas_size: u32,
    /// Glyph size a text scale of 1.0 corresponds to.
    /// Default: 32.0.
    pub base_glyph_size: f32,
}

impl Default for FontContextConfig {
    fn default() -> Self {
        Self {
            distance_field: DistanceFieldCacheConfig::default(),
            default_atlas_size: DEFAULT_ATLAS_SIZE,
            base_glyph_size: BASE_GLYPH_SIZE,
        }
    }
}

impl FontContextConfig {
    /// Set the distance-field cache configuration.
    #[must_use]
    pub fn with_distance_field(mut self, config: DistanceFieldCacheConfig) -> Self {
        self.distance_field = config;
        self
    }

    /// Set the atlas size used when a request specifies zero.
    #[must_use]
    pub fn with_default_atlas_size(mut self, size: u32) -> Self {
        self.default_atlas_size = size;
        self
    }

    /// Set the glyph size a text scale of 1.0 corresponds to.
    #[must_use]
    pub fn with_base_glyph_size(mut self, size: f32) -> Self {
        self.base_glyph_size = size;
        self
    }
}
