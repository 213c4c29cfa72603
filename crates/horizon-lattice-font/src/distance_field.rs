//! Signed distance fields for glyph atlases, with an on-disk cache.
//!
//! Converting a coverage atlas into a distance field is expensive compared to
//! rasterizing it, so the result is written next to other user cache files
//! and read back the next time the same typeface is requested with the same
//! point size and atlas size.
//!
//! Cache files hold the raw single-channel distance bytes, row-major, with no
//! header. A file whose length does not match the atlas is ignored and
//! rebuilt.
//!
//! # Example
//!
//! ```ignore
//! use horizon_lattice_font::{DistanceFieldCache, DistanceFieldCacheConfig};
//!
//! let cache = DistanceFieldCache::new(
//!     DistanceFieldCacheConfig::default().with_cache_dir("/tmp/fonts"),
//! );
//! let field = cache.load_or_build(Path::new("fonts/Sans.ttf"), 24.0, &atlas);
//! atlas.replace_data(field)?;
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{debug, info, warn};

use crate::glyph::GlyphAtlas;

/// Distance in pixels covered by the full 0..255 range of a distance field.
///
/// Distances are measured from the glyph outline; values saturate at half
/// this radius on either side.
pub const DISTANCE_FIELD_RADIUS: f64 = 8.0;

/// Suffix appended to every cache file name. Bump when the encoding changes.
const CACHE_FILE_SUFFIX: &str = "_v2.dfield";

/// Coverage at or above this value counts as inside the glyph.
const INSIDE_THRESHOLD: u8 = 128;

const INF: f64 = 1e20;

/// Configuration for the distance-field cache.
#[derive(Debug, Clone)]
pub struct DistanceFieldCacheConfig {
    /// Directory holding cache files.
    /// Default: the user cache directory / "horizon-lattice" / "fonts", or the
    /// system temp directory if no user cache directory exists.
    pub cache_dir: PathBuf,
    /// Read and write cache files. When disabled, distance fields are always
    /// recomputed.
    /// Default: true.
    pub enabled: bool,
}

impl Default for DistanceFieldCacheConfig {
    fn default() -> Self {
        let cache_dir = ProjectDirs::from("", "", "horizon-lattice")
            .map(|dirs| dirs.cache_dir().join("fonts"))
            .unwrap_or_else(|| std::env::temp_dir().join("horizon-lattice-fonts"));
        Self {
            cache_dir,
            enabled: true,
        }
    }
}

impl DistanceFieldCacheConfig {
    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = path.into();
        self
    }

    /// Enable or disable reading and writing cache files.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Builds distance fields and persists them between runs.
#[derive(Debug, Clone)]
pub struct DistanceFieldCache {
    config: DistanceFieldCacheConfig,
}

impl DistanceFieldCache {
    /// Create a cache with the given configuration.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(config: DistanceFieldCacheConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &DistanceFieldCacheConfig {
        &self.config
    }

    /// Path of the cache file for a typeface at a point size and atlas size.
    ///
    /// Only the file name of `typeface` is used, so the same typeface loaded
    /// from different directories shares one cache file.
    pub fn cache_path(&self, typeface: &Path, point_size: f32, atlas_size: u32) -> PathBuf {
        let base = typeface
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.config.cache_dir.join(format!(
            "{base}.{point_size}.{atlas_size}{CACHE_FILE_SUFFIX}"
        ))
    }

    /// Return the distance field of `atlas`, from disk if possible.
    ///
    /// On a miss the field is computed and written back. I/O failures never
    /// fail the call: a bad read falls back to computing, a failed write is
    /// logged and leaves no file behind.
    pub fn load_or_build(&self, typeface: &Path, point_size: f32, atlas: &GlyphAtlas) -> Vec<u8> {
        let (width, height) = (atlas.width(), atlas.height());

        if !self.config.enabled {
            return make_distance_map(atlas.data(), width, height);
        }

        let path = self.cache_path(typeface, point_size, width);
        let expected_len = width as usize * height as usize;

        if let Some(field) = read_cache_file(&path, expected_len) {
            debug!(
                target: "horizon_lattice_font::distance_field",
                path = %path.display(),
                "loaded cached distance field"
            );
            return field;
        }

        info!(
            target: "horizon_lattice_font::distance_field",
            typeface = %typeface.display(),
            point_size,
            width,
            height,
            "building distance field"
        );
        let field = make_distance_map(atlas.data(), width, height);

        if let Err(err) = write_cache_file(&path, &field) {
            warn!(
                target: "horizon_lattice_font::distance_field",
                path = %path.display(),
                error = %err,
                "failed to write distance field cache"
            );
            let _ = fs::remove_file(&path);
        }

        field
    }
}

fn read_cache_file(path: &Path, expected_len: usize) -> Option<Vec<u8>> {
    let mut file = File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    if len != expected_len as u64 {
        debug!(
            target: "horizon_lattice_font::distance_field",
            path = %path.display(),
            len,
            expected_len,
            "ignoring distance field cache with wrong length"
        );
        return None;
    }

    let mut data = Vec::with_capacity(expected_len);
    file.read_to_end(&mut data).ok()?;
    (data.len() == expected_len).then_some(data)
}

fn write_cache_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Convert a single-channel coverage bitmap into a signed distance field.
///
/// Inside pixels map above 128, outside pixels below, falling off linearly
/// over [`DISTANCE_FIELD_RADIUS`] pixels.
pub fn make_distance_map(coverage: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    debug_assert_eq!(coverage.len(), w * h);

    let inside: Vec<bool> = coverage.iter().map(|&c| c >= INSIDE_THRESHOLD).collect();

    // Distance to the nearest inside pixel, zero for inside pixels
    let mut to_inside: Vec<f64> = inside.iter().map(|&i| if i { 0.0 } else { INF }).collect();
    // Distance to the nearest outside pixel, zero for outside pixels
    let mut to_outside: Vec<f64> = inside.iter().map(|&i| if i { INF } else { 0.0 }).collect();

    squared_distance_transform(&mut to_inside, w, h);
    squared_distance_transform(&mut to_outside, w, h);

    to_inside
        .iter()
        .zip(&to_outside)
        .map(|(&d_in, &d_out)| {
            // Positive outside the glyph
            let signed = d_in.sqrt() - d_out.sqrt();
            let value = (0.5 - signed / DISTANCE_FIELD_RADIUS) * 255.0;
            value.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// In-place 2D squared Euclidean distance transform of a sampled function
/// (Felzenszwalb and Huttenlocher).
fn squared_distance_transform(grid: &mut [f64], width: usize, height: usize) {
    let n = width.max(height);
    let mut f = vec![0.0; n];
    let mut d = vec![0.0; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];

    for x in 0..width {
        for y in 0..height {
            f[y] = grid[y * width + x];
        }
        transform_1d(&f[..height], &mut d[..height], &mut v, &mut z);
        for y in 0..height {
            grid[y * width + x] = d[y];
        }
    }

    for y in 0..height {
        let row = &mut grid[y * width..(y + 1) * width];
        f[..width].copy_from_slice(row);
        transform_1d(&f[..width], &mut d[..width], &mut v, &mut z);
        row.copy_from_slice(&d[..width]);
    }
}

/// Lower envelope of parabolas rooted at `f`.
fn transform_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let intersection = |q: usize, p: usize| -> f64 {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    let mut k = 0;
    v[0] = 0;
    z[0] = -INF;
    z[1] = INF;

    for q in 1..n {
        let mut s = intersection(q, v[k]);
        while k > 0 && s <= z[k] {
            k -= 1;
            s = intersection(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = INF;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *out = dq * dq + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 32x32 bitmap with a filled 12x12 square at (10, 10).
    fn square_atlas() -> GlyphAtlas {
        let mut atlas = GlyphAtlas::new(32, 32, 1).unwrap();
        let region = atlas.allocate(12, 12).unwrap();
        atlas.write(region, &[255; 144]);
        atlas
    }

    #[test]
    fn test_distance_map_inside_is_bright() {
        let atlas = square_atlas();
        let field = make_distance_map(atlas.data(), 32, 32);
        assert_eq!(field.len(), 32 * 32);

        // Allocation starts at the padding offset
        let center = (1 + 6) * 32 + (1 + 6);
        assert!(field[center] > 200, "center was {}", field[center]);
        assert_eq!(field[31 * 32 + 31], 0);
    }

    #[test]
    fn test_distance_map_edge_is_midrange() {
        let atlas = square_atlas();
        let field = make_distance_map(atlas.data(), 32, 32);

        // Row 7 crosses the square; x = 1 is the first inside pixel
        let inside_edge = field[7 * 32 + 1];
        let outside_edge = field[7 * 32];
        assert!(inside_edge > 128 && inside_edge < 180, "{inside_edge}");
        assert!(outside_edge < 128 && outside_edge > 80, "{outside_edge}");
    }

    #[test]
    fn test_distance_transform_1d() {
        let f = [INF, 0.0, INF, INF, 0.0];
        let mut d = [0.0; 5];
        let mut v = [0usize; 5];
        let mut z = [0.0; 6];
        transform_1d(&f, &mut d, &mut v, &mut z);
        assert_eq!(d, [1.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_cache_path_uses_file_name() {
        let cache = DistanceFieldCache::new(
            DistanceFieldCacheConfig::default().with_cache_dir("/var/cache/fonts"),
        );
        let path = cache.cache_path(Path::new("data/fonts/Sans.ttf"), 24.0, 256);
        assert_eq!(path, Path::new("/var/cache/fonts/Sans.ttf.24.256_v2.dfield"));
    }

    #[test]
    fn test_round_trip_through_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DistanceFieldCache::new(
            DistanceFieldCacheConfig::default().with_cache_dir(dir.path()),
        );
        let atlas = square_atlas();
        let typeface = Path::new("Sans.ttf");

        let built = cache.load_or_build(typeface, 16.0, &atlas);
        let path = cache.cache_path(typeface, 16.0, 32);
        assert_eq!(fs::read(&path).unwrap(), built);

        // A blank atlas proves the second call reads the file
        let blank = GlyphAtlas::new(32, 32, 1).unwrap();
        let loaded = cache.load_or_build(typeface, 16.0, &blank);
        assert_eq!(loaded, built);
    }

    #[test]
    fn test_wrong_length_file_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DistanceFieldCache::new(
            DistanceFieldCacheConfig::default().with_cache_dir(dir.path()),
        );
        let atlas = square_atlas();
        let typeface = Path::new("Sans.ttf");
        let path = cache.cache_path(typeface, 16.0, 32);
        fs::write(&path, [7u8; 10]).unwrap();

        let field = cache.load_or_build(typeface, 16.0, &atlas);
        assert_eq!(field, make_distance_map(atlas.data(), 32, 32));
        assert_eq!(fs::read(&path).unwrap().len(), 32 * 32);
    }

    #[test]
    fn test_disabled_cache_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DistanceFieldCache::new(
            DistanceFieldCacheConfig::default()
                .with_cache_dir(dir.path())
                .with_enabled(false),
        );
        let atlas = square_atlas();
        let _ = cache.load_or_build(Path::new("Sans.ttf"), 16.0, &atlas);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
