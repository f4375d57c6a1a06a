// ── Tile extraction and caching ───────────────────────────────────────────────
//
// The consumer-facing layer of the wrapping scheme.  A `TileSource` owns the
// active tileset (plain or column-wrapped), knows the tile-grid addressing
// of the sheet, and hands the renderer per-tile pixels: a plain source rect
// when the sheet fits the hardware limit, an extracted-and-cached bitmap
// when it had to be wrapped.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::bitmap::{Bitmap, Rect};
use crate::wrap::{PackResult, WrapConfig, WrappedAtlas, pack};
use crate::{DEFAULT_TILE_H, DEFAULT_TILE_W};

/// Tile columns per sheet row.  Sheets are always addressed as 8 columns of
/// tiles regardless of the cell size.
pub const TILES_PER_ROW: u32 = 8;

// ── TilesetDesc ───────────────────────────────────────────────────────────────

/// Static layout description of one tileset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilesetDesc {
    /// Pixel width of an extracted tile.
    pub tile_width: u32,
    /// Pixel height of an extracted tile.
    pub tile_height: u32,
    /// Horizontal pitch of the source grid.  Differs from `tile_width` only
    /// for sheets with gutters between cells.
    pub src_cell_width: u32,
    /// Vertical pitch of the source grid.
    pub src_cell_height: u32,
    /// Identifier of the tile at grid position (0, 0).  Lower ids belong to
    /// other addressing schemes and never reach this layer.
    pub first_tile_id: u32,
}

impl TilesetDesc {
    /// Returns the layout of a plain 32-pixel, 8-column sheet with ids
    /// starting at 0.
    pub fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_W,
            tile_height: DEFAULT_TILE_H,
            src_cell_width: DEFAULT_TILE_W,
            src_cell_height: DEFAULT_TILE_H,
            first_tile_id: 0,
        }
    }

    /// Deserialise a descriptor from JSON:
    ///
    /// ```json
    /// { "tile_width": 32, "tile_height": 32, "first_tile_id": 384 }
    /// ```
    ///
    /// `src_cell_width` / `src_cell_height` default to the tile dimensions;
    /// `first_tile_id` defaults to 0.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawDesc = serde_json::from_str(json)?;
        Ok(Self {
            tile_width: raw.tile_width,
            tile_height: raw.tile_height,
            src_cell_width: raw.src_cell_width.unwrap_or(raw.tile_width),
            src_cell_height: raw.src_cell_height.unwrap_or(raw.tile_height),
            first_tile_id: raw.first_tile_id,
        })
    }
}

#[derive(Deserialize)]
struct RawDesc {
    tile_width: u32,
    tile_height: u32,
    #[serde(default)]
    src_cell_width: Option<u32>,
    #[serde(default)]
    src_cell_height: Option<u32>,
    #[serde(default)]
    first_tile_id: u32,
}

// ── UnpackableTileset ─────────────────────────────────────────────────────────

/// A tileset so tall that even the wrapped atlas would exceed the texture
/// cap.  The asset must be rejected; there is no secondary strategy.
#[derive(Clone, Copy, Debug)]
pub struct UnpackableTileset {
    pub height: u32,
    pub texture_cap: u32,
}

impl fmt::Display for UnpackableTileset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tileset of height {} cannot be wrapped under a texture cap of {}",
            self.height, self.texture_cap,
        )
    }
}

impl std::error::Error for UnpackableTileset {}

// ── TilePixels ────────────────────────────────────────────────────────────────

/// How the renderer should source the pixels of one tile.
#[derive(Debug)]
pub enum TilePixels<'a> {
    /// The tileset fits the hardware limit: draw from the tileset texture
    /// directly using this source rect (the ordinary unwrapped path).
    Direct(Rect),
    /// The tileset is wrapped: draw this extracted per-tile bitmap, owned
    /// by the cache.
    Extracted(&'a Bitmap),
}

// ── TileSource ────────────────────────────────────────────────────────────────

enum ActiveSheet {
    Plain(Bitmap),
    Wrapped(WrappedAtlas),
}

/// Per-renderer tileset state: the active sheet, its grid layout, and the
/// lazy per-tile extraction cache.
///
/// Single-threaded by design; the cache interleaves reads and lazy inserts
/// and is only ever touched from the render path.
pub struct TileSource {
    config: WrapConfig,
    desc: TilesetDesc,
    sheet: ActiveSheet,
    cache: HashMap<u32, Bitmap>,
}

impl TileSource {
    /// Create a source with an empty sheet; assign one with
    /// [`Self::set_tileset`].
    pub fn new(config: WrapConfig, desc: TilesetDesc) -> Self {
        Self {
            config,
            desc,
            sheet: ActiveSheet::Plain(Bitmap::new(0, 0)),
            cache: HashMap::new(),
        }
    }

    /// Assign a new tileset, wrapping it when it exceeds the texture cap
    /// and wrapping is enabled.
    ///
    /// Every previously cached tile is dropped, unconditionally: entries
    /// extracted from the old sheet would otherwise survive a reassignment
    /// and serve stale pixels against the new atlas layout.
    pub fn set_tileset(&mut self, sheet: Bitmap) -> Result<(), UnpackableTileset> {
        let height = sheet.height();
        self.sheet = if self.config.enabled {
            match pack(&sheet, self.config.texture_cap) {
                PackResult::Packed(atlas) => ActiveSheet::Wrapped(atlas),
                PackResult::NotNeeded => ActiveSheet::Plain(sheet),
                PackResult::Unpackable => {
                    return Err(UnpackableTileset {
                        height,
                        texture_cap: self.config.texture_cap,
                    });
                }
            }
        } else {
            ActiveSheet::Plain(sheet)
        };
        self.cache.clear();
        Ok(())
    }

    /// Whether the active sheet went through the packer.
    pub fn is_wrapped(&self) -> bool {
        matches!(self.sheet, ActiveSheet::Wrapped(_))
    }

    /// The pixels the renderer should upload as the tileset texture: the
    /// sheet itself, or the packed atlas when the sheet was wrapped.
    pub fn texture(&self) -> &Bitmap {
        match &self.sheet {
            ActiveSheet::Plain(sheet) => sheet,
            ActiveSheet::Wrapped(atlas) => atlas.bitmap(),
        }
    }

    /// Number of tiles currently held by the extraction cache.
    pub fn cached_tiles(&self) -> usize {
        self.cache.len()
    }

    /// Source rectangle of a tile in *logical* sheet coordinates.
    ///
    /// Grid addressing: `index = id - first_tile_id`, row `index / 8`,
    /// column `index % 8`, scaled by the source cell pitch.
    ///
    /// # Panics
    ///
    /// Ids below `first_tile_id` belong to other addressing schemes and are
    /// asserted against rather than wrapped around.
    pub fn tile_rect(&self, id: u32) -> Rect {
        assert!(
            id >= self.desc.first_tile_id,
            "tile id {id} is below the first tile id {}",
            self.desc.first_tile_id,
        );
        let index = id - self.desc.first_tile_id;
        let row = index / TILES_PER_ROW;
        let col = index % TILES_PER_ROW;
        Rect::new(
            (col * self.desc.src_cell_width) as i32,
            (row * self.desc.src_cell_height) as i32,
            self.desc.tile_width,
            self.desc.tile_height,
        )
    }

    /// Pixels for one tile.
    ///
    /// Plain sheets take the fast path: no extraction, no caching, just the
    /// source rect for the renderer's ordinary tileset draw.  Wrapped
    /// sheets extract the tile through the region translator on first
    /// request and serve the cached bitmap afterwards, so the translation
    /// runs at most once per id per tileset assignment.
    pub fn get_tile(&mut self, id: u32) -> TilePixels<'_> {
        let rect = self.tile_rect(id);
        let Self { desc, sheet, cache, .. } = self;
        match sheet {
            ActiveSheet::Plain(_) => TilePixels::Direct(rect),
            ActiveSheet::Wrapped(atlas) => {
                let tile: &Bitmap = cache.entry(id).or_insert_with(|| {
                    let mut tile = Bitmap::new(desc.tile_width, desc.tile_height);
                    atlas.blit_to(&mut tile, 0, 0, rect);
                    tile
                });
                TilePixels::Extracted(tile)
            }
        }
    }
}

// ── load_folder ───────────────────────────────────────────────────────────────

/// Scan `path` recursively for `.png` tilesets, keyed by file stem.
///
/// Duplicate stems keep the first file found; unreadable files are reported
/// and skipped.
pub fn load_folder(path: &str) -> HashMap<String, Bitmap> {
    let mut sheets: HashMap<String, Bitmap> = HashMap::new();

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let file_path = entry.path();
        if file_path.extension().and_then(|s| s.to_str()) != Some("png") {
            continue;
        }
        let name = match file_path.file_stem().and_then(|s| s.to_str()) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };

        if sheets.contains_key(&name) {
            eprintln!("tileset: duplicate name '{}' from {:?}; skipping", name, file_path);
            continue;
        }

        match image::open(file_path) {
            Ok(img) => {
                sheets.insert(name, Bitmap::from(img.to_rgba8()));
            }
            Err(e) => eprintln!("tileset: failed to load {:?}: {e}", file_path),
        }
    }

    sheets
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SHEET_WIDTH;

    fn coded_sheet(height: u32) -> Bitmap {
        let mut bmp = Bitmap::new(SHEET_WIDTH, height);
        for y in 0..height {
            for x in 0..SHEET_WIDTH {
                bmp.set_pixel(x, y, [x as u8, y as u8, (y >> 8) as u8, 0xFF]);
            }
        }
        bmp
    }

    fn small_cap() -> WrapConfig {
        // 1024 keeps test sheets small while allowing up to 4 columns.
        WrapConfig { texture_cap: 1024, enabled: true }
    }

    // ── tile_rect ─────────────────────────────────────────────────────────

    #[test]
    fn tile_rect_walks_the_grid_in_reading_order() {
        let source = TileSource::new(small_cap(), TilesetDesc::default());
        assert_eq!(source.tile_rect(0), Rect::new(0, 0, 32, 32));
        assert_eq!(source.tile_rect(7), Rect::new(224, 0, 32, 32));
        assert_eq!(source.tile_rect(8), Rect::new(0, 32, 32, 32));
        assert_eq!(source.tile_rect(17), Rect::new(32, 64, 32, 32));
    }

    #[test]
    fn tile_rect_subtracts_the_first_tile_id() {
        let desc = TilesetDesc { first_tile_id: 384, ..TilesetDesc::default() };
        let source = TileSource::new(small_cap(), desc);
        assert_eq!(source.tile_rect(384), Rect::new(0, 0, 32, 32));
        assert_eq!(source.tile_rect(384 + 9), Rect::new(32, 32, 32, 32));
    }

    #[test]
    fn tile_rect_scales_by_the_source_cell_pitch() {
        let desc = TilesetDesc {
            src_cell_width: 34,
            src_cell_height: 36,
            ..TilesetDesc::default()
        };
        let source = TileSource::new(small_cap(), desc);
        // Tile (col 2, row 1): origin at the cell pitch, extent at the
        // tile size.
        assert_eq!(source.tile_rect(10), Rect::new(68, 36, 32, 32));
    }

    #[test]
    #[should_panic(expected = "below the first tile id")]
    fn tile_rect_rejects_ids_below_the_first() {
        let desc = TilesetDesc { first_tile_id: 384, ..TilesetDesc::default() };
        TileSource::new(small_cap(), desc).tile_rect(100);
    }

    // ── set_tileset / get_tile ────────────────────────────────────────────

    #[test]
    fn short_sheet_stays_plain_and_serves_direct_rects() {
        let mut source = TileSource::new(small_cap(), TilesetDesc::default());
        source.set_tileset(coded_sheet(512)).unwrap();
        assert!(!source.is_wrapped());
        match source.get_tile(9) {
            TilePixels::Direct(rect) => assert_eq!(rect, Rect::new(32, 32, 32, 32)),
            other => panic!("expected Direct, got {other:?}"),
        }
        assert_eq!(source.cached_tiles(), 0);
    }

    #[test]
    fn tall_sheet_is_wrapped_and_tiles_are_extracted() {
        let mut source = TileSource::new(small_cap(), TilesetDesc::default());
        source.set_tileset(coded_sheet(2500)).unwrap();
        assert!(source.is_wrapped());

        // Tile 9 sits at logical (32, 32); compare a couple of pixels.
        let sheet = coded_sheet(2500);
        match source.get_tile(9) {
            TilePixels::Extracted(tile) => {
                assert_eq!(tile.width(), 32);
                assert_eq!(tile.height(), 32);
                assert_eq!(tile.pixel(0, 0), sheet.pixel(32, 32));
                assert_eq!(tile.pixel(31, 31), sheet.pixel(63, 63));
            }
            other => panic!("expected Extracted, got {other:?}"),
        }
        assert_eq!(source.cached_tiles(), 1);
    }

    #[test]
    fn extracted_tile_spanning_a_column_boundary_is_correct() {
        let mut source = TileSource::new(small_cap(), TilesetDesc::default());
        source.set_tileset(coded_sheet(2500)).unwrap();
        let sheet = coded_sheet(2500);

        // Row 31 of the grid covers logical rows 992..1024; with a 1024
        // cap that touches the boundary, row 32 covers 1024..1056 in the
        // next column.  Check one tile on each side plus the touching one.
        for id in [31 * 8, 32 * 8, 33 * 8 + 5] {
            let rect = source.tile_rect(id);
            match source.get_tile(id) {
                TilePixels::Extracted(tile) => {
                    for y in 0..32 {
                        for x in 0..32 {
                            assert_eq!(
                                tile.pixel(x, y),
                                sheet.pixel(rect.x as u32 + x, rect.y as u32 + y),
                                "tile {id} mismatch at ({x}, {y})",
                            );
                        }
                    }
                }
                other => panic!("expected Extracted, got {other:?}"),
            }
        }
    }

    #[test]
    fn get_tile_serves_the_same_bitmap_on_repeat_lookups() {
        let mut source = TileSource::new(small_cap(), TilesetDesc::default());
        source.set_tileset(coded_sheet(2500)).unwrap();

        let first = match source.get_tile(5) {
            TilePixels::Extracted(tile) => tile.as_raw().as_ptr(),
            other => panic!("expected Extracted, got {other:?}"),
        };
        let second = match source.get_tile(5) {
            TilePixels::Extracted(tile) => tile.as_raw().as_ptr(),
            other => panic!("expected Extracted, got {other:?}"),
        };
        // Identical buffer: the extraction ran once, the second lookup was
        // a map read.
        assert_eq!(first, second);
        assert_eq!(source.cached_tiles(), 1);
    }

    #[test]
    fn reassigning_the_tileset_drops_every_cached_tile() {
        let mut source = TileSource::new(small_cap(), TilesetDesc::default());
        source.set_tileset(coded_sheet(2500)).unwrap();
        source.get_tile(0);
        source.get_tile(9);
        assert_eq!(source.cached_tiles(), 2);

        // New sheet with different pixels at tile 0.
        let mut replacement = coded_sheet(2500);
        for y in 0..32 {
            for x in 0..32 {
                replacement.set_pixel(x, y, [0xAA, 0xBB, 0xCC, 0xFF]);
            }
        }
        source.set_tileset(replacement).unwrap();
        assert_eq!(source.cached_tiles(), 0);

        match source.get_tile(0) {
            TilePixels::Extracted(tile) => assert_eq!(tile.pixel(0, 0), [0xAA, 0xBB, 0xCC, 0xFF]),
            other => panic!("expected Extracted, got {other:?}"),
        }
    }

    #[test]
    fn unpackable_sheet_is_rejected_with_the_layout_numbers() {
        // cap 300: wrapping any taller sheet needs an atlas wider than the
        // cap itself.
        let config = WrapConfig { texture_cap: 300, enabled: true };
        let mut source = TileSource::new(config, TilesetDesc::default());
        let err = source.set_tileset(coded_sheet(301)).unwrap_err();
        assert_eq!(err.height, 301);
        assert_eq!(err.texture_cap, 300);
        assert!(err.to_string().contains("cannot be wrapped"));
    }

    #[test]
    fn disabled_wrapping_passes_tall_sheets_through() {
        let config = WrapConfig { texture_cap: 1024, enabled: false };
        let mut source = TileSource::new(config, TilesetDesc::default());
        source.set_tileset(coded_sheet(2500)).unwrap();
        assert!(!source.is_wrapped());
        assert!(matches!(source.get_tile(0), TilePixels::Direct(_)));
        assert_eq!(source.texture().height(), 2500);
    }

    // ── TilesetDesc::from_json ────────────────────────────────────────────

    #[test]
    fn desc_from_json_fills_defaults() {
        let desc = TilesetDesc::from_json(r#"{ "tile_width": 16, "tile_height": 24 }"#).unwrap();
        assert_eq!(desc.tile_width, 16);
        assert_eq!(desc.tile_height, 24);
        assert_eq!(desc.src_cell_width, 16);
        assert_eq!(desc.src_cell_height, 24);
        assert_eq!(desc.first_tile_id, 0);
    }

    #[test]
    fn desc_from_json_honours_explicit_fields() {
        let desc = TilesetDesc::from_json(
            r#"{ "tile_width": 32, "tile_height": 32,
                 "src_cell_width": 34, "src_cell_height": 34,
                 "first_tile_id": 384 }"#,
        )
        .unwrap();
        assert_eq!(desc.src_cell_width, 34);
        assert_eq!(desc.first_tile_id, 384);
    }

    #[test]
    fn desc_from_json_rejects_missing_tile_size() {
        assert!(TilesetDesc::from_json(r#"{ "tile_width": 32 }"#).is_err());
    }

    // ── load_folder ───────────────────────────────────────────────────────

    #[test]
    fn load_folder_collects_pngs_by_stem() {
        let dir = std::env::temp_dir().join(format!("tilewrap_load_{}", std::process::id()));
        let nested = dir.join("more");
        std::fs::create_dir_all(&nested).unwrap();

        image::RgbaImage::new(8, 8).save(dir.join("grass.png")).unwrap();
        image::RgbaImage::new(16, 4).save(nested.join("cave.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a tileset").unwrap();

        let sheets = load_folder(dir.to_str().unwrap());
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets["grass"].width(), 8);
        assert_eq!(sheets["cave"].width(), 16);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
