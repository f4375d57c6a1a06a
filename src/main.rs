// Headless demo of the tileset wrapping layer: builds a tile sheet far
// taller than a (deliberately small) texture cap, packs it, reads tiles
// back across the column boundary, and uploads the atlas if a GPU adapter
// is around.  Pass a directory argument to list loadable tilesets instead
// of the synthetic sheet stats.

use tilewrap::SHEET_WIDTH;
use tilewrap::bitmap::Bitmap;
use tilewrap::gpu;
use tilewrap::tiles::{TilePixels, TileSource, TilesetDesc, load_folder};
use tilewrap::wrap::{PackResult, WrapConfig, pack};

// ── Synthetic sheet ──────────────────────────────────────────────────────────

/// A sheet of horizontal 32-pixel bands, each band a distinct colour, so a
/// misplaced tile extraction is visible at a glance.
fn banded_sheet(height: u32) -> Bitmap {
    let mut sheet = Bitmap::new(SHEET_WIDTH, height);
    for y in 0..height {
        let band = (y / 32) as u8;
        for x in 0..SHEET_WIDTH {
            sheet.set_pixel(x, y, [band.wrapping_mul(37), band.wrapping_mul(73), x as u8, 0xFF]);
        }
    }
    sheet
}

// ── GPU bring-up ─────────────────────────────────────────────────────────────

async fn acquire_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .ok()?;
    adapter
        .request_device(&wgpu::DeviceDescriptor::default())
        .await
        .ok()
}

// ── main ─────────────────────────────────────────────────────────────────────

fn main() {
    if let Some(dir) = std::env::args().nth(1) {
        let sheets = load_folder(&dir);
        println!("{} tileset(s) under {dir}:", sheets.len());
        let mut names: Vec<_> = sheets.keys().collect();
        names.sort();
        for name in names {
            let sheet = &sheets[name];
            println!("  {name}: {}x{}", sheet.width(), sheet.height());
        }
        return;
    }

    // A small pretend cap so the wrap path runs without 16k allocations.
    // 1000 is deliberately not a multiple of the 32-pixel tile grid, which
    // forces some tiles to straddle a column boundary.
    let config = WrapConfig { texture_cap: 1000, enabled: true };
    let height = 2500;

    match pack(&banded_sheet(height), config.texture_cap) {
        PackResult::Packed(atlas) => println!(
            "packed a {SHEET_WIDTH}x{height} sheet into {} columns ({}x{})",
            atlas.columns(),
            atlas.bitmap().width(),
            atlas.bitmap().height(),
        ),
        other => {
            eprintln!("expected the sheet to wrap, got {other:?}");
            return;
        }
    }

    let mut source = TileSource::new(config, TilesetDesc::default());
    source
        .set_tileset(banded_sheet(height))
        .expect("demo sheet fits three columns under the demo cap");

    // Tile row 31 covers logical rows 992..1024 and straddles the boundary
    // at 1000; its extraction needs both columns.
    for id in [0, 31 * 8, 32 * 8] {
        match source.get_tile(id) {
            TilePixels::Extracted(tile) => {
                let [r, g, ..] = tile.pixel(0, 0);
                println!("tile {id}: extracted {}x{}, top-left band colour ({r}, {g})",
                    tile.width(), tile.height());
            }
            TilePixels::Direct(rect) => println!("tile {id}: direct from sheet at {rect:?}"),
        }
    }
    println!("cache holds {} tile(s)", source.cached_tiles());

    match pollster::block_on(acquire_device()) {
        Some((device, queue)) => {
            let device_config = gpu::wrap_config_for_device(&device);
            println!("device texture cap: {}", device_config.texture_cap);
            let uploaded = gpu::upload_tileset(&device, &queue, source.texture(), "demo_atlas");
            println!("uploaded atlas as a {}x{} texture", uploaded.width, uploaded.height);
        }
        None => eprintln!("no GPU adapter available; skipping the upload step"),
    }
}
