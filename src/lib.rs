pub mod bitmap;
pub mod gpu;
pub mod tiles;
pub mod wrap;

/// Fixed width of a logical tile sheet in pixels. Sheets of any other width
/// are never wrapped; they pass through to the renderer unchanged.
pub const SHEET_WIDTH: u32 = 256;

/// Default maximum single-axis texture dimension. Matches the limit of
/// typical desktop backends; query the real value with
/// `gpu::wrap_config_for_device` when a device is available.
pub const DEFAULT_TEXTURE_CAP: u32 = 16384;

/// Default tile size for an 8-column sheet (`SHEET_WIDTH / 8`).
pub const DEFAULT_TILE_W: u32 = 32;
pub const DEFAULT_TILE_H: u32 = 32;
