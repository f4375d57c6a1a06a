// ── CPU pixel surface ─────────────────────────────────────────────────────────
//
// Owned RGBA8 surfaces and the rectangular copy-blit primitive the wrapping
// layer is built on.  Everything here is plain CPU memory; uploading to the
// GPU happens in `gpu.rs`.

use image::RgbaImage;

// ── Rect ──────────────────────────────────────────────────────────────────────

/// Axis-aligned pixel rectangle.
///
/// The origin is signed so callers can express rectangles that poke outside
/// a surface; [`Bitmap::blit`] copies only the overlapping part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

// ── Bitmap ────────────────────────────────────────────────────────────────────

/// An owned RGBA8 pixel surface.
#[derive(Clone)]
pub struct Bitmap {
    pixels: RgbaImage,
}

impl Bitmap {
    /// Allocate a zeroed (fully transparent) surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::new(width, height) }
    }

    /// Decode a PNG from memory.
    pub fn from_png(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self { pixels: image::load_from_memory(bytes)?.to_rgba8() })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.pixels.put_pixel(x, y, image::Rgba(rgba));
    }

    /// Flat RGBA byte buffer in row-major order, 4 bytes per pixel.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Copy `src_rect` out of `src` to `(dst_x, dst_y)` on this surface.
    ///
    /// A pure unscaled pixel copy.  The rectangle is clipped against both
    /// surfaces: parts of `src_rect` outside `src`, and parts of the
    /// destination footprint outside `self`, are skipped rather than
    /// rejected.  Clipping on the top or left edge shifts the destination
    /// origin by the clipped amount so the surviving pixels keep their
    /// relative positions.
    pub fn blit(&mut self, dst_x: i32, dst_y: i32, src: &Bitmap, src_rect: Rect) {
        let Rect { mut x, mut y, width, height } = src_rect;
        let mut dx = dst_x;
        let mut dy = dst_y;
        let mut w = width as i64;
        let mut h = height as i64;

        // Clip against the top-left of both surfaces.
        if x < 0 { w += x as i64; dx -= x; x = 0; }
        if y < 0 { h += y as i64; dy -= y; y = 0; }
        if dx < 0 { w += dx as i64; x -= dx; dx = 0; }
        if dy < 0 { h += dy as i64; y -= dy; dy = 0; }

        // Clamp the extent to what both surfaces can hold.
        w = w.min(src.width() as i64 - x as i64).min(self.width() as i64 - dx as i64);
        h = h.min(src.height() as i64 - y as i64).min(self.height() as i64 - dy as i64);
        if w <= 0 || h <= 0 {
            return;
        }

        let (x, y, dx, dy) = (x as usize, y as usize, dx as usize, dy as usize);
        let (w, h) = (w as usize, h as usize);
        let src_stride = src.width() as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let src_buf: &[u8] = src.pixels.as_raw();
        let dst_buf: &mut [u8] = &mut self.pixels;

        // Row-wise copy through the raw byte buffers.
        for row in 0..h {
            let s = (y + row) * src_stride + x * 4;
            let d = (dy + row) * dst_stride + dx * 4;
            dst_buf[d..d + w * 4].copy_from_slice(&src_buf[s..s + w * 4]);
        }
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap({}x{})", self.width(), self.height())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
