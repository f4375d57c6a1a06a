// ── Column-wrapped tileset atlases ────────────────────────────────────────────
//
// A tile sheet taller than the backend's maximum texture dimension cannot be
// uploaded as-is.  This module repacks such a sheet into side-by-side column
// slices that each fit the limit, and translates reads expressed in logical
// (unwrapped) coordinates into one or two physical blits against the packed
// atlas.
//
// Only the *height* axis is wrapped.  A sheet wider than the limit is not
// representable under this scheme and is passed through untouched.

use crate::bitmap::{Bitmap, Rect};
use crate::{DEFAULT_TEXTURE_CAP, SHEET_WIDTH};

// ── WrapConfig ────────────────────────────────────────────────────────────────

/// Wrapping configuration, injected into the packer by its caller rather
/// than read from global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrapConfig {
    /// Maximum single-axis texture dimension the rendering backend supports.
    pub texture_cap: u32,
    /// When false, tall sheets are stored unwrapped and the passthrough
    /// path is always taken (for backends without the height limit).
    pub enabled: bool,
}

impl WrapConfig {
    /// Returns a `WrapConfig` with a 16384 cap and wrapping enabled.
    pub fn default() -> Self {
        Self { texture_cap: DEFAULT_TEXTURE_CAP, enabled: true }
    }
}

// ── PackResult ────────────────────────────────────────────────────────────────

/// Outcome of [`pack`].
///
/// `NotNeeded` and `Unpackable` are distinct so a caller can never mistake
/// "no wrapping required" for "cannot wrap".
#[derive(Debug)]
pub enum PackResult {
    /// The sheet fits the cap (or has a non-standard width) and should be
    /// used directly.
    NotNeeded,
    /// The sheet was repacked into a column atlas.
    Packed(WrappedAtlas),
    /// Even wrapped, the sheet cannot be represented: the atlas would need
    /// so many columns that its *width* would itself exceed the cap.  The
    /// asset has to be rejected; there is no fallback strategy.
    Unpackable,
}

// ── pack ──────────────────────────────────────────────────────────────────────

/// Repack a logical sheet into a column atlas under the texture cap.
///
/// Column `c` of the atlas holds logical rows `[c*cap, min((c+1)*cap, h))`
/// at atlas X offset `c * SHEET_WIDTH`:
///
/// ```text
/// logical (256 x h)          atlas (256*columns x cap)
/// ┌────┐ row 0               ┌────┬────┬────┐
/// │ A  │                     │ A  │ B  │ C  │
/// ├────┤ row cap             │    │    ├────┤
/// │ B  │                     │    │    │    │
/// ├────┤ row 2*cap           └────┴────┴────┘
/// │ C  │
/// └────┘ row h
/// ```
///
/// The last column receives `h % cap` rows; when the height divides evenly
/// it receives a full `cap` rows, never zero.
///
/// Returns `NotNeeded` when `h <= cap` or the sheet width is not
/// [`SHEET_WIDTH`], and `Unpackable` when `columns * SHEET_WIDTH` would
/// exceed the cap.  The input is never mutated.
pub fn pack(logical: &Bitmap, cap: u32) -> PackResult {
    assert!(cap > 0, "texture cap must be positive");

    let height = logical.height();
    if logical.width() != SHEET_WIDTH || height <= cap {
        return PackResult::NotNeeded;
    }

    let columns = height.div_ceil(cap);
    if columns.saturating_mul(SHEET_WIDTH) > cap {
        return PackResult::Unpackable;
    }

    let mut atlas = Bitmap::new(columns * SHEET_WIDTH, cap);
    for c in 0..columns {
        let top = c * cap;
        let slice_h = if c + 1 == columns {
            let rem = height % cap;
            if rem == 0 { cap } else { rem }
        } else {
            cap
        };
        atlas.blit(
            (c * SHEET_WIDTH) as i32,
            0,
            logical,
            Rect::new(0, top as i32, SHEET_WIDTH, slice_h),
        );
    }

    PackResult::Packed(WrappedAtlas {
        bitmap: atlas,
        columns,
        column_height: cap,
        logical_height: height,
    })
}

// ── PhysicalBlit ──────────────────────────────────────────────────────────────

/// One atlas-space copy produced by [`WrappedAtlas::resolve`]: a source
/// rectangle in atlas coordinates plus the destination offset, relative to
/// wherever the caller places the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalBlit {
    pub dest_x: u32,
    pub dest_y: u32,
    pub src: Rect,
}

// ── WrappedAtlas ──────────────────────────────────────────────────────────────

/// A logical sheet repacked into column slices, together with the layout
/// parameters needed to translate logical reads.
#[derive(Debug)]
pub struct WrappedAtlas {
    bitmap: Bitmap,
    columns: u32,
    /// Height of one column; equals the texture cap the atlas was packed
    /// under.
    column_height: u32,
    logical_height: u32,
}

impl WrappedAtlas {
    /// The packed pixels, ready for upload.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn column_height(&self) -> u32 {
        self.column_height
    }

    /// Height of the sheet the atlas was packed from.
    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    /// Translate a logical read into one or two physical blits.
    ///
    /// The horizontal axis is clamped to the sheet
    /// (`x' = clamp(x, 0, 256)`, `w' = clamp(w, 0, 256 - x')`); the
    /// vertical axis is the caller's responsibility and is not clamped.
    ///
    /// With `cap` the column height, the request starts in column
    /// `y / cap` at physical position `(column*256 + x', y % cap)`.  It
    /// spans into the next column iff
    ///
    /// ```text
    /// (y % cap) > ((y + height) % cap)
    /// ```
    ///
    /// that is, the end row's residue wrapped around below the start row's,
    /// which only happens when the interval crosses a multiple of `cap`.
    /// A spanning read splits into part A (the `cap - y % cap` rows left in
    /// the current column) and part B (the remainder, read from the next
    /// column at physical Y 0, placed below part A).  A read ending exactly
    /// on a column boundary satisfies the formula too and produces a
    /// zero-height part B, which [`Bitmap::blit`] discards.
    ///
    /// # Panics
    ///
    /// A request taller than one column would need a third blit and is a
    /// caller bug; it fails the `height <= cap` assertion rather than
    /// rendering truncated pixels.  Negative `y` is asserted for the same
    /// reason.
    pub fn resolve(&self, request: Rect) -> Vec<PhysicalBlit> {
        assert!(
            request.height <= self.column_height,
            "request height {} exceeds the column height {}; a read may span at most two columns",
            request.height,
            self.column_height,
        );
        assert!(request.y >= 0, "request y {} is above the sheet", request.y);

        let x = request.x.clamp(0, SHEET_WIDTH as i32) as u32;
        let width = request.width.min(SHEET_WIDTH - x);
        let cap = self.column_height;
        let y = request.y as u32;

        let column = y / cap;
        let phys_x = column * SHEET_WIDTH + x;
        let phys_y = y % cap;

        let spans = phys_y > (y + request.height) % cap;
        if !spans {
            return vec![PhysicalBlit {
                dest_x: 0,
                dest_y: 0,
                src: Rect::new(phys_x as i32, phys_y as i32, width, request.height),
            }];
        }

        let part_a = cap - phys_y;
        vec![
            PhysicalBlit {
                dest_x: 0,
                dest_y: 0,
                src: Rect::new(phys_x as i32, phys_y as i32, width, part_a),
            },
            PhysicalBlit {
                dest_x: 0,
                dest_y: part_a,
                src: Rect::new(
                    (phys_x + SHEET_WIDTH) as i32,
                    0,
                    width,
                    request.height - part_a,
                ),
            },
        ]
    }

    /// Copy a logical region of the sheet into `dest` at
    /// `(dest_x, dest_y)`, going through [`Self::resolve`].
    ///
    /// Stateless and allocation-free apart from the caller's destination;
    /// concurrent calls writing disjoint destinations are safe.
    pub fn blit_to(&self, dest: &mut Bitmap, dest_x: i32, dest_y: i32, request: Rect) {
        for part in self.resolve(request) {
            dest.blit(
                dest_x + part.dest_x as i32,
                dest_y + part.dest_y as i32,
                &self.bitmap,
                part.src,
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
