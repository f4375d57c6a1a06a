// ── GPU glue ──────────────────────────────────────────────────────────────────
//
// The only code in the crate that touches wgpu: reading the hardware
// texture limit off a device, and uploading a finished surface (plain sheet
// or packed atlas) as a nearest-filtered texture.

use wgpu::util::DeviceExt;

use crate::bitmap::Bitmap;
use crate::wrap::WrapConfig;

/// Build a [`WrapConfig`] from the device's actual limits instead of the
/// default cap.
pub fn wrap_config_for_device(device: &wgpu::Device) -> WrapConfig {
    WrapConfig {
        texture_cap: device.limits().max_texture_dimension_2d,
        enabled: true,
    }
}

/// An uploaded tileset texture plus the sampler tile renderers bind with.
pub struct TilesetTexture {
    pub texture_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// Upload `bitmap` as an RGBA texture with nearest filtering.
///
/// Accepts any surface; pass [`crate::tiles::TileSource::texture`] to
/// upload whatever the source settled on.  A surface that still exceeds the
/// device limit on either axis is reported (the driver will reject it) but
/// the upload is attempted anyway so the backend error surfaces normally.
pub fn upload_tileset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bitmap: &Bitmap,
    label: &str,
) -> TilesetTexture {
    let cap = device.limits().max_texture_dimension_2d;
    if bitmap.width() > cap || bitmap.height() > cap {
        eprintln!(
            "gpu: '{label}' is {}x{} but the device caps textures at {cap}",
            bitmap.width(),
            bitmap.height(),
        );
    }

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: bitmap.width(),
                height: bitmap.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        bitmap.as_raw(),
    );

    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    TilesetTexture {
        texture_view,
        sampler,
        width: bitmap.width(),
        height: bitmap.height(),
    }
}
