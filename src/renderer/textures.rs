//! Procedural maps for the textured and reflective modes.
//!
//! Both are generated at startup, so nothing is read from disk.

use glam::Vec3;

pub const UV_GRID_SIZE: u32 = 512;
pub const UV_GRID_CELLS: u32 = 8;
pub const ENVIRONMENT_FACE_SIZE: u32 = 256;

/// RGBA8 test grid: one hue per cell with dark cell borders.
pub fn uv_grid_pixels(size: u32) -> Vec<u8> {
    let cell = (size / UV_GRID_CELLS).max(1);
    let border = (cell / 16).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let (cx, cy) = (x / cell, y / cell);
            let on_border = x % cell < border || y % cell < border;
            let rgb = if on_border {
                [24, 24, 24]
            } else {
                let hue = (cx + cy * UV_GRID_CELLS) as f32 / (UV_GRID_CELLS * UV_GRID_CELLS) as f32;
                let shade = if (cx + cy) % 2 == 0 { 1.0 } else { 0.8 };
                hue_to_rgb(hue, shade)
            };
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    pixels
}

fn hue_to_rgb(hue: f32, value: f32) -> [u8; 3] {
    let h = hue.fract() * 6.0;
    let f = h.fract();
    let (r, g, b) = match h as u32 {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    };
    let channel = |c: f32| ((0.25 + 0.75 * c) * value * 255.0).round() as u8;
    [channel(r), channel(g), channel(b)]
}

/// Direction through texel center `(x, y)` of cube face `face`
/// (order +X, -X, +Y, -Y, +Z, -Z).
pub fn cube_face_direction(face: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let s = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let t = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    };
    dir.normalize()
}

/// Sky gradient above the horizon, checkered ground below.
pub fn environment_color(dir: Vec3) -> [u8; 3] {
    let zenith = Vec3::new(0.18, 0.36, 0.72);
    let horizon = Vec3::new(0.85, 0.88, 0.92);
    let ground = Vec3::new(0.32, 0.27, 0.22);

    let color = if dir.y >= 0.0 {
        let sun = dir.dot(Vec3::new(0.32, 0.39, 0.7).normalize()).max(0.0).powf(200.0);
        horizon.lerp(zenith, dir.y.powf(0.6)) + Vec3::splat(sun)
    } else {
        let t = -1.0 / dir.y.min(-1e-3);
        let (gx, gz) = (dir.x * t, dir.z * t);
        let checker = ((gx.floor() + gz.floor()) as i64).rem_euclid(2) == 0;
        let base = if checker { ground } else { ground * 0.75 };
        base.lerp(horizon, (1.0 + dir.y).powf(8.0))
    };

    let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8]
}

/// All six faces, tightly packed, in layer order.
pub fn environment_pixels(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((6 * size * size * 4) as usize);
    for face in 0..6 {
        for y in 0..size {
            for x in 0..size {
                let rgb = environment_color(cube_face_direction(face, x, y, size));
                pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
    }
    pixels
}

pub struct SceneTextures {
    pub color_view: wgpu::TextureView,
    pub color_sampler: wgpu::Sampler,
    pub environment_view: wgpu::TextureView,
    pub environment_sampler: wgpu::Sampler,
}

impl SceneTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let color = upload_rgba(
            device,
            queue,
            "UV Grid Texture",
            UV_GRID_SIZE,
            1,
            &uv_grid_pixels(UV_GRID_SIZE),
        );
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let environment = upload_rgba(
            device,
            queue,
            "Environment Cube Texture",
            ENVIRONMENT_FACE_SIZE,
            6,
            &environment_pixels(ENVIRONMENT_FACE_SIZE),
        );
        let environment_view = environment.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Environment Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let color_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("UV Grid Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });

        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            color_view,
            color_sampler,
            environment_view,
            environment_sampler,
        }
    }
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    size: u32,
    layers: u32,
    pixels: &[u8],
) -> wgpu::Texture {
    let extent = wgpu::Extent3d {
        width: size,
        height: size,
        depth_or_array_layers: layers,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * size),
            rows_per_image: Some(size),
        },
        extent,
    );

    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uv_grid_has_rgba_for_every_texel() {
        let pixels = uv_grid_pixels(64);
        assert_eq!(pixels.len(), 64 * 64 * 4);
        assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
        // top-left corner sits on a cell border
        assert_eq!(&pixels[..3], &[24, 24, 24]);
    }

    #[test]
    fn neighbouring_cells_differ() {
        let size = 64;
        let cell = size / UV_GRID_CELLS;
        let texel = |x: u32, y: u32| {
            let i = ((y * size + x) * 4) as usize;
            uv_grid_pixels(size)[i..i + 3].to_vec()
        };
        let mid = cell / 2;
        assert_ne!(texel(mid, mid), texel(cell + mid, mid));
    }

    #[test]
    fn face_centers_point_along_axes() {
        let size = 2;
        // texel (1,1) of a 2x2 face is off-center; average the four instead
        let center = |face| {
            (0..2)
                .flat_map(|y| (0..2).map(move |x| (x, y)))
                .map(|(x, y)| cube_face_direction(face, x, y, size))
                .sum::<Vec3>()
                .normalize()
        };
        assert!(center(0).abs_diff_eq(Vec3::X, 1e-5));
        assert!(center(1).abs_diff_eq(-Vec3::X, 1e-5));
        assert!(center(2).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(center(3).abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(center(4).abs_diff_eq(Vec3::Z, 1e-5));
        assert!(center(5).abs_diff_eq(-Vec3::Z, 1e-5));
    }

    #[test]
    fn sky_is_bluer_than_ground() {
        let sky = environment_color(Vec3::Y);
        let ground = environment_color(-Vec3::Y);
        assert!(sky[2] > ground[2]);
        assert_eq!(environment_pixels(4).len(), 6 * 4 * 4 * 4);
    }
}
