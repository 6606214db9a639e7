use glam::Vec3;

use crate::geometry::mesh::TriangleMesh;
use crate::geometry::teapot_data::{
    BLINN_HEIGHT, BLINN_SCALE, BODY_PATCHES, BOTTOM_PATCHES, FIT_LID_SCALE, LID_PATCHES,
    TEAPOT_PATCHES, TEAPOT_VERTICES,
};

/// Everything that changes the generated geometry, apart from the overall size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeapotOptions {
    /// Subdivisions along each patch edge.
    pub segments: u32,
    pub bottom: bool,
    pub lid: bool,
    pub body: bool,
    /// Widen the lid so it sits inside the rim without a gap.
    pub fit_lid: bool,
    /// Use Blinn's squashed proportions instead of Newell's original height.
    pub blinn: bool,
}

type Patch = [[Vec3; 4]; 4];

/// Tessellates the teapot so it fits in `[-size, size]` vertically, Y up.
///
/// With no parts selected the result is an empty mesh.
pub fn generate_teapot(size: f32, options: &TeapotOptions) -> TriangleMesh {
    let segments = options.segments.max(2);
    let verts_per_row = segments as usize + 1;

    let patches: Vec<usize> = selected_patches(options).collect();
    let vertex_count = patches.len() * verts_per_row * verts_per_row;
    let index_count = patches.len() * segments as usize * segments as usize * 6;
    let mut mesh = TriangleMesh::with_capacity(vertex_count, index_count);

    let max_height = if options.blinn {
        BLINN_HEIGHT
    } else {
        BLINN_HEIGHT * BLINN_SCALE
    };
    let half_height = max_height / 2.0;
    let true_size = size / half_height;

    for (surface, &patch_index) in patches.iter().enumerate() {
        let patch = control_points(patch_index, options);

        for sstep in 0..=segments {
            let s = sstep as f32 / segments as f32;
            let bs = bernstein(s);
            let dbs = bernstein_derivative(s);

            for tstep in 0..=segments {
                let t = tstep as f32 / segments as f32;
                let bt = bernstein(t);
                let dbt = bernstein_derivative(t);

                let point = evaluate(&patch, &bs, &bt);
                let s_dir = evaluate(&patch, &dbs, &bt);
                let t_dir = evaluate(&patch, &bs, &dbt);

                let normal = if point.x == 0.0 && point.y == 0.0 {
                    // cusp: the tangents collapse, so point straight up or down
                    let up = if point.z > half_height { 1.0 } else { -1.0 };
                    Vec3::new(0.0, up, 0.0)
                } else {
                    let n = t_dir.cross(s_dir).normalize_or_zero();
                    Vec3::new(n.x, n.z, -n.y)
                };

                mesh.vertices.extend_from_slice(&[
                    true_size * point.x,
                    true_size * (point.z - half_height),
                    -true_size * point.y,
                ]);
                mesh.normals.extend_from_slice(&normal.to_array());
                mesh.uvs.extend_from_slice(&[1.0 - t, 1.0 - s]);
            }
        }

        let base = (surface * verts_per_row * verts_per_row) as u32;
        let row = verts_per_row as u32;
        for sstep in 0..segments {
            for tstep in 0..segments {
                let v1 = base + sstep * row + tstep;
                let v2 = v1 + 1;
                let v3 = v2 + row;
                let v4 = v1 + row;

                if !is_degenerate(&mesh, v1, v2, v3) {
                    mesh.indices.extend_from_slice(&[v1, v2, v3]);
                }
                if !is_degenerate(&mesh, v1, v3, v4) {
                    mesh.indices.extend_from_slice(&[v1, v3, v4]);
                }
            }
        }
    }

    mesh
}

fn selected_patches(options: &TeapotOptions) -> impl Iterator<Item = usize> {
    let body = if options.body { BODY_PATCHES } else { 0..0 };
    let lid = if options.lid { LID_PATCHES } else { 0..0 };
    let bottom = if options.bottom { BOTTOM_PATCHES } else { 0..0 };
    body.chain(lid).chain(bottom)
}

fn control_points(patch_index: usize, options: &TeapotOptions) -> Patch {
    let indices = &TEAPOT_PATCHES[patch_index];
    let is_lid = LID_PATCHES.contains(&patch_index);

    std::array::from_fn(|r| {
        std::array::from_fn(|c| {
            let [x, y, z] = TEAPOT_VERTICES[indices[r * 4 + c] as usize - 1];
            let mut p = Vec3::new(x, y, z);
            if options.fit_lid && is_lid {
                p.x *= FIT_LID_SCALE;
                p.y *= FIT_LID_SCALE;
            }
            if !options.blinn {
                p.z *= BLINN_SCALE;
            }
            p
        })
    })
}

fn evaluate(patch: &Patch, weights_s: &[f32; 4], weights_t: &[f32; 4]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    for (row, ws) in patch.iter().zip(weights_s) {
        for (p, wt) in row.iter().zip(weights_t) {
            sum += *p * (ws * wt);
        }
    }
    sum
}

fn bernstein(t: f32) -> [f32; 4] {
    let u = 1.0 - t;
    [u * u * u, 3.0 * t * u * u, 3.0 * t * t * u, t * t * t]
}

fn bernstein_derivative(t: f32) -> [f32; 4] {
    let u = 1.0 - t;
    [
        -3.0 * u * u,
        3.0 * u * u - 6.0 * t * u,
        6.0 * t * u - 3.0 * t * t,
        3.0 * t * t,
    ]
}

fn is_degenerate(mesh: &TriangleMesh, a: u32, b: u32, c: u32) -> bool {
    let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
    pa == pb || pb == pc || pa == pc
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: f32 = 300.0;
    const LEVELS: [u32; 12] = [2, 3, 4, 5, 6, 8, 10, 15, 20, 30, 40, 50];

    fn options(segments: u32, bottom: bool, lid: bool, body: bool) -> TeapotOptions {
        TeapotOptions {
            segments,
            bottom,
            lid,
            body,
            fit_lid: false,
            blinn: true,
        }
    }

    fn full(segments: u32) -> TeapotOptions {
        options(segments, true, true, true)
    }

    fn max_abs_x(mesh: &TriangleMesh) -> f32 {
        mesh.vertices
            .chunks_exact(3)
            .map(|p| p[0].abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn every_level_and_part_combination_is_deterministic() {
        for &level in &LEVELS {
            for mask in 0..8u8 {
                let opts = options(level, mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
                let first = generate_teapot(SIZE, &opts);
                let second = generate_teapot(SIZE, &opts);
                assert_eq!(first, second, "level {level} mask {mask}");

                let patches = opts.bottom as usize * 4 + opts.lid as usize * 8 + opts.body as usize * 20;
                let per_patch = (level as usize + 1).pow(2);
                assert_eq!(first.vertex_count(), patches * per_patch);
                assert_eq!(first.normals.len(), first.vertices.len());
                assert_eq!(first.uvs.len(), first.vertex_count() * 2);
                assert_eq!(first.is_empty(), mask == 0);
            }
        }
    }

    #[test]
    fn no_parts_gives_empty_mesh() {
        let mesh = generate_teapot(SIZE, &options(15, false, false, false));
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn indices_stay_in_range_and_skip_collapsed_triangles() {
        let mesh = generate_teapot(SIZE, &full(6));
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));

        for tri in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (mesh.position(tri[0]), mesh.position(tri[1]), mesh.position(tri[2]));
            assert!(a != b && b != c && a != c);
        }

        // lid top and bottom centre collapse one row of every fan patch
        assert!(mesh.triangle_count() < 32 * 6 * 6 * 2);
    }

    #[test]
    fn normals_are_unit_length() {
        let mesh = generate_teapot(SIZE, &full(10));
        for n in mesh.normals.chunks_exact(3) {
            let len = Vec3::new(n[0], n[1], n[2]).length();
            assert!((len - 1.0).abs() < 1e-3, "normal length {len}");
        }
    }

    #[test]
    fn fits_vertical_extent_in_both_bases() {
        for blinn in [true, false] {
            let mut opts = full(8);
            opts.blinn = blinn;
            let mesh = generate_teapot(SIZE, &opts);
            let ys = mesh.vertices.chunks_exact(3).map(|p| p[1]);
            let (min, max) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
            assert!((max - SIZE).abs() < 1e-2, "blinn {blinn}: max {max}");
            assert!((min + SIZE).abs() < 1e-2, "blinn {blinn}: min {min}");
        }
    }

    #[test]
    fn original_basis_is_taller_so_it_renders_narrower() {
        let blinn = generate_teapot(SIZE, &full(8));
        let mut opts = full(8);
        opts.blinn = false;
        let original = generate_teapot(SIZE, &opts);

        assert_eq!(blinn.vertex_count(), original.vertex_count());
        assert!(max_abs_x(&original) < max_abs_x(&blinn));
    }

    #[test]
    fn fit_lid_widens_only_the_lid() {
        let lid = options(8, false, true, false);
        let mut snug = lid;
        snug.fit_lid = true;

        let ratio = max_abs_x(&generate_teapot(SIZE, &snug)) / max_abs_x(&generate_teapot(SIZE, &lid));
        assert!((ratio - FIT_LID_SCALE).abs() < 1e-3, "ratio {ratio}");

        let body = options(8, false, false, true);
        let mut body_snug = body;
        body_snug.fit_lid = true;
        assert_eq!(generate_teapot(SIZE, &body), generate_teapot(SIZE, &body_snug));
    }

    #[test]
    fn lid_knob_normal_points_up() {
        let mesh = generate_teapot(SIZE, &options(4, false, true, false));
        let top = mesh
            .vertices
            .chunks_exact(3)
            .enumerate()
            .max_by(|a, b| a.1[1].total_cmp(&b.1[1]))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(&mesh.normals[top * 3..top * 3 + 3], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn bottom_centre_normal_points_down() {
        let mesh = generate_teapot(SIZE, &options(4, true, false, false));
        let lowest = mesh
            .vertices
            .chunks_exact(3)
            .enumerate()
            .min_by(|a, b| a.1[1].total_cmp(&b.1[1]))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(&mesh.normals[lowest * 3..lowest * 3 + 3], &[0.0, -1.0, 0.0]);
    }

    #[test]
    fn segments_below_two_are_raised() {
        let one = generate_teapot(SIZE, &full(1));
        let two = generate_teapot(SIZE, &full(2));
        assert_eq!(one, two);
    }
}
