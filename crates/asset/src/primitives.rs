//! Built-in geometry that needs no asset file.

use crate::mesh::{MeshData, MeshVertex};

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];

/// (normal, u axis, v axis) per face; `u x v == normal` keeps faces CCW from outside.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
];

/// Two triangles per face as (u, v, color) in [-1, 1] face space.
const FACE_CORNERS: [(f32, f32, [f32; 3]); 6] = [
    (-1.0, -1.0, RED),
    (1.0, -1.0, GREEN),
    (1.0, 1.0, BLUE),
    (1.0, 1.0, BLUE),
    (-1.0, 1.0, YELLOW),
    (-1.0, -1.0, RED),
];

/// Axis-aligned cube centered at the origin, 36 vertices, one color per
/// corner slot, texture coordinates already in image (top-left) space.
pub fn cube(half_extent: f32) -> MeshData {
    let h = half_extent;
    let vertices = FACES
        .iter()
        .flat_map(|&(n, u, v)| {
            FACE_CORNERS.iter().map(move |&(s, t, color)| {
                let position = [
                    h * (n[0] + s * u[0] + t * v[0]),
                    h * (n[1] + s * u[1] + t * v[1]),
                    h * (n[2] + s * u[2] + t * v[2]),
                ];
                let uv = [(s + 1.0) * 0.5, 1.0 - (t + 1.0) * 0.5];
                MeshVertex::new(position, color, uv, n)
            })
        })
        .collect();
    MeshData::new(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn cube_has_twelve_triangles() {
        let mesh = cube(0.5);
        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn vertices_lie_on_their_face() {
        for v in cube(0.5).vertices {
            assert!(v.position.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
            assert!((dot(v.position, v.normal) - 0.5).abs() < 1e-6);
            assert!(v.uv.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let mesh = cube(1.0);
        for tri in mesh.vertices.chunks(3) {
            let e1 = std::array::from_fn(|i| tri[1].position[i] - tri[0].position[i]);
            let e2 = std::array::from_fn(|i| tri[2].position[i] - tri[0].position[i]);
            assert!(dot(cross(e1, e2), tri[0].normal) > 0.0);
        }
    }
}
