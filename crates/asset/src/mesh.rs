//! CPU-side mesh representation used by loaders.

use bytemuck::{Pod, Zeroable};

/// Floats per interleaved vertex: position(3) + color(3) + uv(2) + normal(3).
pub const FLOATS_PER_VERTEX: usize = 11;

/// Interleaved vertex record, laid out exactly as uploaded to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], color: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            color,
            uv,
            normal,
        }
    }

    pub fn to_array(&self) -> [f32; FLOATS_PER_VERTEX] {
        let [px, py, pz] = self.position;
        let [r, g, b] = self.color;
        let [u, v] = self.uv;
        let [nx, ny, nz] = self.normal;
        [px, py, pz, r, g, b, u, v, nx, ny, nz]
    }
}

/// Flip a texture `v` coordinate between bottom-left (OBJ) and top-left
/// (image rows) origins.
#[inline]
pub fn flip_v(v: f32) -> f32 {
    1.0 - v
}

/// Non-indexed triangle list: every three vertices form one triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>) -> Self {
        Self { vertices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Flat `f32` stream with [`FLOATS_PER_VERTEX`] floats per vertex.
    pub fn interleaved(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(MeshVertex::to_array).collect()
    }
}

/// Indexed triangle mesh with deduplicated vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedMeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl IndexedMeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Expand back into a face-corner stream.
    pub fn expand(&self) -> MeshData {
        MeshData::new(
            self.indices
                .iter()
                .map(|&i| self.vertices[i as usize])
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_is_eleven_floats() {
        assert_eq!(
            std::mem::size_of::<MeshVertex>(),
            FLOATS_PER_VERTEX * std::mem::size_of::<f32>()
        );
    }

    #[test]
    fn interleaved_matches_pod_layout() {
        let mesh = MeshData::new(vec![
            MeshVertex::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3], [0.5, 0.25], [0.0, 1.0, 0.0]),
            MeshVertex::default(),
            MeshVertex::default(),
        ]);
        let flat = mesh.interleaved();
        assert_eq!(flat.len(), 3 * FLOATS_PER_VERTEX);
        assert_eq!(flat.as_slice(), bytemuck::cast_slice::<MeshVertex, f32>(&mesh.vertices));
        assert_eq!(&flat[..FLOATS_PER_VERTEX], &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 0.5, 0.25, 0.0, 1.0, 0.0]);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn flip_is_involutive() {
        for t in [0.0_f32, 0.25, 0.5, 0.875, 1.0] {
            assert_eq!(flip_v(flip_v(t)), t);
        }
        assert_eq!(flip_v(0.25), 0.75);
    }

    #[test]
    fn indexed_mesh_validity() {
        let data = IndexedMeshData::new(vec![MeshVertex::default()], vec![0, 0, 0]);
        assert!(data.is_valid());
        assert_eq!(data.expand().vertex_count(), 3);
        assert!(!IndexedMeshData::default().is_valid());
    }
}
