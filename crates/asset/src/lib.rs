//! Asset loading/parsers (meshes, textures, shaders).
//! OBJ loader producing interleaved or indexed mesh data, a built-in cube,
//! image textures (RGB/RGBA) and WGSL sources read from disk.

pub mod mesh;
pub mod obj;
pub mod primitives;
pub mod shader;
pub mod texture;

pub use mesh::{FLOATS_PER_VERTEX, IndexedMeshData, MeshData, MeshVertex};
pub use obj::ObjError;
pub use texture::{TextureData, TextureFormat};
