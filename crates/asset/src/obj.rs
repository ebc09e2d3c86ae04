//! Minimal OBJ parser for triangulated meshes with positions, texture
//! coordinates and normals.
//!
//! Supported records: `v x y z`, `vt s t`, `vn x y z` and
//! `f p/t/n p/t/n p/t/n`. Every other record is ignored. Faces must be
//! triangles with all three slots present, and indices are 1-based and must
//! refer to entries declared earlier in the file.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::mesh::{IndexedMeshData, MeshData, MeshVertex, flip_v};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to open OBJ file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read OBJ line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: missing {what}")]
    MissingComponent { line: usize, what: &'static str },
    #[error("line {line}: invalid {what} '{token}'")]
    MalformedNumber {
        line: usize,
        what: &'static str,
        token: String,
    },
    #[error("line {line}: face has {corners} corners, only triangles are supported")]
    NonTriangularFace { line: usize, corners: usize },
    #[error("line {line}: face corner '{token}' is not of the form p/t/n")]
    MalformedCorner { line: usize, token: String },
    #[error("line {line}: {table} index {index} is not a positive 1-based index")]
    InvalidIndex {
        line: usize,
        table: &'static str,
        index: i64,
    },
    #[error("line {line}: {table} index {index} out of range ({len} defined so far)")]
    IndexOutOfRange {
        line: usize,
        table: &'static str,
        index: usize,
        len: usize,
    },
    #[error("OBJ has more unique vertices than a u32 index buffer can address")]
    TooManyVertices,
}

pub type ObjResult<T> = Result<T, ObjError>;

/// Load an OBJ mesh from a file path, one vertex per face corner.
pub fn load_obj_from_path(path: impl AsRef<Path>, color: [f32; 3]) -> ObjResult<MeshData> {
    let path = path.as_ref();
    let mesh = load_obj_from_reader(open(path)?, color)?;
    log::debug!(
        "Loaded OBJ {}: {} vertices ({} triangles)",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R, color: [f32; 3]) -> ObjResult<MeshData> {
    let mut vertices = Vec::new();
    for_each_corner(reader, |corner, tables| {
        vertices.push(tables.vertex(corner, color));
        Ok(())
    })?;
    Ok(MeshData::new(vertices))
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, color: [f32; 3]) -> ObjResult<MeshData> {
    load_obj_from_reader(io::Cursor::new(contents), color)
}

/// Load an OBJ mesh from a file path, deduplicating identical `p/t/n` corners.
pub fn load_obj_indexed_from_path(
    path: impl AsRef<Path>,
    color: [f32; 3],
) -> ObjResult<IndexedMeshData> {
    let path = path.as_ref();
    let mesh = load_obj_indexed_from_reader(open(path)?, color)?;
    log::debug!(
        "Loaded indexed OBJ {}: {} unique vertices, {} indices",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

pub fn load_obj_indexed_from_reader<R: BufRead>(
    reader: R,
    color: [f32; 3],
) -> ObjResult<IndexedMeshData> {
    let mut unique: HashMap<Corner, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for_each_corner(reader, |corner, tables| {
        let index = match unique.get(&corner) {
            Some(&idx) => idx,
            None => {
                let idx = u32::try_from(vertices.len()).map_err(|_| ObjError::TooManyVertices)?;
                vertices.push(tables.vertex(corner, color));
                unique.insert(corner, idx);
                idx
            }
        };
        indices.push(index);
        Ok(())
    })?;

    Ok(IndexedMeshData::new(vertices, indices))
}

pub fn load_obj_indexed_from_str(contents: &str, color: [f32; 3]) -> ObjResult<IndexedMeshData> {
    load_obj_indexed_from_reader(io::Cursor::new(contents), color)
}

fn open(path: &Path) -> ObjResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ObjError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Zero-based `(position, texcoord, normal)` indices of one face corner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct Corner {
    position: usize,
    texcoord: usize,
    normal: usize,
}

/// Attribute tables, filled in file order.
#[derive(Default)]
struct Tables {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

impl Tables {
    /// Corners are resolved against the tables before they are emitted.
    fn vertex(&self, corner: Corner, color: [f32; 3]) -> MeshVertex {
        let [s, t] = self.texcoords[corner.texcoord];
        MeshVertex::new(
            self.positions[corner.position],
            color,
            [s, flip_v(t)],
            self.normals[corner.normal],
        )
    }
}

/// Streams `reader` and hands every resolved face corner to `emit`, in face order.
fn for_each_corner<R, F>(reader: R, mut emit: F) -> ObjResult<()>
where
    R: BufRead,
    F: FnMut(Corner, &Tables) -> ObjResult<()>,
{
    let mut tables = Tables::default();

    // Raw lines: exporters put Latin-1 names and comments in ignored records.
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let line_no = idx + 1;
        let raw = raw.map_err(|source| ObjError::Read {
            line: line_no,
            source,
        })?;
        let line = String::from_utf8_lossy(&raw);

        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                tables.positions.push([x, y, z]);
            }
            "vt" => {
                let s = parse_f32(parts.next(), line_no, "s coordinate")?;
                let t = parse_f32(parts.next(), line_no, "t coordinate")?;
                tables.texcoords.push([s, t]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                tables.normals.push([nx, ny, nz]);
            }
            "f" => {
                let tokens: Vec<&str> = parts.collect();
                if tokens.len() != 3 {
                    return Err(ObjError::NonTriangularFace {
                        line: line_no,
                        corners: tokens.len(),
                    });
                }
                // Resolve the whole face first so a bad corner emits nothing.
                let mut corners = [Corner {
                    position: 0,
                    texcoord: 0,
                    normal: 0,
                }; 3];
                for (slot, token) in corners.iter_mut().zip(&tokens) {
                    *slot = parse_corner(token, &tables, line_no)?;
                }
                for corner in corners {
                    emit(corner, &tables)?;
                }
            }
            _ => {
                // Comments, o/g/s/usemtl/mtllib and anything else.
            }
        }
    }

    Ok(())
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &'static str) -> ObjResult<f32> {
    let token = value.ok_or(ObjError::MissingComponent {
        line: line_no,
        what,
    })?;
    token.parse::<f32>().map_err(|_| ObjError::MalformedNumber {
        line: line_no,
        what,
        token: token.to_owned(),
    })
}

fn parse_corner(token: &str, tables: &Tables, line_no: usize) -> ObjResult<Corner> {
    let malformed = || ObjError::MalformedCorner {
        line: line_no,
        token: token.to_owned(),
    };

    let mut split = token.split('/');
    let (Some(p), Some(t), Some(n), None) = (split.next(), split.next(), split.next(), split.next())
    else {
        return Err(malformed());
    };
    if p.is_empty() || t.is_empty() || n.is_empty() {
        return Err(malformed());
    }

    Ok(Corner {
        position: resolve_index(p, "position", tables.positions.len(), line_no)?,
        texcoord: resolve_index(t, "texcoord", tables.texcoords.len(), line_no)?,
        normal: resolve_index(n, "normal", tables.normals.len(), line_no)?,
    })
}

fn resolve_index(token: &str, table: &'static str, len: usize, line_no: usize) -> ObjResult<usize> {
    let raw = token.parse::<i64>().map_err(|_| ObjError::MalformedNumber {
        line: line_no,
        what: table,
        token: token.to_owned(),
    })?;
    if raw <= 0 {
        return Err(ObjError::InvalidIndex {
            line: line_no,
            table,
            index: raw,
        });
    }

    let index = raw as usize;
    if index > len {
        return Err(ObjError::IndexOutOfRange {
            line: line_no,
            table,
            index,
            len,
        });
    }
    Ok(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FLOATS_PER_VERTEX;

    const CYAN: [f32; 3] = [0.0, 1.0, 1.0];

    /// 8 positions, 8 normals, 4 texcoords, 2 faces.
    const TWO_FACES: &str = r#"
        # two triangles of a unit cube
        o Cube
        v -0.5 -0.5  0.5
        v  0.5 -0.5  0.5
        v  0.5  0.5  0.5
        v -0.5  0.5  0.5
        v -0.5 -0.5 -0.5
        v  0.5 -0.5 -0.5
        v  0.5  0.5 -0.5
        v -0.5  0.5 -0.5
        vt 0.0 0.0
        vt 1.0 0.0
        vt 1.0 1.0
        vt 0.0 0.25
        vn 0.0 0.0 1.0
        vn 0.0 0.0 -1.0
        vn 1.0 0.0 0.0
        vn -1.0 0.0 0.0
        vn 0.0 1.0 0.0
        vn 0.0 -1.0 0.0
        vn 0.0 0.0 1.0
        vn 0.0 0.0 1.0
        s off
        f 1/1/1 2/2/1 3/3/1
        f 3/3/1 4/4/1 1/1/1
    "#;

    #[test]
    fn two_faces_yield_six_vertices() {
        let mesh = load_obj_from_str(TWO_FACES, CYAN).expect("parse two faces");
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.interleaved().len(), 6 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn every_vertex_carries_flat_color() {
        let color = [0.2, 0.4, 0.6];
        let mesh = load_obj_from_str(TWO_FACES, color).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.color == color));
    }

    #[test]
    fn corners_emitted_in_face_order_with_flipped_v() {
        let mesh = load_obj_from_str(TWO_FACES, CYAN).unwrap();
        let v = &mesh.vertices;
        assert_eq!(v[0].position, [-0.5, -0.5, 0.5]);
        assert_eq!(v[2].position, [0.5, 0.5, 0.5]);
        assert_eq!(v[3].position, [0.5, 0.5, 0.5]);
        assert_eq!(v[0].uv, [0.0, 1.0]);
        assert_eq!(v[2].uv, [1.0, 0.0]);
        assert_eq!(v[4].uv, [0.0, 0.75]);
        assert_eq!(v[1].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn vertex_count_is_three_per_face() {
        let mut src = String::from("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\n");
        for faces in 1..=5 {
            src.push_str("f 1/1/1 2/1/1 3/1/1\n");
            let mesh = load_obj_from_str(&src, CYAN).unwrap();
            assert_eq!(mesh.vertex_count(), faces * 3);
        }
    }

    #[test]
    fn indexed_variant_deduplicates_shared_corners() {
        let mesh = load_obj_indexed_from_str(TWO_FACES, CYAN).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(mesh.expand(), load_obj_from_str(TWO_FACES, CYAN).unwrap());
    }

    #[test]
    fn non_utf8_in_ignored_records_is_skipped() {
        let mut src = b"# Cubo - v\xe9rtices\r\no Cubo_\xe1rea\r\n".to_vec();
        src.extend_from_slice(TWO_FACES.as_bytes());
        let mesh = load_obj_from_reader(src.as_slice(), CYAN).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn non_utf8_in_data_records_is_malformed() {
        let src = b"v 0.0 0.\xff 1.0\n";
        let err = load_obj_from_reader(&src[..], CYAN).unwrap_err();
        assert!(matches!(err, ObjError::MalformedNumber { line: 1, .. }), "{err}");
    }

    #[test]
    fn empty_input_is_an_empty_mesh() {
        let mesh = load_obj_from_str("# nothing\n\ng group\n", CYAN).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn quads_are_rejected() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 1/1/1 1/1/1 1/1/1\n";
        let err = load_obj_from_str(src, CYAN).unwrap_err();
        assert!(matches!(err, ObjError::NonTriangularFace { line: 4, corners: 4 }));
    }

    #[test]
    fn missing_slots_are_rejected() {
        for corner in ["1//1", "1/1", "1", "1/1/1/1"] {
            let src = format!("v 0 0 0\nvt 0 0\nvn 0 0 1\nf {corner} {corner} {corner}\n");
            let err = load_obj_from_str(&src, CYAN).unwrap_err();
            assert!(
                matches!(err, ObjError::MalformedCorner { line: 4, .. }),
                "{corner}: {err}"
            );
        }
    }

    #[test]
    fn forward_references_are_out_of_range() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 1/1/1\nv 1 1 1\n";
        let err = load_obj_from_str(src, CYAN).unwrap_err();
        assert!(matches!(
            err,
            ObjError::IndexOutOfRange {
                line: 4,
                table: "position",
                index: 2,
                len: 1
            }
        ));
    }

    #[test]
    fn zero_and_negative_indices_are_rejected() {
        let zero = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/0/1 1/1/1 1/1/1\n";
        assert!(matches!(
            load_obj_from_str(zero, CYAN).unwrap_err(),
            ObjError::InvalidIndex { table: "texcoord", index: 0, .. }
        ));
        let negative = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/-1 1/1/1 1/1/1\n";
        assert!(matches!(
            load_obj_from_str(negative, CYAN).unwrap_err(),
            ObjError::InvalidIndex { table: "normal", index: -1, .. }
        ));
    }

    #[test]
    fn bad_numbers_report_line() {
        let err = load_obj_from_str("v 0 0 0\nv 1 nope 0\n", CYAN).unwrap_err();
        assert!(matches!(err, ObjError::MalformedNumber { line: 2, .. }));
        let err = load_obj_from_str("vn 0 1\n", CYAN).unwrap_err();
        assert!(matches!(err, ObjError::MissingComponent { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("cubeview-does-not-exist.obj");
        let err = load_obj_from_path(&path, CYAN).unwrap_err();
        assert!(matches!(err, ObjError::Io { .. }));
        assert!(err.to_string().contains("cubeview-does-not-exist.obj"));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("cubeview-two-faces-{}.obj", std::process::id()));
        std::fs::write(&path, TWO_FACES).unwrap();
        let mesh = load_obj_from_path(&path, CYAN);
        let indexed = load_obj_indexed_from_path(&path, CYAN);
        std::fs::remove_file(&path).ok();
        assert_eq!(mesh.unwrap().vertex_count(), 6);
        assert_eq!(indexed.unwrap().indices.len(), 6);
    }
}
