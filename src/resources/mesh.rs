//! Face lists for the imported meshes.
//!
//! Loaders keep the arity they find in the file. Triangles stay triangles, points and lines
//! become one- and two-index faces, and the scene-graph builder rejects anything that is not a
//! triangle. Strips and fans are decoded into the triangles they describe.

use gltf::mesh::Mode;

/// Groups a glTF primitive's index stream into faces according to its draw mode.
pub fn gltf_faces(mode: Mode, indices: &[u32]) -> Vec<Vec<u32>> {
    match mode {
        Mode::Triangles => indices.chunks(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    vec![w[0], w[1], w[2]]
                } else {
                    vec![w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&hub, rest)) => rest.windows(2).map(|w| vec![hub, w[0], w[1]]).collect(),
            None => Vec::new(),
        },
        Mode::Lines | Mode::LineStrip | Mode::LineLoop => {
            indices.chunks(2).map(<[u32]>::to_vec).collect()
        }
        Mode::Points => indices.chunks(1).map(<[u32]>::to_vec).collect(),
    }
}

/// Splits a `tobj` index list using its per-face arities. An empty arity list means every
/// face is a triangle.
pub fn obj_faces(indices: &[u32], face_arities: &[u32]) -> Vec<Vec<u32>> {
    if face_arities.is_empty() {
        return indices.chunks(3).map(<[u32]>::to_vec).collect();
    }
    let mut faces = Vec::with_capacity(face_arities.len());
    let mut start = 0;
    for &arity in face_arities {
        let end = (start + arity as usize).min(indices.len());
        faces.push(indices[start..end].to_vec());
        start = end;
    }
    faces
}
