use std::fs::File;
use std::io::BufReader;

use obj::{load_obj, Obj, ObjError, Position};
use thiserror::Error;

use super::math::{Mat4, Vec3};
use super::shape::Triangle;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("cannot open mesh file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse mesh file: {0}")]
    Parse(#[from] ObjError),
}

/// Loads a wavefront obj file and yields one triangle per face, with every
/// vertex carried through the given affine transform.
pub fn import_mesh(filename: &str, transform: &Mat4) -> Result<Vec<Triangle>, MeshError> {
    let input = BufReader::new(File::open(filename)?);
    // only positions are read, normals come from the triangle geometry
    let model: Obj<Position> = load_obj(input)?;
    let mut triangles = Vec::with_capacity(model.indices.len() / 3);
    for face in model.indices.chunks_exact(3) {
        let mut verts = [Vec3::zero(); 3];
        for (corner, index) in face.iter().enumerate() {
            let position: Vec3 = model.vertices[*index as usize].position.into();
            verts[corner] = transform.transform_pt(position);
        }
        triangles.push(Triangle::new(verts[0], verts[1], verts[2]));
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracing::shape::Shape;
    use std::io::Write;

    fn write_quad_obj() -> std::path::PathBuf {
        let path = std::env::temp_dir().join("octray_quad_test.obj");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n"
        )
        .unwrap();
        path
    }

    #[test]
    fn imports_transformed_triangles() {
        let path = write_quad_obj();
        let transform = Mat4::translate(Vec3::new(0.0, 0.0, 2.0));
        let triangles = import_mesh(path.to_str().unwrap(), &transform).unwrap();
        assert_eq!(triangles.len(), 2);
        for triangle in &triangles {
            let extents = triangle.extents();
            assert!((extents.min.z - 2.0).abs() < 1e-6);
            assert!((extents.max.z - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_file_reports_io_error() {
        let result = import_mesh("definitely_not_here.obj", &Mat4::identity());
        assert!(matches!(result, Err(MeshError::Io(_))));
    }
}
