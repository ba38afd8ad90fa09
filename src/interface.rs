//! Description of a mortar interface: two independently discretized face sets.

use crate::fields::{DisplacementField, Side};
use crate::Real;
use eyre::{bail, ensure};
use nalgebra::{Point2, Scalar, Vector2};
use serde::{Deserialize, Serialize};

/// A set of 2-node faces over a shared vertex array, describing one side of a mortar
/// interface as a (possibly disconnected) polyline embedded in 2D.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMesh<T: Scalar> {
    vertices: Vec<Point2<T>>,
    faces: Vec<[usize; 2]>,
}

impl<T: Real> FaceMesh<T> {
    /// Constructs a face mesh, eagerly validating the connectivity.
    ///
    /// Face vertex indices must be in bounds and distinct, and no face may have zero
    /// length.
    pub fn from_vertices_and_faces(
        vertices: Vec<Point2<T>>,
        faces: Vec<[usize; 2]>,
    ) -> eyre::Result<Self> {
        for (face_index, face) in faces.iter().enumerate() {
            for &vertex in face {
                ensure!(
                    vertex < vertices.len(),
                    "face {} references out-of-bounds vertex {}",
                    face_index,
                    vertex
                );
            }
            ensure!(
                face[0] != face[1],
                "face {} references the same vertex twice",
                face_index
            );
            let length = (vertices[face[1]] - vertices[face[0]]).norm();
            ensure!(length > T::zero(), "face {} has zero length", face_index);
        }
        Ok(Self { vertices, faces })
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 2]] {
        &self.faces
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn face_vertices(&self, face_index: usize) -> [Point2<T>; 2] {
        let [a, b] = self.faces[face_index];
        [self.vertices[a], self.vertices[b]]
    }

    pub fn face_length(&self, face_index: usize) -> T {
        let [a, b] = self.face_vertices(face_index);
        (b - a).norm()
    }

    /// Unit tangent of the face, oriented from its first to its second vertex.
    pub fn face_tangent(&self, face_index: usize) -> Vector2<T> {
        let [a, b] = self.face_vertices(face_index);
        (b - a).normalize()
    }

    /// Outward unit normal of the face: the tangent rotated 90 degrees
    /// counter-clockwise.
    pub fn face_normal(&self, face_index: usize) -> Vector2<T> {
        let t = self.face_tangent(face_index);
        Vector2::new(-t.y, t.x)
    }

    /// Averaged, normalized per-vertex normals.
    ///
    /// Each vertex normal is the normalized sum of the normals of its adjacent faces.
    /// Vertices with no adjacent face get a zero normal. Adjacent faces whose normals
    /// cancel exactly make the interface geometry unusable for mortar projection and are
    /// reported as an error.
    pub fn nodal_normals(&self) -> eyre::Result<Vec<Vector2<T>>> {
        let mut normals = vec![Vector2::zeros(); self.vertices.len()];
        for face_index in 0..self.faces.len() {
            let n = self.face_normal(face_index);
            for &vertex in &self.faces[face_index] {
                normals[vertex] += n;
            }
        }
        let mut touched = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &vertex in face {
                touched[vertex] = true;
            }
        }
        for (vertex, normal) in normals.iter_mut().enumerate() {
            if !touched[vertex] {
                continue;
            }
            let norm = normal.norm();
            if norm <= T::default_epsilon() {
                bail!(
                    "degenerate nodal normal at vertex {}: adjacent face normals cancel",
                    vertex
                );
            }
            *normal /= norm;
        }
        Ok(normals)
    }

    /// The mesh in its displaced configuration: each vertex moved by the current
    /// displacement of the corresponding interface node.
    pub fn displaced(&self, side: Side, displacement: &dyn DisplacementField<T>) -> Self {
        let vertices = self
            .vertices
            .iter()
            .enumerate()
            .map(|(node, x)| {
                let u = Vector2::new(
                    displacement.value(side, node, 0),
                    displacement.value(side, node, 1),
                );
                x + u
            })
            .collect();
        Self {
            vertices,
            faces: self.faces.clone(),
        }
    }
}

/// A constrained interface: a secondary face set carrying the multiplier variable, and a
/// primary face set it is tied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortarInterface<T: Scalar> {
    pub secondary: FaceMesh<T>,
    pub primary: FaceMesh<T>,
}

impl<T: Real> MortarInterface<T> {
    pub fn new(secondary: FaceMesh<T>, primary: FaceMesh<T>) -> Self {
        Self { secondary, primary }
    }

    /// Both sides in their displaced configurations.
    pub fn displaced(&self, displacement: &dyn DisplacementField<T>) -> Self {
        Self {
            secondary: self.secondary.displaced(Side::Secondary, displacement),
            primary: self.primary.displaced(Side::Primary, displacement),
        }
    }
}
