use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::f64::consts::PI;

// https://schneide.blog/2016/07/15/generating-an-icosphere-in-c/
const ICO_Z: f64 = 0.850650808352039932;
const ICO_X: f64 = 0.525731112119133606;

/// Finest ico-sphere subdivision level the generator will build.
pub const MAX_ICO_SUBDIVISIONS: usize = 10;

const ICO_VERTICES: [[f64; 3]; 12] = [
    [-ICO_X, ICO_Z, 0.0],
    [ICO_X, ICO_Z, 0.0],
    [-ICO_X, -ICO_Z, 0.0],
    [ICO_X, -ICO_Z, 0.0],
    [0.0, -ICO_X, ICO_Z],
    [0.0, ICO_X, ICO_Z],
    [0.0, -ICO_X, -ICO_Z],
    [0.0, ICO_X, -ICO_Z],
    [ICO_Z, 0.0, -ICO_X],
    [ICO_Z, 0.0, ICO_X],
    [-ICO_Z, 0.0, -ICO_X],
    [-ICO_Z, 0.0, ICO_X],
];

const ICO_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// A polygon mesh with one material slot index per face.
///
/// Faces are stored as vertex index loops, wound counter-clockwise when seen from
/// outside, so that [`Mesh::face_normals`] points outwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Vec<usize>>,
    material_indices: Vec<usize>,
}

impl Mesh {
    /// Creates a mesh with every face assigned to material slot 0.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Self {
        let material_indices = vec![0; faces.len()];
        Self {
            vertices,
            faces,
            material_indices,
        }
    }

    /// Builds a UV sphere centred on the origin.
    ///
    /// The sphere has `segments` meridians and `rings` latitude bands: triangle fans
    /// around both poles and quads everywhere else, giving `segments * rings` faces.
    /// Degenerate requests are raised to the minimum of 3 segments and 2 rings.
    pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> Self {
        let (segments, rings) = (segments.max(3), rings.max(2));
        let mut vertices = Vec::with_capacity(segments * (rings - 1) + 2);
        vertices.push(Point3::new(0.0, 0.0, radius));
        for ring in 1..rings {
            let theta = PI * ring as f64 / rings as f64;
            let (z, rho) = (radius * theta.cos(), radius * theta.sin());
            for segment in 0..segments {
                let phi = 2.0 * PI * segment as f64 / segments as f64;
                vertices.push(Point3::new(rho * phi.cos(), rho * phi.sin(), z));
            }
        }
        let bottom = vertices.len();
        vertices.push(Point3::new(0.0, 0.0, -radius));

        let ring_vertex =
            |ring: usize, segment: usize| 1 + (ring - 1) * segments + segment % segments;

        let mut faces = Vec::with_capacity(segments * rings);
        for segment in 0..segments {
            faces.push(vec![0, ring_vertex(1, segment), ring_vertex(1, segment + 1)]);
        }
        for ring in 1..rings - 1 {
            for segment in 0..segments {
                faces.push(vec![
                    ring_vertex(ring, segment),
                    ring_vertex(ring + 1, segment),
                    ring_vertex(ring + 1, segment + 1),
                    ring_vertex(ring, segment + 1),
                ]);
            }
        }
        for segment in 0..segments {
            faces.push(vec![
                ring_vertex(rings - 1, segment),
                bottom,
                ring_vertex(rings - 1, segment + 1),
            ]);
        }

        Self::new(vertices, faces)
    }

    /// Builds an ico-sphere centred on the origin.
    ///
    /// One subdivision is the bare icosahedron; every further level splits each
    /// triangle into four and projects the new vertices back onto the sphere. The level
    /// is clamped to `1..=MAX_ICO_SUBDIVISIONS`.
    pub fn ico_sphere(radius: f64, subdivisions: usize) -> Self {
        let subdivisions = subdivisions.clamp(1, MAX_ICO_SUBDIVISIONS);
        let mut vertices: Vec<Vector3<f64>> = ICO_VERTICES
            .iter()
            .map(|v| Vector3::new(v[0], v[1], v[2]).normalize())
            .collect();
        let mut faces: Vec<[usize; 3]> = ICO_FACES.to_vec();

        for _ in 1..subdivisions {
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vector3<f64>>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    vertices.push(((vertices[a] + vertices[b]) * 0.5).normalize());
                    vertices.len() - 1
                })
            };

            let mut refined = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                refined.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
            }
            faces = refined;
        }

        let vertices = vertices
            .into_iter()
            .map(|v| Point3::from(v * radius))
            .collect();
        let faces = faces.into_iter().map(|f| f.to_vec()).collect();
        Self::new(vertices, faces)
    }

    /// Builds an axis-aligned cube with edge length `size`, centred on the origin.
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let vertices = (0..8)
            .map(|i| {
                let coord = |bit: usize| if (i & bit) != 0 { h } else { -h };
                Point3::new(coord(1), coord(2), coord(4))
            })
            .collect();
        let faces = vec![
            vec![0, 2, 3, 1],
            vec![4, 5, 7, 6],
            vec![0, 1, 5, 4],
            vec![2, 6, 7, 3],
            vec![0, 4, 6, 2],
            vec![1, 3, 7, 5],
        ];
        Self::new(vertices, faces)
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn material_indices(&self) -> &[usize] {
        &self.material_indices
    }

    /// Replaces the per-face material slot indices.
    ///
    /// # Return
    ///
    /// Returns `None` (and leaves the mesh untouched) if `indices` does not have one
    /// entry per face.
    pub fn set_material_indices(&mut self, indices: Vec<usize>) -> Option<()> {
        if indices.len() != self.faces.len() {
            return None;
        }
        self.material_indices = indices;
        Some(())
    }

    /// Assigns every face the material slot `slot_for` picks from its outward normal.
    pub fn assign_materials_by_normal<F>(&mut self, slot_for: F)
    where
        F: Fn(&Vector3<f64>) -> usize,
    {
        self.material_indices = self.face_normals().iter().map(slot_for).collect();
    }

    /// Unit outward normals of every face, computed with Newell's method.
    ///
    /// Degenerate faces yield a zero vector.
    pub fn face_normals(&self) -> Vec<Vector3<f64>> {
        self.faces
            .iter()
            .map(|face| {
                let mut normal = Vector3::zeros();
                for (i, &current) in face.iter().enumerate() {
                    let a = &self.vertices[current];
                    let b = &self.vertices[face[(i + 1) % face.len()]];
                    normal.x += (a.y - b.y) * (a.z + b.z);
                    normal.y += (a.z - b.z) * (a.x + b.x);
                    normal.z += (a.x - b.x) * (a.y + b.y);
                }
                normal.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
            })
            .collect()
    }

    /// Number of faces assigned to each material slot, indexed by slot.
    pub fn material_face_counts(&self, slots: usize) -> Vec<usize> {
        let mut counts = vec![0; slots];
        for &index in &self.material_indices {
            if let Some(count) = counts.get_mut(index) {
                *count += 1;
            }
        }
        counts
    }
}
