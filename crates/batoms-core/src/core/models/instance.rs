use crate::core::elements::Rgba;
use crate::core::geometry::mesh::{MAX_ICO_SUBDIVISIONS, Mesh};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_UV_SEGMENTS: usize = 32;
pub const DEFAULT_UV_RINGS: usize = 16;
pub const DEFAULT_ICO_SUBDIVISIONS: usize = 2;

/// Render proxy shape of a species instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceShape {
    UvSphere { segments: usize, rings: usize },
    IcoSphere { subdivisions: usize },
    Cube,
}

impl Default for InstanceShape {
    fn default() -> Self {
        InstanceShape::UvSphere {
            segments: DEFAULT_UV_SEGMENTS,
            rings: DEFAULT_UV_RINGS,
        }
    }
}

impl InstanceShape {
    pub fn ico_sphere() -> Self {
        InstanceShape::IcoSphere {
            subdivisions: DEFAULT_ICO_SUBDIVISIONS,
        }
    }

    /// Returns `true` if the shape parameters describe a buildable mesh.
    pub fn is_valid(&self) -> bool {
        match *self {
            InstanceShape::UvSphere { segments, rings } => segments >= 3 && rings >= 2,
            InstanceShape::IcoSphere { subdivisions } => {
                (1..=MAX_ICO_SUBDIVISIONS).contains(&subdivisions)
            }
            InstanceShape::Cube => true,
        }
    }

    /// Builds the instance mesh; a cube uses the radius as its edge length.
    pub fn build_mesh(&self, radius: f64) -> Mesh {
        match *self {
            InstanceShape::UvSphere { segments, rings } => Mesh::uv_sphere(radius, segments, rings),
            InstanceShape::IcoSphere { subdivisions } => Mesh::ico_sphere(radius, subdivisions),
            InstanceShape::Cube => Mesh::cube(radius),
        }
    }

    /// Only UV spheres are shaded smooth.
    pub fn is_smooth(&self) -> bool {
        matches!(self, InstanceShape::UvSphere { .. })
    }
}

impl FromStr for InstanceShape {
    type Err = ();

    /// Parses a shape name with default parameters, case-insensitively.
    ///
    /// The numeric aliases `"0"`, `"1"` and `"2"` select UV sphere, ico-sphere and cube.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uv_sphere" | "uv-sphere" | "uvsphere" | "sphere" | "0" => Ok(Self::default()),
            "ico_sphere" | "ico-sphere" | "icosphere" | "1" => Ok(Self::ico_sphere()),
            "cube" | "2" => Ok(InstanceShape::Cube),
            _ => Err(()),
        }
    }
}

impl fmt::Display for InstanceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceShape::UvSphere { segments, rings } => {
                write!(f, "UV_SPHERE({}x{})", segments, rings)
            }
            InstanceShape::IcoSphere { subdivisions } => write!(f, "ICO_SPHERE({})", subdivisions),
            InstanceShape::Cube => f.write_str("CUBE"),
        }
    }
}

/// A named material holding the base colour of one element of a species.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub element: String,
    pub color: Rgba,
}

/// The shared render proxy of a species.
///
/// Material slots follow the element order of the occupancy assignment, so slot 0
/// is always the majority element. Only the registry mutates an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    name: String,
    shape: InstanceShape,
    radius: f64,
    scale: [f64; 3],
    mesh: Mesh,
    materials: Vec<Material>,
}

impl Instance {
    pub(crate) fn new(name: String, shape: InstanceShape, radius: f64, scale: [f64; 3]) -> Self {
        Self {
            name,
            shape,
            radius,
            scale,
            mesh: shape.build_mesh(radius),
            materials: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> InstanceShape {
        self.shape
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn scale(&self) -> [f64; 3] {
        self.scale
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn is_smooth(&self) -> bool {
        self.shape.is_smooth()
    }

    pub fn material_slot(&self, element: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.element == element)
    }

    pub fn material(&self, element: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.element == element)
    }

    /// Rebuilds the mesh unless shape and radius are unchanged.
    ///
    /// Returns `true` if a new mesh was generated.
    pub(crate) fn reshape(&mut self, shape: InstanceShape, radius: f64) -> bool {
        if self.shape == shape && self.radius == radius {
            return false;
        }
        self.shape = shape;
        self.radius = radius;
        self.mesh = shape.build_mesh(radius);
        true
    }

    pub(crate) fn set_scale(&mut self, scale: [f64; 3]) {
        self.scale = scale;
    }

    pub(crate) fn set_materials(&mut self, materials: Vec<Material>) {
        self.materials = materials;
    }

    pub(crate) fn material_mut(&mut self, element: &str) -> Option<&mut Material> {
        self.materials.iter_mut().find(|m| m.element == element)
    }

    pub(crate) fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }
}
