use crate::core::geometry::mesh::Mesh;
use crate::core::geometry::placement::Placement;
use crate::core::models::attributes::AttributeColumn;
use crate::core::models::instance::Material;
use crate::core::models::timeline::Keypoint;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("Object '{0}' already exists")]
    ObjectExists(String),
    #[error("Object '{0}' does not exist")]
    ObjectNotFound(String),
    #[error("Object '{object}' has no attribute '{name}'")]
    AttributeNotFound { object: String, name: String },
    #[error("Object '{object}' has {expected} vertices but {found} values were given")]
    LengthMismatch {
        object: String,
        expected: usize,
        found: usize,
    },
}

/// Scene operations the host application provides.
///
/// Objects are addressed by name. Positions are per-vertex and local to the object;
/// attributes are per-vertex columns.
pub trait SceneBackend {
    fn has_object(&self, name: &str) -> bool;

    /// Creates an empty mesh-backed object.
    ///
    /// # Errors
    ///
    /// Fails with [`BackendError::ObjectExists`] if the name is taken.
    fn create_object(&mut self, name: &str) -> Result<(), BackendError>;

    fn remove_object(&mut self, name: &str) -> Result<(), BackendError>;

    /// Names of the objects instanced on `parent`, sorted.
    fn children(&self, parent: &str) -> Vec<String>;

    fn set_transform(&mut self, object: &str, placement: &Placement) -> Result<(), BackendError>;

    /// Replaces the vertices of an object, resizing every attribute to match.
    fn write_positions(
        &mut self,
        object: &str,
        positions: &[Point3<f64>],
    ) -> Result<(), BackendError>;

    fn read_positions(&self, object: &str) -> Result<Vec<Point3<f64>>, BackendError>;

    fn write_attribute(
        &mut self,
        object: &str,
        name: &str,
        values: &AttributeColumn,
    ) -> Result<(), BackendError>;

    fn read_attribute(&self, object: &str, name: &str) -> Result<AttributeColumn, BackendError>;

    /// Names of every attribute stored on an object, sorted.
    fn attribute_names(&self, object: &str) -> Result<Vec<String>, BackendError>;

    fn remove_attribute(&mut self, object: &str, name: &str) -> Result<(), BackendError>;

    /// Stores frame `frame` as a shape key with its blend weight keyframes.
    fn write_shape_key(
        &mut self,
        object: &str,
        frame: usize,
        positions: &[Point3<f64>],
        keypoints: &[Keypoint],
    ) -> Result<(), BackendError>;

    /// Creates a material, or updates the colour of an existing one.
    fn create_material(&mut self, material: &Material) -> Result<(), BackendError>;

    /// Replaces the mesh of an object; `materials` names the material of each slot.
    fn write_mesh(
        &mut self,
        object: &str,
        mesh: &Mesh,
        materials: &[String],
        smooth: bool,
    ) -> Result<(), BackendError>;

    /// Instances `child` on every vertex of `parent`.
    fn set_parent(&mut self, child: &str, parent: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKey {
    pub positions: Vec<Point3<f64>>,
    pub keypoints: Vec<Keypoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMesh {
    pub mesh: Mesh,
    pub materials: Vec<String>,
    pub smooth: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneObject {
    pub transform: Placement,
    pub positions: Vec<Point3<f64>>,
    pub attributes: BTreeMap<String, AttributeColumn>,
    pub shape_keys: BTreeMap<usize, ShapeKey>,
    pub mesh: Option<InstancedMesh>,
    pub parent: Option<String>,
}

/// A [`SceneBackend`] keeping everything in memory, for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScene {
    objects: HashMap<String, SceneObject>,
    materials: HashMap<String, Material>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn object_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.objects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    fn object_mut(&mut self, name: &str) -> Result<&mut SceneObject, BackendError> {
        self.objects
            .get_mut(name)
            .ok_or_else(|| BackendError::ObjectNotFound(name.to_string()))
    }

    fn get(&self, name: &str) -> Result<&SceneObject, BackendError> {
        self.objects
            .get(name)
            .ok_or_else(|| BackendError::ObjectNotFound(name.to_string()))
    }
}

impl SceneBackend for InMemoryScene {
    fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    fn create_object(&mut self, name: &str) -> Result<(), BackendError> {
        if self.objects.contains_key(name) {
            return Err(BackendError::ObjectExists(name.to_string()));
        }
        self.objects.insert(name.to_string(), SceneObject::default());
        Ok(())
    }

    fn remove_object(&mut self, name: &str) -> Result<(), BackendError> {
        self.objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::ObjectNotFound(name.to_string()))
    }

    fn children(&self, parent: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent.as_deref() == Some(parent))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    fn set_transform(&mut self, object: &str, placement: &Placement) -> Result<(), BackendError> {
        self.object_mut(object)?.transform = *placement;
        Ok(())
    }

    fn write_positions(
        &mut self,
        object: &str,
        positions: &[Point3<f64>],
    ) -> Result<(), BackendError> {
        let target = self.object_mut(object)?;
        target.positions = positions.to_vec();
        for column in target.attributes.values_mut() {
            if column.len() > positions.len() {
                column.retain(&vec![true; positions.len()]);
            } else {
                column.pad_to(positions.len());
            }
        }
        target.shape_keys.clear();
        Ok(())
    }

    fn read_positions(&self, object: &str) -> Result<Vec<Point3<f64>>, BackendError> {
        Ok(self.get(object)?.positions.clone())
    }

    fn write_attribute(
        &mut self,
        object: &str,
        name: &str,
        values: &AttributeColumn,
    ) -> Result<(), BackendError> {
        let target = self.object_mut(object)?;
        if values.len() != target.positions.len() {
            return Err(BackendError::LengthMismatch {
                object: object.to_string(),
                expected: target.positions.len(),
                found: values.len(),
            });
        }
        target.attributes.insert(name.to_string(), values.clone());
        Ok(())
    }

    fn read_attribute(&self, object: &str, name: &str) -> Result<AttributeColumn, BackendError> {
        self.get(object)?
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::AttributeNotFound {
                object: object.to_string(),
                name: name.to_string(),
            })
    }

    fn attribute_names(&self, object: &str) -> Result<Vec<String>, BackendError> {
        Ok(self.get(object)?.attributes.keys().cloned().collect())
    }

    fn remove_attribute(&mut self, object: &str, name: &str) -> Result<(), BackendError> {
        self.object_mut(object)?
            .attributes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::AttributeNotFound {
                object: object.to_string(),
                name: name.to_string(),
            })
    }

    fn write_shape_key(
        &mut self,
        object: &str,
        frame: usize,
        positions: &[Point3<f64>],
        keypoints: &[Keypoint],
    ) -> Result<(), BackendError> {
        let target = self.object_mut(object)?;
        if positions.len() != target.positions.len() {
            return Err(BackendError::LengthMismatch {
                object: object.to_string(),
                expected: target.positions.len(),
                found: positions.len(),
            });
        }
        target.shape_keys.insert(
            frame,
            ShapeKey {
                positions: positions.to_vec(),
                keypoints: keypoints.to_vec(),
            },
        );
        Ok(())
    }

    fn create_material(&mut self, material: &Material) -> Result<(), BackendError> {
        self.materials
            .insert(material.name.clone(), material.clone());
        Ok(())
    }

    fn write_mesh(
        &mut self,
        object: &str,
        mesh: &Mesh,
        materials: &[String],
        smooth: bool,
    ) -> Result<(), BackendError> {
        self.object_mut(object)?.mesh = Some(InstancedMesh {
            mesh: mesh.clone(),
            materials: materials.to_vec(),
            smooth,
        });
        Ok(())
    }

    fn set_parent(&mut self, child: &str, parent: &str) -> Result<(), BackendError> {
        if !self.objects.contains_key(parent) {
            return Err(BackendError::ObjectNotFound(parent.to_string()));
        }
        self.object_mut(child)?.parent = Some(parent.to_string());
        Ok(())
    }
}
