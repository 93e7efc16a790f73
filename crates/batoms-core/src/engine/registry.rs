use super::config::RegistryConfig;
use super::error::EngineError;
use super::occupancy::OccupancyColorAssigner;
use crate::core::elements::{self, ColorStyle, RadiusStyle, Rgba, VACANCY_SYMBOL};
use crate::core::models::ids::SpeciesId;
use crate::core::models::instance::{Instance, InstanceShape, Material};
use crate::core::models::species::{ElementComposition, Species};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use tracing::debug;

/// Species definitions of one collection and the render instance each one owns.
///
/// Every species has exactly one [`Instance`], shared by all sites of that species.
/// Instances are only changed through registry commands, which validate their input
/// before touching any state.
#[derive(Debug, Clone)]
pub struct SpeciesRegistry {
    owner: String,
    config: RegistryConfig,
    species: SlotMap<SpeciesId, Species>,
    instances: SecondaryMap<SpeciesId, Instance>,
    references: SecondaryMap<SpeciesId, usize>,
    label_map: HashMap<String, SpeciesId>,
    order: Vec<SpeciesId>,
    assigner: OccupancyColorAssigner,
}

impl SpeciesRegistry {
    /// Creates an empty registry for the collection named `owner`.
    pub fn new(owner: &str) -> Self {
        Self::with_config(owner, RegistryConfig::default())
    }

    pub fn with_config(owner: &str, config: RegistryConfig) -> Self {
        Self {
            owner: owner.to_string(),
            config,
            species: SlotMap::with_key(),
            instances: SecondaryMap::new(),
            references: SecondaryMap::new(),
            label_map: HashMap::new(),
            order: Vec::new(),
            assigner: OccupancyColorAssigner,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.label_map.contains_key(label)
    }

    pub fn id(&self, label: &str) -> Option<SpeciesId> {
        self.label_map.get(label).copied()
    }

    pub fn species(&self, label: &str) -> Option<&Species> {
        self.id(label).and_then(|id| self.species.get(id))
    }

    pub fn species_by_id(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id)
    }

    /// Species labels in definition order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter_map(|&id| self.species.get(id))
            .map(|s| s.label.as_str())
    }

    pub fn material_name(&self, label: &str, element: &str) -> String {
        material_name(&self.owner, label, element)
    }

    pub fn instance_name(&self, label: &str) -> String {
        format!("{}_instancer_atom_{}", self.owner, label)
    }

    /// Defines a species and builds its instance.
    ///
    /// Redefining a label with an equivalent composition returns the existing id and
    /// keeps its settings.
    ///
    /// # Errors
    ///
    /// Fails on an invalid composition (including over-occupancy and vacancy-only
    /// species), an unknown element, an unbuildable default shape in the registry
    /// configuration, or a label already defined with a different composition.
    /// Nothing is registered on failure.
    pub fn define(
        &mut self,
        label: &str,
        composition: &ElementComposition,
        radius_style: RadiusStyle,
        color_style: ColorStyle,
    ) -> Result<SpeciesId, EngineError> {
        let (species, radius) = prepare(label, composition, radius_style, color_style)?;
        if !self.config.shape.is_valid() {
            return Err(EngineError::UnknownShape(self.config.shape.to_string()));
        }

        if let Some(id) = self.id(label) {
            if self.species[id].occupancies.is_equivalent(&species.occupancies) {
                return Ok(id);
            }
            return Err(EngineError::SpeciesConflict(label.to_string()));
        }

        let materials = build_materials(&self.owner, &species, &[])?;
        let mut instance = Instance::new(
            self.instance_name(label),
            self.config.shape,
            radius,
            [self.config.scale; 3],
        );
        instance.set_materials(materials);
        self.assigner.assign(&mut instance, &species.occupancies);

        debug!(
            "Defined species '{}' ({} element(s), radius {:.3}) in '{}'.",
            label,
            species.occupancies.len(),
            radius,
            self.owner
        );
        let id = self.species.insert(species);
        self.instances.insert(id, instance);
        self.references.insert(id, 0);
        self.label_map.insert(label.to_string(), id);
        self.order.push(id);
        Ok(id)
    }

    /// Defines a species with the registry's default styles.
    pub fn define_default(
        &mut self,
        label: &str,
        composition: &ElementComposition,
    ) -> Result<SpeciesId, EngineError> {
        self.define(
            label,
            composition,
            self.config.radius_style,
            self.config.color_style,
        )
    }

    /// Returns the id of `label`, defining it as a pure species of its label prefix
    /// if it does not exist yet.
    pub fn ensure(&mut self, label: &str) -> Result<SpeciesId, EngineError> {
        match self.id(label) {
            Some(id) => Ok(id),
            None => self.define_default(label, &ElementComposition::from_label(label)),
        }
    }

    /// The element with the highest occupancy, vacancy excluded.
    pub fn main_element(&self, label: &str) -> Result<&str, EngineError> {
        let species = self.require_species(label)?;
        Ok(species.main_element()?)
    }

    /// Main element of every species, in definition order.
    pub fn main_elements(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .filter_map(|&id| self.species.get(id))
            .filter_map(|s| s.main_element().ok().map(|e| (s.label.as_str(), e)))
            .collect()
    }

    /// Replaces the composition of a species and rebuilds its instance.
    pub fn set_occupancy(
        &mut self,
        label: &str,
        composition: &ElementComposition,
    ) -> Result<(), EngineError> {
        let id = self.require(label)?;
        let current = &self.species[id];
        let (species, _) = prepare(label, composition, current.radius_style, current.color_style)?;
        self.species[id] = species;
        debug!("Updated occupancy of species '{}'.", label);
        self.rebuild(id)
    }

    pub fn instance_for(&self, label: &str) -> Result<&Instance, EngineError> {
        let id = self.require(label)?;
        self.instances
            .get(id)
            .ok_or_else(|| EngineError::UnknownSpecies(label.to_string()))
    }

    /// Removes a species that no site references any more.
    pub fn remove(&mut self, label: &str) -> Result<(), EngineError> {
        let id = self.require(label)?;
        let sites = self.reference_count(label);
        if sites > 0 {
            return Err(EngineError::SpeciesInUse {
                label: label.to_string(),
                sites,
            });
        }
        self.species.remove(id);
        self.instances.remove(id);
        self.references.remove(id);
        self.label_map.remove(label);
        self.order.retain(|&other| other != id);
        debug!("Removed species '{}' from '{}'.", label, self.owner);
        Ok(())
    }

    /// Drops every species, instance and reference.
    pub fn clear(&mut self) {
        self.species.clear();
        self.instances.clear();
        self.references.clear();
        self.label_map.clear();
        self.order.clear();
        debug!("Released all species of '{}'.", self.owner);
    }

    pub fn set_radius_style(&mut self, label: &str, style: RadiusStyle) -> Result<(), EngineError> {
        let id = self.require(label)?;
        let main = self.species[id].main_element()?;
        elements::radius(main, style).ok_or_else(|| EngineError::UnknownElement {
            label: label.to_string(),
            element: main.to_string(),
        })?;
        self.species[id].radius_style = style;
        self.rebuild(id)
    }

    /// Switches the colour scheme, recolouring every material of the species.
    pub fn set_color_style(&mut self, label: &str, style: ColorStyle) -> Result<(), EngineError> {
        let id = self.require(label)?;
        let mut species = self.species[id].clone();
        species.color_style = style;
        let materials = build_materials(&self.owner, &species, &[])?;
        self.species[id] = species;
        if let Some(instance) = self.instances.get_mut(id) {
            instance.set_materials(materials);
        }
        debug!("Set colour style of '{}' to {}.", label, style);
        self.rebuild(id)
    }

    pub fn set_shape(&mut self, label: &str, shape: InstanceShape) -> Result<(), EngineError> {
        if !shape.is_valid() {
            return Err(EngineError::UnknownShape(shape.to_string()));
        }
        let id = self.require(label)?;
        let instance = self.instance_mut(id, label)?;
        let radius = instance.radius();
        if instance.reshape(shape, radius) {
            debug!("Set shape of '{}' to {}.", label, shape);
        }
        self.rebuild(id)
    }

    /// Sets the per-axis scale of a species instance.
    pub fn set_instance_scale(&mut self, label: &str, scale: [f64; 3]) -> Result<(), EngineError> {
        if scale.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(EngineError::InvalidPlacement(format!(
                "instance scale {:?} must be finite and non-negative",
                scale
            )));
        }
        let id = self.require(label)?;
        self.instance_mut(id, label)?.set_scale(scale);
        debug!("Set instance scale of '{}' to {:?}.", label, scale);
        Ok(())
    }

    /// Sets the colour of the main element's material.
    pub fn set_color(&mut self, label: &str, color: Rgba) -> Result<(), EngineError> {
        let id = self.require(label)?;
        let main = self.species[id].main_element()?.to_string();
        let instance = self.instance_mut(id, label)?;
        let material = instance
            .material_mut(&main)
            .ok_or_else(|| EngineError::UnknownElement {
                label: label.to_string(),
                element: main.clone(),
            })?;
        material.color = color;
        debug!("Set colour of '{}' ({}) to {:?}.", label, main, color);
        Ok(())
    }

    /// Regenerates the instance of a species from its current settings.
    ///
    /// The mesh is only rebuilt if the shape or radius changed; materials and the
    /// per-face material assignment are always redone. Existing material colours are
    /// kept.
    pub fn rebuild_instance(&mut self, label: &str) -> Result<(), EngineError> {
        let id = self.require(label)?;
        self.rebuild(id)
    }

    /// Radius of the species instance, before scaling.
    pub fn radius(&self, label: &str) -> Result<f64, EngineError> {
        Ok(self.instance_for(label)?.radius())
    }

    /// Records that `sites` more sites use `label`.
    pub(crate) fn retain(&mut self, label: &str, sites: usize) -> Result<(), EngineError> {
        let id = self.require(label)?;
        if let Some(count) = self.references.get_mut(id) {
            *count += sites;
        }
        Ok(())
    }

    /// Records that `sites` fewer sites use `label`.
    pub(crate) fn release(&mut self, label: &str, sites: usize) -> Result<(), EngineError> {
        let id = self.require(label)?;
        if let Some(count) = self.references.get_mut(id) {
            *count = count.saturating_sub(sites);
        }
        Ok(())
    }

    pub fn reference_count(&self, label: &str) -> usize {
        self.id(label)
            .and_then(|id| self.references.get(id))
            .copied()
            .unwrap_or(0)
    }

    /// Copies the species of `other` that are missing here.
    ///
    /// Species present in both registries must have equivalent compositions. All
    /// labels are checked before anything is copied.
    pub fn merge(&mut self, other: &SpeciesRegistry) -> Result<(), EngineError> {
        for label in other.labels() {
            if let (Some(mine), Some(theirs)) = (self.species(label), other.species(label)) {
                if !mine.occupancies.is_equivalent(&theirs.occupancies) {
                    return Err(EngineError::SpeciesConflict(label.to_string()));
                }
            }
        }
        for label in other.labels() {
            if self.contains(label) {
                continue;
            }
            let (Some(species), Ok(instance)) = (other.species(label), other.instance_for(label))
            else {
                continue;
            };
            let composition =
                ElementComposition::Fractional(species.occupancies.entries().to_vec());
            let id = self.define(label, &composition, species.radius_style, species.color_style)?;
            let colors: Vec<Material> = instance.materials().to_vec();
            let target = self.instance_mut(id, label)?;
            target.set_scale(instance.scale());
            target.reshape(instance.shape(), instance.radius());
            for material in colors {
                if let Some(own) = target.material_mut(&material.element) {
                    own.color = material.color;
                }
            }
            self.rebuild(id)?;
        }
        Ok(())
    }

    fn require(&self, label: &str) -> Result<SpeciesId, EngineError> {
        self.id(label)
            .ok_or_else(|| EngineError::UnknownSpecies(label.to_string()))
    }

    fn require_species(&self, label: &str) -> Result<&Species, EngineError> {
        let id = self.require(label)?;
        Ok(&self.species[id])
    }

    fn instance_mut(&mut self, id: SpeciesId, label: &str) -> Result<&mut Instance, EngineError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSpecies(label.to_string()))
    }

    fn rebuild(&mut self, id: SpeciesId) -> Result<(), EngineError> {
        let species = &self.species[id];
        let main = species.main_element()?;
        let radius = elements::radius(main, species.radius_style).ok_or_else(|| {
            EngineError::UnknownElement {
                label: species.label.clone(),
                element: main.to_string(),
            }
        })?;
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSpecies(species.label.clone()))?;
        let materials = build_materials(&self.owner, species, instance.materials())?;

        let shape = instance.shape();
        let regenerated = instance.reshape(shape, radius);
        instance.set_materials(materials);
        self.assigner.assign(instance, &species.occupancies);
        debug!(
            "Rebuilt instance '{}' (mesh {}).",
            instance.name(),
            if regenerated { "regenerated" } else { "reused" }
        );
        Ok(())
    }
}

fn material_name(owner: &str, label: &str, element: &str) -> String {
    format!("{}_material_atom_{}_{}", owner, label, element)
}

/// Validates a definition and looks up the radius of its main element.
fn prepare(
    label: &str,
    composition: &ElementComposition,
    radius_style: RadiusStyle,
    color_style: ColorStyle,
) -> Result<(Species, f64), EngineError> {
    let species = Species::new(label, composition, radius_style, color_style)?;
    let main = species.main_element()?;
    if let Some(unknown) = species
        .occupancies
        .elements()
        .find(|&e| e != VACANCY_SYMBOL && !elements::is_known_element(e))
    {
        return Err(EngineError::UnknownElement {
            label: label.to_string(),
            element: unknown.to_string(),
        });
    }
    let radius = elements::radius(main, radius_style).ok_or_else(|| EngineError::UnknownElement {
        label: label.to_string(),
        element: main.to_string(),
    })?;
    Ok((species, radius))
}

/// Materials in slot order, keeping the colour of elements found in `previous`.
fn build_materials(
    owner: &str,
    species: &Species,
    previous: &[Material],
) -> Result<Vec<Material>, EngineError> {
    species
        .occupancies
        .sorted()
        .into_iter()
        .map(|(element, _)| {
            let color = match previous.iter().find(|m| m.element == element) {
                Some(existing) => existing.color,
                None => elements::color(element, species.color_style).ok_or_else(|| {
                    EngineError::UnknownElement {
                        label: species.label.clone(),
                        element: element.to_string(),
                    }
                })?,
            };
            Ok(Material {
                name: material_name(owner, &species.label, element),
                element: element.to_string(),
                color,
            })
        })
        .collect()
}
