use crate::core::geometry::lattice::Cell;
use crate::core::geometry::placement::Placement;
use crate::core::models::attributes::{AttributeColumn, AttributeKind};
use crate::core::models::selection::IndexSelection;
use crate::core::models::site::{ModelStyle, Site};
use crate::core::models::timeline::{Keypoint, Timeline};
use crate::engine::backend::SceneBackend;
use crate::engine::error::EngineError;
use crate::engine::registry::SpeciesRegistry;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-site attributes backed by [`Site`] fields rather than custom columns.
const BUILTIN_ATTRIBUTES: [(&str, AttributeKind); 5] = [
    ("species", AttributeKind::Str),
    ("scale", AttributeKind::Float),
    ("show", AttributeKind::Bool),
    ("select", AttributeKind::Int),
    ("model_style", AttributeKind::Int),
];

/// An ordered collection of atomic sites and the species registry they reference.
///
/// Site positions are kept in the collection's local frame and exposed in global
/// coordinates through its [`Placement`]. Frame 0 of the trajectory is the sites'
/// own positions; later frames live in the [`Timeline`].
///
/// Every mutating command validates all of its input before changing anything, so a
/// failed call leaves the collection as it was.
#[derive(Debug, Clone)]
pub struct SiteCollection {
    label: String,
    registry: SpeciesRegistry,
    sites: Vec<Site>,
    placement: Placement,
    cell: Cell,
    pbc: [bool; 3],
    timeline: Timeline,
    attributes: BTreeMap<String, AttributeColumn>,
}

impl SiteCollection {
    /// An empty collection with its own empty registry.
    pub fn new(label: &str) -> Self {
        Self::with_registry(SpeciesRegistry::new(label))
    }

    /// An empty collection named after the owner of `registry`.
    pub fn with_registry(registry: SpeciesRegistry) -> Self {
        Self {
            label: registry.owner().to_string(),
            registry,
            sites: Vec::new(),
            placement: Placement::identity(),
            cell: Cell::default(),
            pbc: [false; 3],
            timeline: Timeline::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Creates a collection with one site per position.
    ///
    /// Labels missing from `registry` are defined as pure species of their prefix
    /// before the first `_`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShapeMismatch`] if `positions` and `species` differ in
    /// length, or the registry error of a label that cannot be auto-defined.
    pub fn create<S: AsRef<str>>(
        registry: SpeciesRegistry,
        positions: &[Point3<f64>],
        species: &[S],
    ) -> Result<Self, EngineError> {
        Self::create_with_frames(registry, vec![positions.to_vec()], species, true)
    }

    /// Creates a collection from a trajectory whose first frame is the rest pose.
    ///
    /// With `frame_0_only` the later frames are stored but deferred until
    /// [`SiteCollection::materialize_frames`] is called.
    pub fn create_with_frames<S: AsRef<str>>(
        mut registry: SpeciesRegistry,
        frames: Vec<Vec<Point3<f64>>>,
        species: &[S],
        frame_0_only: bool,
    ) -> Result<Self, EngineError> {
        let mut frames = frames.into_iter();
        let rest = frames.next().unwrap_or_default();
        if rest.len() != species.len() {
            return Err(EngineError::ShapeMismatch {
                expected: species.len(),
                found: rest.len(),
            });
        }
        let trajectory: Vec<Vec<Point3<f64>>> = frames.collect();
        check_frames(&trajectory, species.len())?;

        for label in species {
            registry.ensure(label.as_ref())?;
        }
        let sites: Vec<Site> = rest
            .into_iter()
            .zip(species)
            .map(|(position, label)| Site::new(position, label.as_ref()))
            .collect();
        for (label, count) in count_species(&sites) {
            registry.retain(label, count)?;
        }

        let mut collection = Self::with_registry(registry);
        collection.sites = sites;
        let deferred = frame_0_only && !trajectory.is_empty();
        collection.timeline.replace(trajectory, deferred);
        debug!(
            "Created collection '{}' with {} site(s), {} species and {} frame(s).",
            collection.label,
            collection.sites.len(),
            collection.registry.len(),
            collection.frame_count()
        );
        Ok(collection)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    /// Mutable access to the species registry, for styling commands.
    pub fn registry_mut(&mut self) -> &mut SpeciesRegistry {
        &mut self.registry
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = cell;
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn set_pbc(&mut self, pbc: [bool; 3]) {
        self.pbc = pbc;
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Species label of every site.
    pub fn species_labels(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.species.as_str()).collect()
    }

    /// Replaces the object transform. Local positions are kept, so global positions
    /// move with the placement.
    pub fn set_placement(&mut self, placement: Placement) -> Result<(), EngineError> {
        if !placement.is_invertible() {
            return Err(EngineError::InvalidPlacement(format!(
                "scale ({}, {}, {}) must be finite and non-zero and the translation finite",
                placement.scale.x, placement.scale.y, placement.scale.z
            )));
        }
        self.placement = placement;
        debug!("Moved collection '{}'.", self.label);
        Ok(())
    }

    // --- Positions ---

    /// Positions in the collection's local frame.
    pub fn local_positions(&self) -> Vec<Point3<f64>> {
        self.sites.iter().map(|s| s.position).collect()
    }

    /// Positions in global coordinates.
    pub fn get_positions(&self) -> Vec<Point3<f64>> {
        self.sites
            .iter()
            .map(|s| self.placement.to_global(&s.position))
            .collect()
    }

    /// Moves every site to the given global position.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), EngineError> {
        self.check_len(positions.len())?;
        for (site, position) in self.sites.iter_mut().zip(positions) {
            site.position = self.placement.to_local(position);
        }
        debug!("Set positions of {} site(s) in '{}'.", positions.len(), self.label);
        Ok(())
    }

    // --- Structure edits ---

    /// Removes the selected sites; the remaining ones keep their order and are
    /// renumbered from 0.
    ///
    /// Removing every site also releases all species, instances, frames and custom
    /// attributes. Returns the number of removed sites.
    pub fn delete(&mut self, selection: impl Into<IndexSelection>) -> Result<usize, EngineError> {
        let indices = selection.into().resolve(self.sites.len())?;
        if indices.is_empty() {
            return Ok(0);
        }
        if indices.len() == self.sites.len() {
            self.release_all();
            return Ok(indices.len());
        }

        let mut keep = vec![true; self.sites.len()];
        for &index in &indices {
            keep[index] = false;
        }
        for (label, count) in count_species(indices.iter().map(|&i| &self.sites[i])) {
            self.registry.release(label, count)?;
        }
        retain_by_mask(&mut self.sites, &keep);
        for column in self.attributes.values_mut() {
            column.retain(&keep);
        }
        self.timeline.retain_sites(&keep);
        debug!(
            "Deleted {} site(s) from '{}'; {} remain.",
            indices.len(),
            self.label,
            self.sites.len()
        );
        Ok(indices.len())
    }

    /// Replicates every site `m₀·m₁·m₂` times, shifting each replica by a lattice
    /// vector combination of `cell`.
    ///
    /// Replicas are ordered with the last multiplicity varying fastest; the first
    /// replica is the original. Frames and custom attributes are replicated the same
    /// way and the collection's cell becomes the supercell.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::UndefinedLattice`] if a multiplicity other than one
    /// is requested along a zero lattice vector, with
    /// [`EngineError::ZeroMultiplicity`] for a zero multiplicity, and with
    /// [`EngineError::TooManyReplicas`] when the replica or site count overflows.
    pub fn repeat(&mut self, multiplicities: [usize; 3], cell: &Cell) -> Result<(), EngineError> {
        let offsets = cell.replica_offsets(multiplicities)?;
        let replicas = offsets.len();
        let too_many = EngineError::TooManyReplicas { multiplicities };
        if self.sites.len().checked_mul(replicas).is_none() {
            return Err(too_many);
        }

        let mut registry = self.registry.clone();
        for (label, count) in count_species(&self.sites) {
            let added = count
                .checked_mul(replicas - 1)
                .ok_or_else(|| too_many.clone())?;
            registry.retain(label, added)?;
        }
        self.registry = registry;
        let base = std::mem::take(&mut self.sites);
        self.sites = offsets
            .iter()
            .flat_map(|offset| {
                base.iter().map(move |site| {
                    let mut replica = site.clone();
                    replica.position += *offset;
                    replica
                })
            })
            .collect();
        for column in self.attributes.values_mut() {
            column.tile(replicas);
        }
        self.timeline.tile(&offsets);
        self.cell = cell.repeated(multiplicities);
        debug!(
            "Repeated '{}' {:?} times; it now has {} site(s).",
            self.label,
            multiplicities,
            self.sites.len()
        );
        Ok(())
    }

    /// Repeats the collection in its own cell.
    pub fn repeat_cell(&mut self, multiplicities: [usize; 3]) -> Result<(), EngineError> {
        let cell = self.cell;
        self.repeat(multiplicities, &cell)
    }

    /// Appends the sites of `other`, merging its species into this registry.
    ///
    /// A species defined in both collections must have the same composition; any
    /// clash is reported as [`EngineError::SpeciesConflict`] before anything changes.
    /// Global positions of the appended sites are preserved. Custom attributes missing
    /// on one side are filled with default values, and frames missing on one side
    /// with that side's rest pose.
    pub fn extend(&mut self, other: &SiteCollection) -> Result<(), EngineError> {
        let mut registry = self.registry.clone();
        registry.merge(&other.registry)?;

        let (from, to) = (other.placement, self.placement);
        let relocate = |p: &Point3<f64>| to.to_local(&from.to_global(p));
        let appended: Vec<Site> = other
            .sites
            .iter()
            .map(|site| {
                let mut site = site.clone();
                site.position = relocate(&site.position);
                site
            })
            .collect();
        for (label, count) in count_species(&appended) {
            registry.retain(label, count)?;
        }

        let own_len = self.sites.len();
        let total = own_len + appended.len();
        let mut attributes = self.attributes.clone();
        for (name, column) in &other.attributes {
            let target = attributes
                .entry(name.clone())
                .or_insert_with(|| AttributeColumn::with_default(column.kind(), own_len));
            target
                .append(column)
                .ok_or_else(|| EngineError::AttributeMismatch {
                    name: name.clone(),
                    reason: format!(
                        "cannot append {} values to a {} column",
                        column.kind(),
                        target.kind()
                    ),
                })?;
        }
        for column in attributes.values_mut() {
            column.pad_to(total);
        }

        let mut other_timeline = other.timeline.clone();
        if from != to {
            other_timeline.map_positions(relocate);
        }
        let own_rest = self.local_positions();
        let other_rest: Vec<Point3<f64>> = appended.iter().map(|s| s.position).collect();
        self.timeline.append(&own_rest, &other_timeline, &other_rest);

        self.registry = registry;
        self.sites.extend(appended);
        self.attributes = attributes;
        debug!(
            "Extended '{}' with {} site(s) from '{}'.",
            self.label,
            other.sites.len(),
            other.label
        );
        Ok(())
    }

    /// Moves the selected sites to species `label`, defining it from its prefix if
    /// needed.
    pub fn replace(
        &mut self,
        selection: impl Into<IndexSelection>,
        label: &str,
    ) -> Result<(), EngineError> {
        let indices = selection.into().resolve(self.sites.len())?;
        let mut registry = self.registry.clone();
        registry.ensure(label)?;
        for (old, count) in count_species(indices.iter().map(|&i| &self.sites[i])) {
            registry.release(old, count)?;
        }
        registry.retain(label, indices.len())?;

        self.registry = registry;
        for &index in &indices {
            self.sites[index].species = label.to_string();
        }
        debug!(
            "Replaced {} site(s) of '{}' with species '{}'.",
            indices.len(),
            self.label,
            label
        );
        Ok(())
    }

    // --- Trajectory ---

    pub fn frame_count(&self) -> usize {
        self.timeline.frame_count()
    }

    /// Global positions of frame `index`; frame 0 is the rest pose.
    pub fn get_frame(&self, index: usize) -> Result<Vec<Point3<f64>>, EngineError> {
        if index == 0 {
            return Ok(self.get_positions());
        }
        self.timeline
            .frame(index)
            .map(|frame| self.placement.points_to_global(frame))
            .ok_or(EngineError::FrameOutOfRange {
                index,
                count: self.frame_count(),
            })
    }

    /// Replaces the whole trajectory with frames in global coordinates.
    ///
    /// The first frame becomes the rest pose. With `only_basis` the other frames are
    /// stored but not materialized. An empty list clears every frame after the rest
    /// pose.
    pub fn set_frames(
        &mut self,
        frames: Vec<Vec<Point3<f64>>>,
        only_basis: bool,
    ) -> Result<(), EngineError> {
        check_frames(&frames, self.sites.len())?;
        let mut frames = frames
            .into_iter()
            .map(|frame| self.placement.points_to_local(&frame));
        let Some(rest) = frames.next() else {
            self.timeline.clear();
            return Ok(());
        };
        for (site, position) in self.sites.iter_mut().zip(rest) {
            site.position = position;
        }
        let trajectory: Vec<Vec<Point3<f64>>> = frames.collect();
        let deferred = only_basis && !trajectory.is_empty();
        let count = trajectory.len() + 1;
        self.timeline.replace(trajectory, deferred);
        debug!(
            "Set {} frame(s) on '{}'{}.",
            count,
            self.label,
            if deferred { " (deferred)" } else { "" }
        );
        Ok(())
    }

    /// Overwrites frame `index`, or appends it right after the last frame.
    ///
    /// Deferred frames are not visible, so while frames are deferred only the rest
    /// pose can be written; call [`SiteCollection::materialize_frames`] first.
    pub fn set_frame(
        &mut self,
        index: usize,
        positions: &[Point3<f64>],
    ) -> Result<(), EngineError> {
        self.check_len(positions.len())?;
        if index == 0 {
            return self.set_positions(positions);
        }
        let count = self.frame_count();
        let local = self.placement.points_to_local(positions);
        self.timeline
            .set_frame(index, local)
            .ok_or(EngineError::FrameOutOfRange { index, count })
    }

    /// Blend weight keypoints of frame `index` on the playback timeline.
    pub fn interpolation_window(&self, index: usize) -> Result<Vec<Keypoint>, EngineError> {
        self.timeline
            .interpolation_window(index)
            .ok_or(EngineError::FrameOutOfRange {
                index,
                count: self.frame_count(),
            })
    }

    /// Makes frames deferred by `only_basis` count.
    pub fn materialize_frames(&mut self) {
        if self.timeline.is_deferred() {
            self.timeline.materialize();
            debug!(
                "Materialized {} frame(s) of '{}'.",
                self.timeline.frame_count(),
                self.label
            );
        }
    }

    pub fn set_frame_start(&mut self, frame_start: i32) {
        self.timeline.set_frame_start(frame_start);
    }

    // --- Display ---

    /// Sets the scale of every site of species `label`.
    pub fn set_scale_for_species(&mut self, label: &str, scale: f64) -> Result<(), EngineError> {
        if !self.registry.contains(label) {
            return Err(EngineError::UnknownSpecies(label.to_string()));
        }
        check_scale(scale)?;
        for site in self.sites.iter_mut().filter(|s| s.species == label) {
            site.scale = scale;
        }
        Ok(())
    }

    /// Sets the model style of the selected sites, with its default scale and
    /// visibility.
    pub fn set_model_style(
        &mut self,
        selection: impl Into<IndexSelection>,
        style: ModelStyle,
    ) -> Result<(), EngineError> {
        let indices = selection.into().resolve(self.sites.len())?;
        for &index in &indices {
            let site = &mut self.sites[index];
            site.model_style = style;
            site.apply_model_style();
        }
        debug!(
            "Set model style of {} site(s) in '{}' to {}.",
            indices.len(),
            self.label,
            style
        );
        Ok(())
    }

    /// Re-applies every site's model style to its scale and visibility.
    pub fn apply_model_styles(&mut self) {
        for site in &mut self.sites {
            site.apply_model_style();
        }
    }

    /// Drawn radius of every site: the species radius times the site scale.
    pub fn sizes(&self) -> Result<Vec<f64>, EngineError> {
        self.sites
            .iter()
            .map(|s| -> Result<f64, EngineError> {
                Ok(self.registry.radius(&s.species)? * s.scale)
            })
            .collect()
    }

    /// Unscaled species radius of every site.
    pub fn radii(&self) -> Result<Vec<f64>, EngineError> {
        self.sites
            .iter()
            .map(|s| self.registry.radius(&s.species))
            .collect()
    }

    /// Main element of every site.
    pub fn elements(&self) -> Result<Vec<&str>, EngineError> {
        self.sites
            .iter()
            .map(|s| self.registry.main_element(&s.species))
            .collect()
    }

    // --- Geometry ---

    /// Fractional coordinates of the local positions in the collection's cell.
    pub fn scaled_positions(&self) -> Result<Vec<Vector3<f64>>, EngineError> {
        Ok(self.cell.fractional(&self.local_positions())?)
    }

    /// Distances from site `index` to each site in `others`.
    ///
    /// With `mic` each displacement is first reduced to its minimum image in the cell
    /// along the periodic axes.
    pub fn distances(
        &self,
        index: usize,
        others: &[usize],
        mic: bool,
    ) -> Result<Vec<f64>, EngineError> {
        self.local_position(index)?;
        others
            .iter()
            .map(|&other| -> Result<f64, EngineError> {
                Ok(self.displacement(index, other, mic)?.norm())
            })
            .collect()
    }

    /// Angle in degrees at site `vertex` between the directions to `first` and `last`,
    /// optionally using minimum-image displacements.
    pub fn angle(
        &self,
        first: usize,
        vertex: usize,
        last: usize,
        mic: bool,
    ) -> Result<f64, EngineError> {
        let a = self.displacement(vertex, first, mic)?;
        let b = self.displacement(vertex, last, mic)?;
        Ok(a.angle(&b).to_degrees())
    }

    /// Centre of the bounding box of the global positions.
    pub fn center_of_geometry(&self) -> Option<Point3<f64>> {
        let positions = self.get_positions();
        let first = *positions.first()?;
        let (lower, upper) = positions
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(nalgebra::center(&lower, &upper))
    }

    // --- Attributes ---

    /// Names of the built-in attributes followed by the custom ones.
    pub fn attribute_names(&self) -> Vec<&str> {
        BUILTIN_ATTRIBUTES
            .iter()
            .map(|(name, _)| *name)
            .chain(self.attributes.keys().map(String::as_str))
            .collect()
    }

    /// A copy of the named attribute column.
    pub fn attribute(&self, name: &str) -> Option<AttributeColumn> {
        let sites = self.sites.iter();
        let column = match name {
            "species" => AttributeColumn::Str(sites.map(|s| s.species.clone()).collect()),
            "scale" => AttributeColumn::Float(sites.map(|s| s.scale).collect()),
            "show" => AttributeColumn::Bool(sites.map(|s| s.show).collect()),
            "select" => AttributeColumn::Int(sites.map(|s| i64::from(s.select)).collect()),
            "model_style" => AttributeColumn::Int(sites.map(|s| s.model_style.index()).collect()),
            _ => return self.attributes.get(name).cloned(),
        };
        Some(column)
    }

    /// Writes a whole attribute column, one value per site.
    ///
    /// Built-in attributes must keep their kind and are checked for valid values.
    /// `species` is read-only; use [`SiteCollection::replace`]. A custom column of any
    /// kind replaces an existing one of the same name.
    pub fn set_attribute(
        &mut self,
        name: &str,
        values: AttributeColumn,
    ) -> Result<(), EngineError> {
        let mismatch = |reason: String| EngineError::AttributeMismatch {
            name: name.to_string(),
            reason,
        };
        if values.len() != self.sites.len() {
            return Err(mismatch(format!(
                "expected {} values, got {}",
                self.sites.len(),
                values.len()
            )));
        }
        if let Some((_, kind)) = BUILTIN_ATTRIBUTES.iter().find(|(builtin, _)| *builtin == name) {
            if values.kind() != *kind {
                return Err(mismatch(format!("expected {} values, got {}", kind, values.kind())));
            }
        }

        match (name, values) {
            ("species", _) => {
                return Err(mismatch("species are changed with replace".to_string()));
            }
            ("scale", AttributeColumn::Float(scales)) => {
                for &scale in &scales {
                    check_scale(scale)?;
                }
                for (site, scale) in self.sites.iter_mut().zip(scales) {
                    site.scale = scale;
                }
            }
            ("show", AttributeColumn::Bool(flags)) => {
                for (site, show) in self.sites.iter_mut().zip(flags) {
                    site.show = show;
                }
            }
            ("select", AttributeColumn::Int(groups)) => {
                let groups = groups
                    .into_iter()
                    .map(|g| {
                        i32::try_from(g).map_err(|_| mismatch(format!("{} is out of range", g)))
                    })
                    .collect::<Result<Vec<i32>, _>>()?;
                for (site, select) in self.sites.iter_mut().zip(groups) {
                    site.select = select;
                }
            }
            ("model_style", AttributeColumn::Int(indices)) => {
                let styles = indices
                    .into_iter()
                    .map(|i| {
                        ModelStyle::from_index(i)
                            .ok_or_else(|| mismatch(format!("{} is not a model style", i)))
                    })
                    .collect::<Result<Vec<ModelStyle>, _>>()?;
                for (site, style) in self.sites.iter_mut().zip(styles) {
                    site.model_style = style;
                }
            }
            (_, values) => {
                self.attributes.insert(name.to_string(), values);
            }
        }
        debug!("Set attribute '{}' on '{}'.", name, self.label);
        Ok(())
    }

    /// Writes attribute values at the selected sites only.
    ///
    /// A single value is broadcast to every selected site. A missing custom column is
    /// created with default values first.
    pub fn set_attribute_with_indices(
        &mut self,
        name: &str,
        selection: impl Into<IndexSelection>,
        values: AttributeColumn,
    ) -> Result<(), EngineError> {
        let indices = selection.into().resolve(self.sites.len())?;
        let mut column = self
            .attribute(name)
            .unwrap_or_else(|| AttributeColumn::with_default(values.kind(), self.sites.len()));
        column
            .set_indices(&indices, &values)
            .ok_or_else(|| EngineError::AttributeMismatch {
                name: name.to_string(),
                reason: format!(
                    "cannot write {} {} value(s) to {} site(s) of a {} column",
                    values.len(),
                    values.kind(),
                    indices.len(),
                    column.kind()
                ),
            })?;
        self.set_attribute(name, column)
    }

    /// Removes a custom attribute column.
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeColumn> {
        self.attributes.remove(name)
    }

    // --- Scene ---

    /// Pushes the collection into a host scene.
    ///
    /// Instancers of species no longer in the registry and attributes the collection
    /// no longer has are removed from the scene first. Then the object transform,
    /// local positions and every attribute are written, followed for each species by
    /// its materials, instance mesh and instancing relation, and finally one shape key
    /// per materialized frame with its interpolation keypoints.
    pub fn publish(&self, backend: &mut dyn SceneBackend) -> Result<(), EngineError> {
        let object = self.label.as_str();
        if !backend.has_object(object) {
            backend.create_object(object)?;
        }
        self.remove_stale(backend)?;
        backend.set_transform(object, &self.placement)?;
        backend.write_positions(object, &self.local_positions())?;
        for name in self.attribute_names() {
            if let Some(column) = self.attribute(name) {
                backend.write_attribute(object, name, &column)?;
            }
        }

        for label in self.registry.labels() {
            let instance = self.registry.instance_for(label)?;
            for material in instance.materials() {
                backend.create_material(material)?;
            }
            let materials: Vec<String> =
                instance.materials().iter().map(|m| m.name.clone()).collect();
            if !backend.has_object(instance.name()) {
                backend.create_object(instance.name())?;
            }
            backend.write_mesh(
                instance.name(),
                instance.mesh(),
                &materials,
                instance.is_smooth(),
            )?;
            let [x, y, z] = instance.scale();
            let transform = Placement {
                scale: Vector3::new(x, y, z),
                ..Placement::identity()
            };
            backend.set_transform(instance.name(), &transform)?;
            backend.set_parent(instance.name(), object)?;
        }

        for index in 1..self.frame_count() {
            if let (Some(positions), Some(keypoints)) = (
                self.timeline.frame(index),
                self.timeline.interpolation_window(index),
            ) {
                backend.write_shape_key(object, index, positions, &keypoints)?;
            }
        }
        debug!(
            "Published '{}': {} site(s), {} species, {} frame(s).",
            object,
            self.sites.len(),
            self.registry.len(),
            self.frame_count()
        );
        Ok(())
    }

    /// Drops scene state left over from an earlier publish.
    fn remove_stale(&self, backend: &mut dyn SceneBackend) -> Result<(), EngineError> {
        let object = self.label.as_str();
        let prefix = self.registry.instance_name("");
        let current: Vec<String> = self
            .registry
            .labels()
            .map(|label| self.registry.instance_name(label))
            .collect();
        for child in backend.children(object) {
            if child.starts_with(&prefix) && !current.contains(&child) {
                backend.remove_object(&child)?;
                debug!("Removed stale instancer '{}' from the scene.", child);
            }
        }

        let names = self.attribute_names();
        for name in backend.attribute_names(object)? {
            if !names.contains(&name.as_str()) {
                backend.remove_attribute(object, &name)?;
                debug!("Removed stale attribute '{}' from '{}'.", name, object);
            }
        }
        Ok(())
    }

    fn check_len(&self, found: usize) -> Result<(), EngineError> {
        if found != self.sites.len() {
            return Err(EngineError::ShapeMismatch {
                expected: self.sites.len(),
                found,
            });
        }
        Ok(())
    }

    fn local_position(&self, index: usize) -> Result<Point3<f64>, EngineError> {
        self.sites
            .get(index)
            .map(|s| s.position)
            .ok_or(EngineError::IndexOutOfRange {
                index,
                len: self.sites.len(),
            })
    }

    /// Global displacement from site `from` to site `to`.
    fn displacement(&self, from: usize, to: usize, mic: bool) -> Result<Vector3<f64>, EngineError> {
        let origin = self.local_position(from)?;
        let mut d = self.local_position(to)? - origin;
        if mic {
            d = self.cell.minimum_image(&d, self.pbc)?;
        }
        Ok(self.placement.to_global(&(origin + d)) - self.placement.to_global(&origin))
    }

    fn release_all(&mut self) {
        self.sites.clear();
        self.attributes.clear();
        self.timeline.clear();
        self.registry.clear();
        debug!("Collection '{}' is empty; released its species.", self.label);
    }
}

fn check_frames(frames: &[Vec<Point3<f64>>], len: usize) -> Result<(), EngineError> {
    match frames.iter().find(|frame| frame.len() != len) {
        Some(frame) => Err(EngineError::ShapeMismatch {
            expected: len,
            found: frame.len(),
        }),
        None => Ok(()),
    }
}

fn check_scale(scale: f64) -> Result<(), EngineError> {
    if !(scale.is_finite() && scale >= 0.0) {
        return Err(EngineError::AttributeMismatch {
            name: "scale".to_string(),
            reason: format!("{} is not a non-negative number", scale),
        });
    }
    Ok(())
}

/// Number of sites per species label.
fn count_species<'a>(sites: impl IntoIterator<Item = &'a Site>) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for site in sites {
        *counts.entry(site.species.as_str()).or_insert(0) += 1;
    }
    counts
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::species::ElementComposition;
    use crate::engine::backend::InMemoryScene;
    use crate::engine::error::ErrorKind;
    use nalgebra::UnitQuaternion;

    fn points(coords: &[[f64; 3]]) -> Vec<Point3<f64>> {
        coords.iter().map(|&c| Point3::from(c)).collect()
    }

    fn collection(coords: &[[f64; 3]], species: &[&str]) -> SiteCollection {
        SiteCollection::create(SpeciesRegistry::new("test"), &points(coords), species).unwrap()
    }

    fn at(indices: &[usize]) -> IndexSelection {
        IndexSelection::Indices(indices.to_vec())
    }

    fn unit_cell() -> Cell {
        Cell::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    fn assert_points_close(actual: &[Point3<f64>], expected: &[Point3<f64>]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).norm() < 1e-9, "{:?} != {:?}", a, e);
        }
    }

    mod create {
        use super::*;

        #[test]
        fn labels_are_auto_defined_from_their_prefix() {
            let collection = collection(
                &[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
                &["Fe_up", "Fe_down", "O"],
            );
            assert_eq!(collection.len(), 3);
            assert_eq!(collection.registry().len(), 3);
            assert_eq!(collection.elements().unwrap(), vec!["Fe", "Fe", "O"]);
            assert_eq!(collection.registry().reference_count("O"), 1);
            assert_eq!(collection.frame_count(), 1);
        }

        #[test]
        fn predefined_fractional_species_are_used_as_is() {
            let mut registry = SpeciesRegistry::new("test");
            registry
                .define_default(
                    "Si",
                    &ElementComposition::fractional([("Si", 0.75), ("Al", 0.25)]),
                )
                .unwrap();
            let collection =
                SiteCollection::create(registry, &points(&[[0.0; 3]]), &["Si"]).unwrap();
            let instance = collection.registry().instance_for("Si").unwrap();
            assert_eq!(instance.materials().len(), 2);
        }

        #[test]
        fn mismatched_species_count_is_rejected() {
            let result = SiteCollection::create(
                SpeciesRegistry::new("test"),
                &points(&[[0.0; 3], [1.0; 3]]),
                &["O"],
            );
            assert!(matches!(
                result,
                Err(EngineError::ShapeMismatch {
                    expected: 1,
                    found: 2
                })
            ));
        }

        #[test]
        fn trajectory_input_defers_later_frames() {
            let frames = vec![points(&[[0.0; 3]]), points(&[[0.0, 0.0, 1.0]])];
            let collection =
                SiteCollection::create_with_frames(SpeciesRegistry::new("t"), frames, &["H"], true)
                    .unwrap();
            assert_eq!(collection.frame_count(), 1);
            assert!(collection.timeline().is_deferred());
            assert_eq!(collection.timeline().stored_frames(), 1);
        }
    }

    mod positions {
        use super::*;

        #[test]
        fn identity_round_trip_is_exact() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            let target = points(&[[0.1, -2.5, 3.3], [1e-7, 4.0, -0.3]]);
            collection.set_positions(&target).unwrap();
            assert_points_close(&collection.get_positions(), &target);
            assert_eq!(collection.local_positions(), target);
        }

        #[test]
        fn general_placement_round_trips() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection
                .set_placement(Placement {
                    translation: Vector3::new(1.0, -2.0, 0.5),
                    rotation: UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
                    scale: Vector3::new(2.0, 0.5, 1.5),
                })
                .unwrap();
            let target = points(&[[0.3, 0.2, 0.1], [-4.0, 2.0, 7.5]]);
            collection.set_positions(&target).unwrap();
            assert_points_close(&collection.get_positions(), &target);
        }

        #[test]
        fn placement_moves_global_positions() {
            let mut collection = collection(&[[1.0, 0.0, 0.0]], &["C"]);
            collection
                .set_placement(Placement::from_translation(Vector3::new(0.0, 2.0, 0.0)))
                .unwrap();
            assert_eq!(collection.local_positions(), points(&[[1.0, 0.0, 0.0]]));
            assert_eq!(collection.get_positions(), points(&[[1.0, 2.0, 0.0]]));
        }

        #[test]
        fn degenerate_placement_is_rejected() {
            let mut collection = collection(&[[1.0, 0.0, 0.0]], &["C"]);
            let result = collection.set_placement(Placement {
                scale: Vector3::new(1.0, 0.0, 1.0),
                ..Placement::identity()
            });
            assert!(matches!(result, Err(EngineError::InvalidPlacement(_))));
            assert!(collection.placement().is_identity());
        }

        #[test]
        fn wrong_length_is_rejected_without_changes() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            let err = collection
                .set_positions(&points(&[[5.0; 3]]))
                .unwrap_err();
            assert_eq!(
                err,
                EngineError::ShapeMismatch {
                    expected: 2,
                    found: 1
                }
            );
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(collection.get_positions(), points(&[[0.0; 3], [1.0; 3]]));
        }
    }

    mod delete {
        use super::*;

        #[test]
        fn remaining_sites_keep_order_and_are_renumbered() {
            let mut collection = collection(
                &[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
                &["H", "He", "Li"],
            );
            assert_eq!(collection.delete(at(&[1])).unwrap(), 1);
            assert_eq!(collection.species_labels(), vec!["H", "Li"]);
            assert_eq!(
                collection.get_positions(),
                points(&[[0.0; 3], [2.0, 0.0, 0.0]])
            );
            assert_eq!(collection.site(1).map(|s| s.species.as_str()), Some("Li"));
            assert_eq!(collection.registry().reference_count("He"), 0);
            assert!(collection.registry().contains("He"));
        }

        #[test]
        fn mask_selection_also_filters_attributes_and_frames() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3], [2.0; 3]], &["C", "O", "O"]);
            collection
                .set_attribute("charge", AttributeColumn::Float(vec![0.1, 0.2, 0.3]))
                .unwrap();
            let shifted =
                |dz: f64| points(&[[0.0, 0.0, dz], [1.0, 1.0, 1.0 + dz], [2.0, 2.0, 2.0 + dz]]);
            collection
                .set_frames(vec![shifted(0.0), shifted(1.0)], false)
                .unwrap();

            collection.delete(vec![true, false, true]).unwrap();
            assert_eq!(collection.species_labels(), vec!["O"]);
            assert_eq!(
                collection.attribute("charge"),
                Some(AttributeColumn::Float(vec![0.2]))
            );
            assert_eq!(collection.get_frame(1).unwrap(), points(&[[1.0, 1.0, 2.0]]));
            assert_eq!(collection.registry().reference_count("O"), 1);
            assert_eq!(collection.registry().reference_count("C"), 0);
        }

        #[test]
        fn invalid_selections_are_rejected() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            assert_eq!(
                collection.delete(at(&[2])),
                Err(EngineError::IndexOutOfRange { index: 2, len: 2 })
            );
            assert_eq!(
                collection.delete(vec![true]),
                Err(EngineError::MaskLengthMismatch {
                    expected: 2,
                    found: 1
                })
            );
            assert_eq!(collection.len(), 2);
        }

        #[test]
        fn deleting_everything_releases_species() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection.delete(at(&[0, 1])).unwrap();
            assert!(collection.is_empty());
            assert!(collection.registry().is_empty());
            assert!(collection.attribute_names().iter().all(|name| {
                BUILTIN_ATTRIBUTES.iter().any(|(builtin, _)| builtin == name)
            }));
        }

        #[test]
        fn referenced_species_cannot_be_removed_from_the_registry() {
            let mut collection = collection(&[[0.0; 3]], &["C"]);
            assert_eq!(
                collection.registry_mut().remove("C"),
                Err(EngineError::SpeciesInUse {
                    label: "C".to_string(),
                    sites: 1
                })
            );
        }
    }

    mod repeat {
        use super::*;

        #[test]
        fn replicas_follow_the_original_in_order() {
            let mut collection = collection(&[[0.0; 3], [0.5, 0.0, 0.0]], &["Na", "Cl"]);
            collection.repeat([2, 1, 1], &unit_cell()).unwrap();
            assert_eq!(
                collection.get_positions(),
                points(&[[0.0; 3], [0.5, 0.0, 0.0], [1.0, 0.0, 0.0], [1.5, 0.0, 0.0]])
            );
            assert_eq!(collection.species_labels(), vec!["Na", "Cl", "Na", "Cl"]);
            assert_eq!(collection.registry().reference_count("Na"), 2);
            assert_eq!(collection.cell().vector(0), Vector3::new(2.0, 0.0, 0.0));
        }

        #[test]
        fn oversized_repeat_fails_and_keeps_the_collection() {
            let mut collection = collection(&[[0.0; 3], [0.5, 0.0, 0.0]], &["Na", "Cl"]);
            let err = collection
                .repeat([1 << 33, 1 << 33, 1], &Cell::orthorhombic(1.0, 1.0, 1.0))
                .unwrap_err();
            assert!(matches!(err, EngineError::TooManyReplicas { .. }));
            assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
            assert_eq!(collection.len(), 2);
            assert_eq!(collection.registry().reference_count("Na"), 1);
        }

        #[test]
        fn frames_and_attributes_are_replicated() {
            let mut collection = collection(&[[0.0; 3]], &["Ar"]);
            collection.set_attribute("tag", AttributeColumn::Int(vec![7])).unwrap();
            collection
                .set_frames(vec![points(&[[0.0; 3]]), points(&[[0.0, 0.0, 0.25]])], false)
                .unwrap();
            let cell = Cell::orthorhombic(3.0, 4.0, 5.0);
            collection.repeat([1, 2, 2], &cell).unwrap();

            assert_eq!(collection.len(), 4);
            assert_eq!(
                collection.attribute("tag"),
                Some(AttributeColumn::Int(vec![7; 4]))
            );
            assert_eq!(
                collection.get_frame(1).unwrap(),
                points(&[
                    [0.0, 0.0, 0.25],
                    [0.0, 0.0, 5.25],
                    [0.0, 4.0, 0.25],
                    [0.0, 4.0, 5.25]
                ])
            );
        }

        #[test]
        fn undefined_lattice_vector_is_unsupported() {
            let mut collection = collection(&[[0.0; 3]], &["Ar"]);
            let cell = Cell::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0; 3]]);
            let err = collection.repeat([1, 1, 2], &cell).unwrap_err();
            assert_eq!(
                err,
                EngineError::UndefinedLattice {
                    axis: 2,
                    multiplicity: 2
                }
            );
            assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
            assert_eq!(collection.len(), 1);
            collection.repeat([2, 1, 1], &cell).unwrap();
            assert_eq!(collection.len(), 2);
        }

        #[test]
        fn repeat_cell_uses_the_collection_cell() {
            let mut collection = collection(&[[0.0; 3]], &["Ar"]);
            collection.set_cell(Cell::orthorhombic(2.0, 2.0, 2.0));
            collection.repeat_cell([2, 2, 2]).unwrap();
            assert_eq!(collection.len(), 8);
            assert_eq!(collection.get_positions()[7], Point3::new(2.0, 2.0, 2.0));
        }
    }

    mod extend {
        use super::*;

        #[test]
        fn sites_species_and_attributes_are_appended() {
            let mut mine = collection(&[[0.0; 3]], &["O"]);
            let mut theirs = SiteCollection::create(
                SpeciesRegistry::new("other"),
                &points(&[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]),
                &["O", "C"],
            )
            .unwrap();
            theirs
                .set_attribute("charge", AttributeColumn::Float(vec![-0.5, 0.25]))
                .unwrap();

            mine.extend(&theirs).unwrap();
            assert_eq!(mine.species_labels(), vec!["O", "O", "C"]);
            assert_eq!(
                mine.attribute("charge"),
                Some(AttributeColumn::Float(vec![0.0, -0.5, 0.25]))
            );
            assert_eq!(mine.registry().reference_count("O"), 2);
            assert_eq!(mine.registry().reference_count("C"), 1);
            assert_eq!(
                mine.registry().instance_for("C").unwrap().name(),
                "test_instancer_atom_C"
            );
        }

        #[test]
        fn global_positions_survive_different_placements() {
            let mut mine = collection(&[[0.0; 3]], &["O"]);
            let mut theirs = collection(&[[1.0, 0.0, 0.0]], &["O"]);
            theirs
                .set_placement(Placement::from_translation(Vector3::new(0.0, 0.0, 3.0)))
                .unwrap();
            mine.extend(&theirs).unwrap();
            assert_eq!(
                mine.get_positions(),
                points(&[[0.0; 3], [1.0, 0.0, 3.0]])
            );
        }

        #[test]
        fn missing_frames_are_filled_with_the_rest_pose() {
            let mut mine = collection(&[[0.0; 3]], &["O"]);
            let mut theirs = collection(&[[1.0, 0.0, 0.0]], &["O"]);
            theirs
                .set_frames(
                    vec![points(&[[1.0, 0.0, 0.0]]), points(&[[1.0, 1.0, 0.0]])],
                    false,
                )
                .unwrap();
            mine.extend(&theirs).unwrap();
            assert_eq!(mine.frame_count(), 2);
            assert_eq!(
                mine.get_frame(1).unwrap(),
                points(&[[0.0; 3], [1.0, 1.0, 0.0]])
            );
        }

        #[test]
        fn conflicting_species_leave_the_collection_unchanged() {
            let mut mine = collection(&[[0.0; 3]], &["O"]);
            let mut registry = SpeciesRegistry::new("other");
            registry
                .define_default("O", &ElementComposition::fractional([("O", 0.5)]))
                .unwrap();
            let theirs = SiteCollection::create(registry, &points(&[[1.0; 3]]), &["O"]).unwrap();

            let err = mine.extend(&theirs).unwrap_err();
            assert_eq!(err, EngineError::SpeciesConflict("O".to_string()));
            assert_eq!(err.kind(), ErrorKind::ReferentialIntegrity);
            assert_eq!(mine.len(), 1);
            assert_eq!(mine.registry().reference_count("O"), 1);
        }

        #[test]
        fn attribute_kind_clash_is_rejected() {
            let mut mine = collection(&[[0.0; 3]], &["O"]);
            mine.set_attribute("tag", AttributeColumn::Int(vec![1])).unwrap();
            let mut theirs = collection(&[[1.0; 3]], &["O"]);
            theirs
                .set_attribute("tag", AttributeColumn::Str(vec!["a".to_string()]))
                .unwrap();
            assert!(matches!(
                mine.extend(&theirs),
                Err(EngineError::AttributeMismatch { .. })
            ));
            assert_eq!(mine.len(), 1);
        }
    }

    mod frames {
        use super::*;

        fn trajectory() -> Vec<Vec<Point3<f64>>> {
            (0..3)
                .map(|f| points(&[[0.0, 0.0, f as f64], [1.0, 0.0, f as f64]]))
                .collect()
        }

        #[test]
        fn only_basis_defers_later_frames() {
            let mut collection = collection(&[[5.0; 3], [6.0; 3]], &["C", "O"]);
            collection.set_frames(trajectory(), true).unwrap();
            assert_eq!(collection.frame_count(), 1);
            assert_eq!(collection.get_positions(), trajectory()[0]);
            assert_eq!(
                collection.get_frame(1),
                Err(EngineError::FrameOutOfRange { index: 1, count: 1 })
            );

            collection.materialize_frames();
            assert_eq!(collection.frame_count(), 3);
            assert_eq!(collection.get_frame(2).unwrap(), trajectory()[2]);
        }

        #[test]
        fn frames_get_interpolation_windows() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection.set_frame_start(10);
            collection.set_frames(trajectory(), false).unwrap();
            let times = |keys: Vec<Keypoint>| -> Vec<(i32, f64)> {
                keys.into_iter().map(|k| (k.time, k.weight)).collect()
            };
            assert_eq!(
                times(collection.interpolation_window(1).unwrap()),
                vec![(10, 0.0), (11, 1.0), (12, 0.0)]
            );
            assert_eq!(
                times(collection.interpolation_window(2).unwrap()),
                vec![(11, 0.0), (12, 1.0)]
            );
            assert!(collection.interpolation_window(0).is_err());
        }

        #[test]
        fn frames_are_stored_locally_and_read_globally() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection
                .set_placement(Placement::from_translation(Vector3::new(1.0, 0.0, 0.0)))
                .unwrap();
            collection.set_frames(trajectory(), false).unwrap();
            assert_eq!(collection.get_frame(1).unwrap(), trajectory()[1]);
            assert_eq!(
                collection.timeline().frame(1),
                Some(points(&[[-1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]).as_slice())
            );
        }

        #[test]
        fn set_frame_overwrites_or_appends() {
            let mut collection = collection(&[[0.0; 3]], &["C"]);
            collection.set_frame(1, &points(&[[0.0, 0.0, 1.0]])).unwrap();
            collection.set_frame(2, &points(&[[0.0, 0.0, 2.0]])).unwrap();
            collection.set_frame(1, &points(&[[0.0, 0.0, 1.5]])).unwrap();
            assert_eq!(collection.frame_count(), 3);
            assert_eq!(collection.get_frame(1).unwrap(), points(&[[0.0, 0.0, 1.5]]));
            assert_eq!(
                collection.set_frame(5, &points(&[[0.0; 3]])),
                Err(EngineError::FrameOutOfRange { index: 5, count: 3 })
            );
        }

        #[test]
        fn deferred_frames_are_read_only() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection.set_frames(trajectory(), true).unwrap();
            let moved = points(&[[0.0, 0.0, 9.0], [1.0, 0.0, 9.0]]);
            assert_eq!(
                collection.set_frame(1, &moved),
                Err(EngineError::FrameOutOfRange { index: 1, count: 1 })
            );

            collection.materialize_frames();
            collection.set_frame(1, &moved).unwrap();
            assert_eq!(collection.get_frame(1).unwrap(), moved);
            assert_eq!(collection.get_frame(2).unwrap(), trajectory()[2]);
        }

        #[test]
        fn mismatched_frames_are_rejected() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            let mut frames = trajectory();
            frames[2].pop();
            assert_eq!(
                collection.set_frames(frames, false),
                Err(EngineError::ShapeMismatch {
                    expected: 2,
                    found: 1
                })
            );
            assert_eq!(collection.frame_count(), 1);
            assert_eq!(collection.get_positions(), points(&[[0.0; 3], [1.0; 3]]));
        }
    }

    mod attributes {
        use super::*;

        #[test]
        fn builtin_attributes_map_to_site_fields() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection
                .set_attribute("scale", AttributeColumn::Float(vec![0.5, 2.0]))
                .unwrap();
            collection
                .set_attribute("select", AttributeColumn::Int(vec![0, 3]))
                .unwrap();
            collection
                .set_attribute_with_indices("show", at(&[0]), AttributeColumn::Bool(vec![false]))
                .unwrap();
            assert_eq!(collection.sites()[1].scale, 2.0);
            assert_eq!(collection.sites()[1].select, 3);
            assert_eq!(
                collection.attribute("show"),
                Some(AttributeColumn::Bool(vec![false, true]))
            );
        }

        #[test]
        fn builtin_attributes_keep_their_kind() {
            let mut collection = collection(&[[0.0; 3]], &["C"]);
            assert!(
                collection
                    .set_attribute("scale", AttributeColumn::Int(vec![1]))
                    .is_err()
            );
            assert!(
                collection
                    .set_attribute("scale", AttributeColumn::Float(vec![-1.0]))
                    .is_err()
            );
            assert!(
                collection
                    .set_attribute("species", AttributeColumn::Str(vec!["O".to_string()]))
                    .is_err()
            );
            assert!(
                collection
                    .set_attribute("model_style", AttributeColumn::Int(vec![9]))
                    .is_err()
            );
            assert_eq!(collection.sites()[0].scale, 1.0);
        }

        #[test]
        fn custom_columns_are_created_on_partial_writes() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection
                .set_attribute_with_indices("tag", at(&[1]), AttributeColumn::Str(vec!["x".into()]))
                .unwrap();
            assert_eq!(
                collection.attribute("tag"),
                Some(AttributeColumn::Str(vec![String::new(), "x".to_string()]))
            );
            assert!(collection.attribute_names().contains(&"tag"));
            assert!(
                collection
                    .set_attribute("tag", AttributeColumn::Int(vec![1, 2, 3]))
                    .is_err()
            );
        }

        #[test]
        fn model_style_sets_scale_and_visibility() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["C", "O"]);
            collection
                .set_model_style(at(&[1]), ModelStyle::Wireframe)
                .unwrap();
            assert_eq!(
                collection.attribute("model_style"),
                Some(AttributeColumn::Int(vec![0, 3]))
            );
            assert!(!collection.sites()[1].show);
            collection
                .set_model_style(at(&[1]), ModelStyle::BallAndStick)
                .unwrap();
            assert!(collection.sites()[1].show);
            assert_eq!(collection.sites()[1].scale, 0.4);
        }

        #[test]
        fn sizes_combine_radius_and_scale() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3]], &["O", "C"]);
            collection.set_scale_for_species("O", 0.5).unwrap();
            assert_eq!(collection.radii().unwrap(), vec![0.66, 0.76]);
            assert_eq!(collection.sizes().unwrap(), vec![0.33, 0.76]);
            assert!(matches!(
                collection.set_scale_for_species("N", 1.0),
                Err(EngineError::UnknownSpecies(_))
            ));
        }

        #[test]
        fn replace_moves_sites_between_species() {
            let mut collection = collection(&[[0.0; 3], [1.0; 3], [2.0; 3]], &["O", "O", "C"]);
            collection.replace(at(&[0, 2]), "N").unwrap();
            assert_eq!(collection.species_labels(), vec!["N", "O", "N"]);
            assert_eq!(collection.registry().reference_count("N"), 2);
            assert_eq!(collection.registry().reference_count("O"), 1);
            assert_eq!(collection.registry().reference_count("C"), 0);
            collection.registry_mut().remove("C").unwrap();
        }
    }

    mod geometry {
        use super::*;

        #[test]
        fn distances_and_angles_use_global_positions() {
            let collection = collection(
                &[[0.0; 3], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]],
                &["O", "H", "H"],
            );
            assert_eq!(
                collection.distances(0, &[1, 2], false).unwrap(),
                vec![3.0, 4.0]
            );
            assert!((collection.angle(1, 0, 2, false).unwrap() - 90.0).abs() < 1e-9);
            assert_eq!(
                collection.center_of_geometry(),
                Some(Point3::new(1.5, 2.0, 0.0))
            );
            assert!(matches!(
                collection.distances(0, &[3], false),
                Err(EngineError::IndexOutOfRange { index: 3, len: 3 })
            ));
        }

        #[test]
        fn minimum_image_crosses_periodic_boundaries() {
            let mut collection = collection(
                &[[0.5, 5.0, 5.0], [9.5, 5.0, 5.0], [0.5, 6.0, 5.0]],
                &["Na", "Cl", "Cl"],
            );
            collection.set_cell(Cell::orthorhombic(10.0, 10.0, 10.0));
            collection.set_pbc([true, false, false]);

            let plain = collection.distances(0, &[1], false).unwrap();
            assert!((plain[0] - 9.0).abs() < 1e-9);
            let wrapped = collection.distances(0, &[1], true).unwrap();
            assert!((wrapped[0] - 1.0).abs() < 1e-9);

            assert!((collection.angle(1, 0, 2, false).unwrap() - 90.0).abs() < 1e-9);
            let placement = Placement::from_translation(Vector3::new(100.0, 0.0, 0.0));
            collection.set_placement(placement).unwrap();
            assert!((collection.angle(1, 0, 2, true).unwrap() - 90.0).abs() < 1e-9);
            assert!((collection.distances(0, &[1], true).unwrap()[0] - 1.0).abs() < 1e-9);

            collection.set_pbc([false; 3]);
            let unwrapped = collection.distances(0, &[1], true).unwrap();
            assert!((unwrapped[0] - 9.0).abs() < 1e-9);
        }

        #[test]
        fn scaled_positions_need_a_regular_cell() {
            let mut collection = collection(&[[1.0, 2.0, 2.5]], &["Cu"]);
            assert_eq!(collection.scaled_positions(), Err(EngineError::SingularCell));
            collection.set_cell(Cell::orthorhombic(2.0, 4.0, 5.0));
            let scaled = collection.scaled_positions().unwrap();
            assert!((scaled[0] - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-12);
        }

        #[test]
        fn empty_collection_has_no_center() {
            assert_eq!(SiteCollection::new("empty").center_of_geometry(), None);
        }
    }

    mod publish {
        use super::*;

        #[test]
        fn scene_receives_sites_instances_and_shape_keys() {
            let mut collection = collection(&[[0.0; 3], [0.5, 0.0, 0.0]], &["Na", "Cl"]);
            collection
                .set_frames(
                    vec![
                        points(&[[0.0; 3], [0.5, 0.0, 0.0]]),
                        points(&[[0.0; 3], [0.6, 0.0, 0.0]]),
                        points(&[[0.0; 3], [0.7, 0.0, 0.0]]),
                    ],
                    false,
                )
                .unwrap();
            let mut scene = InMemoryScene::new();
            collection.publish(&mut scene).unwrap();

            assert_eq!(
                scene.object_names(),
                vec!["test", "test_instancer_atom_Cl", "test_instancer_atom_Na"]
            );
            let object = scene.object("test").unwrap();
            assert_eq!(object.positions.len(), 2);
            assert_eq!(
                object.attributes.get("species"),
                Some(&AttributeColumn::Str(vec!["Na".into(), "Cl".into()]))
            );
            assert_eq!(object.shape_keys.len(), 2);
            assert_eq!(object.shape_keys[&2].keypoints.len(), 2);

            let sodium = scene.object("test_instancer_atom_Na").unwrap();
            assert_eq!(sodium.parent.as_deref(), Some("test"));
            let mesh = sodium.mesh.as_ref().unwrap();
            assert_eq!(mesh.materials, vec!["test_material_atom_Na_Na".to_string()]);
            assert!(mesh.smooth);
            assert_eq!(scene.material_count(), 2);

            collection.publish(&mut scene).unwrap();
            assert_eq!(scene.object_names().len(), 3);
        }

        #[test]
        fn republishing_drops_removed_species_and_attributes() {
            let mut collection = collection(&[[0.0; 3], [1.2, 0.0, 0.0]], &["C", "O"]);
            collection
                .set_attribute("charge", AttributeColumn::Float(vec![-0.1, 0.1]))
                .unwrap();
            let mut scene = InMemoryScene::new();
            collection.publish(&mut scene).unwrap();
            assert!(scene.object("test").unwrap().attributes.contains_key("charge"));

            collection.remove_attribute("charge");
            collection.delete(at(&[1])).unwrap();
            collection.registry_mut().remove("O").unwrap();
            collection.publish(&mut scene).unwrap();

            assert_eq!(
                scene.object_names(),
                vec!["test", "test_instancer_atom_C"]
            );
            let object = scene.object("test").unwrap();
            assert_eq!(object.positions.len(), 1);
            assert!(!object.attributes.contains_key("charge"));
            assert_eq!(
                object.attributes.get("species"),
                Some(&AttributeColumn::Str(vec!["C".into()]))
            );
        }

        #[test]
        fn deferred_frames_are_not_published() {
            let mut collection = collection(&[[0.0; 3]], &["Na"]);
            collection
                .set_frames(vec![points(&[[0.0; 3]]), points(&[[1.0; 3]])], true)
                .unwrap();
            let mut scene = InMemoryScene::new();
            collection.publish(&mut scene).unwrap();
            assert!(scene.object("test").unwrap().shape_keys.is_empty());
        }
    }
}
