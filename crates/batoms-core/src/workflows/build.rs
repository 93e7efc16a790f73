use super::collection::SiteCollection;
use crate::core::elements::{ColorStyle, RadiusStyle};
use crate::core::geometry::lattice::Cell;
use crate::core::geometry::placement::Placement;
use crate::core::io::structure::{SpeciesProps, StructureFile};
use crate::core::models::instance::InstanceShape;
use crate::core::models::selection::IndexSelection;
use crate::core::models::site::ModelStyle;
use crate::core::models::species::ElementComposition;
use crate::engine::config::{RegistryConfig, RegistryConfigBuilder};
use crate::engine::error::EngineError;
use crate::engine::registry::SpeciesRegistry;
use nalgebra::{Point3, Vector3};
use std::str::FromStr;
use tracing::{info, instrument};

/// Builds a site collection from a structure description.
///
/// Species listed under `species-props` are defined first, with their own styles and
/// instance settings; remaining labels are auto-defined from their prefix. Custom
/// attributes are attached before the optional repeat, so they are replicated with
/// the sites. The collection is finally placed at `location`.
#[instrument(skip_all, name = "build_workflow")]
pub fn build(structure: &StructureFile) -> Result<SiteCollection, EngineError> {
    info!(
        "Building collection '{}' from {} site(s) and {} frame(s).",
        structure.label,
        structure.species.len(),
        structure.frames.len() + 1
    );

    let config = registry_config(structure)?;
    let mut registry = SpeciesRegistry::with_config(&structure.label, config);
    for (label, props) in &structure.species_props {
        define_species(&mut registry, label, props)?;
    }

    let frames: Vec<Vec<Point3<f64>>> = std::iter::once(&structure.positions)
        .chain(&structure.frames)
        .map(|frame| frame.iter().map(|&p| Point3::from(p)).collect())
        .collect();
    let mut collection = SiteCollection::create_with_frames(
        registry,
        frames,
        &structure.species,
        structure.defer_frames,
    )?;
    collection.set_frame_start(structure.frame_start);
    if let Some(rows) = structure.cell {
        collection.set_cell(Cell::new(rows));
    }
    collection.set_pbc(structure.pbc.to_array());

    if let Some(name) = &structure.model_style {
        let style = ModelStyle::from_str(name).map_err(|_| EngineError::UnknownStyle {
            kind: "model",
            name: name.clone(),
        })?;
        let everything = IndexSelection::Mask(vec![true; collection.len()]);
        collection.set_model_style(everything, style)?;
    }
    for (name, data) in &structure.attributes {
        collection.set_attribute(name, data.clone().into())?;
    }

    if let Some(multiplicities) = structure.repeat {
        info!("Repeating the structure {:?} times.", multiplicities);
        collection.repeat_cell(multiplicities)?;
    }
    let location = Vector3::from(structure.location);
    collection.set_placement(Placement::from_translation(location))?;

    info!(
        "Collection '{}' ready: {} site(s), {} species, {} frame(s).",
        collection.label(),
        collection.len(),
        collection.registry().len(),
        collection.frame_count()
    );
    Ok(collection)
}

fn registry_config(structure: &StructureFile) -> Result<RegistryConfig, EngineError> {
    let mut builder = RegistryConfigBuilder::new();
    if let Some(name) = &structure.radius_style {
        builder = builder.radius_style(parse_radius_style(name)?);
    }
    if let Some(name) = &structure.color_style {
        builder = builder.color_style(parse_color_style(name)?);
    }
    if let Some(name) = &structure.shape {
        builder = builder.shape(parse_shape(name)?);
    }
    if let Some(scale) = structure.scale {
        builder = builder.scale(scale);
    }
    builder
        .build()
        .map_err(|e| EngineError::InvalidStructure(e.to_string()))
}

fn define_species(
    registry: &mut SpeciesRegistry,
    label: &str,
    props: &SpeciesProps,
) -> Result<(), EngineError> {
    let composition = match (&props.element, &props.elements) {
        (Some(_), Some(_)) => {
            return Err(EngineError::InvalidStructure(format!(
                "species '{}' sets both 'element' and 'elements'",
                label
            )));
        }
        (Some(element), None) => ElementComposition::Pure(element.clone()),
        (None, Some(entries)) => ElementComposition::Fractional(entries.clone()),
        (None, None) => ElementComposition::from_label(label),
    };
    let radius_style = match &props.radius_style {
        Some(name) => parse_radius_style(name)?,
        None => registry.config().radius_style,
    };
    let color_style = match &props.color_style {
        Some(name) => parse_color_style(name)?,
        None => registry.config().color_style,
    };
    let shape = props.shape.as_deref().map(parse_shape).transpose()?;

    registry.define(label, &composition, radius_style, color_style)?;
    if let Some(shape) = shape {
        registry.set_shape(label, shape)?;
    }
    if let Some(scale) = props.scale {
        registry.set_instance_scale(label, [scale; 3])?;
    }
    if let Some(color) = props.color {
        registry.set_color(label, color)?;
    }
    Ok(())
}

fn parse_radius_style(name: &str) -> Result<RadiusStyle, EngineError> {
    RadiusStyle::from_str(name).map_err(|_| EngineError::UnknownStyle {
        kind: "radius",
        name: name.to_string(),
    })
}

fn parse_color_style(name: &str) -> Result<ColorStyle, EngineError> {
    ColorStyle::from_str(name).map_err(|_| EngineError::UnknownStyle {
        kind: "color",
        name: name.to_string(),
    })
}

fn parse_shape(name: &str) -> Result<InstanceShape, EngineError> {
    InstanceShape::from_str(name).map_err(|_| EngineError::UnknownShape(name.to_string()))
}
