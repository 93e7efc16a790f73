use crate::cli::InspectArgs;
use crate::error::Result;
use batoms::core::io::structure::StructureFile;
use batoms::engine::backend::InMemoryScene;
use batoms::workflows::{self, collection::SiteCollection};
use std::fmt::Write;
use std::path::Path;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let mut collection = load_collection(&args.input)?;

    if let Some(multiplicities) = args.repeat {
        info!("Repeating the collection {:?} times.", multiplicities);
        collection.repeat_cell(multiplicities)?;
    }
    if args.frames {
        info!("Loading deferred trajectory frames.");
        collection.materialize_frames();
    }

    let scene = if args.publish {
        let mut scene = InMemoryScene::new();
        collection.publish(&mut scene)?;
        info!("Published {} object(s).", scene.object_names().len());
        Some(scene)
    } else {
        None
    };

    print!("{}", summarize(&collection, scene.as_ref()));
    Ok(())
}

fn load_collection(path: &Path) -> Result<SiteCollection> {
    info!("Loading structure description from {:?}", path);
    let structure = StructureFile::load(path)?;
    Ok(workflows::build::build(&structure)?)
}

/// Renders a plain-text report of a collection and, optionally, its published scene.
pub fn summarize(collection: &SiteCollection, scene: Option<&InMemoryScene>) -> String {
    let mut out = String::new();
    let registry = collection.registry();

    let _ = writeln!(
        out,
        "Collection '{}': {} site(s), {} species, {} frame(s)",
        collection.label(),
        collection.len(),
        registry.len(),
        collection.frame_count()
    );
    let cell = collection.cell();
    if (0..3).any(|axis| cell.is_defined(axis)) {
        let _ = writeln!(
            out,
            "Cell volume: {:.3} A^3, pbc {:?}",
            cell.volume(),
            collection.pbc()
        );
    }

    let _ = writeln!(out, "Species:");
    for label in registry.labels() {
        let Some(species) = registry.species(label) else {
            continue;
        };
        let occupancies = species
            .occupancies
            .sorted()
            .iter()
            .map(|(element, occupancy)| format!("{} {:.3}", element, occupancy))
            .collect::<Vec<_>>()
            .join(", ");
        let main = species.main_element().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:<10} main {:<3} sites {:<6} [{}]",
            label,
            main,
            registry.reference_count(label),
            occupancies
        );
    }

    let _ = writeln!(out, "Attributes: {}", collection.attribute_names().join(", "));

    if let Some(scene) = scene {
        let _ = writeln!(
            out,
            "Scene: {} object(s), {} material(s)",
            scene.object_names().len(),
            scene.material_count()
        );
        for name in scene.object_names() {
            let _ = writeln!(out, "  {}", name);
        }
    }
    out
}
