use std::sync::Arc;

use loil_core::World;
use loil_simulation::{SimConfig, Simulation};

use super::WorldArgs;

pub fn run(paths: &WorldArgs) -> Result<(), String> {
    let registry = Arc::new(super::load_registry(&paths.config_dir)?);
    let counts = registry.counts();
    let world = World::load(&paths.world).map_err(|e| e.to_string())?;

    let locations = world.locations().count();
    let characters = world.characters().count();
    let creatures = world.creatures().count();
    let objects = world.objects().count();
    Simulation::new(world, registry, SimConfig::default())
        .map_err(|e| format!("invalid world: {e}"))?;

    println!("  All checks passed for '{}'.", paths.world.display());
    println!(
        "  {} object, {} road, {} ground, {} item, {} creature types",
        counts.objects, counts.roads, counts.grounds, counts.items, counts.creatures
    );
    println!(
        "  {locations} locations, {characters} characters, {creatures} creatures, {objects} objects"
    );

    Ok(())
}
