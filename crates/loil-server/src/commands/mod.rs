pub mod check;
pub mod serve;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use loil_core::{Catalog, Registry, World};
use loil_simulation::{CollisionMode, ForagingMode, SimConfig, Simulation};

/// Where the world and its type catalogs live.
#[derive(Args, Debug, Clone)]
pub struct WorldArgs {
    /// World file
    #[arg(short, long, default_value = "data/world.json")]
    pub world: PathBuf,

    /// Directory holding the *_types.json catalogs
    #[arg(short, long, default_value = "data/config")]
    pub config_dir: PathBuf,
}

/// Rule modes and seeding for a run.
#[derive(Args, Debug, Clone)]
pub struct RuleArgs {
    /// Tile sharing: exclusive or shared
    #[arg(long, default_value_t = CollisionMode::Exclusive)]
    pub collision: CollisionMode,

    /// Creature feeding: explicit or incidental
    #[arg(long, default_value_t = ForagingMode::Explicit)]
    pub foraging: ForagingMode,

    /// RNG seed for creature behavior
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

impl RuleArgs {
    pub fn sim_config(&self) -> SimConfig {
        SimConfig::default()
            .with_seed(self.seed)
            .with_collision(self.collision)
            .with_foraging(self.foraging)
    }
}

fn load_registry(config_dir: &Path) -> Result<Registry, String> {
    let catalog = Catalog::load_dir(config_dir).map_err(|e| e.to_string())?;
    Registry::from_catalog(&catalog).map_err(|e| e.to_string())
}

/// Load catalogs and world, place every entity and install the systems.
fn build_simulation(paths: &WorldArgs, config: SimConfig) -> Result<Simulation, String> {
    let registry = Arc::new(load_registry(&paths.config_dir)?);
    let world = World::load(&paths.world).map_err(|e| e.to_string())?;
    let sim = Simulation::new(world, registry, config).map_err(|e| format!("invalid world: {e}"))?;
    Ok(sim.with_default_systems())
}

fn save_world(sim: &Simulation, path: &Path) -> Result<(), String> {
    sim.export_world().save(path).map_err(|e| e.to_string())
}
