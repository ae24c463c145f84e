use std::path::Path;

use loil_server::{Engine, EngineConfig, Server, ServerConfig};

use super::{RuleArgs, WorldArgs};

pub fn run(
    addr: &str,
    paths: &WorldArgs,
    rules: &RuleArgs,
    save: Option<&Path>,
) -> Result<(), String> {
    let sim = super::build_simulation(paths, rules.sim_config())?;
    tracing::info!(
        collision = %rules.collision,
        foraging = %rules.foraging,
        seed = rules.seed,
        "simulation ready"
    );

    let engine = Engine::spawn(sim, EngineConfig::default()).map_err(|e| e.to_string())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    let config = ServerConfig::default().with_addr(addr);
    let served = runtime.block_on(async {
        let server = Server::bind(config, engine.client()).await?;
        server
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutdown requested");
            })
            .await
    });
    runtime.shutdown_background();

    let sim = engine.shutdown().map_err(|e| e.to_string())?;
    if let Some(path) = save {
        super::save_world(&sim, path)?;
    }
    served.map_err(|e| format!("server on {addr} failed: {e}"))
}
