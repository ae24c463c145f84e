use crate::context::SimContext;
use crate::error::SimResult;
use crate::system::System;

/// Object upkeep: growth and decay.
///
/// Registered with the default systems so its slot in the tick order is
/// fixed, but it does not change any state yet.
#[derive(Debug, Default)]
pub struct MaintenanceSystem;

impl MaintenanceSystem {
    /// A maintenance system.
    pub fn new() -> Self {
        Self
    }
}

impl System for MaintenanceSystem {
    fn name(&self) -> &str {
        "maintenance"
    }

    fn init(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let growing = ctx
            .world
            .objects()
            .filter(|o| ctx.registry.object(o.type_id).is_some_and(|t| t.growth_time > 0))
            .count();
        tracing::debug!(objects = ctx.world.objects().count(), growing, "maintenance ready");
        Ok(())
    }

    // TODO: advance growth_stage of objects whose type has a growth_time.
    fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::fixtures;

    #[test]
    fn leaves_objects_alone() {
        let mut sim = fixtures::sim(fixtures::world(), SimConfig::default());
        let before = sim.world().clone();
        sim.run(10, 1.0).unwrap();
        assert_eq!(
            sim.world().objects().collect::<Vec<_>>(),
            before.objects().collect::<Vec<_>>()
        );
        assert_eq!(MaintenanceSystem::new().name(), "maintenance");
    }
}
