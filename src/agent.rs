use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use gridwalk_navigation::{
    AgentBuilder, DriverReport, GridMap, PlanDriver, PositionObserver, StopSignal, WorldPoint,
};

use crate::blackboard::{Blackboard, record_position, record_report};
use crate::bus::{PositionUpdate, Topic};
use crate::config::{AgentSettings, Settings};

/// Mirrors every mover position onto the blackboard and the position topic.
struct BusObserver {
    agent: Arc<str>,
    bb: Blackboard,
    topic: Topic<PositionUpdate>,
}

impl PositionObserver for BusObserver {
    fn on_position(&mut self, position: &WorldPoint) {
        record_position(&self.bb, &self.agent, *position);
        self.topic.publish(PositionUpdate {
            agent: Arc::clone(&self.agent),
            position: *position,
        });
    }
}

/// Builds one agent's driver from its settings. Fails on any setup problem.
pub fn build_agent(
    settings: &Settings,
    agent: &AgentSettings,
    grid: &Arc<GridMap>,
    bb: &Blackboard,
    topic: &Topic<PositionUpdate>,
    stop: StopSignal,
) -> anyhow::Result<PlanDriver> {
    let plan = agent.plan();
    let locations = agent.locations(&plan, grid, settings.driver.plan_positions);
    let observer = BusObserver {
        agent: Arc::from(agent.name.as_str()),
        bb: Arc::clone(bb),
        topic: topic.clone(),
    };

    let driver = AgentBuilder::new(agent.name.clone())
        .grid(Arc::clone(grid))
        .plan(plan)
        .locations(locations)
        .start(agent.start_cell(), agent.spawn_height)
        .mover_config(settings.mover)
        .driver_config(settings.driver_config())
        .observer(Box::new(observer))
        .stop_signal(stop)
        .build()
        .with_context(|| format!("building agent '{}'", agent.name))?;

    record_position(bb, &agent.name, *driver.mover().position());
    Ok(driver)
}

/// Runs one agent's plan to completion and files its report.
pub async fn agent_task(mut driver: PlanDriver, bb: Blackboard) -> DriverReport {
    info!(agent = %driver.name(), "Agent task started.");
    let report = driver.run().await;
    record_report(&bb, driver.name(), *driver.mover().position(), report);
    report
}
