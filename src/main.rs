mod agent;        // builds and runs one agent per configured plan
mod blackboard;   // latest position and report of every agent
mod bus;          // broadcast topic for position updates
mod config;       // settings from config/default.toml and the environment

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{self, EnvFilter};

use blackboard::{Blackboard, raise_fault, snapshot};
use bus::{PositionUpdate, Topic};
use gridwalk_navigation::stop_channel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Gridwalk started.");
    if let Err(e) = run().await {
        error!("Gridwalk aborted: {:#}", e);
        return Err(e);
    }
    info!("Gridwalk finished.");
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let settings = config::load_settings().context("loading configuration")?;
    let grid = Arc::new(settings.build_grid().context("building grid")?);
    info!(
        width = grid.width(),
        height = grid.height(),
        cell_size = grid.cell_size(),
        blocked = grid.blocked_count(),
        "Grid ready"
    );

    if settings.agents.is_empty() {
        warn!("No agents configured, nothing to do.");
        return Ok(());
    }

    let bb: Blackboard = Arc::default();
    let position_topic: Topic<PositionUpdate> = Topic::new(64);
    let (stop_handle, stop) = stop_channel();

    // Every agent is built before any of them moves.
    let drivers = settings
        .agents
        .iter()
        .map(|a| agent::build_agent(&settings, a, &grid, &bb, &position_topic, stop.clone()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut position_rx = position_topic.subscribe();
    let position_trace = tokio::spawn(async move {
        loop {
            match position_rx.recv().await {
                Ok(update) => trace!(
                    agent = %update.agent,
                    x = update.position.x,
                    y = update.position.y,
                    z = update.position.z,
                    "Position"
                ),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Position trace lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping agents.");
            stop_handle.stop();
        }
    });

    info!(agents = drivers.len(), "Spawning agent tasks...");
    let mut tasks = JoinSet::new();
    for driver in drivers {
        tasks.spawn(agent::agent_task(driver, Arc::clone(&bb)));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Agent task failed: {}", e);
            raise_fault(&bb, &format!("agent task failed: {}", e));
        }
    }
    position_trace.abort();

    let state = snapshot(&bb);
    for (name, record) in &state.agents {
        if let Some(report) = record.report {
            info!(
                agent = %name,
                moved = report.moved,
                skipped = report.skipped,
                unreachable = report.unreachable,
                waypoints = report.waypoints,
                stopped = report.stopped,
                last_update_ms = record.updated.elapsed().as_millis() as u64,
                "Agent summary"
            );
        }
    }
    if !state.faults.is_empty() {
        anyhow::bail!("{} agent task(s) failed", state.faults.len());
    }
    Ok(())
}
