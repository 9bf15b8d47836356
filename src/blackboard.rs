use parking_lot::RwLock;
use std::collections::HashMap;
use std::{sync::Arc, time::Instant};

use gridwalk_navigation::{DriverReport, WorldPoint};

/// Latest known state of one agent.
#[derive(Clone, Debug)]
pub struct AgentRecord {
    pub position: WorldPoint,
    pub updated: Instant,
    pub report: Option<DriverReport>,
}

#[derive(Clone, Debug, Default)]
pub struct State {
    pub agents: HashMap<String, AgentRecord>,
    pub faults: Vec<String>,
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_position(bb: &Blackboard, agent: &str, position: WorldPoint) {
    let mut g = bb.write();
    match g.agents.get_mut(agent) {
        Some(record) => {
            record.position = position;
            record.updated = Instant::now();
        }
        None => {
            g.agents.insert(
                agent.to_string(),
                AgentRecord {
                    position,
                    updated: Instant::now(),
                    report: None,
                },
            );
        }
    }
}

pub fn record_report(bb: &Blackboard, agent: &str, position: WorldPoint, report: DriverReport) {
    let mut g = bb.write();
    let record = g.agents.entry(agent.to_string()).or_insert(AgentRecord {
        position,
        updated: Instant::now(),
        report: None,
    });
    record.position = position;
    record.updated = Instant::now();
    record.report = Some(report);
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}
