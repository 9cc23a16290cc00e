//! The synchronous multi-agent simulation loop.
//!
//! Each time step runs six phases to completion before the next begins:
//! intent, conflict resolution, execution, broadcast, marker refresh, and
//! the termination check. Conflict resolution processes agents in
//! ascending id order, which makes every run fully deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::SimulationConfig;
use crate::coordination::registry::PositionRegistry;
use crate::error::{CoreError, Result};
use crate::events::SimEvent;
use crate::grid::{Cell, EnvironmentSpec, Grid, Position};
use crate::id::{AgentId, RunId};

/// How a run ended
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every agent occupies its goal
    Success,
    /// No agent moved and no agent holds a path; declared stuck, not an
    /// error
    Stalled,
    /// The safety valve fired; the run is incomplete
    StepCapExceeded,
}

/// What one time step did, for the reporting collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u32,
    /// Agent positions after the execution phase
    pub positions: BTreeMap<AgentId, Position>,
    /// Agents that moved this step
    pub moved: Vec<AgentId>,
    pub events: Vec<SimEvent>,
    /// Set on the terminating step, `None` while the run continues
    pub outcome: Option<RunOutcome>,
}

/// Terminal summary of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub steps: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Total reality mismatches flagged over the run
    pub mismatches: usize,
    /// Total waits recorded by conflict resolution
    pub waits: usize,
}

/// Drives a set of agents over a shared ground-truth grid in discrete,
/// fully synchronous time steps
#[derive(Debug)]
pub struct Coordinator {
    run_id: RunId,
    config: SimulationConfig,
    grid: Grid,
    agents: Vec<Agent>,
    registry: PositionRegistry,
    step: u32,
    started_at: DateTime<Utc>,
    mismatches: usize,
    waits: usize,
}

impl Coordinator {
    /// Validate the environment and configuration and set up agents with
    /// their initial sense and plan. Every malformed-input failure
    /// surfaces here, before the first step.
    pub fn new(spec: EnvironmentSpec, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let (grid, starts, goal) = spec.into_grid()?;

        if starts.len() > config.max_agents {
            return Err(CoreError::TooManyAgents {
                requested: starts.len(),
                max: config.max_agents,
            });
        }

        let run_id = RunId::generate();
        let mut agents = Vec::with_capacity(starts.len());
        for (ordinal, start) in starts.iter().enumerate() {
            let mut agent = Agent::new(
                AgentId::new(ordinal as u32),
                *start,
                goal,
                config.sensor_radius,
                &grid,
            );
            agent.plan();
            agents.push(agent);
        }
        let registry =
            PositionRegistry::new(agents.iter().map(|a| (a.id(), a.position())));

        tracing::info!(
            run = %run_id,
            rows = grid.rows(),
            cols = grid.cols(),
            agents = agents.len(),
            goal = %goal,
            "simulation initialized"
        );

        Ok(Self {
            run_id,
            config,
            grid,
            agents,
            registry,
            step: 0,
            started_at: Utc::now(),
            mismatches: 0,
            waits: 0,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    pub fn current_step(&self) -> u32 {
        self.step
    }

    /// Advance the simulation by one full time step
    pub fn step(&mut self) -> StepReport {
        self.step += 1;
        let step = self.step;
        tracing::debug!(run = %self.run_id, step, "time step");

        let mut events: Vec<SimEvent> = Vec::new();
        let mut moved: Vec<AgentId> = Vec::new();

        // Phase 1: every agent not at its goal proposes its next cell
        let intents: BTreeMap<AgentId, Option<Position>> = self
            .agents
            .iter()
            .map(|a| {
                let intent = if a.at_goal() { None } else { a.next_step() };
                (a.id(), intent)
            })
            .collect();

        // Phases 2 and 3: resolve conflicts and execute, ascending id.
        // Occupancy is checked against live positions, so a convoy can
        // advance within a single step once its head has moved on.
        for i in 0..self.agents.len() {
            let id = self.agents[i].id();
            if self.agents[i].at_goal() {
                continue;
            }
            let Some(target) = intents.get(&id).copied().flatten() else {
                continue;
            };

            let lowest_contender = intents
                .iter()
                .find(|(_, intent)| **intent == Some(target))
                .map(|(id, _)| *id);
            let contended = intents
                .values()
                .filter(|intent| **intent == Some(target))
                .count()
                > 1;
            if contended && lowest_contender != Some(id) {
                tracing::debug!(agent = %id, target = %target, "waiting for priority agent");
                events.push(SimEvent::PriorityWait {
                    agent: id,
                    target,
                    yielded_to: lowest_contender.unwrap_or(id),
                });
                self.note_wait(i, &mut events);
                continue;
            }

            if let Some(occupant) = self.registry.occupant(target, id) {
                if target == self.agents[i].goal() {
                    tracing::info!(
                        agent = %id,
                        target = %target,
                        "entering goal even though it is occupied"
                    );
                    events.push(SimEvent::GoalEntryWhileOccupied { agent: id, target });
                } else {
                    tracing::debug!(agent = %id, target = %target, "target cell is occupied");
                    events.push(SimEvent::OccupancyWait {
                        agent: id,
                        target,
                        occupied_by: occupant,
                    });
                    self.note_wait(i, &mut events);
                    continue;
                }
            }

            if let Some(event) = self.agents[i].step(&self.grid, &mut self.registry) {
                events.push(event);
            }
            self.agents[i].reset_wait();
            self.agents[i].plan();
            moved.push(id);
        }

        // Phase 4: aggregate every agent's facts and broadcast to all.
        // A full barrier: no agent receives until every move is done.
        let mut pool: BTreeMap<Position, Cell> = BTreeMap::new();
        for agent in &self.agents {
            pool.extend(agent.share());
        }
        for agent in &mut self.agents {
            agent.receive(&pool);
        }
        tracing::debug!(run = %self.run_id, step, facts = pool.len(), "broadcast complete");

        // Phase 5: rewrite robot markers from the registry
        let positions: Vec<Position> = self.registry.iter().map(|(_, p)| p).collect();
        for agent in &mut self.agents {
            agent.refresh_markers(positions.iter().copied());
        }

        // Phase 6: termination check
        let outcome = if self.agents.iter().all(Agent::at_goal) {
            tracing::info!(run = %self.run_id, step, "all agents reached the goal");
            Some(RunOutcome::Success)
        } else if moved.is_empty() && self.agents.iter().all(|a| !a.has_path()) {
            tracing::info!(run = %self.run_id, step, "no further progress possible");
            Some(RunOutcome::Stalled)
        } else if step >= self.config.max_steps {
            tracing::info!(run = %self.run_id, step, "step cap reached; run incomplete");
            Some(RunOutcome::StepCapExceeded)
        } else {
            None
        };

        self.mismatches += events.iter().filter(|e| e.is_reality_mismatch()).count();
        self.waits += events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SimEvent::PriorityWait { .. } | SimEvent::OccupancyWait { .. }
                )
            })
            .count();

        StepReport {
            step,
            positions: self.registry.iter().collect(),
            moved,
            events,
            outcome,
        }
    }

    /// Run to termination, invoking `on_step` with every step report
    pub fn run_with<F: FnMut(&StepReport)>(&mut self, mut on_step: F) -> RunSummary {
        let outcome = loop {
            let report = self.step();
            let outcome = report.outcome;
            on_step(&report);
            if let Some(outcome) = outcome {
                break outcome;
            }
        };

        RunSummary {
            run_id: self.run_id,
            outcome,
            steps: self.step,
            started_at: self.started_at,
            finished_at: Utc::now(),
            mismatches: self.mismatches,
            waits: self.waits,
        }
    }

    /// Run to termination, discarding per-step reports
    pub fn run(&mut self) -> RunSummary {
        self.run_with(|_| {})
    }

    /// Increment an agent's wait counter; at the threshold, force a replan
    /// toward its own goal and reset (the anti-deadlock nudge)
    fn note_wait(&mut self, index: usize, events: &mut Vec<SimEvent>) {
        let agent = &mut self.agents[index];
        let waits = agent.register_wait();
        if waits >= self.config.wait_threshold {
            tracing::debug!(agent = %agent.id(), waits, "wait threshold reached; replanning");
            let own_goal = agent.goal();
            agent.replan(own_goal);
            agent.reset_wait();
            events.push(SimEvent::ForcedReplan {
                agent: agent.id(),
                waits,
            });
        }
    }
}
