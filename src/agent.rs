use crate::gene::Gene;
use crate::geometry::{Direction, Location};
use crate::kind::AgentKind;
use crate::maze::Maze;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Forager,
    Pursuer,
}

impl Role {
    pub const BOTH: [Role; 2] = [Role::Forager, Role::Pursuer];

    pub fn kind(self) -> AgentKind {
        match self {
            Role::Forager => AgentKind::FORAGER,
            Role::Pursuer => AgentKind::PURSUER,
        }
    }

    /// What a Look action steers towards.
    pub fn goal(self) -> AgentKind {
        match self {
            Role::Forager => AgentKind::FRUIT,
            Role::Pursuer => AgentKind::FORAGER,
        }
    }

    /// What a Look action flees from.
    pub fn avoid(self) -> AgentKind {
        match self {
            Role::Forager => AgentKind::PURSUER,
            Role::Pursuer => AgentKind::NONE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Forager => "forager",
            Role::Pursuer => "pursuer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Simulation-time actor. Refers to its gene by index into the population
/// owned by its genetic algorithm, so evolving the population never leaves a
/// dangling reference behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub role: Role,
    pub location: Location,
    pub spawn: Location,
    pub heading: Direction,
    pub gene_index: usize,
    pub cursor: usize,
    pub actions_executed: u32,
    /// Actions tried this episode, executed or not.
    pub attempts: u32,
    pub moves_taken: u32,
    /// Pursuer only: summed distance to the forager after each move.
    pub distance_total: f32,
    pub generation: u32,
}

impl Agent {
    pub fn new(role: Role, spawn: Location) -> Self {
        Self {
            role,
            location: spawn,
            spawn,
            heading: Direction::North,
            gene_index: 0,
            cursor: 0,
            actions_executed: 0,
            attempts: 0,
            moves_taken: 0,
            distance_total: 0.0,
            generation: 0,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.role.kind()
    }

    /// Index of the action to run next, advancing the cursor. The gene
    /// repeats forever, so the cursor wraps at the gene length.
    pub fn next_action_index(&mut self, gene: &Gene) -> usize {
        let index = self.cursor % gene.len().max(1);
        self.cursor = (index + 1) % gene.len().max(1);
        self.attempts += 1;
        index
    }

    /// Walks the agent back to its spawn cell and clears the per-episode
    /// counters. Occupancy is vacated and re-occupied in one step.
    pub fn reset(&mut self, maze: &mut Maze) {
        maze.move_occupant(self.kind(), self.location, self.spawn);
        self.location = self.spawn;
        self.heading = Direction::North;
        self.cursor = 0;
        self.actions_executed = 0;
        self.attempts = 0;
        self.moves_taken = 0;
        self.distance_total = 0.0;
    }
}
