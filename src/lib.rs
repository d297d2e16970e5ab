//! Co-evolution of forager and pursuer behaviour programs in a grid maze.
//!
//! Each role owns a population of fixed-length action programs ("genes").
//! A [`Simulation`] plays every gene through one episode per generation,
//! scores it, and asks the role's [`GeneticAlgorithm`] for the next
//! population once all genes have played.

pub mod action;
pub mod agent;
pub mod error;
pub mod gene;
pub mod genetic;
pub mod geometry;
pub mod kind;
pub mod maze;
pub mod report;
pub mod settings;
pub mod simulation;

pub use action::{Action, ActionKind};
pub use agent::{Agent, Role};
pub use error::{GaError, MazeError, Result, SettingsError, SimulationError};
pub use gene::Gene;
pub use genetic::{CrossoverStrategy, GaConfig, GeneticAlgorithm, SelectionWeighting, SelectionWheel};
pub use geometry::{Direction, Location, Turn};
pub use kind::AgentKind;
pub use maze::{FruitPlacement, Maze, MazeTemplate, REFERENCE_MAZE};
pub use report::{FileSink, FitnessRecord, FitnessSink, MemorySink, NullSink};
pub use settings::Settings;
pub use simulation::{EpisodeResult, Generations, RunSummary, Simulation, StateSnapshot, Winner};
