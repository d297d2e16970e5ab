//! Error types for the maze, the genetic algorithm, settings and the
//! simulation loop.
//!
//! Grid queries never fail: out-of-bounds lookups return `None`. Only
//! configuration mistakes and degenerate populations surface here.

use thiserror::Error;

/// Errors raised by the genetic algorithm.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GaError {
    #[error("gene has no Move or no Turn action")]
    InvalidGene,

    #[error("gene length mismatch: expected {expected}, found {found}")]
    GeneLength { expected: usize, found: usize },

    #[error("population fitness is degenerate (total {total})")]
    DegenerateFitness { total: f32 },

    #[error("could not select two distinct parents after {attempts} draws")]
    DegenerateSelection { attempts: usize },

    #[error("crossover produced no valid offspring after {attempts} attempts")]
    DegenerateCrossover { attempts: usize },

    #[error("population is empty")]
    EmptyPopulation,

    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

/// Errors raised while parsing or populating a maze.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze template is empty")]
    Empty,

    #[error("maze must be at least 3x3, got {width}x{height}")]
    TooSmall { width: usize, height: usize },

    #[error("row {row} has width {found}, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },

    #[error("no {0} spawn in maze template")]
    MissingSpawn(&'static str),

    #[error("more than one {0} spawn in maze template")]
    DuplicateSpawn(&'static str),

    #[error("{what} at ({x}, {y}) lies on the border wall")]
    OnBorder { what: &'static str, x: usize, y: usize },

    #[error("maze has {available} fixed fruit slots, {requested} requested")]
    NotEnoughFruitSlots { requested: usize, available: usize },

    #[error("maze has {available} free cells, {requested} fruit requested")]
    NotEnoughFreeCells { requested: usize, available: usize },
}

/// Errors raised by the simulation loop.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Genetic(#[from] GaError),

    #[error(transparent)]
    Maze(#[from] MazeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("fitness sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// Errors raised while loading, validating or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot encode settings as TOML: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("unsupported settings format {0:?}, expected .json or .toml")]
    Format(String),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("maze template: {0}")]
    Maze(#[from] MazeError),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
