//! Run options, loadable from `settings.json` or a TOML file.

use crate::error::SettingsError;
use crate::genetic::{DEFAULT_MUTATION_RATE, GaConfig, SelectionWeighting};
use crate::maze::{FruitPlacement, MazeTemplate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every recognized option. Field names serialize in PascalCase so existing
/// `settings.json` files load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[serde(default = "default_population")]
    pub population: usize,
    #[serde(default = "default_gene_size")]
    pub gene_size: usize,
    #[serde(default = "default_true")]
    pub mutation: bool,
    /// Forager evolutions the fast loop performs. Generations
    /// `0..Evolutions` are played and scored; the run stops as soon as the
    /// forager population has been evolved this many times, without playing
    /// the resulting generation.
    #[serde(default = "default_evolutions")]
    pub evolutions: u32,
    #[serde(default)]
    pub random_fruit_positions: bool,
    #[serde(default)]
    pub visual: bool,
    /// Print a line per finished episode.
    #[serde(default)]
    pub logs: bool,
    #[serde(default = "default_total_fruit")]
    pub total_fruit: usize,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    #[serde(default)]
    pub elitism: bool,
    #[serde(default = "default_action_cap")]
    pub action_cap: u32,
    #[serde(default)]
    pub selection: SelectionWeighting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Path to a maze template. The built-in reference grid when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maze: Option<PathBuf>,
}

fn default_population() -> usize {
    10
}

fn default_gene_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_evolutions() -> u32 {
    50
}

fn default_total_fruit() -> usize {
    4
}

fn default_mutation_rate() -> f32 {
    DEFAULT_MUTATION_RATE
}

fn default_action_cap() -> u32 {
    10_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            population: default_population(),
            gene_size: default_gene_size(),
            mutation: true,
            evolutions: default_evolutions(),
            random_fruit_positions: false,
            visual: false,
            logs: false,
            total_fruit: default_total_fruit(),
            mutation_rate: default_mutation_rate(),
            elitism: false,
            action_cap: default_action_cap(),
            selection: SelectionWeighting::default(),
            seed: None,
            maze: None,
        }
    }
}

impl Settings {
    /// Reads and validates a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings = match extension(path).as_str() {
            "json" => Self::from_json(&text)?,
            "toml" => Self::from_toml(&text)?,
            other => return Err(SettingsError::Format(other.to_string())),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the settings in the format the extension names.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let text = match extension(path).as_str() {
            "json" => serde_json::to_string_pretty(self)?,
            "toml" => self.to_toml()?,
            other => return Err(SettingsError::Format(other.to_string())),
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field, reason: &str| {
            Err(SettingsError::Invalid { field, reason: reason.to_string() })
        };
        if self.population < 2 {
            return invalid("Population", "must be at least 2");
        }
        if self.gene_size < 2 {
            return invalid("GeneSize", "must be at least 2");
        }
        if self.total_fruit < 1 {
            return invalid("TotalFruit", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("MutationRate", "must lie in [0, 1]");
        }
        if self.action_cap < 1 {
            return invalid("ActionCap", "must be at least 1");
        }
        Ok(())
    }

    pub fn ga_config(&self) -> GaConfig {
        GaConfig {
            population_size: self.population,
            gene_length: self.gene_size,
            use_mutation: self.mutation,
            mutation_rate: self.mutation_rate,
            weighting: self.selection,
        }
    }

    pub fn fruit_placement(&self) -> FruitPlacement {
        if self.random_fruit_positions { FruitPlacement::Random } else { FruitPlacement::Fixed }
    }

    /// The configured maze template, or the reference grid.
    pub fn template(&self) -> Result<MazeTemplate, SettingsError> {
        match &self.maze {
            Some(path) => Ok(MazeTemplate::parse(&std::fs::read_to_string(path)?)?),
            None => Ok(MazeTemplate::reference()),
        }
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
