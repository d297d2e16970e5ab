//! The episode loop: both agents act once per tick, termination is checked
//! after both settle, and finished episodes are scored into the active genes.
//!
//! Every gene of a population plays exactly one episode per generation. When
//! a role runs out of genes its population is evolved and the next
//! generation starts from index 0.

use crate::agent::{Agent, Role};
use crate::error::{GaError, Result};
use crate::geometry::{Direction, Location};
use crate::genetic::{GeneticAlgorithm, SelectionWeighting};
use crate::kind::AgentKind;
use crate::maze::{FruitPlacement, Maze, MazeTemplate};
use crate::report::{FitnessSink, NullSink};
use crate::settings::Settings;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fitness numerators are scaled by this before dividing by effort.
pub const FITNESS_SCALE: f32 = 1000.0;

/// An agent that keeps trying actions without executing any still ends the
/// episode after this many times the action cap.
pub const ATTEMPT_CAP_FACTOR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    Forager,
    Pursuer,
    Stalemate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Generations {
    pub forager: u32,
    pub pursuer: u32,
}

/// Outcome of one finished episode. `generations` are those of the genes that
/// just played, before any evolution the episode triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub winner: Winner,
    pub forager_fitness: f32,
    pub pursuer_fitness: f32,
    pub forager_actions: u32,
    pub pursuer_actions: u32,
    pub fruit_collected: usize,
    pub ticks: u64,
    pub generations: Generations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub location: Location,
    pub heading: Direction,
    pub gene_index: usize,
    pub cursor: usize,
    pub actions_executed: u32,
    pub generation: u32,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            location: agent.location,
            heading: agent.heading,
            gene_index: agent.gene_index,
            cursor: agent.cursor,
            actions_executed: agent.actions_executed,
            generation: agent.generation,
        }
    }
}

/// Read-only copy of everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub width: usize,
    pub height: usize,
    pub walls: Vec<bool>,
    /// Row-major occupancy with fruit folded in.
    pub occupancy: Vec<AgentKind>,
    pub fruit: Vec<Location>,
    pub forager: AgentView,
    pub pursuer: AgentView,
    pub collected: usize,
    pub total_fruit: usize,
    pub ticks: u64,
    pub episodes: u64,
}

/// Win counts and final averages over a stretch of episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub episodes: u64,
    pub forager_wins: u64,
    pub pursuer_wins: u64,
    pub stalemates: u64,
    pub fruit_collected: u64,
    pub generations: Generations,
    pub best_forager_fitness: f32,
    pub best_pursuer_fitness: f32,
}

impl RunSummary {
    pub fn record(&mut self, result: &EpisodeResult) {
        self.episodes += 1;
        match result.winner {
            Winner::Forager => self.forager_wins += 1,
            Winner::Pursuer => self.pursuer_wins += 1,
            Winner::Stalemate => self.stalemates += 1,
        }
        self.fruit_collected += result.fruit_collected as u64;
        self.best_forager_fitness = self.best_forager_fitness.max(result.forager_fitness);
        self.best_pursuer_fitness = self.best_pursuer_fitness.max(result.pursuer_fitness);
    }
}

pub struct Simulation {
    maze: Maze,
    forager: Agent,
    pursuer: Agent,
    forager_ga: GeneticAlgorithm,
    pursuer_ga: GeneticAlgorithm,
    collected: usize,
    total_fruit: usize,
    placement: FruitPlacement,
    action_cap: u32,
    elitism: bool,
    ticks: u64,
    episodes: u64,
    rng: SmallRng,
    sink: Box<dyn FitnessSink + Send>,
}

impl Simulation {
    /// Validates `settings`, builds both populations and lays out the first
    /// episode's fruit. Unseeded settings draw the seed from the OS.
    pub fn configure(settings: &Settings, template: &MazeTemplate) -> Result<Self> {
        settings.validate()?;
        let mut rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let config = settings.ga_config();
        let forager_ga = GeneticAlgorithm::new(
            config.clone(),
            Role::Forager.goal(),
            Role::Forager.avoid(),
            &mut rng,
        )?;
        let pursuer_ga =
            GeneticAlgorithm::new(config, Role::Pursuer.goal(), Role::Pursuer.avoid(), &mut rng)?;

        let mut maze = Maze::from_template(template);
        let placement = settings.fruit_placement();
        maze.replace_fruit(settings.total_fruit, placement, &mut rng)?;

        info!(
            width = maze.width(),
            height = maze.height(),
            population = settings.population,
            gene_size = settings.gene_size,
            seed = ?settings.seed,
            "simulation configured"
        );

        Ok(Self {
            maze,
            forager: Agent::new(Role::Forager, template.forager_spawn()),
            pursuer: Agent::new(Role::Pursuer, template.pursuer_spawn()),
            forager_ga,
            pursuer_ga,
            collected: 0,
            total_fruit: settings.total_fruit,
            placement,
            action_cap: settings.action_cap,
            elitism: settings.elitism,
            ticks: 0,
            episodes: 0,
            rng,
            sink: Box::new(NullSink),
        })
    }

    pub fn set_sink(&mut self, sink: Box<dyn FitnessSink + Send>) {
        self.sink = sink;
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn agent(&self, role: Role) -> &Agent {
        match role {
            Role::Forager => &self.forager,
            Role::Pursuer => &self.pursuer,
        }
    }

    pub fn ga(&self, role: Role) -> &GeneticAlgorithm {
        match role {
            Role::Forager => &self.forager_ga,
            Role::Pursuer => &self.pursuer_ga,
        }
    }

    pub fn ga_mut(&mut self, role: Role) -> &mut GeneticAlgorithm {
        match role {
            Role::Forager => &mut self.forager_ga,
            Role::Pursuer => &mut self.pursuer_ga,
        }
    }

    pub fn set_heading(&mut self, role: Role, heading: Direction) {
        match role {
            Role::Forager => self.forager.heading = heading,
            Role::Pursuer => self.pursuer.heading = heading,
        }
    }

    pub fn generation(&self, role: Role) -> u32 {
        self.agent(role).generation
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn total_fruit(&self) -> usize {
        self.total_fruit
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn state(&self) -> StateSnapshot {
        let walls = (0..self.maze.height())
            .flat_map(|y| (0..self.maze.width()).map(move |x| Location::new(x as i32, y as i32)))
            .map(|loc| self.maze.cell_at(loc).is_some_and(|c| c.wall))
            .collect();
        StateSnapshot {
            width: self.maze.width(),
            height: self.maze.height(),
            walls,
            occupancy: self.maze.occupancy_snapshot(),
            fruit: self.maze.fruit(),
            forager: AgentView::from(&self.forager),
            pursuer: AgentView::from(&self.pursuer),
            collected: self.collected,
            total_fruit: self.total_fruit,
            ticks: self.ticks,
            episodes: self.episodes,
        }
    }

    /// One forager action, one pursuer action, then the termination checks.
    /// Returns the result when this tick ended the episode.
    pub fn tick(&mut self) -> Result<Option<EpisodeResult>> {
        self.act(Role::Forager);
        self.act(Role::Pursuer);
        self.ticks += 1;

        if self.maze.collect_fruit(self.forager.location) {
            self.collected += 1;
            debug!(at = %self.forager.location, collected = self.collected, "fruit collected");
        }

        let attempt_cap = self.action_cap.saturating_mul(ATTEMPT_CAP_FACTOR);
        let winner = if self.forager.location == self.pursuer.location {
            Some(Winner::Pursuer)
        } else if self.collected >= self.total_fruit {
            Some(Winner::Forager)
        } else if [&self.forager, &self.pursuer]
            .iter()
            .any(|a| a.actions_executed >= self.action_cap || a.attempts >= attempt_cap)
        {
            Some(Winner::Stalemate)
        } else {
            None
        };

        match winner {
            Some(winner) => self.finish(winner).map(Some),
            None => Ok(None),
        }
    }

    /// Ticks until the current episode ends.
    pub fn step_episode(&mut self) -> Result<EpisodeResult> {
        loop {
            if let Some(result) = self.tick()? {
                return Ok(result);
            }
        }
    }

    /// Plays episodes until the forager population has been evolved
    /// `evolutions` times, calling `on_episode` after each one.
    pub fn run<F>(&mut self, evolutions: u32, mut on_episode: F) -> Result<RunSummary>
    where
        F: FnMut(&EpisodeResult),
    {
        let mut summary = RunSummary::default();
        while self.forager.generation < evolutions {
            let result = self.step_episode()?;
            on_episode(&result);
            summary.record(&result);
        }
        summary.generations = Generations {
            forager: self.forager.generation,
            pursuer: self.pursuer.generation,
        };
        info!(
            episodes = summary.episodes,
            forager_wins = summary.forager_wins,
            pursuer_wins = summary.pursuer_wins,
            stalemates = summary.stalemates,
            "run finished"
        );
        Ok(summary)
    }

    /// Throws the in-flight episode away: agents and fruit reset, no fitness
    /// written, genes unchanged.
    pub fn abandon_episode(&mut self) -> Result<()> {
        debug!(ticks = self.ticks, "episode abandoned");
        self.reset_episode()
    }

    fn act(&mut self, role: Role) {
        let forager_at = self.forager.location;
        let (agent, ga) = match role {
            Role::Forager => (&mut self.forager, &self.forager_ga),
            Role::Pursuer => (&mut self.pursuer, &self.pursuer_ga),
        };
        let Some(gene) = ga.gene(agent.gene_index) else {
            return;
        };
        let index = agent.next_action_index(gene);
        let Some(action) = gene.get(index).copied() else {
            return;
        };
        if action.execute(agent, &mut self.maze, forager_at, &mut self.rng) {
            agent.actions_executed += 1;
        }
    }

    fn forager_fitness(&self) -> f32 {
        if self.forager.actions_executed == 0 {
            return 0.0;
        }
        let share = self.collected as f32 * FITNESS_SCALE / self.total_fruit as f32;
        share / self.forager.actions_executed as f32
    }

    fn pursuer_fitness(&self) -> f32 {
        if self.pursuer.actions_executed == 0 {
            return 0.0;
        }
        let max = self.maze.max_distance();
        let average = if self.pursuer.moves_taken == 0 {
            max
        } else {
            self.pursuer.distance_total / self.pursuer.moves_taken as f32
        };
        // Interior diagonals are longer than `max`, so the raw proximity can go
        // negative. Selection wheels reject negative fitness; those genes score 0.
        let proximity = ((max - average) * FITNESS_SCALE / max).max(0.0);
        proximity / self.pursuer.actions_executed as f32
    }

    fn finish(&mut self, winner: Winner) -> Result<EpisodeResult> {
        let result = EpisodeResult {
            winner,
            forager_fitness: self.forager_fitness(),
            pursuer_fitness: self.pursuer_fitness(),
            forager_actions: self.forager.actions_executed,
            pursuer_actions: self.pursuer.actions_executed,
            fruit_collected: self.collected,
            ticks: self.ticks,
            generations: Generations {
                forager: self.forager.generation,
                pursuer: self.pursuer.generation,
            },
        };

        for (role, fitness, actions) in [
            (Role::Forager, result.forager_fitness, result.forager_actions),
            (Role::Pursuer, result.pursuer_fitness, result.pursuer_actions),
        ] {
            let index = self.agent(role).gene_index;
            if let Some(gene) = self.ga_mut(role).gene_mut(index) {
                gene.fitness = fitness;
                gene.actions_executed = actions;
            }
        }
        debug!(
            ?winner,
            forager_fitness = result.forager_fitness,
            pursuer_fitness = result.pursuer_fitness,
            ticks = result.ticks,
            "episode finished"
        );

        self.advance(Role::Forager)?;
        self.advance(Role::Pursuer)?;
        self.episodes += 1;
        self.reset_episode()?;
        Ok(result)
    }

    /// Moves `role` on to its next gene, evolving once the population is spent.
    fn advance(&mut self, role: Role) -> Result<()> {
        let (agent, ga) = match role {
            Role::Forager => (&mut self.forager, &mut self.forager_ga),
            Role::Pursuer => (&mut self.pursuer, &mut self.pursuer_ga),
        };
        agent.gene_index += 1;
        if agent.gene_index < ga.len() {
            return Ok(());
        }

        let average = ga.average_fitness();
        self.sink.record(role, agent.generation, average)?;
        info!(%role, generation = agent.generation, average, "evolving population");

        match ga.evolve(self.elitism, &mut self.rng) {
            Ok(()) => {}
            Err(err @ (GaError::DegenerateFitness { .. } | GaError::DegenerateSelection { .. })) => {
                warn!(%role, error = %err, "fitness wheel unusable, selecting uniformly");
                ga.evolve_with(SelectionWeighting::Uniform, self.elitism, &mut self.rng)?;
            }
            Err(err) => return Err(err.into()),
        }
        agent.generation += 1;
        agent.gene_index = 0;
        Ok(())
    }

    fn reset_episode(&mut self) -> Result<()> {
        self.forager.reset(&mut self.maze);
        self.pursuer.reset(&mut self.maze);
        self.maze.replace_fruit(self.total_fruit, self.placement, &mut self.rng)?;
        self.collected = 0;
        self.ticks = 0;
        Ok(())
    }
}
