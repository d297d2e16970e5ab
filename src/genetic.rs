//! Population management for one agent role: roulette selection over a
//! fitness-proportionate wheel, single-point or uniform crossover, per-locus
//! mutation and generational replacement.

use crate::action::Action;
use crate::error::GaError;
use crate::gene::Gene;
use crate::kind::AgentKind;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MUTATION_RATE: f32 = 0.01;

/// Upper bound on discard-and-retry rounds in [`GeneticAlgorithm::crossover`].
pub const MAX_CROSSOVER_ATTEMPTS: usize = 1_000;

/// Upper bound on re-rolls when the second parent equals the first.
pub const MAX_SELECTION_ATTEMPTS: usize = 1_000;

/// How gene fitness turns into roulette-wheel weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionWeighting {
    /// Two-pass integer-percentage bucketing. Genes whose shares round to the
    /// same percentage collapse into one bucket, so selection is biased; kept
    /// for parity with the reference runs.
    #[default]
    LegacyBuckets,
    /// Prefix sums over the exact fitness values.
    Exact,
    /// Every gene weighs the same.
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossoverStrategy {
    /// Each locus swaps between the children with probability `ratio`.
    Uniform { ratio: f32 },
    /// Loci up to and including a random cut swap, the rest pass straight.
    SinglePoint,
}

impl Default for CrossoverStrategy {
    fn default() -> Self {
        CrossoverStrategy::Uniform { ratio: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    pub population_size: usize,
    pub gene_length: usize,
    pub use_mutation: bool,
    pub mutation_rate: f32,
    pub weighting: SelectionWeighting,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            gene_length: 10,
            use_mutation: true,
            mutation_rate: DEFAULT_MUTATION_RATE,
            weighting: SelectionWeighting::LegacyBuckets,
        }
    }
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), GaError> {
        if self.population_size == 0 {
            return Err(GaError::EmptyPopulation);
        }
        if self.population_size < 2 {
            return Err(GaError::InvalidConfig {
                field: "population_size",
                reason: "selection needs at least two genes".into(),
            });
        }
        if self.gene_length < 2 {
            return Err(GaError::InvalidConfig {
                field: "gene_length",
                reason: "a gene needs room for one Move and one Turn".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GaError::InvalidConfig {
                field: "mutation_rate",
                reason: format!("{} is not a probability", self.mutation_rate),
            });
        }
        Ok(())
    }
}

/// A group of population indices sharing one integer weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub weight: u32,
    pub members: Vec<usize>,
}

/// Roulette wheel over population indices.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionWheel {
    Buckets { buckets: Vec<Bucket>, sum: u32 },
    Cumulative { bounds: Vec<f64>, total: f64 },
}

impl SelectionWheel {
    pub fn build(population: &[Gene], weighting: SelectionWeighting) -> Result<Self, GaError> {
        match weighting {
            SelectionWeighting::LegacyBuckets => Self::legacy_buckets(population),
            SelectionWeighting::Exact => Self::exact(population),
            SelectionWeighting::Uniform => Self::uniform(population.len()),
        }
    }

    /// First pass: bucket genes by their percentage of the total fitness,
    /// truncated to an integer. Second pass: re-weight each bucket by the
    /// percentage its first member holds of the bucket representatives'
    /// summed fitness, merging buckets that land on the same weight. Both
    /// divisors are truncated to whole numbers first, so a population whose
    /// total fitness is below 1 has no wheel.
    pub fn legacy_buckets(population: &[Gene]) -> Result<Self, GaError> {
        let total = checked_total(population)?;
        let whole_total = total.trunc();
        if whole_total < 1.0 {
            return Err(GaError::DegenerateFitness { total });
        }

        let mut first: Vec<(u32, Vec<usize>)> = Vec::new();
        for (i, gene) in population.iter().enumerate() {
            let share = (gene.fitness * 100.0 / whole_total) as u32;
            match first.iter_mut().find(|(key, _)| *key == share) {
                Some((_, members)) => members.push(i),
                None => first.push((share, vec![i])),
            }
        }

        let single_sum: f32 = first.iter().map(|(_, m)| population[m[0]].fitness).sum();
        let whole_single_sum = single_sum.trunc();
        if whole_single_sum < 1.0 {
            return Err(GaError::DegenerateFitness { total: single_sum });
        }

        let mut buckets: Vec<Bucket> = Vec::new();
        for (_, members) in first {
            let weight = (population[members[0]].fitness * 100.0 / whole_single_sum) as u32;
            match buckets.iter_mut().find(|b| b.weight == weight) {
                Some(bucket) => bucket.members.extend(members),
                None => buckets.push(Bucket { weight, members }),
            }
        }

        let sum: u32 = buckets.iter().map(|b| b.weight).sum();
        if sum == 0 {
            return Err(GaError::DegenerateFitness { total });
        }
        Ok(SelectionWheel::Buckets { buckets, sum })
    }

    pub fn exact(population: &[Gene]) -> Result<Self, GaError> {
        checked_total(population)?;
        Ok(Self::cumulative(population.iter().map(|g| g.fitness as f64)))
    }

    pub fn uniform(len: usize) -> Result<Self, GaError> {
        if len == 0 {
            return Err(GaError::EmptyPopulation);
        }
        Ok(Self::cumulative(std::iter::repeat(1.0).take(len)))
    }

    fn cumulative<I: Iterator<Item = f64>>(weights: I) -> Self {
        let mut running = 0.0;
        let bounds: Vec<f64> = weights
            .map(|w| {
                running += w;
                running
            })
            .collect();
        SelectionWheel::Cumulative { bounds, total: running }
    }

    /// One spin of the wheel.
    pub fn spin<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        match self {
            SelectionWheel::Buckets { buckets, sum } => {
                let roll = rng.gen_range(0..*sum);
                let mut previous = 0;
                for bucket in buckets {
                    // Inclusive upper bound: a zero-weight bucket still wins
                    // when the roll lands exactly on its start.
                    if roll >= previous && roll <= bucket.weight + previous {
                        return bucket.members.choose(rng).copied();
                    }
                    previous += bucket.weight;
                }
                None
            }
            SelectionWheel::Cumulative { bounds, total } => {
                let roll = rng.gen_range(0.0..*total);
                bounds.iter().position(|&bound| roll < bound).or(bounds.len().checked_sub(1))
            }
        }
    }

    /// Two different population indices.
    pub fn pick_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(usize, usize), GaError> {
        let first = self.spin(rng).ok_or(GaError::DegenerateSelection { attempts: 1 })?;
        for _ in 0..MAX_SELECTION_ATTEMPTS {
            if let Some(second) = self.spin(rng) {
                if second != first {
                    return Ok((first, second));
                }
            }
        }
        Err(GaError::DegenerateSelection { attempts: MAX_SELECTION_ATTEMPTS })
    }
}

fn checked_total(population: &[Gene]) -> Result<f32, GaError> {
    if population.is_empty() {
        return Err(GaError::EmptyPopulation);
    }
    let total: f32 = population.iter().map(|g| g.fitness).sum();
    let sane = population.iter().all(|g| g.fitness.is_finite() && g.fitness >= 0.0);
    if !sane || !(total > 0.0) || !total.is_finite() {
        return Err(GaError::DegenerateFitness { total });
    }
    Ok(total)
}

/// Owns the population for one role.
#[derive(Debug, Clone)]
pub struct GeneticAlgorithm {
    config: GaConfig,
    goal: AgentKind,
    avoid: AgentKind,
    population: Vec<Gene>,
}

impl GeneticAlgorithm {
    /// Validates `config` and builds a random initial population.
    pub fn new<R: Rng + ?Sized>(
        config: GaConfig,
        goal: AgentKind,
        avoid: AgentKind,
        rng: &mut R,
    ) -> Result<Self, GaError> {
        config.validate()?;
        let mut ga = Self { config, goal, avoid, population: Vec::new() };
        ga.initialize(rng);
        Ok(ga)
    }

    /// Adopts a hand-built population. Every gene must be valid and sized.
    pub fn with_population(
        config: GaConfig,
        goal: AgentKind,
        avoid: AgentKind,
        population: Vec<Gene>,
    ) -> Result<Self, GaError> {
        config.validate()?;
        let ga = Self { config, goal, avoid, population: Vec::new() };
        if population.len() != ga.config.population_size {
            return Err(GaError::InvalidConfig {
                field: "population_size",
                reason: format!(
                    "expected {} genes, got {}",
                    ga.config.population_size,
                    population.len()
                ),
            });
        }
        for gene in &population {
            ga.check_length(gene)?;
            if !gene.is_valid() {
                return Err(GaError::InvalidGene);
            }
        }
        Ok(Self { population, ..ga })
    }

    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.population = (0..self.config.population_size)
            .map(|_| Gene::random(self.config.gene_length, self.goal, self.avoid, rng))
            .collect();
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn population(&self) -> &[Gene] {
        &self.population
    }

    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    pub fn gene(&self, index: usize) -> Option<&Gene> {
        self.population.get(index)
    }

    pub fn gene_mut(&mut self, index: usize) -> Option<&mut Gene> {
        self.population.get_mut(index)
    }

    /// A fresh action of a random kind, Look actions using this role's masks.
    pub fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action::random(self.goal, self.avoid, rng)
    }

    fn check_length(&self, gene: &Gene) -> Result<(), GaError> {
        if gene.len() != self.config.gene_length {
            return Err(GaError::GeneLength {
                expected: self.config.gene_length,
                found: gene.len(),
            });
        }
        Ok(())
    }

    /// Two offspring built locus by locus from the parents. Offspring that
    /// break gene validity are thrown away and the whole crossover is redrawn.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Gene,
        parent2: &Gene,
        strategy: CrossoverStrategy,
        rng: &mut R,
    ) -> Result<[Gene; 2], GaError> {
        self.check_length(parent1)?;
        self.check_length(parent2)?;
        let n = self.config.gene_length;

        for _ in 0..MAX_CROSSOVER_ATTEMPTS {
            let cut = rng.gen_range(0..n);
            let mut first = Vec::with_capacity(n);
            let mut second = Vec::with_capacity(n);

            for (locus, (&a, &b)) in parent1.actions().iter().zip(parent2.actions()).enumerate() {
                let swap = match strategy {
                    CrossoverStrategy::Uniform { ratio } => rng.r#gen::<f32>() < ratio,
                    CrossoverStrategy::SinglePoint => locus <= cut,
                };
                if swap {
                    first.push(b);
                    second.push(a);
                } else {
                    first.push(a);
                    second.push(b);
                }
            }

            let children = [Gene::new(first), Gene::new(second)];
            if children.iter().all(Gene::is_valid) {
                return Ok(children);
            }
        }
        Err(GaError::DegenerateCrossover { attempts: MAX_CROSSOVER_ATTEMPTS })
    }

    /// Replaces each locus with a random action with probability `rate`. An
    /// invalid result is discarded and the input returned unchanged.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        gene: &Gene,
        rate: f32,
        rng: &mut R,
    ) -> Result<Gene, GaError> {
        self.check_length(gene)?;
        let mut mutated = gene.clone();
        for locus in 0..mutated.len() {
            if rng.r#gen::<f32>() < rate {
                mutated.set(locus, self.random_action(rng));
            }
        }
        Ok(if mutated.is_valid() { mutated } else { gene.clone() })
    }

    /// Replaces the population using the configured selection weighting.
    pub fn evolve<R: Rng + ?Sized>(&mut self, keep_elite: bool, rng: &mut R) -> Result<(), GaError> {
        self.evolve_with(self.config.weighting, keep_elite, rng)
    }

    /// Roulette-selects distinct parent pairs, single-point crosses them until
    /// the population is refilled, resets fitness and applies mutation. With
    /// `keep_elite` the fittest outgoing gene takes the last slot untouched.
    /// On error the current population is left as it was.
    pub fn evolve_with<R: Rng + ?Sized>(
        &mut self,
        weighting: SelectionWeighting,
        keep_elite: bool,
        rng: &mut R,
    ) -> Result<(), GaError> {
        let size = self.config.population_size;
        let wheel = SelectionWheel::build(&self.population, weighting)?;

        let mut next: Vec<Gene> = Vec::with_capacity(size + 1);
        while next.len() < size {
            let (a, b) = wheel.pick_pair(rng)?;
            let children = self.crossover(
                &self.population[a],
                &self.population[b],
                CrossoverStrategy::SinglePoint,
                rng,
            )?;
            next.extend(children);
        }
        next.truncate(size);

        let elite = if keep_elite { self.fittest().map(|(_, g)| g.clone()) } else { None };
        if let Some(elite) = elite {
            next[size - 1] = elite;
        }

        for gene in &mut next {
            gene.reset_fitness();
        }

        if self.config.use_mutation {
            let mutable = if keep_elite { size - 1 } else { size };
            for gene in next.iter_mut().take(mutable) {
                *gene = self.mutate(gene, self.config.mutation_rate, rng)?;
            }
        }

        self.population = next;
        Ok(())
    }

    /// Mean fitness across the population.
    pub fn average_fitness(&self) -> f32 {
        if self.population.is_empty() {
            return 0.0;
        }
        self.population.iter().map(|g| g.fitness).sum::<f32>() / self.population.len() as f32
    }

    pub fn fittest(&self) -> Option<(usize, &Gene)> {
        self.population
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.fitness.total_cmp(&b.fitness))
    }
}
