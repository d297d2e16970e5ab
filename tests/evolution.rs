//! Population-level properties of the genetic algorithm.

use maze_chase_ga::{
    ActionKind, AgentKind, CrossoverStrategy, GaConfig, GaError, GeneticAlgorithm, SelectionWeighting,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn forager_ga(size: usize, length: usize, seed: u64) -> (GeneticAlgorithm, SmallRng) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let config = GaConfig { population_size: size, gene_length: length, ..GaConfig::default() };
    let ga = GeneticAlgorithm::new(config, AgentKind::FRUIT, AgentKind::PURSUER, &mut rng).unwrap();
    (ga, rng)
}

#[test]
fn initial_population_is_valid_and_sized() {
    let (ga, _) = forager_ga(25, 12, 1);
    assert_eq!(ga.population().len(), 25);
    for gene in ga.population() {
        assert_eq!(gene.len(), 12);
        assert!(gene.count(ActionKind::Move) >= 1);
        assert!(gene.count(ActionKind::Turn) >= 1);
    }
}

#[test]
fn crossover_children_partition_parents() {
    let (ga, mut rng) = forager_ga(6, 10, 2);
    for strategy in [CrossoverStrategy::SinglePoint, CrossoverStrategy::Uniform { ratio: 0.3 }] {
        for pair in ga.population().windows(2) {
            let [c1, c2] = ga.crossover(&pair[0], &pair[1], strategy, &mut rng).unwrap();
            for locus in 0..10 {
                let (a, b) = (pair[0].actions()[locus], pair[1].actions()[locus]);
                let (x, y) = (c1.actions()[locus], c2.actions()[locus]);
                assert!((x == a && y == b) || (x == b && y == a), "locus {locus} mixes parents");
            }
        }
    }
}

#[test]
fn equal_fitness_population_of_ten_evolves() {
    let (mut ga, mut rng) = forager_ga(10, 10, 3);
    for i in 0..10 {
        ga.gene_mut(i).unwrap().fitness = 4.0;
    }
    ga.evolve(false, &mut rng).unwrap();
    assert_eq!(ga.population().len(), 10);
    assert!(ga.population().iter().all(|g| g.is_valid() && g.fitness == 0.0));
}

#[test]
fn all_zero_fitness_is_reported_not_divided() {
    let (mut ga, mut rng) = forager_ga(4, 6, 4);
    for weighting in [SelectionWeighting::LegacyBuckets, SelectionWeighting::Exact] {
        let err = ga.evolve_with(weighting, false, &mut rng).unwrap_err();
        assert!(matches!(err, GaError::DegenerateFitness { .. }), "{err}");
    }
    ga.evolve_with(SelectionWeighting::Uniform, false, &mut rng).unwrap();
}

#[test]
fn many_generations_stay_valid() {
    let (mut ga, mut rng) = forager_ga(8, 6, 5);
    for generation in 0..30 {
        for i in 0..8 {
            ga.gene_mut(i).unwrap().fitness = (i + generation) as f32 % 5.0 + 0.5;
        }
        ga.evolve(generation % 2 == 0, &mut rng).unwrap();
        assert!(ga.population().iter().all(|g| g.is_valid() && g.len() == 6));
    }
}
