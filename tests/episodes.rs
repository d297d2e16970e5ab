//! Episode-level behaviour on small hand-built mazes.

use maze_chase_ga::{
    Action, AgentKind, Direction, Gene, Location, MazeTemplate, Role, Settings, Simulation, Winner,
};

fn small_settings(total_fruit: usize) -> Settings {
    Settings {
        population: 2,
        gene_size: 2,
        total_fruit,
        seed: Some(11),
        ..Settings::default()
    }
}

fn set_gene(sim: &mut Simulation, role: Role, actions: Vec<Action>) {
    *sim.ga_mut(role).gene_mut(0).unwrap() = Gene::new(actions);
}

#[test]
fn two_moves_east_on_open_grid() {
    let template = MazeTemplate::open(
        5,
        5,
        Location::new(1, 1),
        Location::new(3, 3),
        vec![Location::new(1, 3)],
    )
    .unwrap();
    let mut sim = Simulation::configure(&small_settings(1), &template).unwrap();
    set_gene(&mut sim, Role::Forager, vec![Action::Move, Action::Move]);
    set_gene(&mut sim, Role::Pursuer, vec![Action::Turn { left_bias: 1.0 }, Action::Move]);
    sim.set_heading(Role::Forager, Direction::East);

    assert_eq!(sim.tick().unwrap(), None);
    assert_eq!(sim.agent(Role::Pursuer).heading, Direction::West);
    assert_eq!(sim.tick().unwrap(), None);

    assert_eq!(sim.agent(Role::Forager).location, Location::new(3, 1));
    assert_eq!(sim.agent(Role::Forager).actions_executed, 2);
    assert_eq!(sim.agent(Role::Pursuer).location, Location::new(2, 3));
    assert_eq!(sim.maze().count_occupied(AgentKind::FORAGER), 1);
    assert_eq!(sim.maze().count_occupied(AgentKind::PURSUER), 1);
}

#[test]
fn collecting_last_fruit_wins_and_resets() {
    let template = MazeTemplate::parse(
        "#######\n\
         #Foooo#\n\
         #######\n\
         #P....#\n\
         #######\n",
    )
    .unwrap();
    let mut sim = Simulation::configure(&small_settings(4), &template).unwrap();
    set_gene(&mut sim, Role::Forager, vec![Action::Move, Action::Move]);
    sim.set_heading(Role::Forager, Direction::East);

    let result = sim.step_episode().unwrap();
    assert_eq!(result.winner, Winner::Forager);
    assert_eq!(result.fruit_collected, 4);
    assert_eq!(result.ticks, 4);
    assert_eq!(result.forager_actions, 4);
    assert!((result.forager_fitness - 250.0).abs() < 1e-3);

    // The next episode starts clean.
    assert_eq!(sim.collected(), 0);
    assert_eq!(sim.maze().fruit_count(), 4);
    assert_eq!(sim.agent(Role::Forager).location, Location::new(1, 1));
    assert_eq!(sim.agent(Role::Forager).gene_index, 1);
    assert_eq!(sim.ga(Role::Forager).gene(0).unwrap().fitness, result.forager_fitness);
}

#[test]
fn capture_beats_final_fruit_in_same_tick() {
    let template = MazeTemplate::parse("#####\n#FoP#\n#####\n").unwrap();
    let mut sim = Simulation::configure(&small_settings(1), &template).unwrap();
    set_gene(&mut sim, Role::Forager, vec![Action::Move, Action::Turn { left_bias: 0.5 }]);
    set_gene(&mut sim, Role::Pursuer, vec![Action::Move, Action::Turn { left_bias: 0.5 }]);
    sim.set_heading(Role::Forager, Direction::East);
    sim.set_heading(Role::Pursuer, Direction::West);

    let result = sim.tick().unwrap().expect("episode should end on the first tick");
    assert_eq!(result.winner, Winner::Pursuer);
    assert_eq!(result.fruit_collected, 1);
    // Pursuer moved once and ended on the forager: zero average distance.
    assert!((result.pursuer_fitness - 1000.0).abs() < 1e-3);
    assert!((result.forager_fitness - 1000.0).abs() < 1e-3);
}

#[test]
fn unreachable_fruit_ends_in_stalemate() {
    let template = MazeTemplate::parse(
        "#######\n\
         #F.#.o#\n\
         #######\n\
         #P....#\n\
         #######\n",
    )
    .unwrap();
    let settings = Settings { action_cap: 5, ..small_settings(1) };
    let mut sim = Simulation::configure(&settings, &template).unwrap();
    set_gene(&mut sim, Role::Forager, vec![Action::Move, Action::Turn { left_bias: 0.5 }]);

    let result = sim.step_episode().unwrap();
    assert_eq!(result.winner, Winner::Stalemate);
    assert_eq!(result.fruit_collected, 0);
    assert_eq!(result.forager_fitness, 0.0);
    assert!(result.ticks <= 20);
}

#[test]
fn abandon_keeps_genes_and_occupancy() {
    let mut sim =
        Simulation::configure(&Settings { seed: Some(3), ..Settings::default() }, &MazeTemplate::reference())
            .unwrap();
    for _ in 0..5 {
        if sim.tick().unwrap().is_some() {
            break;
        }
    }
    let index = sim.agent(Role::Forager).gene_index;
    sim.abandon_episode().unwrap();

    let state = sim.state();
    assert_eq!(state.forager.gene_index, index);
    assert_eq!(state.forager.actions_executed, 0);
    assert_eq!(state.collected, 0);
    assert_eq!(state.ticks, 0);
    assert_eq!(state.fruit.len(), 4);
    assert_eq!(sim.maze().count_occupied(AgentKind::FORAGER), 1);
    assert_eq!(sim.maze().count_occupied(AgentKind::PURSUER), 1);
}

#[test]
fn same_seed_same_run() {
    let settings = Settings {
        population: 4,
        gene_size: 8,
        random_fruit_positions: true,
        seed: Some(2024),
        ..Settings::default()
    };
    let mut a = Simulation::configure(&settings, &MazeTemplate::reference()).unwrap();
    let mut b = Simulation::configure(&settings, &MazeTemplate::reference()).unwrap();
    for _ in 0..10 {
        assert_eq!(a.step_episode().unwrap(), b.step_episode().unwrap());
    }
    assert_eq!(a.state(), b.state());
    assert_eq!(a.ga(Role::Pursuer).population(), b.ga(Role::Pursuer).population());
}

#[test]
fn random_fruit_lands_on_free_floor() {
    let settings = Settings { random_fruit_positions: true, seed: Some(5), ..Settings::default() };
    let template = MazeTemplate::reference();
    let mut sim = Simulation::configure(&settings, &template).unwrap();
    for _ in 0..3 {
        for loc in sim.maze().fruit() {
            let cell = sim.maze().cell_at(loc).unwrap();
            assert!(!cell.wall);
            assert!(cell.spawn.is_empty());
        }
        assert_eq!(sim.maze().fruit_count(), 4);
        sim.step_episode().unwrap();
    }
}
