//! Behaviour instructions and how each one changes the world.
//!
//! An action either performs one state transition and reports `true`
//! ("executed", counts against the agent's action budget) or changes nothing
//! and reports `false`. The gene cursor advances either way.

use crate::agent::{Agent, Role};
use crate::geometry::{Direction, Location, Turn};
use crate::kind::AgentKind;
use crate::maze::Maze;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Move,
    Turn,
    Look,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Move, ActionKind::Turn, ActionKind::Look];

    /// A uniformly random kind, never equal to `except`.
    pub fn random_except<R: Rng + ?Sized>(except: Option<ActionKind>, rng: &mut R) -> ActionKind {
        let candidates: Vec<ActionKind> =
            Self::ALL.iter().copied().filter(|&k| Some(k) != except).collect();
        *candidates.choose(rng).unwrap_or(&ActionKind::Move)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Step one cell along the current heading.
    Move,
    /// Turn left with probability `left_bias`, otherwise right. The bias is
    /// fixed when the action is created; the roll happens on every execution.
    Turn { left_bias: f32 },
    /// Scan all four lines of sight, head for `goal`, flee from `avoid`.
    Look { goal: AgentKind, avoid: AgentKind },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move => ActionKind::Move,
            Action::Turn { .. } => ActionKind::Turn,
            Action::Look { .. } => ActionKind::Look,
        }
    }

    pub fn random_turn<R: Rng + ?Sized>(rng: &mut R) -> Action {
        Action::Turn { left_bias: rng.r#gen::<f32>() }
    }

    pub fn random_of_kind<R: Rng + ?Sized>(
        kind: ActionKind,
        goal: AgentKind,
        avoid: AgentKind,
        rng: &mut R,
    ) -> Action {
        match kind {
            ActionKind::Move => Action::Move,
            ActionKind::Turn => Self::random_turn(rng),
            ActionKind::Look => Action::Look { goal, avoid },
        }
    }

    pub fn random<R: Rng + ?Sized>(goal: AgentKind, avoid: AgentKind, rng: &mut R) -> Action {
        let kind = ActionKind::random_except(None, rng);
        Self::random_of_kind(kind, goal, avoid, rng)
    }

    /// Runs the action for `agent`. `forager_at` is where the forager stands
    /// right now; pursuers score their moves against it.
    pub fn execute<R: Rng + ?Sized>(
        &self,
        agent: &mut Agent,
        maze: &mut Maze,
        forager_at: Location,
        rng: &mut R,
    ) -> bool {
        match *self {
            Action::Move => {
                let Some(target) = maze.neighbor_towards(agent.location, agent.heading) else {
                    return false;
                };
                maze.move_occupant(agent.kind(), agent.location, target);
                agent.location = target;
                if agent.role == Role::Pursuer {
                    agent.moves_taken += 1;
                    agent.distance_total += agent.location.distance_to(forager_at);
                }
                true
            }
            Action::Turn { left_bias } => {
                let turn = roll_turn(left_bias, rng);
                let target = agent.heading.rotate(turn);
                if maze.can_move(agent.location, target) {
                    agent.heading = target;
                    true
                } else {
                    false
                }
            }
            Action::Look { goal, avoid } => {
                let sight = maze.look_all(agent.location);
                let reaction = reaction(goal, avoid, agent.heading, &sight);
                if maze.can_move(agent.location, reaction) {
                    agent.heading = reaction;
                } else if let Some((dir, _)) = maze
                    .available_directions(agent.location)
                    .into_iter()
                    .find(|(dir, _)| *dir != agent.heading)
                {
                    agent.heading = dir;
                }
                true
            }
        }
    }
}

fn roll_turn<R: Rng + ?Sized>(left_bias: f32, rng: &mut R) -> Turn {
    if rng.r#gen::<f32>() <= left_bias { Turn::Left } else { Turn::Right }
}

/// Direction a Look action wants to face given what it sees. The first
/// direction (canonical order) showing the goal wins; failing that, the
/// opposite of the first direction showing the threat; failing that, the
/// current heading.
pub fn reaction(
    goal: AgentKind,
    avoid: AgentKind,
    heading: Direction,
    sight: &[(Direction, AgentKind)],
) -> Direction {
    if !goal.is_empty() {
        if let Some((dir, _)) = sight.iter().find(|(_, seen)| seen.contains(goal)) {
            return *dir;
        }
    }
    if !avoid.is_empty() {
        if let Some((dir, _)) = sight.iter().find(|(_, seen)| seen.contains(avoid)) {
            return dir.opposite();
        }
    }
    heading
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move => f.write_str("Move"),
            Action::Turn { left_bias } => write!(f, "Turn(left {:.0}%)", left_bias * 100.0),
            Action::Look { goal, avoid } => write!(f, "Look(+{goal} -{avoid})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::MazeTemplate;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn setup() -> (Maze, Agent, Agent) {
        let template =
            MazeTemplate::open(5, 5, Location::new(1, 1), Location::new(3, 3), vec![]).unwrap();
        let maze = Maze::from_template(&template);
        let forager = Agent::new(Role::Forager, template.forager_spawn());
        let pursuer = Agent::new(Role::Pursuer, template.pursuer_spawn());
        (maze, forager, pursuer)
    }

    #[test]
    fn move_into_wall_is_not_executed() {
        let (mut maze, mut forager, _) = setup();
        let mut rng = SmallRng::seed_from_u64(1);
        let at = forager.location;
        assert!(!Action::Move.execute(&mut forager, &mut maze, at, &mut rng));
        assert_eq!(forager.location, Location::new(1, 1));
    }

    #[test]
    fn pursuer_move_accumulates_distance() {
        let (mut maze, forager, mut pursuer) = setup();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(Action::Move.execute(&mut pursuer, &mut maze, forager.location, &mut rng));
        assert_eq!(pursuer.location, Location::new(3, 2));
        assert_eq!(pursuer.moves_taken, 1);
        let expected = Location::new(3, 2).distance_to(Location::new(1, 1));
        assert!((pursuer.distance_total - expected).abs() < 1e-6);
        assert_eq!(maze.count_occupied(AgentKind::PURSUER), 1);
    }

    #[test]
    fn full_left_bias_always_turns_left() {
        let (mut maze, _, mut pursuer) = setup();
        // Pursuer at (3,3) faces North; move it to the open centre first.
        maze.move_occupant(AgentKind::PURSUER, pursuer.location, Location::new(2, 2));
        pursuer.location = Location::new(2, 2);
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..20 {
            pursuer.heading = Direction::North;
            let turn = Action::Turn { left_bias: 1.0 };
            assert!(turn.execute(&mut pursuer, &mut maze, Location::UNSET, &mut rng));
            assert_eq!(pursuer.heading, Direction::West);
        }
    }

    #[test]
    fn blocked_turn_keeps_heading() {
        let (mut maze, mut forager, _) = setup();
        let mut rng = SmallRng::seed_from_u64(3);
        // At (1,1) facing East, a left turn would face North into the wall.
        forager.heading = Direction::East;
        let turn = Action::Turn { left_bias: 1.0 };
        assert!(!turn.execute(&mut forager, &mut maze, Location::UNSET, &mut rng));
        assert_eq!(forager.heading, Direction::East);
    }

    #[test]
    fn reaction_prefers_goal_then_flees() {
        let sight = [
            (Direction::North, AgentKind::NONE),
            (Direction::East, AgentKind::PURSUER),
            (Direction::South, AgentKind::FRUIT),
            (Direction::West, AgentKind::NONE),
        ];
        assert_eq!(
            reaction(AgentKind::FRUIT, AgentKind::PURSUER, Direction::North, &sight),
            Direction::South
        );
        assert_eq!(
            reaction(AgentKind::FORAGER, AgentKind::PURSUER, Direction::North, &sight),
            Direction::West
        );
        assert_eq!(
            reaction(AgentKind::FORAGER, AgentKind::NONE, Direction::South, &sight),
            Direction::South
        );
    }

    #[test]
    fn look_in_dead_end_keeps_heading() {
        let template = MazeTemplate::parse("#####\n#F.P#\n#####\n").unwrap();
        let mut maze = Maze::from_template(&template);
        let mut forager = Agent::new(Role::Forager, template.forager_spawn());
        forager.heading = Direction::East;
        let mut rng = SmallRng::seed_from_u64(21);

        // The pursuer is East, so the flee reaction is West, which is a wall.
        // The only open direction is the current heading.
        let sight = maze.look_all(forager.location);
        assert_eq!(
            reaction(Role::Forager.goal(), Role::Forager.avoid(), forager.heading, &sight),
            Direction::West
        );
        let flee = Action::Look { goal: Role::Forager.goal(), avoid: Role::Forager.avoid() };
        assert!(flee.execute(&mut forager, &mut maze, Location::UNSET, &mut rng));
        assert_eq!(forager.heading, Direction::East);
        assert_eq!(forager.location, Location::new(1, 1));
    }

    #[test]
    fn look_turns_towards_goal_and_always_executes() {
        let (mut maze, mut forager, mut pursuer) = setup();
        let mut rng = SmallRng::seed_from_u64(5);
        maze.move_occupant(AgentKind::PURSUER, pursuer.location, Location::new(3, 1));
        pursuer.location = Location::new(3, 1);

        let look = Action::Look { goal: Role::Pursuer.goal(), avoid: Role::Pursuer.avoid() };
        assert!(look.execute(&mut pursuer, &mut maze, forager.location, &mut rng));
        assert_eq!(pursuer.heading, Direction::West);

        // Forager sees the pursuer to the East and flees West, which is a
        // wall, so it falls back to the first open direction not its heading.
        let flee = Action::Look { goal: Role::Forager.goal(), avoid: Role::Forager.avoid() };
        forager.heading = Direction::North;
        assert!(flee.execute(&mut forager, &mut maze, Location::UNSET, &mut rng));
        assert_eq!(forager.heading, Direction::East);
    }

    #[test]
    fn random_kind_skips_excluded() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            assert_ne!(ActionKind::random_except(Some(ActionKind::Look), &mut rng), ActionKind::Look);
        }
    }
}
