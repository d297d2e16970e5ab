use crate::action::{Action, ActionKind};
use crate::kind::AgentKind;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-length behaviour program plus the score it earned in its last
/// episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    actions: Vec<Action>,
    pub fitness: f32,
    pub actions_executed: u32,
}

impl Gene {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, fitness: 0.0, actions_executed: 0 }
    }

    /// A random valid gene: one Move, one Turn, then `length - 2` actions
    /// whose kind never repeats the kind drawn just before, all shuffled.
    pub fn random<R: Rng + ?Sized>(
        length: usize,
        goal: AgentKind,
        avoid: AgentKind,
        rng: &mut R,
    ) -> Self {
        let mut actions = Vec::with_capacity(length.max(2));
        actions.push(Action::Move);
        actions.push(Action::random_turn(rng));

        let mut last = None;
        for _ in 0..length.saturating_sub(2) {
            let kind = ActionKind::random_except(last, rng);
            actions.push(Action::random_of_kind(kind, goal, avoid, rng));
            last = Some(kind);
        }
        actions.shuffle(rng);
        Self::new(actions)
    }

    /// At least one Move and one Turn.
    pub fn is_valid(&self) -> bool {
        self.count(ActionKind::Move) >= 1 && self.count(ActionKind::Turn) >= 1
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn get(&self, locus: usize) -> Option<&Action> {
        self.actions.get(locus)
    }

    pub fn set(&mut self, locus: usize, action: Action) {
        self.actions[locus] = action;
    }

    pub fn reset_fitness(&mut self) {
        self.fitness = 0.0;
        self.actions_executed = 0;
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn random_genes_are_valid_and_sized() {
        let mut rng = SmallRng::seed_from_u64(42);
        for length in 2..30 {
            let gene = Gene::random(length, AgentKind::FRUIT, AgentKind::PURSUER, &mut rng);
            assert_eq!(gene.len(), length);
            assert!(gene.is_valid(), "{gene}");
            assert_eq!(gene.fitness, 0.0);
        }
    }

    #[test]
    fn validity_needs_move_and_turn() {
        let look = Action::Look { goal: AgentKind::FRUIT, avoid: AgentKind::NONE };
        assert!(!Gene::new(vec![Action::Move, Action::Move]).is_valid());
        assert!(!Gene::new(vec![Action::Turn { left_bias: 0.2 }, look]).is_valid());
        assert!(Gene::new(vec![look, Action::Turn { left_bias: 0.2 }, Action::Move]).is_valid());
    }

    #[test]
    fn display_chains_actions() {
        let gene = Gene::new(vec![Action::Move, Action::Turn { left_bias: 0.25 }]);
        assert_eq!(gene.to_string(), "Move -> Turn(left 25%)");
    }
}
