use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of what can stand on (or be seen in) a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKind(u8);

impl AgentKind {
    pub const NONE: AgentKind = AgentKind(0);
    pub const FORAGER: AgentKind = AgentKind(1);
    pub const PURSUER: AgentKind = AgentKind(2);
    pub const FRUIT: AgentKind = AgentKind(4);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        AgentKind(bits & 0b111)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`. An empty `other` is
    /// trivially contained; callers that treat "none" as "no target" must
    /// check `is_empty` themselves.
    pub fn contains(self, other: AgentKind) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: AgentKind) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: AgentKind) {
        self.0 &= !other.0;
    }
}

impl BitOr for AgentKind {
    type Output = AgentKind;

    fn bitor(self, rhs: AgentKind) -> AgentKind {
        AgentKind(self.0 | rhs.0)
    }
}

impl BitOrAssign for AgentKind {
    fn bitor_assign(&mut self, rhs: AgentKind) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names = [
            (AgentKind::FORAGER, "Forager"),
            (AgentKind::PURSUER, "Pursuer"),
            (AgentKind::FRUIT, "Fruit"),
        ];
        let mut first = true;
        for (kind, name) in names {
            if self.contains(kind) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
