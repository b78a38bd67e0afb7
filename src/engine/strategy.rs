// Resolution Strategies
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Preemption,
    Kill,
    Rollback,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Preemption, Strategy::Kill, Strategy::Rollback];

    /// Score deducted when the strategy resolves a deadlock.
    pub fn penalty(&self) -> u32 {
        match self {
            Strategy::Preemption => 20,
            Strategy::Kill => 50,
            Strategy::Rollback => 30,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Preemption => "preemption",
            Strategy::Kill => "kill",
            Strategy::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// One-shot availability flags, all set at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAvailability {
    preemption: bool,
    kill: bool,
    rollback: bool,
}

impl Default for StrategyAvailability {
    fn default() -> Self {
        StrategyAvailability {
            preemption: true,
            kill: true,
            rollback: true,
        }
    }
}

impl StrategyAvailability {
    pub fn is_available(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Preemption => self.preemption,
            Strategy::Kill => self.kill,
            Strategy::Rollback => self.rollback,
        }
    }

    pub fn any(&self) -> bool {
        self.preemption || self.kill || self.rollback
    }

    pub fn remaining(&self) -> Vec<Strategy> {
        Strategy::ALL
            .into_iter()
            .filter(|s| self.is_available(*s))
            .collect()
    }

    pub(crate) fn consume(&mut self, strategy: Strategy) {
        match strategy {
            Strategy::Preemption => self.preemption = false,
            Strategy::Kill => self.kill = false,
            Strategy::Rollback => self.rollback = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_flip_independently() {
        let mut flags = StrategyAvailability::default();
        assert_eq!(flags.remaining(), Strategy::ALL.to_vec());

        flags.consume(Strategy::Kill);
        assert!(!flags.is_available(Strategy::Kill));
        assert_eq!(flags.remaining(), vec![Strategy::Preemption, Strategy::Rollback]);

        flags.consume(Strategy::Preemption);
        flags.consume(Strategy::Rollback);
        assert!(!flags.any());
    }

    #[test]
    fn test_penalties() {
        assert_eq!(Strategy::Preemption.penalty(), 20);
        assert_eq!(Strategy::Kill.penalty(), 50);
        assert_eq!(Strategy::Rollback.penalty(), 30);
    }
}
