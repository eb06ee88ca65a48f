//! Swiss pairing assignments for the next round.

use serde::{Deserialize, Serialize};

use super::TeamId;

/// A team's assignment for a swiss round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pairing {
    /// Two teams meet; `high` is the better-ranked one
    Match { high: TeamId, low: TeamId },

    /// Automatic win without an opponent
    Bye(TeamId),
}

impl Pairing {
    /// Teams covered by this pairing.
    pub fn teams(&self) -> Vec<TeamId> {
        match self {
            Pairing::Match { high, low } => vec![*high, *low],
            Pairing::Bye(team) => vec![*team],
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Pairing::Bye(_))
    }
}
