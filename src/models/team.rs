//! Tournament teams and their participation in a bracket.

use serde::{Deserialize, Serialize};

use super::{GroupId, TeamId, UserId};

/// Marks a team's withdrawal from the tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOut {
    /// Bracket the team withdrew from
    pub bracket_idx: usize,

    /// Last round the team had reached in that bracket
    pub after_round: u32,
}

/// A team registered for the tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Unique identifier
    pub id: TeamId,

    /// Display name
    pub name: String,

    /// Ordered roster of players
    #[serde(default)]
    pub roster: Vec<UserId>,

    /// Seed used for elimination seeding and initial pool order (1 = best)
    #[serde(default)]
    pub seed: Option<u32>,

    /// Set once the team withdraws
    #[serde(default)]
    pub drop_out: Option<DropOut>,

    /// Bracket the team starts the event in
    #[serde(default)]
    pub starting_bracket_idx: usize,
}

impl Team {
    /// Create a new team with an empty roster.
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            roster: Vec::new(),
            seed: None,
            drop_out: None,
            starting_bracket_idx: 0,
        }
    }

    /// Builder method to set the roster.
    pub fn with_roster(mut self, roster: Vec<UserId>) -> Self {
        self.roster = roster;
        self
    }

    /// Builder method to set the seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method to set the starting bracket.
    pub fn with_starting_bracket(mut self, bracket_idx: usize) -> Self {
        self.starting_bracket_idx = bracket_idx;
        self
    }

    /// Builder method to mark the team as withdrawn.
    pub fn with_drop_out(mut self, bracket_idx: usize, after_round: u32) -> Self {
        self.drop_out = Some(DropOut {
            bracket_idx,
            after_round,
        });
        self
    }

    /// Whether the team counts as dropped out for the given bracket.
    pub fn is_dropped_for(&self, bracket_idx: usize) -> bool {
        self.drop_out
            .is_some_and(|drop_out| drop_out.bracket_idx <= bracket_idx)
    }
}

/// Orders teams for a starting pool: seeded teams first by seed, then by id.
pub fn seed_order(teams: &mut [&Team]) {
    teams.sort_by_key(|team| (team.seed.is_none(), team.seed, team.id));
}

/// A team's participation record inside one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub team_id: TeamId,

    /// 1-based seed inside this bracket
    pub seed: u32,

    /// Round robin group, if any
    pub group_id: Option<GroupId>,

    pub dropped_out: bool,
}

impl Entrant {
    pub fn new(team_id: TeamId, seed: u32) -> Self {
        Self {
            team_id,
            seed,
            group_id: None,
            dropped_out: false,
        }
    }
}
