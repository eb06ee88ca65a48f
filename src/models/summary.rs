//! End-of-tournament summary handed to persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TeamId, UserId};

/// Updated rating for one participant: a player or a fixed lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDelta {
    /// Set for individual ratings
    pub user_id: Option<UserId>,

    /// Set for lineup ratings (sorted user ids joined with `-`)
    pub identifier: Option<String>,

    pub mu: f64,
    pub sigma: f64,

    /// Rated sets played in this tournament
    pub matches_count: u32,
}

/// Per-player win/loss increment on one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapResultDelta {
    pub mode: String,
    pub stage_id: u32,
    pub user_id: UserId,
    pub wins: u32,
    pub losses: u32,
}

/// How two players met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Same side
    Mate,
    /// Opposite sides
    Enemy,
}

/// Results of `owner_user_id` when playing with or against `other_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResultDelta {
    pub owner_user_id: UserId,
    pub other_user_id: UserId,
    pub map_wins: u32,
    pub map_losses: u32,
    pub set_wins: u32,
    pub set_losses: u32,
    #[serde(rename = "type")]
    pub relation: Relation,
}

/// Final tournament placement of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentResult {
    pub user_id: UserId,
    pub placement: u32,
    pub participant_count: u32,
    pub team_id: TeamId,
}

/// Everything persistence needs once a tournament is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub skills: Vec<SkillDelta>,
    pub map_result_deltas: Vec<MapResultDelta>,
    pub player_result_deltas: Vec<PlayerResultDelta>,
    pub tournament_results: Vec<TournamentResult>,
    pub finalized_at: DateTime<Utc>,
}

impl TournamentSummary {
    /// Total map wins across all map deltas.
    pub fn total_map_wins(&self) -> u32 {
        self.map_result_deltas.iter().map(|d| d.wins).sum()
    }

    /// Individual skill row for a player.
    pub fn user_skill(&self, user_id: UserId) -> Option<&SkillDelta> {
        self.skills.iter().find(|s| s.user_id == Some(user_id))
    }

    /// Lineup skill row for an identifier.
    pub fn team_skill(&self, identifier: &str) -> Option<&SkillDelta> {
        self.skills
            .iter()
            .find(|s| s.identifier.as_deref() == Some(identifier))
    }

    /// Placement rows for a team.
    pub fn results_for_team(&self, team_id: TeamId) -> Vec<&TournamentResult> {
        self.tournament_results
            .iter()
            .filter(|r| r.team_id == team_id)
            .collect()
    }
}
