//! Computed standings. Always derived from matches, never stored.

use serde::{Deserialize, Serialize};

use super::{GroupId, TeamId};

/// Per-team record inside a bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StandingStats {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,

    /// Set wins against teams tied with this one on set wins
    pub wins_against_tied: u32,

    /// Set losses against teams tied with this one on set wins
    pub losses_against_tied: u32,

    /// Swiss strength of schedule: summed set wins of opponents played
    pub buchholz: Option<u32>,
}

impl StandingStats {
    /// Map win rate as a fraction (0.0 to 1.0).
    pub fn map_win_rate(&self) -> f64 {
        let total = self.map_wins + self.map_losses;
        if total == 0 {
            0.0
        } else {
            self.map_wins as f64 / total as f64
        }
    }

    /// Sets played.
    pub fn sets_played(&self) -> u32 {
        self.set_wins + self.set_losses
    }
}

/// A team's computed position in a bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team_id: TeamId,

    /// 1-based rank; tied teams share a placement. Within-group rank for
    /// round robin brackets.
    pub placement: u32,

    /// Round robin group
    pub group_id: Option<GroupId>,

    /// Withdrawn teams stay listed but are pinned below active teams
    pub dropped_out: bool,

    pub stats: StandingStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_win_rate() {
        let stats = StandingStats {
            map_wins: 5,
            map_losses: 1,
            ..Default::default()
        };
        assert!((stats.map_win_rate() - 0.833).abs() < 0.01);
    }

    #[test]
    fn test_map_win_rate_zero_games() {
        let stats = StandingStats::default();
        assert_eq!(stats.map_win_rate(), 0.0);
        assert_eq!(stats.sets_played(), 0);
    }

    #[test]
    fn test_standing_serialization() {
        let standing = Standing {
            team_id: TeamId(17513),
            placement: 2,
            group_id: Some(GroupId(1)),
            dropped_out: false,
            stats: StandingStats {
                set_wins: 3,
                set_losses: 1,
                losses_against_tied: 1,
                ..Default::default()
            },
        };

        let json = serde_json::to_string(&standing).unwrap();
        let deserialized: Standing = serde_json::from_str(&json).unwrap();
        assert_eq!(standing, deserialized);
    }
}
