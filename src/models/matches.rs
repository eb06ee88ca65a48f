//! Match model: a best-of-N set between two opponents.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{GroupId, MatchId, TeamId, UserId};
use crate::error::EngineError;

/// One of the two opponent positions of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    pub fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

/// Outcome of a single game inside a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Side that won the game
    pub winner: Side,

    /// Game mode, e.g. "SZ"
    pub mode: String,

    /// Map/stage the game was played on
    pub stage_id: u32,

    /// Players who took part, per side. Empty means the team's full roster.
    #[serde(default)]
    pub participants: [Vec<UserId>; 2],
}

impl GameResult {
    pub fn new(winner: Side, mode: impl Into<String>, stage_id: u32) -> Self {
        Self {
            winner,
            mode: mode.into(),
            stage_id,
            participants: [Vec::new(), Vec::new()],
        }
    }

    /// Builder method to record who played on each side.
    pub fn with_participants(mut self, first: Vec<UserId>, second: Vec<UserId>) -> Self {
        self.participants = [first, second];
        self
    }
}

/// Content of an opponent position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Waiting for an earlier match to be decided
    Pending,
    Team(TeamId),
    /// No opponent will ever arrive
    Bye,
}

impl Slot {
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Slot::Team(id) => Some(*id),
            _ => None,
        }
    }
}

/// Forward link into a downstream match position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub match_id: MatchId,
    pub side: Side,
}

impl SlotRef {
    pub fn new(match_id: MatchId, side: Side) -> Self {
        Self { match_id, side }
    }
}

/// Part of the bracket a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Main,
    Winners,
    Losers,
    GrandFinal,
    ThirdPlace,
}

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// An opponent is not yet determined
    Pending,
    /// Both opponents known, no games reported
    Ready,
    /// Some games reported, set undecided
    InProgress,
    /// Set decided
    Final,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::Ready => write!(f, "ready"),
            MatchStatus::InProgress => write!(f, "in-progress"),
            MatchStatus::Final => write!(f, "final"),
        }
    }
}

/// Winner and loser of a decided set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: TeamId,
    pub loser: TeamId,
}

/// A best-of-N set between two opponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,

    /// Round number within the match's section, starting at 1
    pub round: u32,

    pub section: Section,

    /// Round robin group
    pub group_id: Option<GroupId>,

    /// Elimination depth; the loser of a match without `loser_to` is
    /// eliminated at this depth
    pub depth: u32,

    /// Maximum number of games in the set
    pub best_of: u32,

    pub opponents: [Slot; 2],

    /// Reported games in play order
    pub games: Vec<GameResult>,

    pub winner: Option<Side>,

    pub winner_to: Option<SlotRef>,

    pub loser_to: Option<SlotRef>,
}

impl Match {
    /// Create a new match with both opponents pending.
    pub fn new(id: MatchId, round: u32, best_of: u32) -> Self {
        Self {
            id,
            round,
            section: Section::Main,
            group_id: None,
            depth: 0,
            best_of,
            opponents: [Slot::Pending, Slot::Pending],
            games: Vec::new(),
            winner: None,
            winner_to: None,
            loser_to: None,
        }
    }

    /// Builder method to set both opponents.
    pub fn with_opponents(mut self, first: Slot, second: Slot) -> Self {
        self.opponents = [first, second];
        self
    }

    /// Builder method to set the section and elimination depth.
    pub fn with_section(mut self, section: Section, depth: u32) -> Self {
        self.section = section;
        self.depth = depth;
        self
    }

    /// Builder method to set the round robin group.
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn status(&self) -> MatchStatus {
        if self.winner.is_some() {
            MatchStatus::Final
        } else if self.teams().is_none() {
            MatchStatus::Pending
        } else if self.games.is_empty() {
            MatchStatus::Ready
        } else {
            MatchStatus::InProgress
        }
    }

    pub fn is_final(&self) -> bool {
        self.winner.is_some()
    }

    /// Whether either position is a bye.
    pub fn is_bye(&self) -> bool {
        self.opponents.contains(&Slot::Bye)
    }

    pub fn team(&self, side: Side) -> Option<TeamId> {
        self.opponents[side.index()].team()
    }

    /// Both teams, once known.
    pub fn teams(&self) -> Option<(TeamId, TeamId)> {
        Some((self.team(Side::First)?, self.team(Side::Second)?))
    }

    pub fn side_of(&self, team_id: TeamId) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.team(*side) == Some(team_id))
    }

    /// Games won by each side.
    pub fn score(&self) -> [u32; 2] {
        let mut score = [0, 0];
        for game in &self.games {
            score[game.winner.index()] += 1;
        }
        score
    }

    /// Game wins needed to take the set.
    pub fn wins_needed(&self) -> u32 {
        self.best_of / 2 + 1
    }

    pub fn winner_team(&self) -> Option<TeamId> {
        self.team(self.winner?)
    }

    pub fn loser_team(&self) -> Option<TeamId> {
        self.team(self.winner?.other())
    }

    /// Append reported games. Games after the set is decided are ignored.
    ///
    /// Returns the outcome once the set is decided.
    pub fn report_result(
        &mut self,
        games: &[GameResult],
    ) -> Result<Option<MatchOutcome>, EngineError> {
        if self.is_final() {
            return Err(EngineError::invalid_state(format!(
                "match {} is already final",
                self.id
            )));
        }
        let Some((first, second)) = self.teams() else {
            return Err(EngineError::invalid_state(format!(
                "match {} does not have both opponents yet",
                self.id
            )));
        };
        if games.is_empty() {
            return Err(EngineError::invalid_state(format!(
                "no games reported for match {}",
                self.id
            )));
        }

        let needed = self.wins_needed();
        let mut score = self.score();
        for (played, game) in games.iter().enumerate() {
            self.games.push(game.clone());
            score[game.winner.index()] += 1;

            if let Some(side) = Side::BOTH.into_iter().find(|s| score[s.index()] >= needed) {
                self.winner = Some(side);
                let ignored = games.len() - played - 1;
                if ignored > 0 {
                    warn!(
                        "Ignoring {} games reported after match {} was decided",
                        ignored, self.id
                    );
                }
                break;
            }
        }

        Ok(self.winner.map(|side| {
            let (winner, loser) = match side {
                Side::First => (first, second),
                Side::Second => (second, first),
            };
            MatchOutcome { winner, loser }
        }))
    }

    /// Clear all reported games, returning the match to `ready`.
    pub fn undo(&mut self) {
        self.games.clear();
        self.winner = None;
    }

    /// A bye that can be decided without play: no pending position left.
    pub(crate) fn is_unresolved_bye(&self) -> bool {
        self.winner.is_none() && self.is_bye() && !self.opponents.contains(&Slot::Pending)
    }

    /// Decide a bye in favour of the side holding a team. With no team on
    /// either side the first position "wins" and the bye travels on.
    pub(crate) fn resolve_bye(&mut self) {
        let winner = if self.opponents[1].team().is_some() {
            Side::Second
        } else {
            Side::First
        };
        self.winner = Some(winner);
    }

    /// Players on a side for one game, falling back to the roster.
    pub fn game_participants<'a>(
        game: &'a GameResult,
        side: Side,
        roster: &'a [UserId],
    ) -> &'a [UserId] {
        let listed = &game.participants[side.index()];
        if listed.is_empty() {
            roster
        } else {
            listed
        }
    }
}

/// An already-reported result, used to resume a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedResult {
    pub bracket_idx: usize,
    pub match_id: MatchId,
    pub games: Vec<GameResult>,
}
