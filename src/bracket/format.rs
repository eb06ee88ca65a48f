//! Bracket formats and the per-format engines behind them.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::generate;
use crate::calculate;
use crate::error::EngineError;
use crate::models::{Entrant, Match, MatchId, Pairing, Slot, Standing};
use crate::pairing::{PairingHistory, SwissPairingEngine};

/// Format of a bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BracketFormat {
    SingleElimination {
        #[serde(default)]
        third_place_match: bool,
    },
    DoubleElimination,
    RoundRobin {
        #[serde(default = "default_groups")]
        groups: u32,
    },
    Swiss {
        rounds: u32,
    },
}

fn default_groups() -> u32 {
    1
}

impl BracketFormat {
    /// Map the format tag to its engine.
    pub fn engine(&self) -> Box<dyn FormatEngine> {
        match self {
            BracketFormat::SingleElimination { third_place_match } => {
                Box::new(SingleEliminationEngine {
                    third_place_match: *third_place_match,
                })
            }
            BracketFormat::DoubleElimination => Box::new(DoubleEliminationEngine),
            BracketFormat::RoundRobin { groups } => Box::new(RoundRobinEngine { groups: *groups }),
            BracketFormat::Swiss { rounds } => Box::new(SwissEngine::new(*rounds)),
        }
    }
}

impl fmt::Display for BracketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketFormat::SingleElimination { .. } => write!(f, "single elimination"),
            BracketFormat::DoubleElimination => write!(f, "double elimination"),
            BracketFormat::RoundRobin { groups } => write!(f, "round robin ({} groups)", groups),
            BracketFormat::Swiss { rounds } => write!(f, "swiss ({} rounds)", rounds),
        }
    }
}

/// Format-specific behaviour of a bracket.
pub trait FormatEngine: fmt::Debug + Send + Sync {
    /// Build the initial match structure. Entrants are in seed order.
    fn generate(&mut self, entrants: &[Entrant], best_of: u32) -> Vec<Match>;

    /// Assign round robin groups before generation.
    fn assign_groups(&self, _entrants: &mut [Entrant]) {}

    fn standings(
        &self,
        entrants: &[Entrant],
        matches: &[Match],
        include_in_progress: bool,
    ) -> Vec<Standing>;

    fn is_finished(&self, matches: &[Match]) -> bool;

    /// Generate the next round of a lazily built format.
    fn next_round(
        &mut self,
        _entrants: &[Entrant],
        _matches: &[Match],
        _best_of: u32,
    ) -> Result<Vec<Match>, EngineError> {
        Err(EngineError::invalid_state(
            "rounds of this format are generated up front",
        ))
    }

    /// Number of lazily generated rounds so far.
    fn rounds_generated(&self) -> Option<u32> {
        None
    }

    /// Why a final match may no longer be undone, beyond its forward links.
    fn undo_locked(&self, _m: &Match) -> Option<String> {
        None
    }
}

/// Elimination brackets are done once every terminal match is decided.
fn terminal_matches_final(matches: &[Match]) -> bool {
    !matches.is_empty()
        && matches
            .iter()
            .filter(|m| m.winner_to.is_none())
            .all(Match::is_final)
}

#[derive(Debug, Clone)]
pub struct SingleEliminationEngine {
    third_place_match: bool,
}

impl FormatEngine for SingleEliminationEngine {
    fn generate(&mut self, entrants: &[Entrant], best_of: u32) -> Vec<Match> {
        generate::single_elimination(entrants, best_of, self.third_place_match)
    }

    fn standings(&self, entrants: &[Entrant], matches: &[Match], live: bool) -> Vec<Standing> {
        calculate::elimination::standings(entrants, matches, live)
    }

    fn is_finished(&self, matches: &[Match]) -> bool {
        terminal_matches_final(matches)
    }
}

#[derive(Debug, Clone)]
pub struct DoubleEliminationEngine;

impl FormatEngine for DoubleEliminationEngine {
    fn generate(&mut self, entrants: &[Entrant], best_of: u32) -> Vec<Match> {
        generate::double_elimination(entrants, best_of)
    }

    fn standings(&self, entrants: &[Entrant], matches: &[Match], live: bool) -> Vec<Standing> {
        calculate::elimination::standings(entrants, matches, live)
    }

    fn is_finished(&self, matches: &[Match]) -> bool {
        terminal_matches_final(matches)
    }
}

#[derive(Debug, Clone)]
pub struct RoundRobinEngine {
    groups: u32,
}

impl FormatEngine for RoundRobinEngine {
    fn generate(&mut self, entrants: &[Entrant], best_of: u32) -> Vec<Match> {
        generate::round_robin(entrants, best_of)
    }

    fn assign_groups(&self, entrants: &mut [Entrant]) {
        if entrants.iter().any(|e| e.group_id.is_none()) {
            generate::snake_groups(entrants, self.groups);
        }
    }

    fn standings(&self, entrants: &[Entrant], matches: &[Match], live: bool) -> Vec<Standing> {
        calculate::round_robin::standings(entrants, matches, live)
    }

    fn is_finished(&self, matches: &[Match]) -> bool {
        !matches.is_empty() && matches.iter().all(Match::is_final)
    }
}

/// Swiss rounds are generated one at a time from the standings.
#[derive(Debug, Clone)]
pub struct SwissEngine {
    total_rounds: u32,
    rounds_generated: u32,
}

impl SwissEngine {
    pub fn new(total_rounds: u32) -> Self {
        Self {
            total_rounds,
            rounds_generated: 0,
        }
    }
}

impl FormatEngine for SwissEngine {
    fn generate(&mut self, entrants: &[Entrant], best_of: u32) -> Vec<Match> {
        self.rounds_generated = 1;
        generate::swiss_first_round(entrants, best_of)
    }

    fn standings(&self, entrants: &[Entrant], matches: &[Match], live: bool) -> Vec<Standing> {
        calculate::swiss::standings(entrants, matches, live)
    }

    fn is_finished(&self, matches: &[Match]) -> bool {
        self.rounds_generated >= self.total_rounds && matches.iter().all(Match::is_final)
    }

    fn next_round(
        &mut self,
        entrants: &[Entrant],
        matches: &[Match],
        best_of: u32,
    ) -> Result<Vec<Match>, EngineError> {
        if self.rounds_generated >= self.total_rounds {
            return Err(EngineError::invalid_state(format!(
                "all {} swiss rounds have been generated",
                self.total_rounds
            )));
        }

        let round = self.rounds_generated + 1;
        let active: Vec<Standing> = calculate::swiss::standings(entrants, matches, false)
            .into_iter()
            .filter(|s| !s.dropped_out)
            .collect();
        let history = PairingHistory::from_matches(matches);
        let pairings = SwissPairingEngine::new(&history, round).pair(&active)?;

        let new_matches = pairings
            .into_iter()
            .enumerate()
            .map(|(i, pairing)| {
                let id = MatchId::from_index(matches.len() + i);
                let opponents = match pairing {
                    Pairing::Match { high, low } => (Slot::Team(high), Slot::Team(low)),
                    Pairing::Bye(team) => (Slot::Team(team), Slot::Bye),
                };
                Match::new(id, round, best_of).with_opponents(opponents.0, opponents.1)
            })
            .collect();

        self.rounds_generated = round;
        info!("Generated swiss round {} of {}", round, self.total_rounds);
        Ok(new_matches)
    }

    fn rounds_generated(&self) -> Option<u32> {
        Some(self.rounds_generated)
    }

    fn undo_locked(&self, m: &Match) -> Option<String> {
        (m.round < self.rounds_generated).then(|| {
            format!(
                "round {} has already been followed by round {}",
                m.round, self.rounds_generated
            )
        })
    }
}
