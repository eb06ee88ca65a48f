//! Errors raised by the bracket engine.
//!
//! Every error is a synchronous precondition violation: the engine performs
//! no I/O, so nothing here is transient and nothing is retried.

use thiserror::Error;

use crate::models::{MatchId, TeamId};

/// Errors that can occur while driving a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Result of match {match_id} can no longer be undone: {detail}")]
    PropagationLocked { match_id: MatchId, detail: String },

    #[error("Bracket {0} is finished and closed to result edits")]
    BracketClosed(usize),

    #[error("Round {round} of bracket {bracket_idx} still has unfinished matches")]
    IncompleteRound { bracket_idx: usize, round: u32 },

    #[error("No rematch-free pairing exists for the {set_wins}-win score group of round {round}")]
    Unpairable { round: u32, set_wins: u32 },

    #[error("Source bracket {0} is not finished")]
    SourceBracketNotFinished(usize),

    #[error("Tournament is not finished: bracket {0} is still in progress")]
    TournamentNotFinished(usize),

    #[error("Bracket {0} not found")]
    UnknownBracket(usize),

    #[error("Match {0} not found")]
    UnknownMatch(MatchId),

    #[error("Team {0} not found")]
    UnknownTeam(TeamId),
}

impl EngineError {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        EngineError::InvalidState(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::IncompleteRound {
            bracket_idx: 0,
            round: 3,
        };
        assert_eq!(
            err.to_string(),
            "Round 3 of bracket 0 still has unfinished matches"
        );

        let err = EngineError::UnknownMatch(MatchId(12));
        assert_eq!(err.to_string(), "Match 12 not found");
    }

    #[test]
    fn test_invalid_state_helper() {
        let err = EngineError::invalid_state("match is already final");
        assert_eq!(
            err,
            EngineError::InvalidState("match is already final".to_string())
        );
    }
}
