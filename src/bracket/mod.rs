//! A single bracket: its entrants, match arena and progression.

pub mod format;
pub mod generate;

pub use format::{BracketFormat, FormatEngine};

use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::{
    Entrant, GameResult, Match, MatchId, MatchStatus, Slot, SlotRef, Standing, TeamId,
};

/// One stage of a tournament.
#[derive(Debug)]
pub struct Bracket {
    /// Position in the tournament
    pub idx: usize,

    pub name: String,

    pub format: BracketFormat,

    /// Default best-of length of generated matches
    pub best_of: u32,

    /// Teams in seed order
    entrants: Vec<Entrant>,

    /// Match arena; a match id is its index here
    matches: Vec<Match>,

    engine: Box<dyn FormatEngine>,

    started: bool,

    /// Set once finished; results can no longer change
    closed: bool,
}

impl Bracket {
    pub fn new(idx: usize, name: impl Into<String>, format: BracketFormat, best_of: u32) -> Self {
        let engine = format.engine();
        Self {
            idx,
            name: name.into(),
            format,
            best_of,
            entrants: Vec::new(),
            matches: Vec::new(),
            engine,
            started: false,
            closed: false,
        }
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn match_by_id(&self, match_id: MatchId) -> Result<&Match, EngineError> {
        self.matches
            .get(match_id.index())
            .ok_or(EngineError::UnknownMatch(match_id))
    }

    pub fn has_team(&self, team_id: TeamId) -> bool {
        self.entrants.iter().any(|e| e.team_id == team_id)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append teams to the pool, seeded after the existing entrants.
    pub fn add_entrants(&mut self, teams: &[TeamId]) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::invalid_state(format!(
                "bracket {} has already started",
                self.idx
            )));
        }

        for &team_id in teams {
            if self.has_team(team_id) {
                return Err(EngineError::invalid_state(format!(
                    "team {} is already in bracket {}",
                    team_id, self.idx
                )));
            }
            let seed = self.entrants.len() as u32 + 1;
            self.entrants.push(Entrant::new(team_id, seed));
        }
        Ok(())
    }

    /// Generate the match structure and resolve first-round byes.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::invalid_state(format!(
                "bracket {} has already started",
                self.idx
            )));
        }
        if self.entrants.len() < 2 {
            return Err(EngineError::invalid_state(format!(
                "bracket {} needs at least two teams, has {}",
                self.idx,
                self.entrants.len()
            )));
        }

        self.entrants.sort_by_key(|e| e.seed);
        self.engine.assign_groups(&mut self.entrants);
        self.matches = self.engine.generate(&self.entrants, self.best_of);
        self.started = true;
        self.settle_byes();

        info!(
            "Started bracket {} ({}) with {} teams and {} matches",
            self.idx,
            self.format,
            self.entrants.len(),
            self.matches.len()
        );
        Ok(())
    }

    /// Record games for a match and propagate a decided set.
    pub fn report_match_result(
        &mut self,
        match_id: MatchId,
        games: &[GameResult],
    ) -> Result<MatchStatus, EngineError> {
        if self.closed {
            return Err(EngineError::BracketClosed(self.idx));
        }
        let m = self
            .matches
            .get_mut(match_id.index())
            .ok_or(EngineError::UnknownMatch(match_id))?;

        if let Some(outcome) = m.report_result(games)? {
            info!(
                "Bracket {} match {}: team {} beat team {}",
                self.idx, match_id, outcome.winner, outcome.loser
            );
            self.propagate(match_id);
            self.settle_byes();
        }
        let status = self.matches[match_id.index()].status();

        if self.engine.is_finished(&self.matches) {
            self.closed = true;
            info!("Bracket {} is finished", self.idx);
        }
        Ok(status)
    }

    /// Clear a match's result. A decided match can only be undone while
    /// nothing downstream has been played.
    pub fn undo_result(&mut self, match_id: MatchId) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::BracketClosed(self.idx));
        }
        let m = self.match_by_id(match_id)?;

        if m.is_bye() {
            return Err(EngineError::invalid_state(format!(
                "match {} is a bye and cannot be undone",
                match_id
            )));
        }
        if m.games.is_empty() {
            return Err(EngineError::invalid_state(format!(
                "match {} has no reported result",
                match_id
            )));
        }

        if m.is_final() {
            let locked = self
                .engine
                .undo_locked(m)
                .or_else(|| self.downstream_lock(match_id));
            if let Some(detail) = locked {
                return Err(EngineError::PropagationLocked { match_id, detail });
            }
            self.retract(match_id);
        }

        self.matches[match_id.index()].undo();
        info!("Bracket {} match {}: result undone", self.idx, match_id);
        Ok(())
    }

    /// Standings computed from the current match state.
    pub fn current_standings(&self, include_in_progress: bool) -> Vec<Standing> {
        self.engine
            .standings(&self.entrants, &self.matches, include_in_progress)
    }

    pub fn is_finished(&self) -> bool {
        self.started && self.engine.is_finished(&self.matches)
    }

    /// Generate the next swiss round. Returns the ids of the new matches.
    pub fn next_round(&mut self) -> Result<Vec<MatchId>, EngineError> {
        if !self.started {
            return Err(EngineError::invalid_state(format!(
                "bracket {} has not started",
                self.idx
            )));
        }
        if self.engine.rounds_generated().is_none() {
            return Err(EngineError::invalid_state(format!(
                "bracket {} is {} and has no rounds to generate",
                self.idx, self.format
            )));
        }
        if let Some(open) = self.matches.iter().find(|m| !m.is_final()) {
            return Err(EngineError::IncompleteRound {
                bracket_idx: self.idx,
                round: open.round,
            });
        }

        let new_matches = self
            .engine
            .next_round(&self.entrants, &self.matches, self.best_of)?;
        let ids = new_matches.iter().map(|m| m.id).collect();
        self.matches.extend(new_matches);
        self.settle_byes();

        if self.engine.is_finished(&self.matches) {
            self.closed = true;
        }
        Ok(ids)
    }

    /// Flag a team as withdrawn from this bracket.
    pub fn mark_dropped_out(&mut self, team_id: TeamId) -> Result<(), EngineError> {
        let entrant = self
            .entrants
            .iter_mut()
            .find(|e| e.team_id == team_id)
            .ok_or(EngineError::UnknownTeam(team_id))?;
        entrant.dropped_out = true;
        debug!("Team {} dropped out of bracket {}", team_id, self.idx);
        Ok(())
    }

    /// Lowest round that still has an undecided match, or the last round.
    pub fn current_round(&self) -> u32 {
        self.matches
            .iter()
            .filter(|m| !m.is_final())
            .map(|m| m.round)
            .min()
            .or_else(|| self.matches.iter().map(|m| m.round).max())
            .unwrap_or(0)
    }

    pub fn rounds_generated(&self) -> Option<u32> {
        self.engine.rounds_generated()
    }

    /// Write a decided match's winner and loser into their linked slots.
    /// A bye travels on as a bye.
    fn propagate(&mut self, match_id: MatchId) {
        let m = &self.matches[match_id.index()];
        let Some(winner) = m.winner else {
            return;
        };
        let winner_slot = m.opponents[winner.index()];
        let loser_slot = m.opponents[winner.other().index()];

        for (link, slot) in [(m.winner_to, winner_slot), (m.loser_to, loser_slot)] {
            if let Some(link) = link {
                debug!(
                    "Bracket {}: match {} sends {:?} to match {}",
                    self.idx, match_id, slot, link.match_id
                );
                self.set_slot(link, slot);
            }
        }
    }

    fn set_slot(&mut self, link: SlotRef, slot: Slot) {
        if let Some(target) = self.matches.get_mut(link.match_id.index()) {
            target.opponents[link.side.index()] = slot;
        }
    }

    /// Resolve every bye that no longer waits on an opponent, cascading.
    fn settle_byes(&mut self) {
        while let Some(idx) = self.matches.iter().position(Match::is_unresolved_bye) {
            self.matches[idx].resolve_bye();
            self.propagate(MatchId::from_index(idx));
        }
    }

    /// First downstream match already played, following auto-resolved byes.
    fn downstream_lock(&self, match_id: MatchId) -> Option<String> {
        let m = &self.matches[match_id.index()];
        [m.winner_to, m.loser_to]
            .into_iter()
            .flatten()
            .find_map(|link| {
                let target = &self.matches[link.match_id.index()];
                if target.is_bye() && target.is_final() {
                    self.downstream_lock(target.id)
                } else if target.is_final() || !target.games.is_empty() {
                    Some(format!("match {} already has results", target.id))
                } else {
                    None
                }
            })
    }

    /// Pull a match's propagated teams back out of downstream slots,
    /// unwinding byes that were resolved because of them.
    fn retract(&mut self, match_id: MatchId) {
        let m = &self.matches[match_id.index()];
        for link in [m.winner_to, m.loser_to].into_iter().flatten() {
            let target = &self.matches[link.match_id.index()];
            if target.is_bye() && target.is_final() {
                let target_id = target.id;
                self.retract(target_id);
                self.matches[target_id.index()].winner = None;
            }
            self.set_slot(link, Slot::Pending);
        }
    }
}
