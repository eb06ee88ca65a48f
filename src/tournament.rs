//! Tournament: ordered brackets, cross-bracket team movement and the
//! finalize step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bracket::{Bracket, BracketFormat};
use crate::config::{BracketSource, EngineDefaults, TournamentConfig};
use crate::error::EngineError;
use crate::models::{
    seed_order, DropOut, GameResult, MatchId, MatchStatus, ReportedResult, Standing, Team, TeamId,
    TournamentSummary,
};
use crate::summarize::Summarizer;

/// Which teams of a finished bracket move on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSelector {
    /// Every team at one of these placements (within-group placement for
    /// round robin)
    Placements(Vec<u32>),

    /// The first `n` teams of the standings
    Top(usize),
}

/// A tournament made of one or more brackets.
#[derive(Debug)]
pub struct Tournament {
    pub name: String,
    teams: BTreeMap<TeamId, Team>,
    brackets: Vec<Bracket>,
    /// Per bracket: brackets that feed it during replay
    sources: Vec<Vec<BracketSource>>,
    finalized: bool,
}

impl Tournament {
    pub fn new(name: impl Into<String>, teams: Vec<Team>) -> Self {
        Self {
            name: name.into(),
            teams: teams.into_iter().map(|t| (t.id, t)).collect(),
            brackets: Vec::new(),
            sources: Vec::new(),
            finalized: false,
        }
    }

    /// Append an empty bracket. Returns its index.
    pub fn add_bracket(
        &mut self,
        name: impl Into<String>,
        format: BracketFormat,
        best_of: u32,
    ) -> usize {
        let idx = self.brackets.len();
        self.brackets.push(Bracket::new(idx, name, format, best_of));
        self.sources.push(Vec::new());
        idx
    }

    /// Build a tournament from its definition and replay every reported
    /// result in order.
    ///
    /// Brackets fed by other brackets start once all their sources are
    /// finished. A swiss result for a match past the end of the arena
    /// first generates the next round.
    pub fn from_config(
        config: &TournamentConfig,
        defaults: &EngineDefaults,
    ) -> Result<Self, EngineError> {
        let mut tournament = Tournament::new(&config.name, config.teams.clone());

        for (idx, bracket_config) in config.brackets.iter().enumerate() {
            let best_of = bracket_config.best_of.unwrap_or(defaults.best_of);
            tournament.add_bracket(&bracket_config.name, bracket_config.format.clone(), best_of);
            tournament.sources[idx] = bracket_config.sources.clone();

            let pool: Vec<TeamId> = match &bracket_config.teams {
                Some(ids) => ids.clone(),
                None => {
                    let mut starting: Vec<&Team> = config
                        .teams
                        .iter()
                        .filter(|t| t.starting_bracket_idx == idx)
                        .collect();
                    seed_order(&mut starting);
                    starting.iter().map(|t| t.id).collect()
                }
            };
            tournament.brackets[idx].add_entrants(&pool)?;

            if bracket_config.sources.is_empty() && pool.len() >= 2 {
                tournament.brackets[idx].start()?;
            }
        }

        tournament.advance_ready_brackets()?;
        for result in &config.results {
            tournament.replay_result(result)?;
            tournament.advance_ready_brackets()?;
        }
        for idx in 0..tournament.brackets.len() {
            tournament.apply_drop_outs(idx, None)?;
        }

        info!(
            "Loaded tournament '{}': {} teams, {} brackets, {} results",
            tournament.name,
            tournament.teams.len(),
            tournament.brackets.len(),
            config.results.len()
        );
        Ok(tournament)
    }

    fn replay_result(&mut self, result: &ReportedResult) -> Result<(), EngineError> {
        let bracket = self.bracket_by_idx(result.bracket_idx)?;
        let needs_round = bracket.rounds_generated().is_some()
            && result.match_id.index() >= bracket.matches().len()
            && bracket.matches().iter().all(|m| m.is_final());

        if needs_round {
            let played = bracket.rounds_generated();
            self.apply_drop_outs(result.bracket_idx, played)?;
            self.brackets[result.bracket_idx].next_round()?;
        }

        self.brackets[result.bracket_idx].report_match_result(result.match_id, &result.games)?;
        Ok(())
    }

    /// Mark recorded drop-outs in a bracket. With `through_round`, only
    /// teams that left after that round or earlier are marked.
    fn apply_drop_outs(
        &mut self,
        bracket_idx: usize,
        through_round: Option<u32>,
    ) -> Result<(), EngineError> {
        let bracket = &mut self.brackets[bracket_idx];
        let leaving: Vec<TeamId> = self
            .teams
            .values()
            .filter(|team| bracket.has_team(team.id))
            .filter(|team| {
                team.drop_out.is_some_and(|left| {
                    left.bracket_idx < bracket_idx
                        || (left.bracket_idx == bracket_idx
                            && through_round.map_or(true, |round| left.after_round <= round))
                })
            })
            .map(|team| team.id)
            .collect();

        for team_id in leaving {
            bracket.mark_dropped_out(team_id)?;
        }
        Ok(())
    }

    /// Start every unstarted bracket whose sources have all finished.
    fn advance_ready_brackets(&mut self) -> Result<(), EngineError> {
        for to in 0..self.brackets.len() {
            let sources = &self.sources[to];
            if self.brackets[to].is_started() || sources.is_empty() {
                continue;
            }
            if !sources
                .iter()
                .all(|s| self.brackets[s.bracket_idx].is_finished())
            {
                continue;
            }

            let mut advancing = Vec::new();
            for source in sources {
                advancing.extend(self.select_advancing(source.bracket_idx, &source.selector)?);
            }
            self.seed(to, &advancing)?;
            self.brackets[to].start()?;
        }
        Ok(())
    }

    pub fn bracket_by_idx(&self, idx: usize) -> Result<&Bracket, EngineError> {
        self.brackets.get(idx).ok_or(EngineError::UnknownBracket(idx))
    }

    fn bracket_mut(&mut self, idx: usize) -> Result<&mut Bracket, EngineError> {
        self.brackets
            .get_mut(idx)
            .ok_or(EngineError::UnknownBracket(idx))
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn team(&self, team_id: TeamId) -> Result<&Team, EngineError> {
        self.teams
            .get(&team_id)
            .ok_or(EngineError::UnknownTeam(team_id))
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn current_standings(
        &self,
        bracket_idx: usize,
        include_in_progress: bool,
    ) -> Result<Vec<Standing>, EngineError> {
        Ok(self
            .bracket_by_idx(bracket_idx)?
            .current_standings(include_in_progress))
    }

    pub fn report_match_result(
        &mut self,
        bracket_idx: usize,
        match_id: MatchId,
        games: &[GameResult],
    ) -> Result<MatchStatus, EngineError> {
        self.bracket_mut(bracket_idx)?
            .report_match_result(match_id, games)
    }

    pub fn undo_result(&mut self, bracket_idx: usize, match_id: MatchId) -> Result<(), EngineError> {
        self.bracket_mut(bracket_idx)?.undo_result(match_id)
    }

    /// Generate the next swiss round of a bracket.
    pub fn next_round(&mut self, bracket_idx: usize) -> Result<Vec<MatchId>, EngineError> {
        self.bracket_mut(bracket_idx)?.next_round()
    }

    /// Start a bracket with the teams already in its pool.
    pub fn start_bracket(&mut self, bracket_idx: usize) -> Result<(), EngineError> {
        self.bracket_mut(bracket_idx)?.start()
    }

    /// Move selected teams of a finished bracket into the pool of an
    /// unstarted one. Teams keep their relative standings order as seeds,
    /// after any teams already in the pool. Several sources can feed the
    /// same bracket; `start_bracket` generates its matches once all have
    /// advanced. Returns the advanced teams.
    pub fn advance_teams(
        &mut self,
        from: usize,
        to: usize,
        selector: &TeamSelector,
    ) -> Result<Vec<TeamId>, EngineError> {
        let advancing = self.select_advancing(from, selector)?;
        self.seed(to, &advancing)?;
        info!(
            "Advanced {} teams from bracket {} to bracket {}",
            advancing.len(),
            from,
            to
        );
        Ok(advancing)
    }

    fn select_advancing(
        &self,
        from: usize,
        selector: &TeamSelector,
    ) -> Result<Vec<TeamId>, EngineError> {
        let source = self.bracket_by_idx(from)?;
        if !source.is_finished() {
            return Err(EngineError::SourceBracketNotFinished(from));
        }

        let eligible = source.current_standings(false).into_iter().filter(|s| {
            !s.dropped_out
                && !self
                    .teams
                    .get(&s.team_id)
                    .is_some_and(|team| team.is_dropped_for(from))
        });

        let selected = match selector {
            TeamSelector::Placements(placements) => eligible
                .filter(|s| placements.contains(&s.placement))
                .map(|s| s.team_id)
                .collect(),
            TeamSelector::Top(count) => eligible.take(*count).map(|s| s.team_id).collect(),
        };
        Ok(selected)
    }

    fn seed(&mut self, to: usize, teams: &[TeamId]) -> Result<(), EngineError> {
        let destination = self.bracket_mut(to)?;
        if destination.is_started() {
            return Err(EngineError::invalid_state(format!(
                "bracket {} has already started",
                to
            )));
        }
        let fresh: Vec<TeamId> = teams
            .iter()
            .copied()
            .filter(|t| !destination.has_team(*t))
            .collect();
        debug!("Seeding bracket {} with {:?}", to, fresh);
        destination.add_entrants(&fresh)
    }

    /// Withdraw a team from a bracket and every later bracket it is in.
    pub fn drop_out_team(&mut self, team_id: TeamId, bracket_idx: usize) -> Result<(), EngineError> {
        let bracket = self.bracket_by_idx(bracket_idx)?;
        if !bracket.has_team(team_id) {
            return Err(EngineError::UnknownTeam(team_id));
        }
        let after_round = bracket.current_round();

        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or(EngineError::UnknownTeam(team_id))?;
        team.drop_out = Some(DropOut {
            bracket_idx,
            after_round,
        });

        for bracket in self.brackets[bracket_idx..].iter_mut() {
            if bracket.has_team(team_id) {
                bracket.mark_dropped_out(team_id)?;
            }
        }
        info!(
            "Team {} dropped out of bracket {} after round {}",
            team_id, bracket_idx, after_round
        );
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.brackets.iter().all(Bracket::is_finished)
    }

    /// Produce the end-of-tournament summary. Allowed once, after every
    /// bracket has finished.
    pub fn finalize(&mut self, summarizer: &Summarizer) -> Result<TournamentSummary, EngineError> {
        if self.finalized {
            return Err(EngineError::invalid_state(format!(
                "tournament '{}' is already finalized",
                self.name
            )));
        }
        let summary = summarizer.summarize(self)?;
        self.finalized = true;
        info!(
            "Finalized tournament '{}': {} skill updates, {} placements",
            self.name,
            summary.skills.len(),
            summary.tournament_results.len()
        );
        Ok(summary)
    }
}
