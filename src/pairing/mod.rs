//! Swiss pairing engine.
//!
//! Teams are split into score groups by set wins and each group is paired
//! top-down. Inside a group every team prefers the nearest lower-ranked
//! opponent it has not met yet; dead ends backtrack. An odd group folds
//! one team into the next group down, and the bottom group hands out the
//! bye instead. When a lower group cannot absorb the folded team, the
//! search goes back and folds a different one.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::models::{Match, Pairing, Standing, TeamId};

/// Who has already met whom inside a bracket.
#[derive(Debug, Clone, Default)]
pub struct PairingHistory {
    played: BTreeSet<(TeamId, TeamId)>,
    byes: BTreeSet<TeamId>,
}

impl PairingHistory {
    /// Build from every generated match, decided or not.
    pub fn from_matches(matches: &[Match]) -> Self {
        let mut history = Self::default();
        for m in matches {
            match m.teams() {
                Some((a, b)) => {
                    history.played.insert(ordered(a, b));
                }
                None if m.is_bye() => {
                    history.byes.extend(m.opponents.iter().filter_map(|s| s.team()));
                }
                None => {}
            }
        }
        history
    }

    pub fn have_played(&self, a: TeamId, b: TeamId) -> bool {
        self.played.contains(&ordered(a, b))
    }

    pub fn had_bye(&self, team: TeamId) -> bool {
        self.byes.contains(&team)
    }
}

fn ordered(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Produces the pairings for the next swiss round.
pub struct SwissPairingEngine<'a> {
    history: &'a PairingHistory,
    round: u32,
}

impl<'a> SwissPairingEngine<'a> {
    pub fn new(history: &'a PairingHistory, round: u32) -> Self {
        Self { history, round }
    }

    /// Pair the given teams, listed in standings order.
    ///
    /// Every team ends up in exactly one match or bye. Fails with
    /// `Unpairable` when no choice of fold-downs gives a rematch-free
    /// pairing of the whole field.
    pub fn pair(&self, standings: &[Standing]) -> Result<Vec<Pairing>, EngineError> {
        let groups = score_groups(standings);
        self.pair_groups(&groups, Vec::new())
            .map_err(|set_wins| self.unpairable(set_wins))
    }

    /// Pair `groups` top-down, starting with the teams folded in from above.
    /// An odd pool tries each fold candidate in turn and keeps the first one
    /// the lower groups can absorb. Errors with the set wins of the group
    /// that failed last.
    fn pair_groups(
        &self,
        groups: &[(u32, Vec<TeamId>)],
        carried: Vec<TeamId>,
    ) -> Result<Vec<Pairing>, u32> {
        let Some(((set_wins, members), lower)) = groups.split_first() else {
            return Ok(Vec::new());
        };
        let mut pool = carried;
        pool.extend(members.iter().copied());

        if pool.len() % 2 == 0 {
            let mut pairings = self.pair_group(&pool).ok_or(*set_wins)?;
            pairings.extend(self.pair_groups(lower, Vec::new())?);
            return Ok(pairings);
        }

        let mut failed_at = *set_wins;
        for i in self.fold_candidates(&pool, lower.is_empty()) {
            let odd_one = pool[i];
            let Some(mut pairings) = self.pair_without(&pool, i) else {
                continue;
            };
            if lower.is_empty() {
                debug!("Round {}: bye for team {}", self.round, odd_one);
                pairings.push(Pairing::Bye(odd_one));
                return Ok(pairings);
            }
            match self.pair_groups(lower, vec![odd_one]) {
                Ok(rest) => {
                    debug!(
                        "Round {}: team {} folds down from the {}-win group",
                        self.round, odd_one, set_wins
                    );
                    pairings.extend(rest);
                    return Ok(pairings);
                }
                Err(set_wins) => failed_at = set_wins,
            }
        }

        Err(failed_at)
    }

    /// Indices of an odd pool in the order they are tried for folding
    /// down. Lowest-ranked teams go first; for a bye, teams that already had
    /// one are only considered after everyone else.
    fn fold_candidates(&self, pool: &[TeamId], bottom: bool) -> Vec<usize> {
        let mut candidates: Vec<usize> = (0..pool.len()).rev().collect();
        if bottom {
            candidates.sort_by_key(|&i| self.history.had_bye(pool[i]));
        }
        candidates
    }

    /// Pair the pool with the team at `skip` taken out.
    fn pair_without(&self, pool: &[TeamId], skip: usize) -> Option<Vec<Pairing>> {
        let rest: Vec<TeamId> = pool
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != skip)
            .map(|(_, team)| *team)
            .collect();
        self.pair_group(&rest)
    }

    /// Backtracking search: the first team takes the nearest opponent it
    /// has not played that still leaves the remainder pairable.
    fn pair_group(&self, teams: &[TeamId]) -> Option<Vec<Pairing>> {
        let Some((&high, rest)) = teams.split_first() else {
            return Some(Vec::new());
        };

        for (j, &low) in rest.iter().enumerate() {
            if self.history.have_played(high, low) {
                continue;
            }
            let remaining: Vec<TeamId> = rest
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != j)
                .map(|(_, team)| *team)
                .collect();
            if let Some(mut pairs) = self.pair_group(&remaining) {
                pairs.insert(0, Pairing::Match { high, low });
                return Some(pairs);
            }
        }

        None
    }

    fn unpairable(&self, set_wins: u32) -> EngineError {
        warn!(
            "Round {}: no rematch-free pairing for the {}-win group",
            self.round, set_wins
        );
        EngineError::Unpairable {
            round: self.round,
            set_wins,
        }
    }
}

/// Consecutive runs of equal set wins, in standings order.
fn score_groups(standings: &[Standing]) -> Vec<(u32, Vec<TeamId>)> {
    let mut groups: Vec<(u32, Vec<TeamId>)> = Vec::new();
    for standing in standings {
        match groups.last_mut() {
            Some((wins, members)) if *wins == standing.stats.set_wins => {
                members.push(standing.team_id)
            }
            _ => groups.push((standing.stats.set_wins, vec![standing.team_id])),
        }
    }
    groups
}
