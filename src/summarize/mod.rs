//! End-of-tournament summary: rating updates, map and opponent results, and
//! final placements.
//!
//! Every final, non-bye match is visited exactly once, bracket by bracket in
//! round and id order. Rating updates depend on that order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::{
    GameResult, Match, MapResultDelta, MatchId, PlayerResultDelta, Relation, Side, SkillDelta,
    TeamId, TournamentResult, TournamentSummary, UserId,
};
use crate::rating::{team_identifier, PriorRatings, Rating, RatingModel, WengLinModel};
use crate::tournament::Tournament;

/// Turns a finished tournament into a [`TournamentSummary`].
pub struct Summarizer {
    model: Box<dyn RatingModel>,
    priors: PriorRatings,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(WengLinModel::new())
    }
}

impl Summarizer {
    pub fn new(model: impl RatingModel + 'static) -> Self {
        Self {
            model: Box::new(model),
            priors: PriorRatings::default(),
        }
    }

    /// Builder method to start from ratings held before this tournament.
    pub fn with_priors(mut self, priors: PriorRatings) -> Self {
        self.priors = priors;
        self
    }

    pub fn summarize(&self, tournament: &Tournament) -> Result<TournamentSummary, EngineError> {
        if let Some(bracket) = tournament.brackets().iter().find(|b| !b.is_finished()) {
            return Err(EngineError::TournamentNotFinished(bracket.idx));
        }

        let mut tally = Tally::default();
        let mut visited: BTreeSet<(usize, MatchId)> = BTreeSet::new();

        for bracket in tournament.brackets() {
            let mut decided: Vec<&Match> = bracket
                .matches()
                .iter()
                .filter(|m| m.is_final() && !m.is_bye())
                .collect();
            decided.sort_by_key(|m| (m.round, m.id));

            for m in decided {
                if visited.insert((bracket.idx, m.id)) {
                    self.record_match(tournament, m, &mut tally)?;
                }
            }
        }
        debug!("Summarized {} matches", visited.len());

        let tournament_results = placements(tournament, &tally)?;
        let summary = tally.into_summary(tournament_results);
        info!(
            "Summary for '{}': {} skills, {} map deltas, {} player deltas",
            tournament.name,
            summary.skills.len(),
            summary.map_result_deltas.len(),
            summary.player_result_deltas.len()
        );
        Ok(summary)
    }

    fn record_match(
        &self,
        tournament: &Tournament,
        m: &Match,
        tally: &mut Tally,
    ) -> Result<(), EngineError> {
        let (Some((first, second)), Some(winner)) = (m.teams(), m.winner) else {
            return Ok(());
        };
        let rosters = [
            &tournament.team(first)?.roster,
            &tournament.team(second)?.roster,
        ];

        // Everyone who played at least one game, per side
        let mut played: [BTreeSet<UserId>; 2] = Default::default();
        for game in &m.games {
            for side in Side::BOTH {
                let users = Match::game_participants(game, side, rosters[side.index()]);
                played[side.index()].extend(users.iter().copied());
                tally.record_game(game, side, users);
            }
            record_game_pairs(game, rosters, tally);
        }

        for side in Side::BOTH {
            let team_id = if side == Side::First { first } else { second };
            tally
                .played
                .entry(team_id)
                .or_default()
                .extend(played[side.index()].iter().copied());
        }

        let winners: Vec<UserId> = played[winner.index()].iter().copied().collect();
        let losers: Vec<UserId> = played[winner.other().index()].iter().copied().collect();

        for (owner_side, others_side) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            let relation = if owner_side == others_side {
                Relation::Mate
            } else {
                Relation::Enemy
            };
            let won = owner_side == winner.index();
            for owner in &played[owner_side] {
                for other in played[others_side].iter().filter(|u| *u != owner) {
                    let entry = tally.players.entry((*owner, *other, relation)).or_default();
                    if won {
                        entry.set_wins += 1;
                    } else {
                        entry.set_losses += 1;
                    }
                }
            }
        }

        rate(
            self.model.as_ref(),
            &winners,
            &losers,
            &mut tally.user_ratings,
            |user| self.priors.user(*user),
        );
        let lineups = [team_identifier(&winners), team_identifier(&losers)];
        rate(
            self.model.as_ref(),
            &lineups[..1],
            &lineups[1..],
            &mut tally.team_ratings,
            |identifier| self.priors.team(identifier),
        );

        Ok(())
    }
}

/// Per-game mate and enemy map results for every pair of participants.
fn record_game_pairs(game: &GameResult, rosters: [&Vec<UserId>; 2], tally: &mut Tally) {
    for owner_side in Side::BOTH {
        let owners = Match::game_participants(game, owner_side, rosters[owner_side.index()]);
        let won = game.winner == owner_side;

        for other_side in Side::BOTH {
            let relation = if other_side == owner_side {
                Relation::Mate
            } else {
                Relation::Enemy
            };
            let others = Match::game_participants(game, other_side, rosters[other_side.index()]);

            for owner in owners {
                for other in others.iter().filter(|u| *u != owner) {
                    let entry = tally.players.entry((*owner, *other, relation)).or_default();
                    if won {
                        entry.map_wins += 1;
                    } else {
                        entry.map_losses += 1;
                    }
                }
            }
        }
    }
}

/// Run one rating update and store the results with their match counts.
fn rate<K: Ord + Clone>(
    model: &dyn RatingModel,
    winners: &[K],
    losers: &[K],
    table: &mut BTreeMap<K, (Rating, u32)>,
    prior: impl Fn(&K) -> Rating,
) {
    if winners.is_empty() || losers.is_empty() {
        return;
    }
    let current = |keys: &[K], table: &BTreeMap<K, (Rating, u32)>| -> Vec<Rating> {
        keys.iter()
            .map(|k| table.get(k).map_or_else(|| prior(k), |(rating, _)| *rating))
            .collect()
    };
    let (winner_ratings, loser_ratings) =
        model.rate(&current(winners, table), &current(losers, table));

    for (key, rating) in winners
        .iter()
        .zip(winner_ratings)
        .chain(losers.iter().zip(loser_ratings))
    {
        let entry = table.entry(key.clone()).or_insert((rating, 0));
        entry.0 = rating;
        entry.1 += 1;
    }
}

/// Final placements. Brackets are walked from last to first so each team is
/// placed by the last bracket it reached; later brackets push earlier ones
/// down by the number of teams they placed.
fn placements(tournament: &Tournament, tally: &Tally) -> Result<Vec<TournamentResult>, EngineError> {
    let participant_count = tally.played.len() as u32;
    let mut placed: BTreeSet<TeamId> = BTreeSet::new();
    let mut results = Vec::new();

    for bracket in tournament.brackets().iter().rev() {
        let standings = bracket.current_standings(false);
        let remaining: Vec<_> = standings
            .iter()
            .filter(|s| !placed.contains(&s.team_id))
            .collect();
        let offset = placed.len() as u32;

        for standing in &remaining {
            let ahead = remaining
                .iter()
                .filter(|other| other.placement < standing.placement)
                .count() as u32;
            let placement = offset + 1 + ahead;

            let users: Vec<UserId> = match tally.played.get(&standing.team_id) {
                Some(users) if !users.is_empty() => users.iter().copied().collect(),
                _ => tournament.team(standing.team_id)?.roster.clone(),
            };
            results.extend(users.into_iter().map(|user_id| TournamentResult {
                user_id,
                placement,
                participant_count,
                team_id: standing.team_id,
            }));
        }
        placed.extend(remaining.iter().map(|s| s.team_id));
    }

    results.sort_by_key(|r| (r.placement, r.team_id, r.user_id));
    Ok(results)
}

#[derive(Debug, Default, Clone, Copy)]
struct PlayerTally {
    map_wins: u32,
    map_losses: u32,
    set_wins: u32,
    set_losses: u32,
}

/// Accumulated results, keyed so iteration order is deterministic.
#[derive(Debug, Default)]
struct Tally {
    user_ratings: BTreeMap<UserId, (Rating, u32)>,
    team_ratings: BTreeMap<String, (Rating, u32)>,
    maps: BTreeMap<(String, u32, UserId), (u32, u32)>,
    players: BTreeMap<(UserId, UserId, Relation), PlayerTally>,
    /// Users who played at least one game, per team
    played: BTreeMap<TeamId, BTreeSet<UserId>>,
}

impl Tally {
    fn record_game(&mut self, game: &GameResult, side: Side, users: &[UserId]) {
        let won = game.winner == side;
        for user in users {
            let entry = self
                .maps
                .entry((game.mode.clone(), game.stage_id, *user))
                .or_default();
            if won {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }

    fn into_summary(self, tournament_results: Vec<TournamentResult>) -> TournamentSummary {
        let user_skills = self
            .user_ratings
            .into_iter()
            .map(|(user_id, (rating, matches_count))| SkillDelta {
                user_id: Some(user_id),
                identifier: None,
                mu: rating.mu,
                sigma: rating.sigma,
                matches_count,
            });
        let team_skills = self
            .team_ratings
            .into_iter()
            .map(|(identifier, (rating, matches_count))| SkillDelta {
                user_id: None,
                identifier: Some(identifier),
                mu: rating.mu,
                sigma: rating.sigma,
                matches_count,
            });

        TournamentSummary {
            skills: user_skills.chain(team_skills).collect(),
            map_result_deltas: self
                .maps
                .into_iter()
                .map(|((mode, stage_id, user_id), (wins, losses))| MapResultDelta {
                    mode,
                    stage_id,
                    user_id,
                    wins,
                    losses,
                })
                .collect(),
            player_result_deltas: self
                .players
                .into_iter()
                .map(|((owner_user_id, other_user_id, relation), t)| PlayerResultDelta {
                    owner_user_id,
                    other_user_id,
                    map_wins: t.map_wins,
                    map_losses: t.map_losses,
                    set_wins: t.set_wins,
                    set_losses: t.set_losses,
                    relation,
                })
                .collect(),
            tournament_results,
            finalized_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketFormat;
    use crate::config::{BracketConfig, BracketSource, EngineDefaults, TournamentConfig};
    use crate::fixtures::{set, teams};
    use crate::models::{ReportedResult, Team};
    use crate::tournament::TeamSelector;
    use pretty_assertions::assert_eq;

    fn result(bracket_idx: usize, match_id: u32, games: Vec<GameResult>) -> ReportedResult {
        ReportedResult {
            bracket_idx,
            match_id: MatchId(match_id),
            games,
        }
    }

    fn single_elimination(name: &str) -> BracketConfig {
        BracketConfig {
            name: name.to_string(),
            format: BracketFormat::SingleElimination {
                third_place_match: false,
            },
            best_of: None,
            teams: None,
            sources: Vec::new(),
        }
    }

    /// Four teams: 1 beats 4 (2-1), 2 beats 3 (2-0), 1 beats 2 (2-0).
    fn finished_bracket() -> Tournament {
        let config = TournamentConfig {
            name: "Cup".to_string(),
            teams: teams(4),
            brackets: vec![single_elimination("Main")],
            results: vec![
                result(0, 0, set(Side::First, 2, 1)),
                result(0, 1, set(Side::First, 2, 0)),
                result(0, 2, set(Side::First, 2, 0)),
            ],
        };
        Tournament::from_config(&config, &EngineDefaults::default()).unwrap()
    }

    fn player_delta(
        summary: &TournamentSummary,
        owner: u32,
        other: u32,
        relation: Relation,
    ) -> &PlayerResultDelta {
        summary
            .player_result_deltas
            .iter()
            .find(|d| {
                d.owner_user_id == UserId(owner)
                    && d.other_user_id == UserId(other)
                    && d.relation == relation
            })
            .unwrap()
    }

    #[test]
    fn test_unfinished_tournament_is_rejected() {
        let config = TournamentConfig {
            name: "Cup".to_string(),
            teams: teams(4),
            brackets: vec![single_elimination("Main")],
            results: Vec::new(),
        };
        let tournament = Tournament::from_config(&config, &EngineDefaults::default()).unwrap();

        let err = Summarizer::default().summarize(&tournament).unwrap_err();
        assert_eq!(err, EngineError::TournamentNotFinished(0));
    }

    #[test]
    fn test_map_wins_match_games_won() {
        let summary = Summarizer::default().summarize(&finished_bracket()).unwrap();

        // 7 games, two players per side
        assert_eq!(summary.total_map_wins(), 14);
        let losses: u32 = summary.map_result_deltas.iter().map(|d| d.losses).sum();
        assert_eq!(losses, 14);

        let user_10: u32 = summary
            .map_result_deltas
            .iter()
            .filter(|d| d.user_id == UserId(10))
            .map(|d| d.wins)
            .sum();
        assert_eq!(user_10, 4);
    }

    #[test]
    fn test_each_match_rated_once() {
        let summary = Summarizer::default().summarize(&finished_bracket()).unwrap();

        let champion = summary.user_skill(UserId(10)).unwrap();
        assert_eq!(champion.matches_count, 2);
        assert!(champion.mu > 25.0);

        let first_out = summary.user_skill(UserId(40)).unwrap();
        assert_eq!(first_out.matches_count, 1);
        assert!(first_out.mu < 25.0);

        assert_eq!(summary.team_skill("10-11").unwrap().matches_count, 2);
        assert_eq!(summary.team_skill("30-31").unwrap().matches_count, 1);
        // 8 users and 4 lineups
        assert_eq!(summary.skills.len(), 12);
    }

    #[test]
    fn test_player_deltas() {
        let summary = Summarizer::default().summarize(&finished_bracket()).unwrap();

        let mate = player_delta(&summary, 10, 11, Relation::Mate);
        assert_eq!((mate.map_wins, mate.map_losses), (4, 1));
        assert_eq!((mate.set_wins, mate.set_losses), (2, 0));

        let enemy = player_delta(&summary, 20, 10, Relation::Enemy);
        assert_eq!((enemy.map_wins, enemy.map_losses), (0, 2));
        assert_eq!((enemy.set_wins, enemy.set_losses), (0, 1));

        assert!(summary
            .player_result_deltas
            .iter()
            .all(|d| d.owner_user_id != d.other_user_id));
    }

    #[test]
    fn test_single_bracket_placements() {
        let summary = Summarizer::default().summarize(&finished_bracket()).unwrap();

        let placement = |team: u32| summary.results_for_team(TeamId(team))[0].placement;
        assert_eq!(placement(1), 1);
        assert_eq!(placement(2), 2);
        assert_eq!(placement(3), 3);
        assert_eq!(placement(4), 3);
        assert_eq!(summary.tournament_results.len(), 8);
        assert!(summary
            .tournament_results
            .iter()
            .all(|r| r.participant_count == 4));
    }

    #[test]
    fn test_placements_come_from_last_bracket_reached() {
        // Swiss round 1: 1-3, 2-4. Top two play a final won by 2.
        let mut final_bracket = single_elimination("Final");
        final_bracket.sources = vec![BracketSource {
            bracket_idx: 0,
            selector: TeamSelector::Top(2),
        }];
        let config = TournamentConfig {
            name: "Two stage".to_string(),
            teams: teams(4),
            brackets: vec![
                BracketConfig {
                    name: "Swiss".to_string(),
                    format: BracketFormat::Swiss { rounds: 1 },
                    best_of: None,
                    teams: None,
                    sources: Vec::new(),
                },
                final_bracket,
            ],
            results: vec![
                result(0, 0, set(Side::First, 2, 0)),
                result(0, 1, set(Side::First, 2, 0)),
                result(1, 0, set(Side::Second, 2, 0)),
            ],
        };
        let tournament = Tournament::from_config(&config, &EngineDefaults::default()).unwrap();
        let summary = Summarizer::default().summarize(&tournament).unwrap();

        let placement = |team: u32| summary.results_for_team(TeamId(team))[0].placement;
        assert_eq!(placement(2), 1);
        assert_eq!(placement(1), 2);
        assert_eq!(placement(3), 3);
        assert_eq!(placement(4), 3);
    }

    #[test]
    fn test_game_participants_override_roster() {
        let mut team_list = teams(2);
        team_list[0] = Team::new(TeamId(1), "Three players")
            .with_roster(vec![UserId(10), UserId(11), UserId(12)])
            .with_seed(1);
        let game = GameResult::new(Side::First, "RM", 7)
            .with_participants(vec![UserId(10), UserId(12)], Vec::new());

        let mut bracket = single_elimination("Main");
        bracket.best_of = Some(1);
        let config = TournamentConfig {
            name: "Subs".to_string(),
            teams: team_list,
            brackets: vec![bracket],
            results: vec![result(0, 0, vec![game])],
        };
        let tournament = Tournament::from_config(&config, &EngineDefaults::default()).unwrap();
        let summary = Summarizer::default().summarize(&tournament).unwrap();

        assert!(summary.user_skill(UserId(11)).is_none());
        assert!(summary.team_skill("10-12").is_some());
        assert_eq!(summary.results_for_team(TeamId(1)).len(), 2);
        assert_eq!(summary.total_map_wins(), 2);
    }

    #[test]
    fn test_summary_is_deterministic() {
        let tournament = finished_bracket();
        let summarizer = Summarizer::default();

        let a = summarizer.summarize(&tournament).unwrap();
        let b = summarizer.summarize(&tournament).unwrap();
        assert_eq!(a.skills, b.skills);
        assert_eq!(a.map_result_deltas, b.map_result_deltas);
        assert_eq!(a.player_result_deltas, b.player_result_deltas);
        assert_eq!(a.tournament_results, b.tournament_results);
    }

    #[test]
    fn test_priors_are_used() {
        let mut priors = PriorRatings::default();
        priors.users.insert(UserId(40), Rating::new(40.0, 2.0));
        let summary = Summarizer::default()
            .with_priors(priors)
            .summarize(&finished_bracket())
            .unwrap();

        let skill = summary.user_skill(UserId(40)).unwrap();
        assert!(skill.mu < 40.0);
        assert!(skill.mu > 30.0);
    }
}
