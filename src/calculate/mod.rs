//! Standings calculation engine.
//!
//! Computes ranked standings from a bracket's matches:
//! - Round robin: per-group records with head-to-head and tied-team tie-breaks
//! - Elimination: depth reached in the bracket tree
//! - Swiss: set wins, Buchholz strength of schedule, map win rate
//!
//! Every function here is pure. The same matches always produce the same
//! ordering; team id is the last tie-break.

pub mod elimination;
pub mod round_robin;
pub mod swiss;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::bracket::Bracket;
use crate::models::{Entrant, Match, MatchStatus, Side, Standing, TeamId};

/// Compute the current standings of a bracket.
pub fn compute_standings(bracket: &Bracket, include_in_progress: bool) -> Vec<Standing> {
    bracket.current_standings(include_in_progress)
}

/// Compare two win/loss records by win rate without floating point.
/// A record with no games ranks as 0%.
pub fn compare_win_rate(a: (u32, u32), b: (u32, u32)) -> Ordering {
    let a_total = u64::from((a.0 + a.1).max(1));
    let b_total = u64::from((b.0 + b.1).max(1));
    (u64::from(a.0) * b_total).cmp(&(u64::from(b.0) * a_total))
}

/// A team's accumulated results inside one bracket.
#[derive(Debug, Clone, Default)]
pub(crate) struct Record {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,

    /// Took part in at least one counted, non-bye match
    pub played: bool,

    /// Decided sets: (opponent, won)
    pub sets: Vec<(TeamId, bool)>,
}

/// Which matches feed a standings calculation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Counting {
    pub include_in_progress: bool,
    /// Byes count as set wins (swiss)
    pub byes_as_wins: bool,
}

/// Accumulate records for every entrant from the counted matches.
pub(crate) fn collect_records(
    entrants: &[Entrant],
    matches: &[Match],
    counting: Counting,
) -> BTreeMap<TeamId, Record> {
    let mut records: BTreeMap<TeamId, Record> = entrants
        .iter()
        .map(|e| (e.team_id, Record::default()))
        .collect();

    for m in matches {
        let counted = match m.status() {
            MatchStatus::Final => true,
            MatchStatus::InProgress => counting.include_in_progress,
            _ => false,
        };
        if !counted {
            continue;
        }

        if m.is_bye() {
            if counting.byes_as_wins {
                if let Some(record) = m.winner_team().and_then(|t| records.get_mut(&t)) {
                    record.set_wins += 1;
                }
            }
            continue;
        }

        let Some((first, second)) = m.teams() else {
            continue;
        };

        for (side, team) in [(Side::First, first), (Side::Second, second)] {
            let Some(record) = records.get_mut(&team) else {
                continue;
            };
            record.played = true;
            for game in &m.games {
                if game.winner == side {
                    record.map_wins += 1;
                } else {
                    record.map_losses += 1;
                }
            }
            if let Some(winner) = m.winner {
                let opponent = if side == Side::First { second } else { first };
                let won = winner == side;
                if won {
                    record.set_wins += 1;
                } else {
                    record.set_losses += 1;
                }
                record.sets.push((opponent, won));
            }
        }
    }

    records
}

/// Entrants that appear in standings: dropped teams only once they played.
pub(crate) fn visible<'a>(
    entrants: &'a [Entrant],
    records: &'a BTreeMap<TeamId, Record>,
) -> impl Iterator<Item = &'a Entrant> + 'a {
    entrants.iter().filter(move |e| {
        !e.dropped_out || records.get(&e.team_id).is_some_and(|r| r.played)
    })
}

/// Set wins and losses against the teams accepted by `tied`.
pub(crate) fn against(record: &Record, tied: impl Fn(TeamId) -> bool) -> (u32, u32) {
    record
        .sets
        .iter()
        .filter(|(opponent, _)| tied(*opponent))
        .fold((0, 0), |(wins, losses), (_, won)| {
            if *won {
                (wins + 1, losses)
            } else {
                (wins, losses + 1)
            }
        })
}

/// Competition ranks (1, 2, 2, 4) for an already sorted slice.
pub(crate) fn competition_ranks<T>(sorted: &[T], same_rank: impl Fn(&T, &T) -> bool) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted.len());
    for (i, item) in sorted.iter().enumerate() {
        let rank = if i > 0 && same_rank(&sorted[i - 1], item) {
            ranks[i - 1]
        } else {
            i as u32 + 1
        };
        ranks.push(rank);
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameResult, MatchId, Slot};

    #[test]
    fn test_compute_standings_deterministic() {
        use crate::bracket::BracketFormat;

        let mut bracket = Bracket::new(0, "Groups", BracketFormat::RoundRobin { groups: 2 }, 3);
        let teams: Vec<TeamId> = (1..=6).map(TeamId).collect();
        bracket.add_entrants(&teams).unwrap();
        bracket.start().unwrap();
        bracket
            .report_match_result(MatchId(0), &[GameResult::new(Side::Second, "SZ", 1)])
            .unwrap();

        let first = compute_standings(&bracket, true);
        assert_eq!(first.len(), 6);
        for _ in 0..5 {
            assert_eq!(compute_standings(&bracket, true), first);
        }
    }

    #[test]
    fn test_compare_win_rate() {
        assert_eq!(compare_win_rate((2, 1), (4, 2)), Ordering::Equal);
        assert_eq!(compare_win_rate((3, 1), (2, 1)), Ordering::Greater);
        assert_eq!(compare_win_rate((0, 0), (3, 4)), Ordering::Less);
        assert_eq!(compare_win_rate((0, 0), (0, 3)), Ordering::Equal);
    }

    #[test]
    fn test_competition_ranks() {
        let sorted = [5, 3, 3, 1, 1, 0];
        let ranks = competition_ranks(&sorted, |a, b| a == b);
        assert_eq!(ranks, vec![1, 2, 2, 4, 4, 6]);
    }

    #[test]
    fn test_collect_records_counts_in_progress_maps_only() {
        let entrants = vec![Entrant::new(TeamId(1), 1), Entrant::new(TeamId(2), 2)];
        let mut m = Match::new(MatchId(0), 1, 3)
            .with_opponents(Slot::Team(TeamId(1)), Slot::Team(TeamId(2)));
        m.report_result(&[GameResult::new(Side::First, "SZ", 1)]).unwrap();
        let matches = vec![m];

        let locked = collect_records(
            &entrants,
            &matches,
            Counting {
                include_in_progress: false,
                byes_as_wins: false,
            },
        );
        assert_eq!(locked[&TeamId(1)].map_wins, 0);
        assert!(!locked[&TeamId(1)].played);

        let live = collect_records(
            &entrants,
            &matches,
            Counting {
                include_in_progress: true,
                byes_as_wins: false,
            },
        );
        assert_eq!(live[&TeamId(1)].map_wins, 1);
        assert_eq!(live[&TeamId(2)].map_losses, 1);
        assert_eq!(live[&TeamId(1)].set_wins, 0);
        assert!(live[&TeamId(2)].played);
    }

    #[test]
    fn test_collect_records_byes() {
        let entrants = vec![Entrant::new(TeamId(1), 1)];
        let mut m = Match::new(MatchId(0), 1, 3).with_opponents(Slot::Team(TeamId(1)), Slot::Bye);
        m.resolve_bye();
        let matches = vec![m];

        let counting = Counting {
            include_in_progress: false,
            byes_as_wins: true,
        };
        let records = collect_records(&entrants, &matches, counting);
        assert_eq!(records[&TeamId(1)].set_wins, 1);
        assert!(!records[&TeamId(1)].played);

        let counting = Counting {
            byes_as_wins: false,
            ..counting
        };
        let records = collect_records(&entrants, &matches, counting);
        assert_eq!(records[&TeamId(1)].set_wins, 0);
    }

    #[test]
    fn test_against_filters_opponents() {
        let record = Record {
            sets: vec![(TeamId(2), true), (TeamId(3), false), (TeamId(4), false)],
            ..Default::default()
        };
        assert_eq!(against(&record, |t| t != TeamId(4)), (1, 1));
        assert_eq!(against(&record, |_| false), (0, 0));
    }
}
