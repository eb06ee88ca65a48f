//! Swiss standings: set wins, then strength of schedule.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::{against, collect_records, compare_win_rate, competition_ranks, visible, Counting};
use crate::models::{Entrant, Match, Standing, StandingStats, TeamId};

fn compare(a: &Standing, b: &Standing) -> Ordering {
    b.stats
        .set_wins
        .cmp(&a.stats.set_wins)
        .then_with(|| a.dropped_out.cmp(&b.dropped_out))
        .then_with(|| b.stats.buchholz.cmp(&a.stats.buchholz))
        .then_with(|| {
            compare_win_rate(
                (b.stats.map_wins, b.stats.map_losses),
                (a.stats.map_wins, a.stats.map_losses),
            )
        })
}

/// Byes count as set wins. Buchholz sums the set wins of every opponent
/// actually played, skipping opponents that dropped out.
pub fn standings(
    entrants: &[Entrant],
    matches: &[Match],
    include_in_progress: bool,
) -> Vec<Standing> {
    let records = collect_records(
        entrants,
        matches,
        Counting {
            include_in_progress,
            byes_as_wins: true,
        },
    );
    let dropped: BTreeSet<TeamId> = entrants
        .iter()
        .filter(|e| e.dropped_out)
        .map(|e| e.team_id)
        .collect();
    let set_wins = |team: TeamId| records.get(&team).map_or(0, |r| r.set_wins);

    let mut standings: Vec<Standing> = visible(entrants, &records)
        .map(|entrant| {
            let record = &records[&entrant.team_id];
            let buchholz: u32 = record
                .sets
                .iter()
                .filter(|(opponent, _)| !dropped.contains(opponent))
                .map(|(opponent, _)| set_wins(*opponent))
                .sum();
            let (wins_against_tied, losses_against_tied) = if entrant.dropped_out {
                (0, 0)
            } else {
                against(record, |opponent| {
                    !dropped.contains(&opponent) && set_wins(opponent) == record.set_wins
                })
            };

            Standing {
                team_id: entrant.team_id,
                placement: 0,
                group_id: None,
                dropped_out: entrant.dropped_out,
                stats: StandingStats {
                    set_wins: record.set_wins,
                    set_losses: record.set_losses,
                    map_wins: record.map_wins,
                    map_losses: record.map_losses,
                    wins_against_tied,
                    losses_against_tied,
                    buchholz: Some(buchholz),
                },
            }
        })
        .collect();

    standings.sort_by(|a, b| compare(a, b).then_with(|| a.team_id.cmp(&b.team_id)));
    let ranks = competition_ranks(&standings, |a, b| compare(a, b) == Ordering::Equal);
    for (standing, placement) in standings.iter_mut().zip(ranks) {
        standing.placement = placement;
    }

    standings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameResult, MatchId, Side, Slot};

    fn entrants(count: u32) -> Vec<Entrant> {
        (1..=count).map(|id| Entrant::new(TeamId(id), id)).collect()
    }

    fn won(id: usize, round: u32, winner: u32, loser: u32) -> Match {
        let mut m = Match::new(MatchId::from_index(id), round, 1)
            .with_opponents(Slot::Team(TeamId(winner)), Slot::Team(TeamId(loser)));
        m.report_result(&[GameResult::new(Side::First, "SZ", 1)]).unwrap();
        m
    }

    fn bye(id: usize, round: u32, team: u32) -> Match {
        let mut m = Match::new(MatchId::from_index(id), round, 1)
            .with_opponents(Slot::Team(TeamId(team)), Slot::Bye);
        m.resolve_bye();
        m
    }

    fn find(standings: &[Standing], team: u32) -> &Standing {
        standings
            .iter()
            .find(|s| s.team_id == TeamId(team))
            .unwrap()
    }

    #[test]
    fn test_bye_counts_as_set_win() {
        let matches = vec![won(0, 1, 1, 2), bye(1, 1, 3)];
        let standings = standings(&entrants(3), &matches, false);

        assert_eq!(find(&standings, 3).stats.set_wins, 1);
        assert_eq!(find(&standings, 3).stats.map_wins, 0);
        // Same set wins, but the bye brings no maps
        assert_eq!(find(&standings, 1).placement, 1);
        assert_eq!(find(&standings, 3).placement, 2);
        assert_eq!(find(&standings, 2).placement, 3);
    }

    #[test]
    fn test_buchholz_breaks_set_win_ties() {
        // Round 1: 1>2, 3>4. Round 2: 1>3, 2>4.
        let matches = vec![
            won(0, 1, 1, 2),
            won(1, 1, 3, 4),
            won(2, 2, 1, 3),
            won(3, 2, 2, 4),
        ];
        let standings = standings(&entrants(4), &matches, false);

        // 2 and 3 are both 1-1; 3's opponents won 2+0, 2's won 2+0 as well,
        // so map rate and id decide
        let order: Vec<u32> = standings.iter().map(|s| s.team_id.as_u32()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(find(&standings, 1).stats.buchholz, Some(2));
        assert_eq!(find(&standings, 2).stats.buchholz, Some(2));
        assert_eq!(find(&standings, 2).placement, 2);
        assert_eq!(find(&standings, 3).placement, 2);
    }

    #[test]
    fn test_losses_against_tied_counts_active_opponents() {
        // 3 and 4 end on one win; 3 beat 4 directly
        let matches = vec![
            won(0, 1, 1, 2),
            won(1, 1, 3, 4),
            won(2, 2, 1, 3),
            won(3, 2, 4, 2),
        ];
        let standings = standings(&entrants(4), &matches, false);

        let three = find(&standings, 3);
        let four = find(&standings, 4);
        assert_eq!((three.stats.set_wins, four.stats.set_wins), (1, 1));
        assert_eq!(three.stats.wins_against_tied, 1);
        assert_eq!(three.stats.losses_against_tied, 0);
        assert_eq!(four.stats.losses_against_tied, 1);
        assert_eq!(find(&standings, 2).stats.losses_against_tied, 0);
    }

    #[test]
    fn test_losses_against_dropped_team_are_ignored() {
        // 5 beat 1 in round one, then dropped out; 1 and 5 share one win
        let mut entrants = entrants(6);
        entrants[4].dropped_out = true;
        let matches = vec![
            won(0, 1, 5, 1),
            won(1, 1, 2, 3),
            won(2, 1, 4, 6),
            won(3, 2, 1, 6),
            won(4, 2, 2, 4),
            bye(5, 2, 3),
        ];
        let standings = standings(&entrants, &matches, false);

        let one = find(&standings, 1);
        assert_eq!(one.stats.set_wins, 1);
        assert_eq!(one.stats.losses_against_tied, 0);
        // Dropped opponents never add to strength of schedule
        assert_eq!(one.stats.buchholz, Some(0));

        let five = find(&standings, 5);
        assert!(five.dropped_out);
        assert_eq!(five.placement, standings.len() as u32 - 1);
    }

    #[test]
    fn test_deterministic() {
        let matches = vec![won(0, 1, 1, 2), won(1, 1, 4, 3), bye(2, 1, 5)];
        let first = standings(&entrants(5), &matches, true);
        let second = standings(&entrants(5), &matches, true);
        assert_eq!(first, second);
    }
}
