//! Match structure generation for each bracket format.
//!
//! Elimination trees are built up front as an arena with forward links.
//! Match ids are arena indices, allocated round by round.

use crate::models::{Entrant, GroupId, Match, MatchId, Section, Side, Slot, SlotRef};

/// Bracket positions for seeds 1..=size, e.g. `[1, 8, 4, 5, 2, 7, 3, 6]`
/// for eight, so the top seeds can only meet late.
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    while positions.len() < size {
        let mirror = positions.len() * 2 + 1;
        positions = positions.iter().flat_map(|&s| [s, mirror - s]).collect();
    }
    positions
}

fn side_for(index: usize) -> Side {
    if index % 2 == 0 {
        Side::First
    } else {
        Side::Second
    }
}

fn seeded_slot(entrants: &[Entrant], seed: usize) -> Slot {
    entrants
        .get(seed - 1)
        .map_or(Slot::Bye, |entrant| Slot::Team(entrant.team_id))
}

/// Number of rounds in a tree holding `entrants` teams.
fn tree_rounds(entrants: usize) -> (usize, u32) {
    let size = entrants.max(2).next_power_of_two();
    (size, size.trailing_zeros())
}

/// Single elimination tree. Round `r` sits at depth `2r`; the optional
/// third place match is fed by the semifinal losers.
pub fn single_elimination(entrants: &[Entrant], best_of: u32, third_place: bool) -> Vec<Match> {
    let (size, rounds) = tree_rounds(entrants.len());
    let positions = seed_positions(size);
    let mut matches: Vec<Match> = Vec::with_capacity(size);

    let mut round_start = 0;
    for round in 1..=rounds {
        let count = size >> round;
        let next_start = round_start + count;

        for i in 0..count {
            let id = MatchId::from_index(round_start + i);
            let mut m = Match::new(id, round, best_of).with_section(Section::Main, 2 * round);
            if round == 1 {
                m.opponents = [
                    seeded_slot(entrants, positions[2 * i]),
                    seeded_slot(entrants, positions[2 * i + 1]),
                ];
            }
            if round < rounds {
                m.winner_to = Some(SlotRef::new(
                    MatchId::from_index(next_start + i / 2),
                    side_for(i),
                ));
            }
            matches.push(m);
        }
        round_start = next_start;
    }

    if third_place && rounds >= 2 {
        let third_id = MatchId::from_index(matches.len());
        let semis_start = matches.len() - 3;
        for i in 0..2 {
            matches[semis_start + i].loser_to = Some(SlotRef::new(third_id, side_for(i)));
        }
        matches.push(
            Match::new(third_id, rounds, best_of)
                .with_section(Section::ThirdPlace, 2 * (rounds - 1)),
        );
    }

    matches
}

/// Double elimination: winners tree, losers tree and a single grand final.
///
/// The losers bracket has `2(k-1)` rounds for a `k` round winners bracket.
/// Odd losers rounds pair survivors among themselves (round 1 takes the
/// first-round losers); even rounds bring in the losers of the next
/// winners round, in reverse order to delay rematches. Losers round `r`
/// sits at depth `2r`, the grand final one round deeper.
pub fn double_elimination(entrants: &[Entrant], best_of: u32) -> Vec<Match> {
    let (size, rounds) = tree_rounds(entrants.len());
    let positions = seed_positions(size);
    let losers_rounds = 2 * (rounds - 1);

    // Arena offsets: winners rounds, then losers rounds, then the grand final
    let mut wb_start = Vec::new();
    let mut next = 0;
    for round in 1..=rounds {
        wb_start.push(next);
        next += size >> round;
    }
    let lb_count = |round: u32| size >> (round.div_ceil(2) + 1);
    let mut lb_start = Vec::new();
    for round in 1..=losers_rounds {
        lb_start.push(next);
        next += lb_count(round);
    }
    let grand_final = MatchId::from_index(next);

    let mut matches: Vec<Match> = Vec::with_capacity(next + 1);

    for round in 1..=rounds {
        let count = size >> round;
        for i in 0..count {
            let id = MatchId::from_index(wb_start[round as usize - 1] + i);
            let mut m = Match::new(id, round, best_of).with_section(Section::Winners, 2 * round);
            if round == 1 {
                m.opponents = [
                    seeded_slot(entrants, positions[2 * i]),
                    seeded_slot(entrants, positions[2 * i + 1]),
                ];
            }

            m.winner_to = Some(if round < rounds {
                SlotRef::new(
                    MatchId::from_index(wb_start[round as usize] + i / 2),
                    side_for(i),
                )
            } else {
                SlotRef::new(grand_final, Side::First)
            });

            m.loser_to = Some(if losers_rounds == 0 {
                SlotRef::new(grand_final, Side::Second)
            } else if round == 1 {
                SlotRef::new(MatchId::from_index(lb_start[0] + i / 2), side_for(i))
            } else {
                // Winners round r feeds losers round 2(r-1), reversed
                let target = 2 * (round - 1);
                let offset = lb_count(target) - 1 - i;
                SlotRef::new(
                    MatchId::from_index(lb_start[target as usize - 1] + offset),
                    Side::Second,
                )
            });

            matches.push(m);
        }
    }

    for round in 1..=losers_rounds {
        let count = lb_count(round);
        for i in 0..count {
            let id = MatchId::from_index(lb_start[round as usize - 1] + i);
            let mut m = Match::new(id, round, best_of).with_section(Section::Losers, 2 * round);

            m.winner_to = Some(if round == losers_rounds {
                SlotRef::new(grand_final, Side::Second)
            } else if round % 2 == 1 {
                // Odd rounds feed the same index of the following even round
                SlotRef::new(MatchId::from_index(lb_start[round as usize] + i), Side::First)
            } else {
                SlotRef::new(
                    MatchId::from_index(lb_start[round as usize] + i / 2),
                    side_for(i),
                )
            });

            matches.push(m);
        }
    }

    matches.push(
        Match::new(grand_final, 1, best_of)
            .with_section(Section::GrandFinal, 2 * (losers_rounds + 1)),
    );

    matches
}

/// Spread entrants over groups in snake order: A B C C B A A B C ...
pub fn snake_groups(entrants: &mut [Entrant], groups: u32) {
    let groups = groups.clamp(1, entrants.len().max(1) as u32) as usize;
    for (i, entrant) in entrants.iter_mut().enumerate() {
        let row = i / groups;
        let col = i % groups;
        let col = if row % 2 == 1 { groups - 1 - col } else { col };
        entrant.group_id = Some(GroupId(col as u32 + 1));
    }
}

/// Full round robin schedule, group by group, using the circle method.
pub fn round_robin(entrants: &[Entrant], best_of: u32) -> Vec<Match> {
    let mut group_ids: Vec<GroupId> = entrants.iter().filter_map(|e| e.group_id).collect();
    group_ids.sort();
    group_ids.dedup();

    let mut matches = Vec::new();
    for group_id in group_ids {
        let mut circle: Vec<Option<&Entrant>> = entrants
            .iter()
            .filter(|e| e.group_id == Some(group_id))
            .map(Some)
            .collect();
        if circle.len() % 2 == 1 {
            circle.push(None);
        }
        let n = circle.len();

        for round in 1..n {
            for i in 0..n / 2 {
                if let (Some(a), Some(b)) = (circle[i], circle[n - 1 - i]) {
                    matches.push(
                        Match::new(MatchId::from_index(matches.len()), round as u32, best_of)
                            .with_opponents(Slot::Team(a.team_id), Slot::Team(b.team_id))
                            .with_group(group_id),
                    );
                }
            }
            // Keep the first position fixed, rotate the rest
            circle[1..].rotate_right(1);
        }
    }

    matches
}

/// First swiss round: top half against bottom half by seed. With an odd
/// number of teams the lowest seed gets the bye.
pub fn swiss_first_round(entrants: &[Entrant], best_of: u32) -> Vec<Match> {
    let mut active: Vec<&Entrant> = entrants.iter().filter(|e| !e.dropped_out).collect();
    let bye = if active.len() % 2 == 1 { active.pop() } else { None };
    let half = active.len() / 2;

    let mut matches: Vec<Match> = (0..half)
        .map(|i| {
            Match::new(MatchId::from_index(i), 1, best_of).with_opponents(
                Slot::Team(active[i].team_id),
                Slot::Team(active[i + half].team_id),
            )
        })
        .collect();

    if let Some(entrant) = bye {
        matches.push(
            Match::new(MatchId::from_index(half), 1, best_of)
                .with_opponents(Slot::Team(entrant.team_id), Slot::Bye),
        );
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamId;
    use pretty_assertions::assert_eq;

    fn entrants(count: u32) -> Vec<Entrant> {
        (1..=count).map(|id| Entrant::new(TeamId(id), id)).collect()
    }

    #[test]
    fn test_seed_positions() {
        assert_eq!(seed_positions(2), vec![1, 2]);
        assert_eq!(seed_positions(4), vec![1, 4, 2, 3]);
        assert_eq!(seed_positions(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn test_single_elimination_structure() {
        let matches = single_elimination(&entrants(8), 3, false);
        assert_eq!(matches.len(), 7);
        assert_eq!(
            matches[0].opponents,
            [Slot::Team(TeamId(1)), Slot::Team(TeamId(8))]
        );
        assert_eq!(
            matches[0].winner_to,
            Some(SlotRef::new(MatchId(4), Side::First))
        );
        assert_eq!(
            matches[3].winner_to,
            Some(SlotRef::new(MatchId(5), Side::Second))
        );
        assert_eq!(matches[6].winner_to, None);
        assert_eq!(matches[6].depth, 6);
        assert!(matches.iter().all(|m| m.loser_to.is_none()));
    }

    #[test]
    fn test_single_elimination_byes_for_missing_seeds() {
        let matches = single_elimination(&entrants(6), 3, false);
        assert_eq!(matches[0].opponents, [Slot::Team(TeamId(1)), Slot::Bye]);
        assert_eq!(matches[2].opponents, [Slot::Team(TeamId(2)), Slot::Bye]);
        assert_eq!(
            matches[1].opponents,
            [Slot::Team(TeamId(4)), Slot::Team(TeamId(5))]
        );
    }

    #[test]
    fn test_third_place_match() {
        let matches = single_elimination(&entrants(4), 3, true);
        assert_eq!(matches.len(), 4);
        let third = &matches[3];
        assert_eq!(third.section, Section::ThirdPlace);
        assert_eq!(third.depth, 2);
        assert_eq!(
            matches[0].loser_to,
            Some(SlotRef::new(MatchId(3), Side::First))
        );
        assert_eq!(
            matches[1].loser_to,
            Some(SlotRef::new(MatchId(3), Side::Second))
        );
        assert_eq!(matches[2].loser_to, None);
    }

    #[test]
    fn test_double_elimination_structure() {
        let matches = double_elimination(&entrants(8), 3);
        // 7 winners, 6 losers (2, 2, 1, 1), 1 grand final
        assert_eq!(matches.len(), 14);

        let losers: Vec<&Match> = matches
            .iter()
            .filter(|m| m.section == Section::Losers)
            .collect();
        assert_eq!(
            losers.iter().map(|m| m.round).collect::<Vec<_>>(),
            vec![1, 1, 2, 2, 3, 4]
        );

        // First round losers pair up in losers round 1
        assert_eq!(
            matches[0].loser_to,
            Some(SlotRef::new(MatchId(7), Side::First))
        );
        assert_eq!(
            matches[1].loser_to,
            Some(SlotRef::new(MatchId(7), Side::Second))
        );
        // Second round losers drop in reversed
        assert_eq!(
            matches[4].loser_to,
            Some(SlotRef::new(MatchId(10), Side::Second))
        );
        assert_eq!(
            matches[5].loser_to,
            Some(SlotRef::new(MatchId(9), Side::Second))
        );
        // Winners final loser meets the losers round 3 winner
        assert_eq!(
            matches[6].loser_to,
            Some(SlotRef::new(MatchId(12), Side::Second))
        );
        assert_eq!(
            matches[6].winner_to,
            Some(SlotRef::new(MatchId(13), Side::First))
        );
        assert_eq!(
            matches[12].winner_to,
            Some(SlotRef::new(MatchId(13), Side::Second))
        );

        let grand_final = &matches[13];
        assert_eq!(grand_final.section, Section::GrandFinal);
        assert_eq!(grand_final.depth, 10);
        assert!(grand_final.winner_to.is_none() && grand_final.loser_to.is_none());
    }

    #[test]
    fn test_double_elimination_two_teams() {
        let matches = double_elimination(&entrants(2), 1);
        assert_eq!(matches.len(), 2);
        assert_eq!(
            matches[0].loser_to,
            Some(SlotRef::new(MatchId(1), Side::Second))
        );
    }

    #[test]
    fn test_snake_groups() {
        let mut pool = entrants(7);
        snake_groups(&mut pool, 3);
        let groups: Vec<u32> = pool.iter().map(|e| e.group_id.unwrap().as_u32()).collect();
        assert_eq!(groups, vec![1, 2, 3, 3, 2, 1, 1]);
    }

    #[test]
    fn test_round_robin_everyone_meets_once() {
        let mut pool = entrants(5);
        snake_groups(&mut pool, 1);
        let matches = round_robin(&pool, 3);

        assert_eq!(matches.len(), 10);
        for a in 1..=5 {
            for b in (a + 1)..=5 {
                let meetings = matches
                    .iter()
                    .filter(|m| m.side_of(TeamId(a)).is_some() && m.side_of(TeamId(b)).is_some())
                    .count();
                assert_eq!(meetings, 1, "{} vs {}", a, b);
            }
        }
        assert_eq!(matches.iter().map(|m| m.round).max(), Some(5));
    }

    #[test]
    fn test_round_robin_keeps_groups_apart() {
        let mut pool = entrants(8);
        snake_groups(&mut pool, 2);
        let matches = round_robin(&pool, 3);

        assert_eq!(matches.len(), 12);
        for m in &matches {
            let (a, b) = m.teams().unwrap();
            let group_of = |t: TeamId| pool.iter().find(|e| e.team_id == t).unwrap().group_id;
            assert_eq!(group_of(a), group_of(b));
            assert_eq!(group_of(a), m.group_id);
        }
    }

    #[test]
    fn test_swiss_first_round() {
        let matches = swiss_first_round(&entrants(5), 3);
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches[0].opponents,
            [Slot::Team(TeamId(1)), Slot::Team(TeamId(3))]
        );
        assert_eq!(
            matches[1].opponents,
            [Slot::Team(TeamId(2)), Slot::Team(TeamId(4))]
        );
        assert_eq!(matches[2].opponents, [Slot::Team(TeamId(5)), Slot::Bye]);
    }
}
