//! Round robin standings, computed per group.
//!
//! Sort chain inside a group:
//! 1. set wins (desc)
//! 2. active teams before dropped ones
//! 3. set wins against tied teams (desc), i.e. head-to-head
//! 4. map win rate (desc)
//! 5. set losses against tied teams (asc)
//! 6. team id (asc)
//!
//! Two teams are tied when they share a group and a set-win count and
//! neither dropped out.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{against, collect_records, compare_win_rate, competition_ranks, visible, Counting};
use crate::models::{Entrant, GroupId, Match, Standing, StandingStats, TeamId};

struct Row<'a> {
    entrant: &'a Entrant,
    stats: StandingStats,
}

fn compare_rows(a: &Row, b: &Row) -> Ordering {
    b.stats
        .set_wins
        .cmp(&a.stats.set_wins)
        .then_with(|| a.entrant.dropped_out.cmp(&b.entrant.dropped_out))
        .then_with(|| b.stats.wins_against_tied.cmp(&a.stats.wins_against_tied))
        .then_with(|| {
            compare_win_rate(
                (b.stats.map_wins, b.stats.map_losses),
                (a.stats.map_wins, a.stats.map_losses),
            )
        })
        .then_with(|| a.stats.losses_against_tied.cmp(&b.stats.losses_against_tied))
}

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
            byes_as_wins: false,
        },
    );

    let mut groups: BTreeMap<Option<GroupId>, Vec<&Entrant>> = BTreeMap::new();
    for entrant in visible(entrants, &records) {
        groups.entry(entrant.group_id).or_default().push(entrant);
    }

    let active_in_group = |team: TeamId, group: Option<GroupId>| {
        entrants
            .iter()
            .any(|e| e.team_id == team && e.group_id == group && !e.dropped_out)
    };

    // (within-group placement, group, order within group, standing)
    let mut all: Vec<(u32, Option<GroupId>, usize, Standing)> = Vec::new();

    for (group_id, members) in groups {
        let mut rows: Vec<Row> = members
            .into_iter()
            .map(|entrant| {
                let record = &records[&entrant.team_id];
                let (wins_against_tied, losses_against_tied) = if entrant.dropped_out {
                    (0, 0)
                } else {
                    against(record, |opponent| {
                        active_in_group(opponent, group_id)
                            && records.get(&opponent).map(|r| r.set_wins) == Some(record.set_wins)
                    })
                };

                Row {
                    entrant,
                    stats: StandingStats {
                        set_wins: record.set_wins,
                        set_losses: record.set_losses,
                        map_wins: record.map_wins,
                        map_losses: record.map_losses,
                        wins_against_tied,
                        losses_against_tied,
                        buchholz: None,
                    },
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            compare_rows(a, b).then_with(|| a.entrant.team_id.cmp(&b.entrant.team_id))
        });
        let ranks = competition_ranks(&rows, |a, b| compare_rows(a, b) == Ordering::Equal);

        for (order, (row, placement)) in rows.into_iter().zip(ranks).enumerate() {
            all.push((
                placement,
                group_id,
                order,
                Standing {
                    team_id: row.entrant.team_id,
                    placement,
                    group_id,
                    dropped_out: row.entrant.dropped_out,
                    stats: row.stats,
                },
            ));
        }
    }

    all.sort_by_key(|(placement, group_id, order, _)| (*placement, *group_id, *order));
    all.into_iter().map(|(_, _, _, standing)| standing).collect()
}
