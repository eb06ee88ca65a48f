//! Elimination standings: how deep each team got in the bracket tree.

use std::collections::BTreeMap;

use super::{collect_records, competition_ranks, visible, Counting};
use crate::models::{Entrant, Match, Standing, StandingStats, TeamId};

/// Where a team's run ended, or the cap on how far it can still go.
#[derive(Debug, Clone, Copy)]
enum Run {
    /// Lost a match without a `loser_to` link (its depth), or won a terminal
    /// match (its depth + 1)
    Finished(u32),
    /// Still alive; `cap` is set while the team sits in an open terminal match
    Alive { cap: Option<u32> },
}

fn run_of(team: TeamId, matches: &[Match]) -> Run {
    let mut cap = None;

    for m in matches {
        if m.is_final() {
            if m.loser_team() == Some(team) && m.loser_to.is_none() {
                return Run::Finished(m.depth);
            }
            if m.winner_team() == Some(team) && m.winner_to.is_none() {
                return Run::Finished(m.depth + 1);
            }
        } else if m.side_of(team).is_some() && m.winner_to.is_none() {
            cap = Some(m.depth + 1);
        }
    }

    Run::Alive { cap }
}

/// Ranking key per team, larger is better.
///
/// Alive teams rank ahead of every finished team, except a team whose open
/// terminal match can no longer lift it above an already finished team
/// (a third place match played after the final).
fn reach_keys(entrants: &[Entrant], matches: &[Match]) -> BTreeMap<TeamId, u32> {
    let runs: Vec<(TeamId, Run)> = entrants
        .iter()
        .map(|e| (e.team_id, run_of(e.team_id, matches)))
        .collect();

    let best_finished = runs
        .iter()
        .filter_map(|(_, run)| match run {
            Run::Finished(depth) => Some(*depth),
            Run::Alive { .. } => None,
        })
        .max();

    runs.into_iter()
        .map(|(team, run)| {
            let key = match run {
                Run::Finished(depth) => depth,
                Run::Alive { cap: Some(cap) } if best_finished.is_some_and(|best| best > cap) => {
                    cap
                }
                Run::Alive { .. } => u32::MAX,
            };
            (team, key)
        })
        .collect()
}

/// Standings for single and double elimination brackets.
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

    let reached = reach_keys(entrants, matches);
    let dropped: BTreeMap<TeamId, bool> = entrants
        .iter()
        .map(|e| (e.team_id, e.dropped_out))
        .collect();

    let mut rows: Vec<(&Entrant, u32)> = visible(entrants, &records)
        .map(|e| (e, reached[&e.team_id]))
        .collect();

    rows.sort_by(|(a, a_reach), (b, b_reach)| {
        b_reach
            .cmp(a_reach)
            .then_with(|| a.dropped_out.cmp(&b.dropped_out))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });

    let ranks = competition_ranks(&rows, |(a, a_reach), (b, b_reach)| {
        a_reach == b_reach && a.dropped_out == b.dropped_out
    });

    rows.iter()
        .zip(ranks)
        .map(|((entrant, team_reach), placement)| {
            let record = &records[&entrant.team_id];
            let tied = |opponent: TeamId| {
                !entrant.dropped_out
                    && !dropped.get(&opponent).copied().unwrap_or(true)
                    && reached.get(&opponent) == Some(team_reach)
            };
            let (wins_against_tied, losses_against_tied) = super::against(record, tied);

            Standing {
                team_id: entrant.team_id,
                placement,
                group_id: None,
                dropped_out: entrant.dropped_out,
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
        .collect()
}
