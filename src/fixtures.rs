//! Shared test fixtures.

use crate::models::{GameResult, Side, Team, TeamId, UserId};

/// Teams 1..=count, seeded by id, each with a two-player roster
/// (team `t` fields users `10t` and `10t + 1`).
pub fn teams(count: u32) -> Vec<Team> {
    (1..=count)
        .map(|id| {
            Team::new(TeamId(id), format!("Team {}", id))
                .with_roster(vec![UserId(id * 10), UserId(id * 10 + 1)])
                .with_seed(id)
        })
        .collect()
}

/// A single game won by `winner`.
pub fn game(winner: Side) -> GameResult {
    GameResult::new(winner, "SZ", 1)
}

/// A set won `wins`-`losses` by `winner`, the loss played first.
pub fn set(winner: Side, wins: u32, losses: u32) -> Vec<GameResult> {
    let mut games: Vec<GameResult> = (0..losses)
        .map(|i| GameResult::new(winner.other(), "TC", i + 1))
        .collect();
    games.extend((0..wins).map(|i| GameResult::new(winner, "SZ", i + 1)));
    games
}
