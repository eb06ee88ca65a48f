//! Rating collaborator.
//!
//! The engine never does rating math itself. The summarizer hands each
//! decided set to a [`RatingModel`] and records whatever it returns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use skillratings::weng_lin::{weng_lin_two_teams, WengLinConfig, WengLinRating};
use skillratings::Outcomes;

use crate::models::UserId;

/// Skill estimate: mean and uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            mu: 25.0,
            sigma: 25.0 / 3.0,
        }
    }
}

impl From<WengLinRating> for Rating {
    fn from(rating: WengLinRating) -> Self {
        Self {
            mu: rating.rating,
            sigma: rating.uncertainty,
        }
    }
}

impl From<Rating> for WengLinRating {
    fn from(rating: Rating) -> Self {
        WengLinRating {
            rating: rating.mu,
            uncertainty: rating.sigma,
        }
    }
}

/// Updates ratings after one decided set.
pub trait RatingModel: Send + Sync {
    /// Return updated ratings for the winning and losing sides, in input order.
    fn rate(&self, winners: &[Rating], losers: &[Rating]) -> (Vec<Rating>, Vec<Rating>);
}

/// Weng-Lin (OpenSkill family) Bayesian rating.
#[derive(Debug, Clone)]
pub struct WengLinModel {
    config: WengLinConfig,
}

impl WengLinModel {
    pub fn new() -> Self {
        Self {
            config: WengLinConfig::new(),
        }
    }
}

impl Default for WengLinModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RatingModel for WengLinModel {
    fn rate(&self, winners: &[Rating], losers: &[Rating]) -> (Vec<Rating>, Vec<Rating>) {
        let winners: Vec<WengLinRating> = winners.iter().copied().map(Into::into).collect();
        let losers: Vec<WengLinRating> = losers.iter().copied().map(Into::into).collect();

        let (winners, losers) =
            weng_lin_two_teams(&winners, &losers, &Outcomes::WIN, &self.config);

        (
            winners.into_iter().map(Rating::from).collect(),
            losers.into_iter().map(Rating::from).collect(),
        )
    }
}

/// Ratings held by the persistence layer before this tournament.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorRatings {
    #[serde(default)]
    pub users: HashMap<UserId, Rating>,

    /// Keyed by team identifier (sorted user ids joined with `-`)
    #[serde(default)]
    pub teams: HashMap<String, Rating>,
}

impl PriorRatings {
    pub fn user(&self, user_id: UserId) -> Rating {
        self.users.get(&user_id).copied().unwrap_or_default()
    }

    pub fn team(&self, identifier: &str) -> Rating {
        self.teams.get(identifier).copied().unwrap_or_default()
    }
}

/// Identifier for a lineup: sorted user ids joined with `-`.
pub fn team_identifier(users: &[UserId]) -> String {
    let mut ids: Vec<u32> = users.iter().map(|u| u.as_u32()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
