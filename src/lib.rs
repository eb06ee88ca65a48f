//! # Bracket Engine
//!
//! Tournament brackets, standings and end-of-event summaries.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (teams, matches, standings, summary)
//! - **calculate**: Standings and tie-break computation per format
//! - **pairing**: Swiss pairing with rematch avoidance
//! - **bracket**: Format engines, match generation and result propagation
//! - **tournament**: Ordered brackets, team advancement and drop-outs
//! - **summarize**: Ratings, map/opponent deltas and final placements
//! - **rating**: Rating model seam (Weng-Lin by default)
//! - **config**: Configuration loading and validation
//! - **error**: Engine error type

pub mod bracket;
pub mod calculate;
pub mod config;
pub mod error;
pub mod models;
pub mod pairing;
pub mod rating;
pub mod summarize;
pub mod tournament;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::EngineError;
pub use models::*;
pub use summarize::Summarizer;
pub use tournament::{TeamSelector, Tournament};
