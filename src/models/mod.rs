//! Core data models for the bracket engine.

mod ids;
mod matches;
mod pairing;
mod standing;
mod summary;
mod team;

pub use ids::*;
pub use matches::*;
pub use pairing::*;
pub use standing::*;
pub use summary::*;
pub use team::*;
