//! Hyperparameter search
//!
//! - `grid`: ordered parameter grids and their combinations
//! - `grid_search`: inner-CV grid search with refit of the winner

pub mod grid;
pub mod grid_search;

#[cfg(test)]
mod tests;

pub use grid::{Combination, ParamGrid, ParamKey};
pub use grid_search::{CandidateScore, GridSearchCv, SearchOutcome};
