//! Configuration validation
//!
//! Checks an experiment specification for correctness before any data is
//! loaded.

mod error;
mod validator;


pub use error::ValidationError;
pub use validator::validate_config;
