//! Consistency scoring for repeated runs of a generative model, plus a small
//! SQLite run store the CLI records runs into.

pub mod consistency;
pub mod store;
pub mod util;
