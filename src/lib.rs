//! Hospital roster planning engine.
//!
//! A constraint-programming pipeline that turns employees, shift types, day
//! tokens, and free-form planning rules into an optimized roster: decision
//! variables → hard constraints → weighted objective → solve → analysis.

pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod dto;
pub mod error;
pub mod objectives;
pub mod solution;
pub mod solver;
pub mod variables;
