//! Error types for the planning core.

use thiserror::Error;

/// Failures surfaced at the solve boundary.
///
/// Solver-side outcomes (infeasible, timed out, model invalid) are not errors;
/// they are reported through [`crate::solver::SolveStatus`].
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// Input-structure defects. Solving never starts; the full error list is
    /// preserved for the caller.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

impl PlanError {
    /// The individual validation messages, when this is a validation failure.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation(errors) => errors,
        }
    }
}
