//! Wire-facing request payloads for the planning core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{AvailabilityMap, Employee, FixedAssignment, PlanningData, Rule, Shift};

/// Lower clamp for caller-supplied time limits, in seconds.
pub const MIN_TIME_LIMIT_SECS: u64 = 5;
/// Upper clamp for caller-supplied time limits, in seconds.
pub const MAX_TIME_LIMIT_SECS: u64 = 600;

/// How much wall-clock budget the caller wants to spend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    #[default]
    Quick,
    Optimal,
    Custom,
}

impl OptimizationMode {
    /// Resolves the wall-clock budget in seconds. `custom` is only consulted
    /// in custom mode and clamped to `[5, 600]`.
    pub fn time_limit_secs(&self, custom: Option<u64>) -> u64 {
        match self {
            Self::Quick => 30,
            Self::Optimal => 300,
            Self::Custom => custom
                .unwrap_or(30)
                .clamp(MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS),
        }
    }
}

/// A day token as it arrives on the wire: either a number or a string.
/// Both normalize to the string form used everywhere inside the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayInput {
    Number(i64),
    Text(String),
}

impl DayInput {
    pub fn into_token(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Request to generate a roster plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverRequest {
    pub employees: Vec<Employee>,
    pub shifts: Vec<Shift>,
    pub days: Vec<DayInput>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub availability: AvailabilityMap,
    #[serde(default)]
    pub fixed_assignments: Vec<FixedAssignment>,
    #[serde(default)]
    pub optimization_mode: OptimizationMode,
    #[serde(default)]
    pub time_limit: Option<u64>,
    /// Accepted for wire compatibility; the core does not consume stations.
    #[serde(default)]
    pub stations: Vec<String>,
}

impl SolverRequest {
    /// Effective wall-clock budget for this request.
    pub fn time_limit_secs(&self) -> u64 {
        self.optimization_mode.time_limit_secs(self.time_limit)
    }

    /// Normalizes the payload into the internal problem instance.
    pub fn into_planning_data(self) -> PlanningData {
        PlanningData {
            employees: self.employees,
            shifts: self.shifts,
            days: self.days.into_iter().map(DayInput::into_token).collect(),
            rules: self.rules,
            availability: self.availability,
            fixed_assignments: self.fixed_assignments,
        }
    }
}

/// One cell of a pre-existing schedule used for incremental re-planning.
///
/// Cells with a shift and `locked = false` are pinned by the incremental
/// solver; locked cells are expected to arrive as fixed assignments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExistingCell {
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

/// `initials → day → cell` view of the schedule being re-planned.
pub type ExistingSchedule = HashMap<String, HashMap<String, ExistingCell>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_limit_resolution() {
        assert_eq!(OptimizationMode::Quick.time_limit_secs(Some(120)), 30);
        assert_eq!(OptimizationMode::Optimal.time_limit_secs(None), 300);
        assert_eq!(OptimizationMode::Custom.time_limit_secs(Some(120)), 120);
        // Custom budgets clamp to the allowed band.
        assert_eq!(OptimizationMode::Custom.time_limit_secs(Some(2)), 5);
        assert_eq!(OptimizationMode::Custom.time_limit_secs(Some(9999)), 600);
        assert_eq!(OptimizationMode::Custom.time_limit_secs(None), 30);
    }

    #[test]
    fn test_day_tokens_accept_numbers_and_strings() {
        let days: Vec<DayInput> = serde_json::from_str(r#"[1, "2", 3]"#).unwrap();
        let tokens: Vec<String> = days.into_iter().map(DayInput::into_token).collect();
        assert_eq!(tokens, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_request_defaults() {
        let request: SolverRequest = serde_json::from_str(
            r#"{
                "employees": [{"name": "Dr. Anna Müller", "initials": "AM"}],
                "shifts": [{"name": "Früh"}],
                "days": [1, 2]
            }"#,
        )
        .unwrap();

        assert_eq!(request.optimization_mode, OptimizationMode::Quick);
        assert_eq!(request.time_limit_secs(), 30);
        assert!(request.rules.is_empty());
        assert!(request.stations.is_empty());
        assert_eq!(request.employees[0].hours, 40);
        assert_eq!(request.shifts[0].time, "08:00-16:00");

        let data = request.into_planning_data();
        assert_eq!(data.days, vec!["1", "2"]);
    }

    #[test]
    fn test_existing_cell_defaults() {
        let cell: ExistingCell = serde_json::from_str(r#"{"shift": "Früh"}"#).unwrap();
        assert_eq!(cell.shift.as_deref(), Some("Früh"));
        assert!(!cell.locked);
    }
}
