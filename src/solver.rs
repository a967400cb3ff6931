//! Solve driver: validation, compilation, engine invocation, status mapping.
//!
//! A solve call is a pure function of its input: the model is compiled in a
//! deterministic sequence (variables → constraints → objective) and handed to
//! the engine exactly once. Nothing is added after the search starts, and
//! independent solve calls share no mutable state.

use selen::prelude::*;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

use crate::constraints::ConstraintBuilder;
use crate::domain::PlanningData;
use crate::dto::ExistingSchedule;
use crate::error::PlanError;
use crate::objectives::ObjectiveBuilder;
use crate::solution::{RosterSolution, SolutionAnalysis, SolutionAnalyzer};
use crate::variables::ShiftVars;

/// Terminal status of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Optimum proven within the budget.
    Optimal,
    /// A valid roster exists but optimality was not proven.
    Feasible,
    /// The hard constraints cannot be satisfied simultaneously.
    Infeasible,
    /// The compiled model itself was rejected by the engine.
    ModelInvalid,
    /// Budget exhausted with no feasible roster found.
    Unknown,
}

impl SolveStatus {
    /// A roster is available iff the status is optimal or feasible.
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::ModelInvalid => "MODEL_INVALID",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Search statistics of a solve call.
///
/// `num_conflicts` and `num_branches` carry the engine's propagation and
/// search-node counts under the roster system's historical wire names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolveStatistics {
    pub num_conflicts: usize,
    pub num_branches: usize,
    /// Measured wall-clock seconds for the whole solve call.
    pub wall_time: f64,
    /// 0 when no objective was built.
    pub objective_value: i64,
}

/// Outcome of a solve call. `solution` and `analysis` are present iff the
/// status is optimal or feasible.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub solution: Option<RosterSolution>,
    pub statistics: SolveStatistics,
    pub analysis: Option<SolutionAnalysis>,
}

/// Validates the problem instance. An empty list means solving may start.
pub fn validate_planning_data(data: &PlanningData) -> Vec<String> {
    let mut errors = Vec::new();

    if data.employees.is_empty() {
        errors.push("No employees provided".to_string());
    }
    if data.shifts.is_empty() {
        errors.push("No shifts provided".to_string());
    }
    if data.days.is_empty() {
        errors.push("No days provided".to_string());
    }

    for (i, emp) in data.employees.iter().enumerate() {
        if emp.initials.is_empty() {
            errors.push(format!("Employee {i} missing initials"));
        }
        if emp.name.is_empty() {
            errors.push(format!("Employee {i} missing name"));
        }
    }

    for (i, shift) in data.shifts.iter().enumerate() {
        if shift.name.is_empty() {
            errors.push(format!("Shift {i} missing name"));
        }
    }

    for fa in &data.fixed_assignments {
        if !fa.is_complete() {
            errors.push(format!(
                "Invalid fixed assignment: {{'employee': '{}', 'day': '{}', 'shift': '{}'}}",
                fa.employee, fa.day, fa.shift
            ));
        }
    }

    errors
}

/// A compiled problem instance: engine model, decision-variable table, and
/// the optional objective variable.
pub(crate) struct CompiledModel {
    pub(crate) model: Model,
    pub(crate) vars: ShiftVars,
    pub(crate) objective: Option<VarId>,
}

/// Roster solver: compiles a problem instance into a CP model and drives the
/// engine under a wall-clock budget.
pub struct RosterSolver {
    data: PlanningData,
}

impl RosterSolver {
    pub fn new(data: PlanningData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &PlanningData {
        &self.data
    }

    /// Runs a full solve. Fails fast with the validation error list when the
    /// input is structurally broken; every other outcome is a [`SolveResult`].
    pub fn solve(&self, time_limit_secs: u64) -> Result<SolveResult, PlanError> {
        self.solve_with_pins(time_limit_secs, None)
    }

    fn solve_with_pins(
        &self,
        time_limit_secs: u64,
        existing: Option<&ExistingSchedule>,
    ) -> Result<SolveResult, PlanError> {
        let errors = validate_planning_data(&self.data);
        if !errors.is_empty() {
            return Err(PlanError::Validation(errors));
        }

        let started = Instant::now();
        let compiled = self.compile(time_limit_secs, existing);
        let objective = compiled.objective;
        let vars = compiled.vars;

        let outcome = match objective {
            Some(obj) => compiled.model.minimize(obj),
            None => compiled.model.solve(),
        };

        let result = match outcome {
            Ok(solution) => {
                let status = if objective.is_some() {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Feasible
                };
                self.completed(status, &solution, objective, &vars, started)
            }
            Err(SolverError::Timeout { .. }) => {
                // The engine discards its incumbent on timeout, so a plain
                // feasibility pass is the only way to still hand back a
                // workable roster.
                debug!("optimization timed out, retrying as pure satisfaction");
                let fallback = self.compile(time_limit_secs, existing);
                let fallback_vars = fallback.vars;
                let fallback_objective = fallback.objective;
                match fallback.model.solve() {
                    Ok(solution) => self.completed(
                        SolveStatus::Feasible,
                        &solution,
                        fallback_objective,
                        &fallback_vars,
                        started,
                    ),
                    Err(err) => self.failed(error_status(&err), started),
                }
            }
            Err(err) => self.failed(error_status(&err), started),
        };

        Ok(result)
    }

    /// Builds the model in the fixed sequence variables → hard constraints →
    /// (optional pins) → objective.
    pub(crate) fn compile(
        &self,
        time_limit_secs: u64,
        existing: Option<&ExistingSchedule>,
    ) -> CompiledModel {
        let config =
            SolverConfig::default().with_timeout_ms(time_limit_secs.saturating_mul(1000));
        let mut model = Model::with_config(config);

        let vars = ShiftVars::build(&mut model, &self.data);
        ConstraintBuilder::new(&mut model, &vars, &self.data).add_all();
        if let Some(existing) = existing {
            pin_existing_assignments(&mut model, &vars, existing);
        }
        let objective = ObjectiveBuilder::new(&mut model, &vars, &self.data).build_all();

        debug!(
            variables = vars.len(),
            has_objective = objective.is_some(),
            "model compiled"
        );
        CompiledModel {
            model,
            vars,
            objective,
        }
    }

    fn completed(
        &self,
        status: SolveStatus,
        solution: &Solution,
        objective: Option<VarId>,
        vars: &ShiftVars,
        started: Instant,
    ) -> SolveResult {
        let objective_value = objective
            .and_then(|obj| solution[obj].as_int())
            .unwrap_or(0) as i64;
        let statistics = SolveStatistics {
            num_conflicts: solution.stats.propagation_count,
            num_branches: solution.stats.node_count,
            wall_time: started.elapsed().as_secs_f64(),
            objective_value,
        };

        let analyzer = SolutionAnalyzer::new(solution, vars, &self.data);
        let roster = analyzer.extract();
        let analysis = analyzer.analyze(&roster, &statistics);

        info!(
            status = %status,
            assignments = roster.assignments.len(),
            objective = objective_value,
            "solve completed"
        );
        SolveResult {
            status,
            solution: Some(roster),
            statistics,
            analysis: Some(analysis),
        }
    }

    fn failed(&self, status: SolveStatus, started: Instant) -> SolveResult {
        info!(status = %status, "solve finished without a roster");
        SolveResult {
            status,
            solution: None,
            statistics: SolveStatistics {
                wall_time: started.elapsed().as_secs_f64(),
                ..SolveStatistics::default()
            },
            analysis: None,
        }
    }
}

/// Re-solves while preserving a pre-existing partial schedule.
///
/// Every cell with a shift and `locked = false` is pinned to 1 on top of the
/// regular compilation; locked cells are expected to arrive as fixed
/// assignments. Infeasibility under the pins is reported normally.
pub struct IncrementalRosterSolver {
    solver: RosterSolver,
    existing: ExistingSchedule,
}

impl IncrementalRosterSolver {
    pub fn new(data: PlanningData, existing: ExistingSchedule) -> Self {
        Self {
            solver: RosterSolver::new(data),
            existing,
        }
    }

    pub fn solve(&self, time_limit_secs: u64) -> Result<SolveResult, PlanError> {
        self.solver
            .solve_with_pins(time_limit_secs, Some(&self.existing))
    }
}

/// Pins every unlocked, non-empty cell of the pre-existing schedule to 1.
fn pin_existing_assignments(model: &mut Model, vars: &ShiftVars, existing: &ExistingSchedule) {
    for (initials, day_cells) in existing {
        for (day, cell) in day_cells {
            let Some(shift_name) = cell.shift.as_deref() else {
                continue;
            };
            if cell.locked {
                continue;
            }
            if let Some(var) = vars.get(initials, day, shift_name) {
                model.new(var.eq(1));
            }
        }
    }
}

fn error_status(err: &SolverError) -> SolveStatus {
    match err {
        SolverError::NoSolution { .. } | SolverError::ConflictingConstraints { .. } => {
            SolveStatus::Infeasible
        }
        SolverError::InvalidConstraint { .. }
        | SolverError::InvalidDomain { .. }
        | SolverError::InvalidVariable { .. }
        | SolverError::InvalidInput { .. } => SolveStatus::ModelInvalid,
        _ => SolveStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Employee, FixedAssignment, Rule, Shift};
    use crate::dto::ExistingCell;
    use crate::solution::Assignment;
    use std::collections::HashMap;

    const TEST_TIME_LIMIT: u64 = 10;

    /// One-week ward roster: four doctors, three shift types, night duty
    /// requires a Facharzt, Lisa Weber is off on the weekend.
    fn test_data() -> PlanningData {
        PlanningData {
            employees: vec![
                Employee::new("AM", "Dr. Anna Müller")
                    .with_contract("Oberarzt")
                    .with_qualifications(["Facharzt", "Notfallzertifizierung"]),
                Employee::new("PS", "Dr. Peter Schmidt")
                    .with_contract("Facharzt")
                    .with_qualifications(["Facharzt", "ABS-zertifiziert"]),
                Employee::new("LW", "Dr. Lisa Weber")
                    .with_contract("Assistenzarzt")
                    .with_qualifications(["Assistenzarzt"]),
                Employee::new("MB", "Dr. Max Bauer")
                    .with_contract("Facharzt")
                    .with_qualifications(["Facharzt", "Notfallzertifizierung"]),
            ],
            shifts: vec![
                Shift::new("Früh", "08:00-16:00")
                    .with_station("Ambulanzen")
                    .with_requirement("Min. 1 Person"),
                Shift::new("Spät", "14:00-22:00")
                    .with_station("Ambulanzen")
                    .with_requirement("Min. 1 Person"),
                Shift::new("Nacht", "22:00-08:00")
                    .with_station("Ambulanzen")
                    .with_requirement("Min. 1 Person")
                    .with_requirement("Facharzt"),
            ],
            days: (1..=7).map(|d| d.to_string()).collect(),
            rules: vec![
                Rule::hard("Mindestens 11 Stunden Ruhezeit zwischen Schichten"),
                Rule::hard("Maximal 48 Stunden pro Woche"),
                Rule::soft("Wochenenden fair verteilen"),
            ],
            availability: HashMap::from([(
                "LW".to_string(),
                HashMap::from([
                    ("6".to_string(), "uw".to_string()),
                    ("7".to_string(), "uw".to_string()),
                ]),
            )]),
            fixed_assignments: Vec::new(),
        }
    }

    #[test]
    fn test_validate_input_data() {
        assert!(validate_planning_data(&test_data()).is_empty());
    }

    #[test]
    fn test_validate_missing_employees() {
        let errors = validate_planning_data(&PlanningData::default());
        assert!(errors.iter().any(|e| e == "No employees provided"));
        assert!(errors.iter().any(|e| e == "No shifts provided"));
        assert!(errors.iter().any(|e| e == "No days provided"));
    }

    #[test]
    fn test_validate_item_level_errors() {
        let mut data = test_data();
        data.employees[0].initials.clear();
        data.shifts[1].name.clear();
        data.fixed_assignments
            .push(FixedAssignment::new("AM", "", "Früh"));

        let errors = validate_planning_data(&data);
        assert!(errors.iter().any(|e| e == "Employee 0 missing initials"));
        assert!(errors.iter().any(|e| e == "Shift 1 missing name"));
        assert!(errors
            .iter()
            .any(|e| e == "Invalid fixed assignment: {'employee': 'AM', 'day': '', 'shift': 'Früh'}"));
    }

    #[test]
    fn test_solve_rejects_invalid_input() {
        let solver = RosterSolver::new(PlanningData::default());
        let err = solver.solve(TEST_TIME_LIMIT).unwrap_err();
        assert!(err
            .messages()
            .iter()
            .any(|e| e == "No employees provided"));
    }

    #[test]
    fn test_compile_creates_variables() {
        let solver = RosterSolver::new(test_data());
        let compiled = solver.compile(TEST_TIME_LIMIT, None);
        // 4 employees × 7 days × 3 shifts.
        assert_eq!(compiled.vars.len(), 84);
        assert!(compiled.objective.is_some());
    }

    #[test]
    fn test_basic_solution() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        assert!(result.status.is_solved(), "status was {}", result.status);
        let solution = result.solution.expect("solved status carries a roster");
        assert!(!solution.assignments.is_empty());
        assert!(result.analysis.is_some());
    }

    #[test]
    fn test_respects_availability() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        let lw_days: Vec<&str> = solution
            .assignments
            .iter()
            .filter(|a| a.employee == "LW")
            .map(|a| a.day.as_str())
            .collect();
        assert!(!lw_days.contains(&"6"));
        assert!(!lw_days.contains(&"7"));
    }

    #[test]
    fn test_respects_qualifications() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        // Night duty requires Facharzt, which LW lacks.
        assert!(solution
            .assignments
            .iter()
            .all(|a| !(a.shift == "Nacht" && a.employee == "LW")));
    }

    #[test]
    fn test_one_shift_per_day() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        let mut per_day: HashMap<(&str, &str), u32> = HashMap::new();
        for a in &solution.assignments {
            *per_day.entry((a.employee.as_str(), a.day.as_str())).or_insert(0) += 1;
        }
        assert!(per_day.values().all(|&count| count <= 1));
    }

    #[test]
    fn test_coverage_is_met() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let analysis = result.analysis.expect("analysis expected");
        for per_shift in analysis.coverage_stats.values() {
            for cell in per_shift.values() {
                assert!(cell.assigned >= cell.required);
            }
        }
        assert!(analysis.constraint_summary.hard_constraints_satisfied);
    }

    #[test]
    fn test_statistics_reported() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        assert!(result.statistics.wall_time > 0.0);
        assert!(result.statistics.wall_time < (2 * TEST_TIME_LIMIT + 5) as f64);
    }

    #[test]
    fn test_fixed_assignment_honored() {
        let mut data = test_data();
        data.fixed_assignments = vec![FixedAssignment::new("AM", "1", "Früh")];

        let solver = RosterSolver::new(data);
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        let am_day1: Vec<&Assignment> = solution
            .assignments
            .iter()
            .filter(|a| a.employee == "AM" && a.day == "1")
            .collect();
        assert_eq!(am_day1.len(), 1);
        assert_eq!(am_day1[0].shift, "Früh");
    }

    #[test]
    fn test_schedule_pivot_complete() {
        let solver = RosterSolver::new(test_data());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        for emp in ["AM", "PS", "LW", "MB"] {
            let days = &solution.schedule[emp];
            assert_eq!(days.len(), 7);
        }
        // LW is off on day 7.
        assert!(solution.schedule["LW"]["7"].shift.is_none());
    }

    #[test]
    fn test_rest_between_late_and_early_shifts() {
        let data = test_data();
        let solver = RosterSolver::new(data.clone());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        let works = |employee: &str, day: &str, pred: &dyn Fn(&Shift) -> bool| {
            data.shifts.iter().any(|s| {
                pred(s)
                    && solution
                        .assignments
                        .iter()
                        .any(|a| a.employee == employee && a.day == day && a.shift == s.name)
            })
        };

        for emp in &data.employees {
            for pair in data.days.windows(2) {
                let worked_late = works(&emp.initials, &pair[0], &Shift::is_late);
                let works_early = works(&emp.initials, &pair[1], &Shift::is_early);
                assert!(
                    !(worked_late && works_early),
                    "{} works an early shift right after a late one",
                    emp.initials
                );
            }
        }
    }

    #[test]
    fn test_weekly_hours_capped() {
        let data = test_data();
        let solver = RosterSolver::new(data.clone());
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        let solution = result.solution.expect("roster expected");
        for emp in &data.employees {
            let hours: u32 = solution
                .assignments
                .iter()
                .filter(|a| a.employee == emp.initials)
                .filter_map(|a| data.shifts.iter().find(|s| s.name == a.shift))
                .map(|s| s.duration_hours())
                .sum();
            assert!(hours <= 48, "{} works {hours}h in one week", emp.initials);
        }
    }

    #[test]
    fn test_repeated_solves_agree() {
        let data = PlanningData {
            employees: vec![
                Employee::new("AM", "Dr. Anna Müller"),
                Employee::new("PS", "Dr. Peter Schmidt"),
            ],
            shifts: vec![Shift::new("Früh", "08:00-16:00").with_requirement("Min. 1 Person")],
            days: vec!["5".to_string(), "6".to_string()],
            ..Default::default()
        };

        let first = RosterSolver::new(data.clone()).solve(TEST_TIME_LIMIT).unwrap();
        let second = RosterSolver::new(data).solve(TEST_TIME_LIMIT).unwrap();

        assert!(first.status.is_solved());
        assert!(second.status.is_solved());
        assert_eq!(
            first.statistics.objective_value,
            second.statistics.objective_value
        );
    }

    #[test]
    fn test_infeasible_roster() {
        // One employee cannot cover two parallel shifts per day.
        let data = PlanningData {
            employees: vec![Employee::new("AM", "Dr. Anna Müller")],
            shifts: vec![
                Shift::new("Früh", "08:00-16:00").with_requirement("Min. 1 Person"),
                Shift::new("Spät", "14:00-22:00").with_requirement("Min. 1 Person"),
            ],
            days: vec!["1".to_string()],
            ..Default::default()
        };

        let solver = RosterSolver::new(data);
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.solution.is_none());
        assert!(result.analysis.is_none());
    }

    #[test]
    fn test_incremental_preserves_existing_schedule() {
        let data = PlanningData {
            employees: vec![
                Employee::new("AM", "Dr. Anna Müller"),
                Employee::new("PS", "Dr. Peter Schmidt"),
            ],
            shifts: vec![Shift::new("Früh", "08:00-16:00").with_requirement("Min. 1 Person")],
            days: vec!["1".to_string(), "2".to_string()],
            ..Default::default()
        };
        let existing: ExistingSchedule = HashMap::from([(
            "AM".to_string(),
            HashMap::from([(
                "1".to_string(),
                ExistingCell {
                    shift: Some("Früh".to_string()),
                    locked: false,
                },
            )]),
        )]);

        let solver = IncrementalRosterSolver::new(data, existing);
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();

        assert!(result.status.is_solved());
        let solution = result.solution.expect("roster expected");
        assert!(solution
            .assignments
            .iter()
            .any(|a| a.employee == "AM" && a.day == "1" && a.shift == "Früh"));
    }

    #[test]
    fn test_incremental_skips_locked_and_unknown_cells() {
        let data = PlanningData {
            employees: vec![Employee::new("AM", "Dr. Anna Müller")],
            shifts: vec![Shift::new("Früh", "08:00-16:00")],
            days: vec!["1".to_string()],
            ..Default::default()
        };
        // A locked cell and a cell for an unknown shift must both be ignored.
        let existing: ExistingSchedule = HashMap::from([(
            "AM".to_string(),
            HashMap::from([
                (
                    "1".to_string(),
                    ExistingCell {
                        shift: Some("Nacht".to_string()),
                        locked: false,
                    },
                ),
                (
                    "2".to_string(),
                    ExistingCell {
                        shift: Some("Früh".to_string()),
                        locked: true,
                    },
                ),
            ]),
        )]);

        let solver = IncrementalRosterSolver::new(data, existing);
        let result = solver.solve(TEST_TIME_LIMIT).unwrap();
        assert!(result.status.is_solved(), "pins on unknown cells must not leak");
    }

    #[test]
    fn test_status_display_matches_wire_names() {
        assert_eq!(SolveStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(SolveStatus::ModelInvalid.to_string(), "MODEL_INVALID");
        assert_eq!(
            serde_json::to_string(&SolveStatus::Infeasible).unwrap(),
            "\"INFEASIBLE\""
        );
    }
}
