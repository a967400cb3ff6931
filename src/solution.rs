//! Solution extraction and quality analysis.

use selen::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{is_night_shift_name, is_weekend_day, PlanningData, Shift};
use crate::solver::SolveStatistics;
use crate::variables::ShiftVars;

/// One (employee, day, shift) cell of the produced roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Employee initials.
    pub employee: String,
    pub day: String,
    pub shift: String,
    pub station: String,
}

/// One cell of the dense schedule pivot. `shift` is `None` when the employee
/// is off that day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleCell {
    pub shift: Option<String>,
    pub station: Option<String>,
    pub locked: bool,
    pub violation: bool,
}

/// `initials → day → cell`, with an entry for every pair in the problem.
pub type SchedulePivot = HashMap<String, HashMap<String, ScheduleCell>>;

/// The produced roster: flat assignment list plus the dense pivot.
#[derive(Debug, Clone, Serialize)]
pub struct RosterSolution {
    pub assignments: Vec<Assignment>,
    pub schedule: SchedulePivot,
}

/// Quality report computed from a solved roster.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionAnalysis {
    pub coverage_stats: HashMap<String, HashMap<String, CoverageCell>>,
    pub fairness_metrics: FairnessMetrics,
    pub employee_workload: HashMap<String, EmployeeWorkload>,
    pub constraint_summary: ConstraintSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Ok,
    Understaffed,
}

/// Staffing level of one (day, shift) cell.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageCell {
    pub assigned: u32,
    pub required: u32,
    pub status: CoverageStatus,
}

/// Per-employee distribution counts and their population variances.
#[derive(Debug, Clone, Serialize)]
pub struct FairnessMetrics {
    pub weekend_distribution: HashMap<String, u32>,
    pub weekend_variance: f64,
    pub night_shift_distribution: HashMap<String, u32>,
    pub night_shift_variance: f64,
    pub total_shift_distribution: HashMap<String, u32>,
    pub total_shift_variance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeWorkload {
    pub total_shifts: u32,
    pub total_hours: u32,
    /// Shift counts keyed by shift name.
    pub shift_types: HashMap<String, u32>,
    pub average_hours_per_week: f64,
}

/// Hard constraints hold in every extracted solution; the summary restates
/// the solver statistics alongside that fact.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintSummary {
    pub hard_constraints_satisfied: bool,
    pub objective_value: i64,
    pub num_conflicts: usize,
    pub num_branches: usize,
    pub wall_time: f64,
}

/// Projects the engine assignment into roster structures and quality reports.
pub struct SolutionAnalyzer<'a> {
    solution: &'a Solution,
    vars: &'a ShiftVars,
    data: &'a PlanningData,
}

impl<'a> SolutionAnalyzer<'a> {
    pub fn new(solution: &'a Solution, vars: &'a ShiftVars, data: &'a PlanningData) -> Self {
        Self {
            solution,
            vars,
            data,
        }
    }

    /// Emits an assignment for every decision variable valued 1, in
    /// employee/day/shift input order, plus the dense schedule pivot.
    pub fn extract(&self) -> RosterSolution {
        let mut assignments = Vec::new();
        for (e, emp) in self.data.employees.iter().enumerate() {
            for (d, day) in self.data.days.iter().enumerate() {
                for (s, shift) in self.data.shifts.iter().enumerate() {
                    let var = self.vars.at(e, d, s);
                    if self.solution[var] == Val::ValI(1) {
                        assignments.push(Assignment {
                            employee: emp.initials.clone(),
                            day: day.clone(),
                            shift: shift.name.clone(),
                            station: station_of(shift),
                        });
                    }
                }
            }
        }

        let schedule = build_schedule_pivot(self.data, &assignments);
        RosterSolution {
            assignments,
            schedule,
        }
    }

    /// Full quality report for an extracted roster.
    pub fn analyze(&self, roster: &RosterSolution, stats: &SolveStatistics) -> SolutionAnalysis {
        SolutionAnalysis {
            coverage_stats: analyze_coverage(self.data, &roster.assignments),
            fairness_metrics: analyze_fairness(self.data, &roster.assignments),
            employee_workload: analyze_workload(self.data, &roster.assignments),
            constraint_summary: ConstraintSummary {
                hard_constraints_satisfied: true,
                objective_value: stats.objective_value,
                num_conflicts: stats.num_conflicts,
                num_branches: stats.num_branches,
                wall_time: stats.wall_time,
            },
        }
    }
}

/// Station shown for an assignment: the shift's station, its category, or
/// `"Unknown"`.
fn station_of(shift: &Shift) -> String {
    shift
        .station
        .clone()
        .or_else(|| shift.category.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Dense `initials → day → cell` table, initialized to empty cells and
/// overlaid with the assignments.
fn build_schedule_pivot(data: &PlanningData, assignments: &[Assignment]) -> SchedulePivot {
    let mut schedule: SchedulePivot = HashMap::new();
    for emp in &data.employees {
        let days = schedule.entry(emp.initials.clone()).or_default();
        for day in &data.days {
            days.insert(day.clone(), ScheduleCell::default());
        }
    }

    for assignment in assignments {
        if let Some(cell) = schedule
            .get_mut(&assignment.employee)
            .and_then(|days| days.get_mut(&assignment.day))
        {
            cell.shift = Some(assignment.shift.clone());
            cell.station = Some(assignment.station.clone());
        }
    }

    schedule
}

fn analyze_coverage(
    data: &PlanningData,
    assignments: &[Assignment],
) -> HashMap<String, HashMap<String, CoverageCell>> {
    let mut coverage = HashMap::new();
    for day in &data.days {
        let mut per_shift = HashMap::new();
        for shift in &data.shifts {
            let assigned = assignments
                .iter()
                .filter(|a| &a.day == day && a.shift == shift.name)
                .count() as u32;
            let required = shift.min_required();
            per_shift.insert(
                shift.name.clone(),
                CoverageCell {
                    assigned,
                    required,
                    status: if assigned >= required {
                        CoverageStatus::Ok
                    } else {
                        CoverageStatus::Understaffed
                    },
                },
            );
        }
        coverage.insert(day.clone(), per_shift);
    }
    coverage
}

fn analyze_fairness(data: &PlanningData, assignments: &[Assignment]) -> FairnessMetrics {
    let mut weekend = HashMap::new();
    let mut night = HashMap::new();
    let mut total = HashMap::new();

    for emp in &data.employees {
        let emp_assignments: Vec<&Assignment> = assignments
            .iter()
            .filter(|a| a.employee == emp.initials)
            .collect();

        weekend.insert(
            emp.initials.clone(),
            emp_assignments
                .iter()
                .filter(|a| is_weekend_day(&a.day))
                .count() as u32,
        );
        night.insert(
            emp.initials.clone(),
            emp_assignments
                .iter()
                .filter(|a| is_night_shift_name(&a.shift))
                .count() as u32,
        );
        total.insert(emp.initials.clone(), emp_assignments.len() as u32);
    }

    let weekend_variance = population_variance(&values_of(&weekend));
    let night_shift_variance = population_variance(&values_of(&night));
    let total_shift_variance = population_variance(&values_of(&total));

    FairnessMetrics {
        weekend_distribution: weekend,
        weekend_variance,
        night_shift_distribution: night,
        night_shift_variance,
        total_shift_distribution: total,
        total_shift_variance,
    }
}

fn analyze_workload(
    data: &PlanningData,
    assignments: &[Assignment],
) -> HashMap<String, EmployeeWorkload> {
    let mut workload = HashMap::new();

    for emp in &data.employees {
        let emp_assignments: Vec<&Assignment> = assignments
            .iter()
            .filter(|a| a.employee == emp.initials)
            .collect();

        let mut total_hours = 0;
        let mut shift_types: HashMap<String, u32> = HashMap::new();
        for assignment in &emp_assignments {
            if let Some(shift) = data.shifts.iter().find(|s| s.name == assignment.shift) {
                total_hours += shift.duration_hours();
            }
            *shift_types.entry(assignment.shift.clone()).or_insert(0) += 1;
        }

        let weeks = (data.days.len() as f64 / 7.0).max(1.0);
        workload.insert(
            emp.initials.clone(),
            EmployeeWorkload {
                total_shifts: emp_assignments.len() as u32,
                total_hours,
                shift_types,
                average_hours_per_week: f64::from(total_hours) / weeks,
            },
        );
    }

    workload
}

fn values_of(counts: &HashMap<String, u32>) -> Vec<u32> {
    counts.values().copied().collect()
}

/// Population variance rounded to two decimals; 0.0 below two samples.
fn population_variance(values: &[u32]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    (variance * 100.0).round() / 100.0
}
