//! Hard-constraint compilation for the roster model.
//!
//! Every feasible schedule must satisfy all constraints emitted here:
//! coverage, exclusivity, rest, weekly hours, qualification gating, fixed
//! assignments, availability, and the hard-typed custom rules.

use selen::prelude::*;
use tracing::debug;

use crate::domain::{
    first_integer, Employee, PlanningData, Rule, CONSECUTIVE_MARKER, NO_WORK_MARKER,
    SATURDAY_MARKER, SUNDAY_MARKER, WEEKEND_MARKER, WORKDAY_MARKER,
};
use crate::variables::ShiftVars;

/// Availability codes that take an employee out for the whole day.
pub const UNAVAILABLE_CODES: &[&str] = &["uw", "EZ", "BV", "krank", "U", "K", "SU", "MU"];

/// Weekly working-hour ceiling (German Arbeitszeitgesetz).
const MAX_WEEKLY_HOURS: i32 = 48;

/// Consecutive-day limit assumed when a rule names none.
const DEFAULT_MAX_CONSECUTIVE: usize = 5;

/// Emits all hard constraints into the shared model.
pub struct ConstraintBuilder<'a> {
    model: &'a mut Model,
    vars: &'a ShiftVars,
    data: &'a PlanningData,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(model: &'a mut Model, vars: &'a ShiftVars, data: &'a PlanningData) -> Self {
        Self { model, vars, data }
    }

    pub fn add_all(&mut self) {
        self.add_shift_coverage();
        self.add_one_shift_per_day();
        self.add_rest_time();
        self.add_max_weekly_hours();
        self.add_qualifications();
        self.add_fixed_assignments();
        self.add_availability();
        self.add_custom_hard_rules();
    }

    /// Every (day, shift) cell reaches its minimum staffing.
    fn add_shift_coverage(&mut self) {
        for d in 0..self.data.days.len() {
            for (s, shift) in self.data.shifts.iter().enumerate() {
                let min_staff = shift.min_required() as i32;
                if min_staff <= 0 {
                    continue;
                }
                let assigned: Vec<VarId> = (0..self.data.employees.len())
                    .map(|e| self.vars.at(e, d, s))
                    .collect();
                if assigned.is_empty() {
                    continue;
                }
                let total = self.model.sum(&assigned);
                self.model.new(total.ge(min_staff));
            }
        }
    }

    /// At most one shift per employee per day.
    fn add_one_shift_per_day(&mut self) {
        for e in 0..self.data.employees.len() {
            for d in 0..self.data.days.len() {
                let on_day: Vec<VarId> = (0..self.data.shifts.len())
                    .map(|s| self.vars.at(e, d, s))
                    .collect();
                if on_day.is_empty() {
                    continue;
                }
                let coeffs = vec![1; on_day.len()];
                self.model.int_lin_le(&coeffs, &on_day, 1);
            }
        }
    }

    /// 11 hours minimum rest: no late shift directly followed by an early
    /// shift on the next day in input order.
    fn add_rest_time(&mut self) {
        let late: Vec<usize> = self
            .data
            .shifts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_late())
            .map(|(i, _)| i)
            .collect();
        let early: Vec<usize> = self
            .data
            .shifts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_early())
            .map(|(i, _)| i)
            .collect();

        for e in 0..self.data.employees.len() {
            for d in 0..self.data.days.len().saturating_sub(1) {
                for &ls in &late {
                    for &es in &early {
                        let current = self.vars.at(e, d, ls);
                        let next = self.vars.at(e, d + 1, es);
                        self.model.int_lin_le(&[1, 1], &[current, next], 1);
                    }
                }
            }
        }
    }

    /// At most 48 working hours per fixed 7-day window.
    fn add_max_weekly_hours(&mut self) {
        let data = self.data;
        for e in 0..data.employees.len() {
            for (w, week) in data.weeks().enumerate() {
                let mut coeffs = Vec::new();
                let mut week_vars = Vec::new();
                for offset in 0..week.len() {
                    let d = w * 7 + offset;
                    for (s, shift) in data.shifts.iter().enumerate() {
                        coeffs.push(shift.duration_hours() as i32);
                        week_vars.push(self.vars.at(e, d, s));
                    }
                }
                if !week_vars.is_empty() {
                    self.model.int_lin_le(&coeffs, &week_vars, MAX_WEEKLY_HOURS);
                }
            }
        }
    }

    /// Shifts demanding qualifications the employee lacks are pinned to 0.
    fn add_qualifications(&mut self) {
        for (e, emp) in self.data.employees.iter().enumerate() {
            let held = emp.qualification_set();
            for (s, shift) in self.data.shifts.iter().enumerate() {
                let required = shift.required_qualifications();
                if required.is_empty() || required.iter().all(|q| held.contains(q)) {
                    continue;
                }
                for d in 0..self.data.days.len() {
                    let var = self.vars.at(e, d, s);
                    self.model.new(var.eq(0));
                }
            }
        }
    }

    /// Pre-decided assignments are pinned to 1. Entries referencing unknown
    /// employees, days, or shifts are dropped.
    fn add_fixed_assignments(&mut self) {
        for fa in &self.data.fixed_assignments {
            match self.vars.get(&fa.employee, &fa.day, &fa.shift) {
                Some(var) => {
                    self.model.new(var.eq(1));
                }
                None => debug!(
                    employee = %fa.employee,
                    day = %fa.day,
                    shift = %fa.shift,
                    "dropping fixed assignment with unknown reference"
                ),
            }
        }
    }

    /// Days marked with an unavailability code block every shift.
    fn add_availability(&mut self) {
        for (initials, day_codes) in &self.data.availability {
            if !self.vars.has_employee(initials) {
                debug!(employee = %initials, "dropping availability for unknown employee");
                continue;
            }
            for (day, code) in day_codes {
                if !UNAVAILABLE_CODES.contains(&code.as_str()) {
                    continue;
                }
                for shift in &self.data.shifts {
                    if let Some(var) = self.vars.get(initials, day, &shift.name) {
                        self.model.new(var.eq(0));
                    }
                }
            }
        }
    }

    fn add_custom_hard_rules(&mut self) {
        let data = self.data;
        for rule in &data.rules {
            if rule.is_hard() {
                self.apply_hard_rule(rule);
            }
        }
    }

    fn apply_hard_rule(&mut self, rule: &Rule) {
        let text = rule.text.to_lowercase();
        if text.contains(NO_WORK_MARKER) {
            self.add_no_work_rule(rule, &text);
        } else if text.contains(CONSECUTIVE_MARKER) && text.contains(WORKDAY_MARKER) {
            self.add_max_consecutive_rule(&text);
        }
        // Text outside the vocabulary is ignored.
    }

    /// "… arbeitet nicht …": the targeted employees get no shift on the named
    /// day class (Sundays, Saturdays, or whole weekends).
    fn add_no_work_rule(&mut self, rule: &Rule, text: &str) {
        let target_days: Vec<&str> = if text.contains(SUNDAY_MARKER) {
            self.data.sundays()
        } else if text.contains(SATURDAY_MARKER) {
            self.data.saturdays()
        } else if text.contains(WEEKEND_MARKER) {
            self.data.weekend_days()
        } else {
            return;
        };

        for emp in targeted_employees(&self.data.employees, &rule.applies_to) {
            for day in &target_days {
                for shift in &self.data.shifts {
                    if let Some(var) = self.vars.get(&emp.initials, day, &shift.name) {
                        self.model.new(var.eq(0));
                    }
                }
            }
        }
    }

    /// "Maximal N aufeinanderfolgende Arbeitstage": in every window of N+1
    /// days at most N may be worked.
    fn add_max_consecutive_rule(&mut self, text: &str) {
        let limit = first_integer(text)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_CONSECUTIVE);
        let num_days = self.data.days.len();
        if num_days <= limit {
            return;
        }

        for e in 0..self.data.employees.len() {
            for start in 0..(num_days - limit) {
                let mut window = Vec::new();
                for d in start..=start + limit {
                    for s in 0..self.data.shifts.len() {
                        window.push(self.vars.at(e, d, s));
                    }
                }
                if window.len() > limit {
                    let coeffs = vec![1; window.len()];
                    self.model.int_lin_le(&coeffs, &window, limit as i32);
                }
            }
        }
    }
}

/// Employees a rule applies to: all of them, or those whose name contains the
/// `appliesTo` fragment.
pub(crate) fn targeted_employees<'e>(
    employees: &'e [Employee],
    applies_to: &str,
) -> Vec<&'e Employee> {
    if applies_to == "all" {
        employees.iter().collect()
    } else {
        employees
            .iter()
            .filter(|e| e.name.contains(applies_to))
            .collect()
    }
}
