//! Decision-variable construction for the roster model.

use selen::prelude::*;
use std::collections::HashMap;

use crate::domain::PlanningData;

/// Boolean decision variables, one per (employee, day, shift) triple.
///
/// Storage is dense and employee-major; string-keyed lookups go through the
/// name indices built from the problem instance. A lookup with an unknown
/// name yields `None`, which dependent constraints treat as "no variable"
/// and skip silently.
pub struct ShiftVars {
    vars: Vec<VarId>,
    emp_index: HashMap<String, usize>,
    day_index: HashMap<String, usize>,
    shift_index: HashMap<String, usize>,
    num_days: usize,
    num_shifts: usize,
}

impl ShiftVars {
    /// Creates one Boolean per triple in the full Cartesian product of
    /// employees, days, and shifts.
    pub fn build(model: &mut Model, data: &PlanningData) -> Self {
        let num_days = data.days.len();
        let num_shifts = data.shifts.len();

        let mut vars = Vec::with_capacity(data.employees.len() * num_days * num_shifts);
        for _ in 0..data.employees.len() {
            for _ in 0..num_days {
                for _ in 0..num_shifts {
                    vars.push(model.bool());
                }
            }
        }

        let emp_index = data
            .employees
            .iter()
            .enumerate()
            .map(|(i, e)| (e.initials.clone(), i))
            .collect();
        let day_index = data
            .days
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), i))
            .collect();
        let shift_index = data
            .shifts
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        Self {
            vars,
            emp_index,
            day_index,
            shift_index,
            num_days,
            num_shifts,
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variable by position. Every position inside the problem bounds exists
    /// by construction.
    #[inline]
    pub fn at(&self, emp: usize, day: usize, shift: usize) -> VarId {
        self.vars[(emp * self.num_days + day) * self.num_shifts + shift]
    }

    /// Variable by name keys; `None` when any key is unknown.
    pub fn get(&self, initials: &str, day: &str, shift_name: &str) -> Option<VarId> {
        let e = *self.emp_index.get(initials)?;
        let d = *self.day_index.get(day)?;
        let s = *self.shift_index.get(shift_name)?;
        Some(self.at(e, d, s))
    }

    pub fn has_employee(&self, initials: &str) -> bool {
        self.emp_index.contains_key(initials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Employee, Shift};

    fn small_data() -> PlanningData {
        PlanningData {
            employees: vec![
                Employee::new("AM", "Dr. Anna Müller"),
                Employee::new("PS", "Dr. Peter Schmidt"),
            ],
            shifts: vec![
                Shift::new("Früh", "08:00-16:00"),
                Shift::new("Spät", "14:00-22:00"),
            ],
            days: vec!["1".into(), "2".into(), "3".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_cartesian_product() {
        let data = small_data();
        let mut model = Model::default();
        let vars = ShiftVars::build(&mut model, &data);
        assert_eq!(vars.len(), 2 * 3 * 2);
    }

    #[test]
    fn test_lookup_by_name() {
        let data = small_data();
        let mut model = Model::default();
        let vars = ShiftVars::build(&mut model, &data);

        assert!(vars.get("AM", "1", "Früh").is_some());
        assert!(vars.get("AM", "1", "Früh") == Some(vars.at(0, 0, 0)));
        assert!(vars.get("PS", "3", "Spät") == Some(vars.at(1, 2, 1)));
    }

    #[test]
    fn test_unknown_names_resolve_to_none() {
        let data = small_data();
        let mut model = Model::default();
        let vars = ShiftVars::build(&mut model, &data);

        assert!(vars.get("XX", "1", "Früh").is_none());
        assert!(vars.get("AM", "9", "Früh").is_none());
        assert!(vars.get("AM", "1", "Nacht").is_none());
        assert!(vars.has_employee("AM"));
        assert!(!vars.has_employee("XX"));
    }
}
