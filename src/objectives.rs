//! Soft-constraint compilation: the weighted optimization objective.
//!
//! Two accumulators collect weighted penalty and reward terms; the final
//! objective minimizes `Σ penalties − Σ rewards`. Violating a soft constraint
//! never makes the roster infeasible, only more expensive.

use selen::prelude::*;
use tracing::debug;

use crate::domain::{
    is_weekend_day, PlanningData, Rule, AVOID_MARKER, DEFAULT_RULE_WEIGHT, PREFER_MARKER,
};
use crate::variables::ShiftVars;

/// Penalty weight per unit of weekend-count spread between two employees.
const WEEKEND_FAIRNESS_WEIGHT: i32 = 10;
/// Penalty weight per shift outside the fair workload band.
const WORKLOAD_BALANCE_WEIGHT: i32 = 5;
/// Penalty weight per unit of demanding-shift spread between two employees.
const SHIFT_DISTRIBUTION_WEIGHT: i32 = 3;
/// Penalty for six worked days in a row.
const CONSECUTIVE_DAYS_PENALTY: i32 = 80;

/// One weighted term of the objective.
struct Term {
    var: VarId,
    weight: i32,
}

/// Emits auxiliary variables and collects the weighted objective terms.
pub struct ObjectiveBuilder<'a> {
    model: &'a mut Model,
    vars: &'a ShiftVars,
    data: &'a PlanningData,
    penalties: Vec<Term>,
    rewards: Vec<Term>,
    // Running bounds of the accumulated terms, for the objective domain.
    penalty_bound: i64,
    reward_bound: i64,
}

impl<'a> ObjectiveBuilder<'a> {
    pub fn new(model: &'a mut Model, vars: &'a ShiftVars, data: &'a PlanningData) -> Self {
        Self {
            model,
            vars,
            data,
            penalties: Vec::new(),
            rewards: Vec::new(),
            penalty_bound: 0,
            reward_bound: 0,
        }
    }

    /// Builds every objective family and assembles the single variable to
    /// minimize. `None` when no term was produced (nothing to optimize).
    pub fn build_all(mut self) -> Option<VarId> {
        self.add_weekend_fairness();
        self.add_workload_balance();
        self.add_shift_distribution();
        self.add_consecutive_days_penalty();
        self.add_soft_rules();
        self.assemble()
    }

    /// Spreads weekend shifts evenly across the staff.
    fn add_weekend_fairness(&mut self) {
        let data = self.data;
        if data.employees.len() < 2 {
            return;
        }
        let weekend_days: Vec<usize> = data
            .days
            .iter()
            .enumerate()
            .filter(|(_, d)| is_weekend_day(d))
            .map(|(i, _)| i)
            .collect();
        if weekend_days.is_empty() {
            return;
        }

        let mut counts = Vec::new();
        for e in 0..data.employees.len() {
            let mut emp_vars = Vec::new();
            for &d in &weekend_days {
                for s in 0..data.shifts.len() {
                    emp_vars.push(self.vars.at(e, d, s));
                }
            }
            if emp_vars.is_empty() {
                continue;
            }
            let bound = emp_vars.len() as i64;
            let count = self.model.sum(&emp_vars);
            counts.push((count, bound));
        }
        self.add_pairwise_spread_penalties(&counts, WEEKEND_FAIRNESS_WEIGHT);
    }

    /// Keeps every employee's total inside the fair band
    /// `[total/employees, total/employees + 1]`; deviation in either
    /// direction is penalized linearly.
    fn add_workload_balance(&mut self) {
        let data = self.data;
        if data.employees.len() < 2 {
            return;
        }

        let mut counts = Vec::new();
        for e in 0..data.employees.len() {
            let mut emp_vars = Vec::new();
            for d in 0..data.days.len() {
                for s in 0..data.shifts.len() {
                    emp_vars.push(self.vars.at(e, d, s));
                }
            }
            if emp_vars.is_empty() {
                continue;
            }
            counts.push(self.model.sum(&emp_vars));
        }
        if counts.len() < 2 {
            return;
        }

        let total_slots = (data.days.len() * data.shifts.len()) as i32;
        let (min_target, max_target) = workload_targets(total_slots, data.employees.len() as i32);

        for &count in &counts {
            let below = self.model.int(0, total_slots);
            let above = self.model.int(0, total_slots);
            // below ≥ min_target − count, above ≥ count − max_target.
            self.model.new(count.add(below).ge(min_target));
            self.model.new(count.sub(above).le(max_target));
            self.penalize(below, WORKLOAD_BALANCE_WEIGHT, total_slots as i64);
            self.penalize(above, WORKLOAD_BALANCE_WEIGHT, total_slots as i64);
        }
    }

    /// Spreads each demanding shift (nights, on-call) evenly across the staff.
    fn add_shift_distribution(&mut self) {
        let data = self.data;
        if data.employees.len() < 2 {
            return;
        }
        let demanding: Vec<usize> = data
            .shifts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_demanding())
            .map(|(i, _)| i)
            .collect();

        for &s in &demanding {
            let mut counts = Vec::new();
            for e in 0..data.employees.len() {
                let emp_vars: Vec<VarId> =
                    (0..data.days.len()).map(|d| self.vars.at(e, d, s)).collect();
                if emp_vars.is_empty() {
                    continue;
                }
                let bound = emp_vars.len() as i64;
                counts.push((self.model.sum(&emp_vars), bound));
            }
            self.add_pairwise_spread_penalties(&counts, SHIFT_DISTRIBUTION_WEIGHT);
        }
    }

    /// Discourages six worked days in a row: a reified `all6` Boolean per
    /// employee and 6-day window.
    fn add_consecutive_days_penalty(&mut self) {
        let data = self.data;
        let num_days = data.days.len();
        if num_days < 6 {
            return;
        }

        for e in 0..data.employees.len() {
            for start in 0..=(num_days - 6) {
                let mut working = Vec::new();
                for d in start..start + 6 {
                    let day_vars: Vec<VarId> =
                        (0..data.shifts.len()).map(|s| self.vars.at(e, d, s)).collect();
                    if day_vars.is_empty() {
                        continue;
                    }
                    // One shift per day keeps the total binary, so equality
                    // against 1 reifies "works this day".
                    let day_total = self.model.sum(&day_vars);
                    let one = self.model.int(1, 1);
                    let is_working = self.model.bool();
                    self.model.int_eq_reif(day_total, one, is_working);
                    working.push(is_working);
                }
                if working.len() == 6 {
                    let worked = self.model.sum(&working);
                    let six = self.model.int(6, 6);
                    let all6 = self.model.bool();
                    self.model.int_eq_reif(worked, six, all6);
                    self.penalize(all6, CONSECUTIVE_DAYS_PENALTY, 1);
                }
            }
        }
    }

    /// Soft custom rules: preference rewards and avoidance penalties.
    /// Fairness wishes are covered by the built-in objectives.
    fn add_soft_rules(&mut self) {
        let data = self.data;
        for rule in &data.rules {
            if !rule.is_soft() {
                continue;
            }
            let text = rule.text.to_lowercase();
            if text.contains(PREFER_MARKER) {
                self.add_preference_reward(rule);
            } else if text.contains(AVOID_MARKER) {
                self.add_avoidance_penalty(rule, &text);
            }
        }
    }

    /// Coarse preference reward: every shift of the targeted employee earns
    /// the fixed rule weight. The rule text does not select specific shifts.
    fn add_preference_reward(&mut self, rule: &Rule) {
        let data = self.data;
        if rule.applies_to == "all" {
            return;
        }
        let Some(emp) = data
            .employees
            .iter()
            .position(|e| e.name.contains(&rule.applies_to))
        else {
            debug!(applies_to = %rule.applies_to, "preference rule targets no employee");
            return;
        };

        let weight = DEFAULT_RULE_WEIGHT;
        for d in 0..data.days.len() {
            for s in 0..data.shifts.len() {
                let var = self.vars.at(emp, d, s);
                self.reward(var, weight, 1);
            }
        }
    }

    /// Penalizes shifts whose name occurs in the rule text for the targeted
    /// employee, at the fixed rule weight.
    fn add_avoidance_penalty(&mut self, rule: &Rule, text: &str) {
        let data = self.data;
        if rule.applies_to == "all" {
            return;
        }
        let Some(emp) = data
            .employees
            .iter()
            .position(|e| e.name.contains(&rule.applies_to))
        else {
            debug!(applies_to = %rule.applies_to, "avoidance rule targets no employee");
            return;
        };

        let weight = DEFAULT_RULE_WEIGHT;
        for (s, shift) in data.shifts.iter().enumerate() {
            if !text.contains(&shift.name.to_lowercase()) {
                continue;
            }
            for d in 0..data.days.len() {
                let var = self.vars.at(emp, d, s);
                self.penalize(var, weight, 1);
            }
        }
    }

    /// Pairwise `|count_i − count_j|` penalties, the shared encoding behind
    /// the fairness objectives.
    fn add_pairwise_spread_penalties(&mut self, counts: &[(VarId, i64)], weight: i32) {
        if counts.len() < 2 {
            return;
        }
        for i in 0..counts.len() {
            for j in (i + 1)..counts.len() {
                let (ci, bi) = counts[i];
                let (cj, bj) = counts[j];
                let diff = self.model.sub(ci, cj);
                let abs_diff = self.model.abs(diff);
                self.penalize(abs_diff, weight, bi.max(bj));
            }
        }
    }

    fn penalize(&mut self, var: VarId, weight: i32, bound: i64) {
        self.penalty_bound += weight as i64 * bound;
        self.penalties.push(Term { var, weight });
    }

    fn reward(&mut self, var: VarId, weight: i32, bound: i64) {
        self.reward_bound += weight as i64 * bound;
        self.rewards.push(Term { var, weight });
    }

    /// Ties the accumulated terms to a single objective variable:
    /// `objective = Σ weight·penalty − Σ weight·reward`.
    fn assemble(self) -> Option<VarId> {
        if self.penalties.is_empty() && self.rewards.is_empty() {
            return None;
        }

        let mut coeffs = Vec::with_capacity(self.penalties.len() + self.rewards.len() + 1);
        let mut term_vars = Vec::with_capacity(self.penalties.len() + self.rewards.len() + 1);
        for term in &self.penalties {
            coeffs.push(term.weight);
            term_vars.push(term.var);
        }
        for term in &self.rewards {
            coeffs.push(-term.weight);
            term_vars.push(term.var);
        }

        let lo = (-self.reward_bound).max(i32::MIN as i64) as i32;
        let hi = self.penalty_bound.min(i32::MAX as i64) as i32;
        let objective = self.model.int(lo, hi);
        coeffs.push(-1);
        term_vars.push(objective);
        self.model.int_lin_eq(&coeffs, &term_vars, 0);

        debug!(
            penalties = self.penalties.len(),
            rewards = self.rewards.len(),
            "objective assembled"
        );
        Some(objective)
    }
}

/// Fair workload band for `total_slots` spread over `employees`.
pub(crate) fn workload_targets(total_slots: i32, employees: i32) -> (i32, i32) {
    let min_target = total_slots / employees;
    let max_target = min_target + i32::from(total_slots % employees != 0);
    (min_target, max_target)
}
