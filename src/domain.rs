//! Domain model for hospital roster planning.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Qualification keywords recognized inside shift requirement entries.
///
/// Requirement strings are free-form; a shift demands a qualification when
/// one of these keywords occurs in any entry (case-insensitive).
pub const QUALIFICATION_KEYWORDS: &[&str] = &[
    "Facharzt",
    "Oberarzt",
    "Chefarzt",
    "Assistenzarzt",
    "ABS-zertifiziert",
    "Notfallzertifizierung",
    "Intensivmedizin",
    "Ultraschall-Zertifikat",
    "Endoskopie",
];

/// Weight applied to preference and avoidance rules. The `weight` carried on
/// a rule payload is accepted but not consumed by the objective compiler.
pub const DEFAULT_RULE_WEIGHT: i32 = 5;

// ============================================================================
// Rule-text vocabulary
// ============================================================================
//
// Free-form rule text is matched by lowercase substring search against this
// table; text that matches nothing is ignored by the compilers.

/// Hard rule: the targeted employees do not work on certain days.
pub const NO_WORK_MARKER: &str = "arbeitet nicht";
/// Hard rule: limits consecutive working days (together with
/// [`WORKDAY_MARKER`]).
pub const CONSECUTIVE_MARKER: &str = "aufeinanderfolgende";
pub const WORKDAY_MARKER: &str = "arbeitstage";
/// Day-class selectors inside a no-work rule.
pub const SUNDAY_MARKER: &str = "sonntag";
pub const SATURDAY_MARKER: &str = "samstag";
pub const WEEKEND_MARKER: &str = "wochenende";
/// Soft rule: shift preference of a single employee.
pub const PREFER_MARKER: &str = "bevorzugt";
/// Soft rule: shifts a single employee wants to avoid.
pub const AVOID_MARKER: &str = "vermeiden";

/// A staff member who can be rostered onto shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    /// Unique key used throughout the plan (availability, assignments, pivot).
    pub initials: String,
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default = "default_weekly_hours")]
    pub hours: u32,
    #[serde(default)]
    pub qualifications: Vec<String>,
}

fn default_weekly_hours() -> u32 {
    40
}

impl Employee {
    pub fn new(initials: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initials: initials.into(),
            contract: None,
            hours: default_weekly_hours(),
            qualifications: Vec::new(),
        }
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_qualifications(
        mut self,
        qualifications: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        for qual in qualifications {
            self.qualifications.push(qual.into());
        }
        self
    }

    /// The employee's qualifications as a set for subset checks.
    pub fn qualification_set(&self) -> HashSet<&str> {
        self.qualifications.iter().map(String::as_str).collect()
    }
}

/// A shift type that recurs on every planned day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    /// Unique key used throughout the plan.
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form requirement entries, parsed heuristically (minimum staffing,
    /// qualification keywords).
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub station: Option<String>,
    /// `"HH:MM-HH:MM"` window; may wrap midnight.
    #[serde(default = "default_shift_time")]
    pub time: String,
}

fn default_shift_time() -> String {
    "08:00-16:00".to_string()
}

impl Shift {
    pub fn new(name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            description: None,
            requirements: Vec::new(),
            rules: Vec::new(),
            station: None,
            time: time.into(),
        }
    }

    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Parses the `"HH:MM-HH:MM"` window. `None` when the string is malformed;
    /// callers degrade to their documented defaults in that case.
    pub fn time_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        let (start, end) = self.time.split_once('-')?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
        Some((start, end))
    }

    /// Shift length in whole hours; overnight windows wrap past midnight.
    /// Defaults to 8 when the window cannot be parsed.
    pub fn duration_hours(&self) -> u32 {
        match self.time_window() {
            Some((start, end)) => {
                let (s, e) = (start.hour(), end.hour());
                if e <= s {
                    (24 - s) + e
                } else {
                    e - s
                }
            }
            None => 8,
        }
    }

    /// Ends late in the evening or runs into the next morning.
    pub fn is_late(&self) -> bool {
        self.time_window()
            .map(|(_, end)| end.hour() >= 21 || end.hour() <= 8)
            .unwrap_or(false)
    }

    /// Starts before 09:00.
    pub fn is_early(&self) -> bool {
        self.time_window()
            .map(|(start, _)| start.hour() < 9)
            .unwrap_or(false)
    }

    /// Night work or on-call duty, by name or by an end before 08:00.
    pub fn is_demanding(&self) -> bool {
        if is_night_shift_name(&self.name) {
            return true;
        }
        self.time_window()
            .map(|(_, end)| end.hour() <= 8)
            .unwrap_or(false)
    }

    /// Minimum staffing parsed from the first `"Min."`/`"Mindestens"`
    /// requirement entry; one person when nothing matches.
    pub fn min_required(&self) -> u32 {
        for req in &self.requirements {
            if req.contains("Min.") || req.contains("Mindestens") {
                if let Some(n) = first_integer(req) {
                    return n;
                }
            }
        }
        1
    }

    /// Qualification keywords demanded by the requirement entries.
    pub fn required_qualifications(&self) -> HashSet<&'static str> {
        let mut quals = HashSet::new();
        for req in &self.requirements {
            let req = req.to_lowercase();
            for qual in QUALIFICATION_KEYWORDS {
                if req.contains(&qual.to_lowercase()) {
                    quals.insert(*qual);
                }
            }
        }
        quals
    }
}

/// A planning rule, either mandatory (`hard`) or an optimization wish (`soft`).
///
/// `text` is free-form German and matched by substring heuristics; `applies_to`
/// is `"all"` or a substring of the targeted employee names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: String,
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "appliesTo", default = "default_applies_to")]
    pub applies_to: String,
    #[serde(default)]
    pub weight: Option<i32>,
}

fn default_rule_type() -> String {
    "hard".to_string()
}

fn default_applies_to() -> String {
    "all".to_string()
}

impl Rule {
    pub fn hard(text: impl Into<String>) -> Self {
        Self::with_type("hard", text)
    }

    pub fn soft(text: impl Into<String>) -> Self {
        Self::with_type("soft", text)
    }

    fn with_type(rule_type: &str, text: impl Into<String>) -> Self {
        Self {
            id: None,
            rule_type: rule_type.to_string(),
            text: text.into(),
            source: None,
            category: None,
            applies_to: default_applies_to(),
            weight: None,
        }
    }

    pub fn with_applies_to(mut self, target: impl Into<String>) -> Self {
        self.applies_to = target.into();
        self
    }

    pub fn is_hard(&self) -> bool {
        self.rule_type == "hard"
    }

    pub fn is_soft(&self) -> bool {
        self.rule_type == "soft"
    }
}

/// A pre-decided assignment the solver must honor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedAssignment {
    /// Employee initials.
    pub employee: String,
    pub day: String,
    pub shift: String,
}

impl FixedAssignment {
    pub fn new(
        employee: impl Into<String>,
        day: impl Into<String>,
        shift: impl Into<String>,
    ) -> Self {
        Self {
            employee: employee.into(),
            day: day.into(),
            shift: shift.into(),
        }
    }

    /// All three keys present; incomplete entries fail validation.
    pub fn is_complete(&self) -> bool {
        !self.employee.is_empty() && !self.day.is_empty() && !self.shift.is_empty()
    }
}

/// Per-employee, per-day availability codes (`initials → day → code`).
pub type AvailabilityMap = HashMap<String, HashMap<String, String>>;

/// Everything a single solve call operates on.
///
/// Built once per solve, never mutated after compilation. The order of `days`
/// defines adjacency for rest and consecutive-day constraints; calendar weeks
/// are fixed 7-day chunks from the first day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningData {
    pub employees: Vec<Employee>,
    pub shifts: Vec<Shift>,
    pub days: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub availability: AvailabilityMap,
    #[serde(default)]
    pub fixed_assignments: Vec<FixedAssignment>,
}

impl PlanningData {
    /// Fixed 7-day chunks from the first day.
    pub fn weeks(&self) -> impl Iterator<Item = &[String]> {
        self.days.chunks(7)
    }

    pub fn sundays(&self) -> Vec<&str> {
        self.days
            .iter()
            .map(String::as_str)
            .filter(|d| is_sunday(d))
            .collect()
    }

    pub fn saturdays(&self) -> Vec<&str> {
        self.days
            .iter()
            .map(String::as_str)
            .filter(|d| is_saturday(d))
            .collect()
    }

    pub fn weekend_days(&self) -> Vec<&str> {
        self.days
            .iter()
            .map(String::as_str)
            .filter(|d| is_weekend_day(d))
            .collect()
    }
}

// ============================================================================
// Day-token arithmetic
// ============================================================================
//
// Day tokens are opaque strings, usually day-of-month numbers. Weekday
// classification is arithmetic mod 7 rather than real calendar lookup, which
// keeps solves deterministic for the same token sequence.

pub fn day_number(day: &str) -> Option<i64> {
    day.trim().parse().ok()
}

pub fn is_sunday(day: &str) -> bool {
    day_number(day).map(|n| n % 7 == 0).unwrap_or(false)
}

pub fn is_saturday(day: &str) -> bool {
    day_number(day).map(|n| (n - 1) % 7 == 5).unwrap_or(false)
}

pub fn is_weekend_day(day: &str) -> bool {
    day_number(day)
        .map(|n| n % 7 == 0 || n % 7 == 6)
        .unwrap_or(false)
}

/// Night work by shift name.
pub fn is_night_shift_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("nacht") || name.contains("rufbereitschaft")
}

/// First run of ASCII digits in `text`, if any.
pub(crate) fn first_integer(text: &str) -> Option<u32> {
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse().ok()
}
