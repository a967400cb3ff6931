//! Demo data generators for roster planning.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{Employee, PlanningData, Rule, Shift};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                days_in_schedule: 7,
                staff_count: 6,
                with_on_call: false,
                unavailability_count_distribution: vec![(0, 3.0), (1, 2.0), (2, 1.0)],
            },
            DemoData::Large => DemoDataParameters {
                days_in_schedule: 14,
                staff_count: 12,
                with_on_call: true,
                unavailability_count_distribution: vec![(0, 2.0), (1, 3.0), (2, 2.0), (3, 1.0)],
            },
        }
    }
}

struct DemoDataParameters {
    days_in_schedule: u32,
    staff_count: usize,
    with_on_call: bool,
    unavailability_count_distribution: Vec<(usize, f64)>,
}

/// Ward staff pool: initials, name, contract, qualifications.
const STAFF: &[(&str, &str, &str, &[&str])] = &[
    ("AM", "Dr. Anna Müller", "Oberarzt", &["Facharzt", "Notfallzertifizierung"]),
    ("PS", "Dr. Peter Schmidt", "Facharzt", &["Facharzt", "ABS-zertifiziert"]),
    ("LW", "Dr. Lisa Weber", "Assistenzarzt", &["Assistenzarzt"]),
    ("MB", "Dr. Max Bauer", "Facharzt", &["Facharzt", "Notfallzertifizierung"]),
    ("JK", "Dr. Julia Klein", "Facharzt", &["Facharzt", "Intensivmedizin"]),
    ("TH", "Dr. Thomas Hoffmann", "Oberarzt", &["Facharzt", "Oberarzt", "Endoskopie"]),
    ("SR", "Dr. Sabine Richter", "Assistenzarzt", &["Assistenzarzt", "Ultraschall-Zertifikat"]),
    ("FN", "Dr. Felix Neumann", "Facharzt", &["Facharzt", "Intensivmedizin"]),
    ("CV", "Dr. Clara Vogt", "Assistenzarzt", &["Assistenzarzt"]),
    ("DK", "Dr. David Krüger", "Facharzt", &["Facharzt", "ABS-zertifiziert"]),
    ("EB", "Dr. Eva Brandt", "Oberarzt", &["Facharzt", "Oberarzt", "Intensivmedizin"]),
    ("RW", "Dr. Robert Winkler", "Assistenzarzt", &["Assistenzarzt"]),
];

/// Unavailability codes sprinkled over the demo roster.
const DEMO_ABSENCE_CODES: &[&str] = &["U", "K", "uw"];

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Generates a deterministic demo roster for the given size.
pub fn generate(demo: DemoData) -> PlanningData {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let employees: Vec<Employee> = STAFF
        .iter()
        .take(params.staff_count)
        .map(|(initials, name, contract, quals)| {
            Employee::new(*initials, *name)
                .with_contract(*contract)
                .with_qualifications(quals.iter().copied())
        })
        .collect();

    let mut shifts = vec![
        Shift::new("Früh", "08:00-16:00")
            .with_station("Ambulanzen")
            .with_requirement("Min. 2 Personen"),
        Shift::new("Spät", "14:00-22:00")
            .with_station("Ambulanzen")
            .with_requirement("Min. 1 Person"),
        Shift::new("Nacht", "22:00-08:00")
            .with_station("Station 3")
            .with_requirement("Min. 1 Person")
            .with_requirement("Facharzt"),
    ];
    if params.with_on_call {
        shifts.push(
            Shift::new("Rufbereitschaft", "16:00-08:00")
                .with_category("Hintergrund")
                .with_requirement("Min. 1 Person")
                .with_requirement("Facharzt"),
        );
    }

    let days: Vec<String> = (1..=params.days_in_schedule).map(|d| d.to_string()).collect();

    let mut rules = vec![
        Rule::hard("Mindestens 11 Stunden Ruhezeit zwischen Schichten"),
        Rule::hard("Maximal 48 Stunden pro Woche"),
        Rule::soft("Wochenenden fair verteilen"),
    ];
    if params.with_on_call {
        rules.push(Rule::hard("Maximal 5 aufeinanderfolgende Arbeitstage"));
        rules.push(Rule::soft("Nachtdienste möglichst vermeiden").with_applies_to("Klein"));
    }

    // Sprinkle absences without starving coverage: a couple per day at most.
    let mut data = PlanningData {
        employees,
        shifts,
        days,
        rules,
        ..Default::default()
    };
    for day in data.days.clone() {
        let absent_count = pick_count(&mut rng, &params.unavailability_count_distribution);
        let absent: Vec<usize> = (0..params.staff_count)
            .collect::<Vec<_>>()
            .choose_multiple(&mut rng, absent_count.min(params.staff_count))
            .copied()
            .collect();
        for emp_idx in absent {
            let initials = data.employees[emp_idx].initials.clone();
            let code = DEMO_ABSENCE_CODES
                .choose(&mut rng)
                .copied()
                .unwrap_or("U")
                .to_string();
            data.availability
                .entry(initials)
                .or_default()
                .insert(day.clone(), code);
        }
    }

    data
}

/// Pick a count based on a weighted distribution.
fn pick_count(rng: &mut StdRng, distribution: &[(usize, f64)]) -> usize {
    let total_weight: f64 = distribution.iter().map(|(_, w)| w).sum();
    let mut choice = rng.gen::<f64>() * total_weight;

    for (count, weight) in distribution {
        if choice < *weight {
            return *count;
        }
        choice -= weight;
    }
    distribution.last().map(|(c, _)| *c).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::UNAVAILABLE_CODES;
    use crate::solver::validate_planning_data;

    #[test]
    fn test_generate_small() {
        let data = generate(DemoData::Small);

        assert_eq!(data.employees.len(), 6);
        assert_eq!(data.shifts.len(), 3);
        assert_eq!(data.days.len(), 7);
        assert!(validate_planning_data(&data).is_empty());
    }

    #[test]
    fn test_generate_large() {
        let data = generate(DemoData::Large);

        assert_eq!(data.employees.len(), 12);
        assert_eq!(data.days.len(), 14);
        assert!(data.shifts.iter().any(|s| s.name == "Rufbereitschaft"));
        assert!(data
            .rules
            .iter()
            .any(|r| r.is_hard() && r.text.contains("aufeinanderfolgende")));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(DemoData::Small);
        let b = generate(DemoData::Small);
        assert_eq!(a.availability, b.availability);
    }

    #[test]
    fn test_absence_codes_are_unavailability_codes() {
        let data = generate(DemoData::Large);
        for day_codes in data.availability.values() {
            for code in day_codes.values() {
                assert!(UNAVAILABLE_CODES.contains(&code.as_str()));
            }
        }
    }

    #[test]
    fn test_employees_have_qualifications() {
        let data = generate(DemoData::Small);
        for emp in &data.employees {
            assert!(
                !emp.qualifications.is_empty(),
                "{} has no qualifications",
                emp.name
            );
        }
    }

    #[test]
    fn test_demo_data_from_str() {
        assert_eq!("SMALL".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("small".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("invalid".parse::<DemoData>().is_err());
    }
}
