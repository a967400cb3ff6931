//! Roster solver console demo.
//!
//! Run with: cargo run --release

use tracing_subscriber::EnvFilter;

use roster_solver::demo_data::{self, DemoData};
use roster_solver::solver::RosterSolver;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data = demo_data::generate(DemoData::Small);
    println!(
        "Roster demo: {} employees, {} shift types, {} days",
        data.employees.len(),
        data.shifts.len(),
        data.days.len()
    );

    let solver = RosterSolver::new(data);
    match solver.solve(30) {
        Ok(result) => {
            println!("Status: {}", result.status);
            println!(
                "Search: {} propagations, {} nodes, {:.2}s, objective {}",
                result.statistics.num_conflicts,
                result.statistics.num_branches,
                result.statistics.wall_time,
                result.statistics.objective_value
            );

            if let Some(solution) = &result.solution {
                println!("Assignments: {}", solution.assignments.len());
                for a in solution.assignments.iter().take(10) {
                    println!("  {} - Tag {} - {} ({})", a.employee, a.day, a.shift, a.station);
                }
            }

            if let Some(analysis) = &result.analysis {
                let understaffed = analysis
                    .coverage_stats
                    .values()
                    .flat_map(|per_shift| per_shift.values())
                    .filter(|cell| cell.assigned < cell.required)
                    .count();
                println!("Coverage: {understaffed} understaffed cells");

                let fairness = &analysis.fairness_metrics;
                println!(
                    "Fairness variances: weekend {:.2}, night {:.2}, total {:.2}",
                    fairness.weekend_variance,
                    fairness.night_shift_variance,
                    fairness.total_shift_variance
                );
            }
        }
        Err(err) => eprintln!("Solve failed: {err}"),
    }
}
