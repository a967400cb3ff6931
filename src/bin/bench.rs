//! Benchmark for end-to-end solve throughput.
//!
//! Run with: cargo run --release --bin bench

use std::time::Instant;

use roster_solver::demo_data::{self, DemoData};
use roster_solver::solver::RosterSolver;

fn main() {
    for demo in [DemoData::Small, DemoData::Large] {
        let data = demo_data::generate(demo);
        println!(
            "Benchmark: {} ({} employees, {} shift types, {} days)",
            demo.as_str(),
            data.employees.len(),
            data.shifts.len(),
            data.days.len()
        );

        let solver = RosterSolver::new(data);
        let start = Instant::now();
        match solver.solve(60) {
            Ok(result) => {
                println!("  Status: {} in {:.2?}", result.status, start.elapsed());
                println!(
                    "  Search: {} propagations, {} nodes",
                    result.statistics.num_conflicts, result.statistics.num_branches
                );
                println!("  Objective: {}", result.statistics.objective_value);
                if let Some(solution) = &result.solution {
                    println!("  Assignments: {}", solution.assignments.len());
                }
            }
            Err(err) => println!("  Failed: {err}"),
        }
        println!();
    }
}
