use crate::resource_allocation::{Challenge, Solution};
use anyhow::Result;
use serde_json::{Map, Value};
use tracing::debug;

/// Enumerates every assignment (tasks may share resources) and saves the
/// cheapest one. The first minimum in lexicographic order wins.
pub fn solve_challenge(
    challenge: &Challenge,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    _hyperparameters: &Option<Map<String, Value>>,
) -> Result<()> {
    challenge.check_feasible()?;
    let num_tasks = challenge.num_tasks;
    let num_resources = challenge.num_resources;

    let mut current = vec![0usize; num_tasks];
    let mut best = current.clone();
    let mut best_cost = f64::INFINITY;
    let mut enumerated = 0u64;

    'enumerate: loop {
        enumerated += 1;
        let total_cost: f64 = current
            .iter()
            .enumerate()
            .map(|(t, &r)| challenge.cost_of(t, r))
            .sum();
        if total_cost < best_cost {
            best_cost = total_cost;
            best.copy_from_slice(&current);
        }

        // Odometer step, last task varies fastest
        let mut pos = num_tasks;
        loop {
            if pos == 0 {
                break 'enumerate;
            }
            pos -= 1;
            current[pos] += 1;
            if current[pos] < num_resources {
                break;
            }
            current[pos] = 0;
        }
    }

    debug!(enumerated, best_cost, "exhaustive search finished");
    save_solution(&Solution::from_resources(&best))
}
