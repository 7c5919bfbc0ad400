use anyhow::Result;
use serde_json::{Map, Value};
mod equilibrium;
mod gelr;
mod initial;
mod params;
mod refinement;
mod solver;
mod splr;
mod state;
pub use cloudalloc_challenges::resource_allocation::{Challenge, Solution, Track};
pub use equilibrium::{can_improve_nash, find_improving_move, is_equilibrium};
pub use gelr::{compute_gelr, min_single, minimize_gelr};
pub use initial::{solve_initial, HungarianSolver, InitialStrategy, Objective, RandomInitializer};
pub use params::{Params, StrategyKind};
pub use refinement::randomized_refinement;
pub use solver::{refine, Report, Solver};
pub use splr::{best_improving_resource, compute_splr, minimize_splr};
pub use state::{State, TrialMove};

pub fn solve_challenge(
    challenge: &Challenge,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    hyperparameters: &Option<Map<String, Value>>,
) -> Result<()> {
    let report = Solver::solve(challenge, Some(save_solution), hyperparameters)?;
    save_solution(&report.solution)
}

pub fn help() {
    println!("Hyperparameters (all optional):");
    println!("  refinement_iterations  random reallocation trials after SPLR/GELR (default 100)");
    println!("  seed                   u64 seed for the random passes (default: from challenge seed)");
    println!("  initial_strategy       \"hungarian\" (default) or \"random\"");
    println!("  objective              \"weighted\" (default) or \"cost_only\"");
}
