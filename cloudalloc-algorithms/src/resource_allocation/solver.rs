use super::{
    equilibrium::is_equilibrium, gelr::minimize_gelr, params::Params,
    refinement::randomized_refinement, splr::minimize_splr, state::State,
};
use anyhow::Result;
use cloudalloc_challenges::resource_allocation::{Challenge, Solution};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Report {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub total_utility: f64,
    pub is_equilibrium: bool,
    pub solution: Solution,
}

/// SPLR, then GELR, then randomized refinement, in place.
/// Returns the total number of moves applied.
pub fn refine(state: &mut State, params: &Params) -> usize {
    if !state.solution().is_complete() {
        warn!("refining an allocation with unassigned tasks, they are left untouched");
    }
    let mut rng = SmallRng::seed_from_u64(params.seed_for(state.ch));
    minimize_splr(state)
        + minimize_gelr(state)
        + randomized_refinement(state, params.refinement_iterations, &mut rng)
}

pub struct Solver;

impl Solver {
    pub fn solve(
        challenge: &Challenge,
        save_solution: Option<&dyn Fn(&Solution) -> Result<()>>,
        hyperparameters: &Option<Map<String, Value>>,
    ) -> Result<Report> {
        let params = Params::initialize(hyperparameters)?;
        let strategy = params.strategy_for(challenge);
        let mut state = State::new(challenge, strategy.solve(challenge)?)?;
        let initial_cost = state.total_cost();
        info!(
            strategy = strategy.name(),
            initial_cost, "initial allocation ready"
        );
        if let Some(save_solution) = save_solution {
            save_solution(state.solution())?;
        }

        let moves = refine(&mut state, &params);
        let is_equilibrium = is_equilibrium(&state);
        let final_cost = state.total_cost();
        let total_utility = state.total_utility();
        info!(
            moves,
            initial_cost, final_cost, is_equilibrium, "refinement finished"
        );

        Ok(Report {
            initial_cost,
            final_cost,
            total_utility,
            is_equilibrium,
            solution: state.into_solution(),
        })
    }
}
