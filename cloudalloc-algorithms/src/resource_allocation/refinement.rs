use super::state::State;
use rand::{rngs::SmallRng, Rng};
use tracing::{debug, info};

/// `iterations` random (task, resource) trials; a trial moves the task
/// when its utility on the sampled resource beats its current one.
/// Unassigned tasks are skipped. Returns the number of moves applied.
pub fn randomized_refinement(state: &mut State, iterations: usize, rng: &mut SmallRng) -> usize {
    let num_tasks = state.ch.num_tasks;
    let num_resources = state.ch.num_resources;
    if num_tasks == 0 || num_resources == 0 {
        return 0;
    }

    let mut moves = 0;
    for _ in 0..iterations {
        let task = rng.gen_range(0..num_tasks);
        let candidate = rng.gen_range(0..num_resources);
        let Some(current) = state.current(task) else {
            continue;
        };
        if state.own_utility(task) < state.projected_utility(task, candidate) {
            state.move_task(task, candidate);
            moves += 1;
            debug!(task, from = current, to = candidate, "random reallocation");
        }
    }
    info!(
        iterations,
        moves,
        total_cost = state.total_cost(),
        "randomized refinement finished"
    );
    moves
}
