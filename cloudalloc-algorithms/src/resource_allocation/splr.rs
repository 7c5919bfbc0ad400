use super::state::State;
use cloudalloc_challenges::AllocationError;
use tracing::{debug, info};

/// Current utility of `task` minus the utility it would have on `resource`.
/// Negative means moving is a gain; `+inf` for an unassigned task.
pub fn compute_splr(
    state: &State,
    task: usize,
    resource: usize,
) -> Result<f64, AllocationError> {
    state.check_pair(task, resource)?;
    Ok(splr(state, task, resource))
}

/// First resource (increasing index, current one excluded) with the lowest
/// SPLR, if that SPLR is negative.
pub fn best_improving_resource(
    state: &State,
    task: usize,
) -> Result<Option<usize>, AllocationError> {
    state.ch.check_task(task)?;
    Ok(best_improving(state, task))
}

pub(crate) fn splr(state: &State, task: usize, resource: usize) -> f64 {
    match state.current(task) {
        Some(current) => {
            state.projected_utility(task, current) - state.projected_utility(task, resource)
        }
        None => f64::INFINITY,
    }
}

pub(crate) fn best_improving(state: &State, task: usize) -> Option<usize> {
    let current = state.current(task)?;
    let mut best: Option<(usize, f64)> = None;
    for resource in (0..state.ch.num_resources).filter(|&r| r != current) {
        let splr = splr(state, task, resource);
        if best.map_or(true, |(_, b)| splr < b) {
            best = Some((resource, splr));
        }
    }
    best.filter(|&(_, splr)| splr < 0.0).map(|(r, _)| r)
}

/// One forward pass over the tasks. Returns the number of moves applied.
pub fn minimize_splr(state: &mut State) -> usize {
    let mut moves = 0;
    for task in 0..state.ch.num_tasks {
        let Some(current) = state.current(task) else {
            continue;
        };
        if let Some(best) = best_improving(state, task) {
            state.move_task(task, best);
            moves += 1;
            debug!(task, from = current, to = best, "splr reallocation");
        }
    }
    info!(moves, total_cost = state.total_cost(), "splr pass finished");
    moves
}
