use super::{splr::best_improving, state::State};
use cloudalloc_challenges::AllocationError;
use tracing::{debug, info};

/// Magnitude of the change in total utility if `task` moved to `resource`.
pub fn compute_gelr(
    state: &State,
    task: usize,
    resource: usize,
) -> Result<f64, AllocationError> {
    state.check_pair(task, resource)?;
    Ok(gelr(state, task, resource))
}

/// Resource other than `resource` with the smallest non-zero GELR for
/// `task`. Ties go to the lowest index.
pub fn min_single(
    state: &State,
    task: usize,
    resource: usize,
) -> Result<Option<usize>, AllocationError> {
    state.check_pair(task, resource)?;
    Ok(closest_alternative(state, task, resource))
}

fn gelr(state: &State, task: usize, resource: usize) -> f64 {
    (state.total_utility() - state.projected_total_utility(task, resource)).abs()
}

fn closest_alternative(state: &State, task: usize, resource: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for r in (0..state.ch.num_resources).filter(|&r| r != resource) {
        let gelr = gelr(state, task, r);
        if gelr > 0.0 && best.map_or(true, |(_, b)| gelr < b) {
            best = Some((r, gelr));
        }
    }
    best.map(|(r, _)| r)
}

/// Per-resource pass over the multiplexing tasks of every resource.
///
/// Each task is tentatively moved to its `min_single` target. The move
/// stands only if the task's own utility went up; otherwise it is rolled
/// back and the task joins the negative-SPLR set. The member of that set
/// with the smallest GELR then gets one more chance at its best improving
/// resource. Returns the number of moves that stand.
pub fn minimize_gelr(state: &mut State) -> usize {
    let mut moves = 0;
    for resource in 0..state.ch.num_resources {
        let multiplexing = state.solution().tasks_on(resource);
        let mut negative_splr: Vec<(usize, f64)> = Vec::new();

        for task in multiplexing {
            let Some(target) = closest_alternative(state, task, resource) else {
                continue;
            };
            let gelr = gelr(state, task, target);
            let before = state.own_utility(task);
            let trial = state.trial(task, target);
            if trial.own_utility(task) > before {
                trial.commit();
                moves += 1;
                debug!(task, from = resource, to = target, gelr, "gelr reallocation");
            } else {
                drop(trial);
                negative_splr.push((task, gelr));
            }
        }

        let candidate = negative_splr
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|&(task, _)| task);
        if let Some(task) = candidate {
            if let Some(target) = best_improving(state, task) {
                state.move_task(task, target);
                moves += 1;
                debug!(task, from = resource, to = target, "gelr second-chance reallocation");
            }
        }
    }
    info!(moves, total_cost = state.total_cost(), "gelr pass finished");
    moves
}
