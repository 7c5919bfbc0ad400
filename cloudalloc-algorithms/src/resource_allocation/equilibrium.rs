use super::state::State;
use cloudalloc_challenges::AllocationError;

/// Whether moving `task` to `resource` would strictly raise its utility.
pub fn can_improve_nash(
    state: &State,
    task: usize,
    resource: usize,
) -> Result<bool, AllocationError> {
    state.check_pair(task, resource)?;
    Ok(improves(state, task, resource))
}

fn improves(state: &State, task: usize, resource: usize) -> bool {
    match state.current(task) {
        Some(current) if current != resource => {
            state.projected_utility(task, resource) > state.projected_utility(task, current)
        }
        _ => false,
    }
}

/// First improving unilateral move in (task, resource) index order.
pub fn find_improving_move(state: &State) -> Option<(usize, usize)> {
    (0..state.ch.num_tasks)
        .flat_map(|t| (0..state.ch.num_resources).map(move |r| (t, r)))
        .find(|&(t, r)| improves(state, t, r))
}

/// Read-only: no task can raise its own utility by moving alone.
pub fn is_equilibrium(state: &State) -> bool {
    find_improving_move(state).is_none()
}
