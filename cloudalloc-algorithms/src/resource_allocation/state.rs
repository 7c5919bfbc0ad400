use cloudalloc_challenges::{
    resource_allocation::{Challenge, Solution},
    AllocationError,
};
use std::ops::Deref;

/// Mutable allocation owned by whichever pass is currently running.
///
/// The wrapped [`Solution`] is validated against the challenge on
/// construction, so every stored resource index is in range and the
/// crate-internal accessors below index without checks.
pub struct State<'a> {
    pub ch: &'a Challenge,
    solution: Solution,
}

impl<'a> State<'a> {
    pub fn new(ch: &'a Challenge, solution: Solution) -> Result<Self, AllocationError> {
        ch.check_allocation(&solution)?;
        Ok(Self { ch, solution })
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn into_solution(self) -> Solution {
        self.solution
    }

    pub fn current_resource_of(&self, task: usize) -> Result<Option<usize>, AllocationError> {
        self.ch.check_task(task)?;
        Ok(self.solution.assignment[task])
    }

    pub fn tasks_on(&self, resource: usize) -> Result<Vec<usize>, AllocationError> {
        self.ch.check_resource(resource)?;
        Ok(self.solution.tasks_on(resource))
    }

    /// Moves `task` from `from` to `to` in a single write. Fails without
    /// touching the allocation if `task` is not currently on `from`.
    pub fn reallocate(
        &mut self,
        task: usize,
        from: usize,
        to: usize,
    ) -> Result<(), AllocationError> {
        self.ch.check_task(task)?;
        self.ch.check_resource(from)?;
        self.ch.check_resource(to)?;
        if self.solution.assignment[task] != Some(from) {
            return Err(AllocationError::NotAssigned {
                task,
                resource: from,
            });
        }
        self.move_task(task, to);
        Ok(())
    }

    pub fn utility(&self, task: usize, resource: usize) -> Result<f64, AllocationError> {
        self.ch.utility(&self.solution, task, resource)
    }

    pub fn utility_if_reallocated(
        &self,
        task: usize,
        resource: usize,
    ) -> Result<f64, AllocationError> {
        self.ch.utility_if_reallocated(task, resource)
    }

    pub fn total_utility(&self) -> f64 {
        (0..self.ch.num_tasks).map(|t| self.own_utility(t)).sum()
    }

    pub fn total_utility_if_reallocated(
        &self,
        task: usize,
        resource: usize,
    ) -> Result<f64, AllocationError> {
        self.check_pair(task, resource)?;
        Ok(self.projected_total_utility(task, resource))
    }

    pub fn total_cost(&self) -> f64 {
        self.solution
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(t, r)| r.map(|r| weighted_cost(self.ch, t, r)))
            .sum()
    }

    /// Applies a tentative move that is rolled back when the returned guard
    /// goes out of scope, unless [`TrialMove::commit`] is called first.
    pub fn trial_move(
        &mut self,
        task: usize,
        to: usize,
    ) -> Result<TrialMove<'_, 'a>, AllocationError> {
        self.check_pair(task, to)?;
        Ok(self.trial(task, to))
    }

    pub(crate) fn check_pair(&self, task: usize, resource: usize) -> Result<(), AllocationError> {
        self.ch.check_task(task)?;
        self.ch.check_resource(resource)
    }

    pub(crate) fn trial(&mut self, task: usize, to: usize) -> TrialMove<'_, 'a> {
        let previous = self.solution.assignment[task];
        self.solution.assignment[task] = Some(to);
        TrialMove {
            state: self,
            task,
            previous,
            committed: false,
        }
    }

    pub(crate) fn current(&self, task: usize) -> Option<usize> {
        self.solution.assignment[task]
    }

    pub(crate) fn projected_utility(&self, task: usize, resource: usize) -> f64 {
        1.0 / weighted_cost(self.ch, task, resource)
    }

    pub(crate) fn own_utility(&self, task: usize) -> f64 {
        self.current(task)
            .map_or(0.0, |r| self.projected_utility(task, r))
    }

    pub(crate) fn projected_total_utility(&self, task: usize, resource: usize) -> f64 {
        self.total_utility() - self.own_utility(task) + self.projected_utility(task, resource)
    }

    pub(crate) fn move_task(&mut self, task: usize, to: usize) {
        self.solution.assignment[task] = Some(to);
    }
}

/// `processing_time * cost` for indices already known to be in range.
pub(crate) fn weighted_cost(ch: &Challenge, task: usize, resource: usize) -> f64 {
    ch.processing_times[task] * ch.cost_matrix[task][resource]
}

/// Scoped tentative reallocation, see [`State::trial_move`].
pub struct TrialMove<'s, 'a> {
    state: &'s mut State<'a>,
    task: usize,
    previous: Option<usize>,
    committed: bool,
}

impl TrialMove<'_, '_> {
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<'a> Deref for TrialMove<'_, 'a> {
    type Target = State<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.state
    }
}

impl Drop for TrialMove<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.solution.assignment[self.task] = self.previous;
        }
    }
}
