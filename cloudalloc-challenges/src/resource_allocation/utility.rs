//! Utility model: a task earns `1 / (processing_time * cost)` on the
//! resource it is assigned to and nothing anywhere else.

use super::{Challenge, Solution};
use crate::error::AllocationError;

impl Challenge {
    /// Utility of `task` on `resource` under `solution`; `0.0` unless
    /// `solution` currently assigns `task` to `resource`.
    pub fn utility(
        &self,
        solution: &Solution,
        task: usize,
        resource: usize,
    ) -> Result<f64, AllocationError> {
        self.check_task(task)?;
        self.check_resource(resource)?;
        Ok(match solution.current_resource_of(task)? {
            Some(r) if r == resource => 1.0 / self.cost_of(task, resource),
            _ => 0.0,
        })
    }

    /// Utility `task` would earn if it ran on `resource`, whatever the
    /// current allocation is.
    pub fn utility_if_reallocated(
        &self,
        task: usize,
        resource: usize,
    ) -> Result<f64, AllocationError> {
        self.check_task(task)?;
        self.check_resource(resource)?;
        Ok(1.0 / self.cost_of(task, resource))
    }

    pub fn total_utility(&self, solution: &Solution) -> Result<f64, AllocationError> {
        solution
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(t, r)| r.map(|r| (t, r)))
            .try_fold(0.0, |acc, (t, r)| Ok(acc + self.utility(solution, t, r)?))
    }

    /// Total utility after moving `task` to `resource`, every other task
    /// left in place. Computed from the model, `solution` is only read.
    pub fn total_utility_if_reallocated(
        &self,
        solution: &Solution,
        task: usize,
        resource: usize,
    ) -> Result<f64, AllocationError> {
        let total = self.total_utility(solution)?;
        let current = match solution.current_resource_of(task)? {
            Some(r) => self.utility(solution, task, r)?,
            None => 0.0,
        };
        Ok(total - current + self.utility_if_reallocated(task, resource)?)
    }
}
