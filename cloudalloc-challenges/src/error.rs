use thiserror::Error;

/// Failures surfaced by the problem model and the solvers built on it.
///
/// A task without a resource is not an error: it is reported as `None`
/// wherever the current resource of a task is queried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Task ({task}) is out of bounds (num_tasks: {num_tasks})")]
    InvalidTask { task: usize, num_tasks: usize },

    #[error("Resource ({resource}) is out of bounds (num_resources: {num_resources})")]
    InvalidResource {
        resource: usize,
        num_resources: usize,
    },

    #[error("Infeasible instance: {num_tasks} tasks cannot be matched to {num_resources} resources")]
    InfeasibleInstance {
        num_tasks: usize,
        num_resources: usize,
    },

    #[error("Task ({task}) is not assigned to resource ({resource})")]
    NotAssigned { task: usize, resource: usize },

    #[error("Dimension mismatch for {what}. Expected: {expected}, Actual: {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {what} at index {index}: {value} (must be positive and finite)")]
    InvalidValue {
        what: &'static str,
        index: usize,
        value: f64,
    },
}

impl AllocationError {
    pub fn is_invalid_index(&self) -> bool {
        matches!(
            self,
            AllocationError::InvalidTask { .. } | AllocationError::InvalidResource { .. }
        )
    }
}
