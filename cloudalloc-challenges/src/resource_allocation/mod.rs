use crate::{error::AllocationError, QUALITY_PRECISION};
mod baselines;
mod utility;
use anyhow::{anyhow, Result};
use ndarray::{Array2, Axis};
use rand::{
    distributions::{Distribution, Uniform},
    rngs::{SmallRng, StdRng},
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

impl_kv_string_serde! {
    Track {
        n_tasks: usize,
        n_resources: usize,
    }
}

/// Assignment of every task to at most one resource.
///
/// `assignment[t]` is the resource currently hosting task `t`, or `None`
/// while the task is unassigned. A resource may host several tasks; the
/// one-to-one property only holds for allocations produced by a matching
/// solver (see [`Challenge::verify_matching`]).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub assignment: Vec<Option<usize>>,
}

impl Solution {
    pub fn new() -> Self {
        Self {
            assignment: Vec::new(),
        }
    }

    pub fn unassigned(num_tasks: usize) -> Self {
        Self {
            assignment: vec![None; num_tasks],
        }
    }

    pub fn from_resources(resources: &[usize]) -> Self {
        Self {
            assignment: resources.iter().map(|&r| Some(r)).collect(),
        }
    }

    pub fn num_tasks(&self) -> usize {
        self.assignment.len()
    }

    pub fn current_resource_of(&self, task: usize) -> Result<Option<usize>, AllocationError> {
        self.assignment
            .get(task)
            .copied()
            .ok_or(AllocationError::InvalidTask {
                task,
                num_tasks: self.assignment.len(),
            })
    }

    /// Tasks multiplexing `resource`, in increasing task index.
    pub fn tasks_on(&self, resource: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(t, &r)| (r == Some(resource)).then_some(t))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.assignment.iter().all(Option::is_some)
    }

    /// 0/1 allocation matrix with one row per task.
    pub fn to_matrix(&self, num_resources: usize) -> Result<Array2<u8>, AllocationError> {
        let mut matrix = Array2::<u8>::zeros((self.assignment.len(), num_resources));
        for (t, r) in self.assignment.iter().enumerate() {
            if let Some(r) = *r {
                if r >= num_resources {
                    return Err(AllocationError::InvalidResource {
                        resource: r,
                        num_resources,
                    });
                }
                matrix[[t, r]] = 1;
            }
        }
        Ok(matrix)
    }

    pub fn from_matrix(matrix: &Array2<u8>) -> Result<Self, AllocationError> {
        let assignment = matrix
            .axis_iter(Axis(0))
            .map(|row| {
                let assigned: Vec<usize> = row
                    .iter()
                    .enumerate()
                    .filter_map(|(r, &x)| (x != 0).then_some(r))
                    .collect();
                match assigned.len() {
                    0 => Ok(None),
                    1 => Ok(Some(assigned[0])),
                    n => Err(AllocationError::DimensionMismatch {
                        what: "resources assigned to a task",
                        expected: 1,
                        actual: n,
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { assignment })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(try_from = "ChallengeData")]
pub struct Challenge {
    pub seed: [u8; 32],
    pub num_tasks: usize,
    pub num_resources: usize,
    /// `cost_matrix[t][r]` is the cost of running task `t` on resource `r`.
    pub cost_matrix: Vec<Vec<f64>>,
    pub processing_times: Vec<f64>,
}

/// Wire form of [`Challenge`]; deserialization goes through [`Challenge::new`].
#[derive(Deserialize)]
struct ChallengeData {
    #[serde(default)]
    seed: [u8; 32],
    num_tasks: usize,
    num_resources: usize,
    cost_matrix: Vec<Vec<f64>>,
    processing_times: Vec<f64>,
}

impl TryFrom<ChallengeData> for Challenge {
    type Error = AllocationError;

    fn try_from(data: ChallengeData) -> Result<Self, Self::Error> {
        let mut challenge = Challenge::new(
            data.num_tasks,
            data.num_resources,
            data.cost_matrix,
            data.processing_times,
        )?;
        challenge.seed = data.seed;
        Ok(challenge)
    }
}

impl Challenge {
    pub fn new(
        num_tasks: usize,
        num_resources: usize,
        cost_matrix: Vec<Vec<f64>>,
        processing_times: Vec<f64>,
    ) -> Result<Self, AllocationError> {
        if cost_matrix.len() != num_tasks {
            return Err(AllocationError::DimensionMismatch {
                what: "cost matrix rows",
                expected: num_tasks,
                actual: cost_matrix.len(),
            });
        }
        if processing_times.len() != num_tasks {
            return Err(AllocationError::DimensionMismatch {
                what: "processing times",
                expected: num_tasks,
                actual: processing_times.len(),
            });
        }
        for (t, row) in cost_matrix.iter().enumerate() {
            if row.len() != num_resources {
                return Err(AllocationError::DimensionMismatch {
                    what: "cost matrix columns",
                    expected: num_resources,
                    actual: row.len(),
                });
            }
            if let Some(&value) = row.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
                return Err(AllocationError::InvalidValue {
                    what: "cost",
                    index: t,
                    value,
                });
            }
        }
        if let Some((t, &value)) = processing_times
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(AllocationError::InvalidValue {
                what: "processing time",
                index: t,
                value,
            });
        }

        Ok(Self {
            seed: [0; 32],
            num_tasks,
            num_resources,
            cost_matrix,
            processing_times,
        })
    }

    /// Costs and processing times are drawn uniformly from `1..=10`.
    pub fn generate_instance(seed: &[u8; 32], track: &Track) -> Result<Self> {
        if track.n_tasks == 0 || track.n_resources == 0 {
            return Err(AllocationError::InfeasibleInstance {
                num_tasks: track.n_tasks,
                num_resources: track.n_resources,
            }
            .into());
        }
        let mut rng = SmallRng::from_seed(StdRng::from_seed(seed.clone()).gen());
        let value_distr = Uniform::new_inclusive(1u32, 10u32);

        let costs = Array2::from_shape_fn((track.n_tasks, track.n_resources), |_| {
            value_distr.sample(&mut rng) as f64
        });
        let cost_matrix = costs.axis_iter(Axis(0)).map(|row| row.to_vec()).collect();
        let processing_times = (0..track.n_tasks)
            .map(|_| value_distr.sample(&mut rng) as f64)
            .collect();

        let mut challenge = Self::new(
            track.n_tasks,
            track.n_resources,
            cost_matrix,
            processing_times,
        )?;
        challenge.seed = seed.clone();
        Ok(challenge)
    }

    pub fn check_task(&self, task: usize) -> Result<(), AllocationError> {
        if task < self.num_tasks {
            Ok(())
        } else {
            Err(AllocationError::InvalidTask {
                task,
                num_tasks: self.num_tasks,
            })
        }
    }

    pub fn check_resource(&self, resource: usize) -> Result<(), AllocationError> {
        if resource < self.num_resources {
            Ok(())
        } else {
            Err(AllocationError::InvalidResource {
                resource,
                num_resources: self.num_resources,
            })
        }
    }

    pub fn check_feasible(&self) -> Result<(), AllocationError> {
        if self.num_tasks == 0 || self.num_resources == 0 {
            Err(AllocationError::InfeasibleInstance {
                num_tasks: self.num_tasks,
                num_resources: self.num_resources,
            })
        } else {
            Ok(())
        }
    }

    /// `processing_time * cost` of running `task` on `resource`.
    pub fn weighted_cost(&self, task: usize, resource: usize) -> Result<f64, AllocationError> {
        self.check_task(task)?;
        self.check_resource(resource)?;
        Ok(self.cost_of(task, resource))
    }

    pub(crate) fn cost_of(&self, task: usize, resource: usize) -> f64 {
        self.processing_times[task] * self.cost_matrix[task][resource]
    }

    /// Length matches `num_tasks` and every assigned resource is in range.
    pub fn check_allocation(&self, solution: &Solution) -> Result<(), AllocationError> {
        if solution.assignment.len() != self.num_tasks {
            return Err(AllocationError::DimensionMismatch {
                what: "allocation",
                expected: self.num_tasks,
                actual: solution.assignment.len(),
            });
        }
        for &r in solution.assignment.iter().flatten() {
            self.check_resource(r)?;
        }
        Ok(())
    }

    /// Sum of `processing_time * cost` over assigned tasks.
    pub fn evaluate_total_cost(&self, solution: &Solution) -> Result<f64, AllocationError> {
        self.check_allocation(solution)?;
        Ok(solution
            .assignment
            .iter()
            .enumerate()
            .filter_map(|(t, r)| r.map(|r| self.cost_of(t, r)))
            .sum())
    }

    pub fn verify_solution(&self, solution: &Solution) -> Result<()> {
        self.check_allocation(solution)?;
        if let Some(task) = solution.assignment.iter().position(Option::is_none) {
            return Err(anyhow!("Task ({}) is not assigned to any resource", task));
        }
        Ok(())
    }

    pub fn verify_matching(&self, solution: &Solution) -> Result<()> {
        self.verify_solution(solution)?;
        let mut hosted = vec![None; self.num_resources];
        for (t, r) in solution.assignment.iter().enumerate() {
            if let Some(r) = *r {
                if let Some(other) = hosted[r] {
                    return Err(anyhow!(
                        "Resource ({}) hosts more than one task ({} and {})",
                        r,
                        other,
                        t
                    ));
                }
                hosted[r] = Some(t);
            }
        }
        Ok(())
    }

    /// Exhaustive search over all `num_resources ^ num_tasks` assignments.
    pub fn compute_brute_force_baseline(&self) -> Result<Solution> {
        let solution = RefCell::new(Solution::new());
        let save_solution_fn = |s: &Solution| -> Result<()> {
            *solution.borrow_mut() = s.clone();
            Ok(())
        };
        baselines::brute_force::solve_challenge(self, &save_solution_fn, &None)?;
        Ok(solution.into_inner())
    }

    /// Quality relative to the exhaustive baseline. `0` is optimal, negative is worse.
    pub fn evaluate_solution(&self, solution: &Solution) -> Result<i32> {
        self.verify_solution(solution)?;
        let total_cost = self.evaluate_total_cost(solution)?;
        let baseline_solution = self.compute_brute_force_baseline()?;
        let baseline_cost = self.evaluate_total_cost(&baseline_solution)?;
        let quality = (baseline_cost - total_cost) / baseline_cost;
        let quality = quality.clamp(-10.0, 10.0) * QUALITY_PRECISION as f64;
        Ok(quality.round() as i32)
    }
}
