use super::state::weighted_cost;
use cloudalloc_challenges::{
    resource_allocation::{Challenge, Solution},
    AllocationError,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Produces the allocation the refinement passes start from.
pub trait InitialStrategy {
    fn name(&self) -> &'static str;

    fn solve(&self, challenge: &Challenge) -> Result<Solution, AllocationError>;
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// `processing_time * cost`
    #[default]
    Weighted,
    CostOnly,
}

impl Objective {
    fn cost(&self, challenge: &Challenge, task: usize, resource: usize) -> f64 {
        match self {
            Objective::Weighted => weighted_cost(challenge, task, resource),
            Objective::CostOnly => challenge.cost_matrix[task][resource],
        }
    }
}

/// Exact minimum-cost assignment (every task on exactly one resource, every
/// resource hosting at most one task), shortest augmenting path variant of
/// the Hungarian method with row and column potentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct HungarianSolver {
    pub objective: Objective,
}

impl InitialStrategy for HungarianSolver {
    fn name(&self) -> &'static str {
        "hungarian"
    }

    fn solve(&self, challenge: &Challenge) -> Result<Solution, AllocationError> {
        challenge.check_feasible()?;
        let n = challenge.num_tasks;
        let m = challenge.num_resources;
        if n > m {
            return Err(AllocationError::InfeasibleInstance {
                num_tasks: n,
                num_resources: m,
            });
        }

        // 1-based; row 0 and column 0 are the virtual start of each augmenting path
        let mut u = vec![0.0f64; n + 1];
        let mut v = vec![0.0f64; m + 1];
        let mut row_of = vec![0usize; m + 1];
        let mut way = vec![0usize; m + 1];

        for i in 1..=n {
            row_of[0] = i;
            let mut j0 = 0;
            let mut min_slack = vec![f64::INFINITY; m + 1];
            let mut used = vec![false; m + 1];
            loop {
                used[j0] = true;
                let i0 = row_of[j0];
                let mut delta = f64::INFINITY;
                let mut j1 = 0;
                for j in 1..=m {
                    if used[j] {
                        continue;
                    }
                    let reduced = self.objective.cost(challenge, i0 - 1, j - 1) - u[i0] - v[j];
                    if reduced < min_slack[j] {
                        min_slack[j] = reduced;
                        way[j] = j0;
                    }
                    if min_slack[j] < delta {
                        delta = min_slack[j];
                        j1 = j;
                    }
                }
                if j1 == 0 {
                    return Err(AllocationError::InfeasibleInstance {
                        num_tasks: n,
                        num_resources: m,
                    });
                }
                for j in 0..=m {
                    if used[j] {
                        u[row_of[j]] += delta;
                        v[j] -= delta;
                    } else {
                        min_slack[j] -= delta;
                    }
                }
                j0 = j1;
                if row_of[j0] == 0 {
                    break;
                }
            }
            // Flip the augmenting path
            loop {
                let j1 = way[j0];
                row_of[j0] = row_of[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }

        let mut solution = Solution::unassigned(n);
        for j in 1..=m {
            if row_of[j] != 0 {
                solution.assignment[row_of[j] - 1] = Some(j - 1);
            }
        }
        debug!(
            num_tasks = n,
            num_resources = m,
            objective = ?self.objective,
            "initial matching solved"
        );
        Ok(solution)
    }
}

/// Every task on a uniformly random resource. No matching constraint.
#[derive(Clone, Copy, Debug)]
pub struct RandomInitializer {
    pub seed: u64,
}

impl InitialStrategy for RandomInitializer {
    fn name(&self) -> &'static str {
        "random"
    }

    fn solve(&self, challenge: &Challenge) -> Result<Solution, AllocationError> {
        challenge.check_feasible()?;
        let mut rng = SmallRng::seed_from_u64(self.seed);
        Ok(Solution {
            assignment: (0..challenge.num_tasks)
                .map(|_| Some(rng.gen_range(0..challenge.num_resources)))
                .collect(),
        })
    }
}

pub fn solve_initial(challenge: &Challenge) -> Result<Solution, AllocationError> {
    HungarianSolver::default().solve(challenge)
}
