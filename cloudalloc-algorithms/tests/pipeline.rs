use cloudalloc_algorithms::resource_allocation::*;
use cloudalloc_challenges::AllocationError;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::cell::RefCell;

fn make_seed(index: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0..8].copy_from_slice(&index.to_le_bytes());
    seed
}

fn instance(index: u64, n_tasks: usize, n_resources: usize) -> Challenge {
    Challenge::generate_instance(
        &make_seed(index),
        &Track {
            n_tasks,
            n_resources,
        },
    )
    .unwrap()
}

fn hyperparameters(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

/// Cheapest one-to-one assignment by trying every injective map.
fn min_matching_cost(challenge: &Challenge) -> f64 {
    fn search(ch: &Challenge, task: usize, used: &mut Vec<bool>, acc: f64, best: &mut f64) {
        if task == ch.num_tasks {
            *best = best.min(acc);
            return;
        }
        for r in 0..ch.num_resources {
            if !used[r] {
                used[r] = true;
                search(ch, task + 1, used, acc + ch.weighted_cost(task, r).unwrap(), best);
                used[r] = false;
            }
        }
    }
    let mut best = f64::INFINITY;
    search(
        challenge,
        0,
        &mut vec![false; challenge.num_resources],
        0.0,
        &mut best,
    );
    best
}

#[test]
fn test_two_by_two_scenario() {
    let challenge = Challenge::new(
        2,
        2,
        vec![vec![1.0, 2.0], vec![2.0, 1.0]],
        vec![1.0, 1.0],
    )
    .unwrap();
    let solution = solve_initial(&challenge).unwrap();
    assert_eq!(solution, Solution::from_resources(&[0, 1]));
    assert_eq!(challenge.evaluate_total_cost(&solution).unwrap(), 2.0);

    let state = State::new(&challenge, solution).unwrap();
    assert!(is_equilibrium(&state));
    assert_eq!(find_improving_move(&state), None);
}

#[test]
fn test_initial_solution_is_an_optimal_matching() {
    let mut rng = SmallRng::seed_from_u64(7);
    for index in 0..40 {
        let n_tasks = rng.gen_range(1..=5);
        let n_resources = rng.gen_range(n_tasks..=6);
        let challenge = instance(index, n_tasks, n_resources);
        let solution = solve_initial(&challenge).unwrap();
        challenge.verify_matching(&solution).unwrap();
        let cost = challenge.evaluate_total_cost(&solution).unwrap();
        assert!((cost - min_matching_cost(&challenge)).abs() < 1e-9);
    }
}

#[test]
fn test_initial_solver_rejects_infeasible_instances() {
    let challenge = instance(1, 4, 3);
    assert_eq!(
        solve_initial(&challenge).unwrap_err(),
        AllocationError::InfeasibleInstance {
            num_tasks: 4,
            num_resources: 3
        }
    );
    let empty = Challenge::new(0, 3, vec![], vec![]).unwrap();
    assert!(matches!(
        solve_initial(&empty),
        Err(AllocationError::InfeasibleInstance { .. })
    ));
    let no_resources = Challenge::new(2, 0, vec![vec![], vec![]], vec![1.0, 1.0]).unwrap();
    assert!(RandomInitializer { seed: 0 }.solve(&no_resources).is_err());
}

#[test]
fn test_random_initializer_is_seeded() {
    let challenge = instance(2, 8, 3);
    let a = RandomInitializer { seed: 11 }.solve(&challenge).unwrap();
    let b = RandomInitializer { seed: 11 }.solve(&challenge).unwrap();
    assert_eq!(a, b);
    challenge.verify_solution(&a).unwrap();
}

#[test]
fn test_refine_never_increases_cost() {
    let params = Params::default();
    for index in 0..50 {
        let challenge = instance(index, 5, 7);
        let mut state = State::new(&challenge, solve_initial(&challenge).unwrap()).unwrap();
        let initial_cost = state.total_cost();
        refine(&mut state, &params);
        assert!(state.total_cost() <= initial_cost);
        challenge.verify_solution(state.solution()).unwrap();
    }
}

#[test]
fn test_refine_is_idempotent_at_equilibrium() {
    let params = Params::default();
    for index in 0..50 {
        let challenge = instance(index, 4, 6);
        let mut state = State::new(&challenge, solve_initial(&challenge).unwrap()).unwrap();
        refine(&mut state, &params);
        assert!(is_equilibrium(&state));

        let before = state.solution().clone();
        assert_eq!(refine(&mut state, &params), 0);
        assert_eq!(state.solution(), &before);
    }
}

#[test]
fn test_brute_force_bounds_pipeline() {
    for index in 0..20 {
        let challenge = instance(index, 3, 3);
        let mut state = State::new(&challenge, solve_initial(&challenge).unwrap()).unwrap();
        refine(&mut state, &Params::default());
        let baseline = challenge.compute_brute_force_baseline().unwrap();
        let baseline_cost = challenge.evaluate_total_cost(&baseline).unwrap();
        assert!(baseline_cost <= state.total_cost() + 1e-9);
    }
}

#[test]
fn test_total_utility_if_reallocated_is_pure() {
    let challenge = instance(5, 4, 4);
    let mut state = State::new(&challenge, Solution::from_resources(&[0, 0, 2, 3])).unwrap();
    minimize_gelr(&mut state);
    let before = state.solution().clone();
    for t in 0..4 {
        for r in 0..4 {
            let projected = state.total_utility_if_reallocated(t, r).unwrap();
            let simulated = state.trial_move(t, r).unwrap().total_utility();
            assert!((projected - simulated).abs() < 1e-12);
            for task in 0..4 {
                assert_eq!(
                    state.current_resource_of(task).unwrap(),
                    before.assignment[task]
                );
            }
        }
    }
    assert!(state.total_utility_if_reallocated(4, 0).is_err());
}

#[test]
fn test_reallocate_keeps_single_assignment() {
    let challenge = instance(6, 3, 3);
    let mut state = State::new(&challenge, Solution::from_resources(&[0, 1, 2])).unwrap();
    state.reallocate(0, 0, 2).unwrap();
    assert_eq!(state.current_resource_of(0).unwrap(), Some(2));
    assert_eq!(state.tasks_on(2).unwrap(), vec![0, 2]);
    assert_eq!(state.tasks_on(0).unwrap(), Vec::<usize>::new());

    assert_eq!(
        state.reallocate(1, 0, 2).unwrap_err(),
        AllocationError::NotAssigned {
            task: 1,
            resource: 0
        }
    );
    assert!(state.reallocate(3, 0, 1).unwrap_err().is_invalid_index());
    assert!(state.reallocate(1, 1, 3).unwrap_err().is_invalid_index());
    assert!(state.tasks_on(3).is_err());
    assert!(state.current_resource_of(3).is_err());
    assert_eq!(state.solution(), &Solution::from_resources(&[2, 1, 2]));
}

#[test]
fn test_state_rejects_out_of_range_allocation() {
    let challenge = instance(6, 2, 2);
    assert!(State::new(&challenge, Solution::from_resources(&[0, 2])).is_err());
    assert!(State::new(&challenge, Solution::from_resources(&[0])).is_err());
}

#[test]
fn test_splr_moves_to_first_cheapest_resource() {
    let challenge = Challenge::new(
        2,
        4,
        vec![vec![5.0, 2.0, 2.0, 9.0], vec![1.0, 3.0, 1.0, 1.0]],
        vec![1.0, 1.0],
    )
    .unwrap();
    let mut state = State::new(&challenge, Solution::from_resources(&[3, 0])).unwrap();
    assert!(compute_splr(&state, 0, 1).unwrap() < 0.0);
    assert!(compute_splr(&state, 1, 2).unwrap() == 0.0);
    assert_eq!(best_improving_resource(&state, 0), Ok(Some(1)));
    assert_eq!(best_improving_resource(&state, 1), Ok(None));

    assert_eq!(minimize_splr(&mut state), 1);
    assert_eq!(state.solution(), &Solution::from_resources(&[1, 0]));
}

#[test]
fn test_splr_skips_unassigned_tasks() {
    let challenge = instance(8, 2, 3);
    let mut state = State::new(
        &challenge,
        Solution {
            assignment: vec![None, None],
        },
    )
    .unwrap();
    assert_eq!(compute_splr(&state, 0, 1), Ok(f64::INFINITY));
    assert_eq!(minimize_splr(&mut state), 0);
    assert_eq!(minimize_gelr(&mut state), 0);
    let mut rng = SmallRng::seed_from_u64(0);
    assert_eq!(randomized_refinement(&mut state, 100, &mut rng), 0);
    assert!(is_equilibrium(&state));
}

#[test]
fn test_gelr_min_single_prefers_smallest_change() {
    let challenge = Challenge::new(
        1,
        4,
        vec![vec![4.0, 4.0, 1.0, 2.0]],
        vec![1.0],
    )
    .unwrap();
    let mut state = State::new(&challenge, Solution::from_resources(&[0])).unwrap();
    // resource 1 leaves total utility unchanged, resource 3 changes it least
    assert_eq!(compute_gelr(&state, 0, 1), Ok(0.0));
    assert_eq!(min_single(&state, 0, 0), Ok(Some(3)));

    // moved onto resource 3 first, then from there to its cheapest resource
    // once its own min_single move is rolled back
    assert_eq!(minimize_gelr(&mut state), 2);
    assert_eq!(state.current_resource_of(0).unwrap(), Some(2));
}

#[test]
fn test_gelr_second_chance_for_negative_splr_task() {
    // The smallest change for task 0 is onto the more expensive resource 1,
    // which is rolled back; the task then takes its best improving move.
    let challenge = Challenge::new(
        1,
        3,
        vec![vec![2.0, 3.0, 1.0]],
        vec![1.0],
    )
    .unwrap();
    let mut state = State::new(&challenge, Solution::from_resources(&[0])).unwrap();
    assert_eq!(min_single(&state, 0, 0), Ok(Some(1)));
    assert_eq!(minimize_gelr(&mut state), 1);
    assert_eq!(state.current_resource_of(0).unwrap(), Some(2));
}

#[test]
fn test_gelr_skips_single_resource() {
    let challenge = Challenge::new(2, 1, vec![vec![3.0], vec![1.0]], vec![1.0, 2.0]).unwrap();
    let mut state = State::new(&challenge, Solution::from_resources(&[0, 0])).unwrap();
    assert_eq!(min_single(&state, 0, 0), Ok(None));
    assert_eq!(minimize_gelr(&mut state), 0);
    assert_eq!(state.solution(), &Solution::from_resources(&[0, 0]));
}

#[test]
fn test_randomized_refinement_only_improves() {
    let challenge = instance(9, 6, 5);
    let solution = RandomInitializer { seed: 3 }.solve(&challenge).unwrap();
    let mut state = State::new(&challenge, solution.clone()).unwrap();
    let mut rng = SmallRng::seed_from_u64(4);
    assert_eq!(randomized_refinement(&mut state, 0, &mut rng), 0);
    assert_eq!(state.solution(), &solution);

    let mut last_cost = state.total_cost();
    for _ in 0..20 {
        randomized_refinement(&mut state, 10, &mut rng);
        assert!(state.total_cost() <= last_cost);
        last_cost = state.total_cost();
    }
}

#[test]
fn test_can_improve_nash() {
    let challenge = Challenge::new(
        2,
        2,
        vec![vec![1.0, 2.0], vec![2.0, 1.0]],
        vec![1.0, 1.0],
    )
    .unwrap();
    let state = State::new(&challenge, Solution::from_resources(&[1, 1])).unwrap();
    assert_eq!(can_improve_nash(&state, 0, 0), Ok(true));
    assert_eq!(can_improve_nash(&state, 0, 1), Ok(false));
    assert_eq!(can_improve_nash(&state, 1, 0), Ok(false));
    assert_eq!(find_improving_move(&state), Some((0, 0)));
    assert!(!is_equilibrium(&state));
}

#[test]
fn test_queries_reject_out_of_range_indices() {
    let challenge = Challenge::new(
        2,
        2,
        vec![vec![1.0, 2.0], vec![2.0, 1.0]],
        vec![1.0, 1.0],
    )
    .unwrap();
    let mut state = State::new(&challenge, Solution::from_resources(&[0, 1])).unwrap();
    let bad_task = AllocationError::InvalidTask {
        task: 5,
        num_tasks: 2,
    };
    let bad_resource = AllocationError::InvalidResource {
        resource: 7,
        num_resources: 2,
    };

    assert_eq!(compute_splr(&state, 5, 0), Err(bad_task.clone()));
    assert_eq!(compute_splr(&state, 0, 7), Err(bad_resource.clone()));
    assert_eq!(best_improving_resource(&state, 5), Err(bad_task.clone()));
    assert_eq!(compute_gelr(&state, 5, 0), Err(bad_task.clone()));
    assert_eq!(compute_gelr(&state, 0, 7), Err(bad_resource.clone()));
    assert_eq!(min_single(&state, 5, 0), Err(bad_task.clone()));
    assert_eq!(min_single(&state, 0, 7), Err(bad_resource.clone()));
    assert_eq!(can_improve_nash(&state, 5, 0), Err(bad_task.clone()));
    assert_eq!(can_improve_nash(&state, 0, 7), Err(bad_resource.clone()));
    assert_eq!(state.trial_move(0, 7).err(), Some(bad_resource));
    assert_eq!(state.trial_move(5, 0).err(), Some(bad_task));

    assert_eq!(state.solution(), &Solution::from_resources(&[0, 1]));
    assert_eq!(state.total_cost(), 2.0);
}

#[test]
fn test_params_initialize() {
    let defaults = Params::initialize(&None).unwrap();
    assert_eq!(defaults, Params::default());
    assert_eq!(defaults.refinement_iterations, 100);

    let params = Params::initialize(&hyperparameters(json!({
        "refinement_iterations": 5,
        "seed": 42,
        "initial_strategy": "random",
        "objective": "cost_only",
    })))
    .unwrap();
    assert_eq!(params.refinement_iterations, 5);
    assert_eq!(params.seed, Some(42));
    assert_eq!(params.initial_strategy, StrategyKind::Random);
    assert_eq!(params.objective, Objective::CostOnly);

    assert!(Params::initialize(&hyperparameters(json!({"initial_strategy": "auction"}))).is_err());
    assert!(Params::initialize(&hyperparameters(json!({"refinement_iterations": -1}))).is_err());
}

#[test]
fn test_params_seed_defaults_to_challenge_seed() {
    let challenge = instance(77, 2, 2);
    assert_eq!(Params::default().seed_for(&challenge), 77);
    let params = Params {
        seed: Some(5),
        ..Params::default()
    };
    assert_eq!(params.seed_for(&challenge), 5);
}

#[test]
fn test_solver_report() {
    let challenge = instance(10, 5, 5);
    let report = Solver::solve(&challenge, None, &None).unwrap();
    assert!(report.final_cost <= report.initial_cost);
    assert!(report.is_equilibrium);
    assert_eq!(
        report.final_cost,
        challenge.evaluate_total_cost(&report.solution).unwrap()
    );
    assert!((report.total_utility - challenge.total_utility(&report.solution).unwrap()).abs() < 1e-12);
}

#[test]
fn test_solver_with_random_start_reaches_baseline() {
    let challenge = instance(12, 4, 3);
    let report = Solver::solve(
        &challenge,
        None,
        &hyperparameters(json!({"initial_strategy": "random", "seed": 1})),
    )
    .unwrap();
    let baseline = challenge.compute_brute_force_baseline().unwrap();
    let baseline_cost = challenge.evaluate_total_cost(&baseline).unwrap();
    assert!((report.final_cost - baseline_cost).abs() < 1e-9);
    assert_eq!(challenge.evaluate_solution(&report.solution).unwrap(), 0);
}

#[test]
fn test_solve_challenge_saves_initial_and_final_solutions() {
    let challenge = instance(13, 3, 4);
    let saved = RefCell::new(Vec::new());
    let save_solution_fn = |s: &Solution| -> anyhow::Result<()> {
        saved.borrow_mut().push(s.clone());
        Ok(())
    };
    solve_challenge(&challenge, &save_solution_fn, &None).unwrap();
    assert!(solve_challenge(&instance(14, 4, 3), &save_solution_fn, &None).is_err());

    let saved = saved.into_inner();
    assert_eq!(saved.len(), 2);
    challenge.verify_matching(&saved[0]).unwrap();
    challenge.verify_solution(&saved[1]).unwrap();
}
