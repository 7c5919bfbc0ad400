use anyhow::{anyhow, Context, Result};
use clap::{arg, ArgAction, Command};
use cloudalloc_algorithms::resource_allocation::{
    find_improving_move, help, InitialStrategy, Params, Solver, State,
};
use cloudalloc_challenges::resource_allocation::{Challenge, Solution, Track};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use std::{fs, io::Read};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("cloudalloc-runner")
        .about("Generates task allocation instances, solves them and checks allocations")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate_instance")
                .about("Generates a random instance")
                .arg(
                    arg!(<TRACK> "Instance shape, e.g. n_tasks=5,n_resources=5")
                        .value_parser(clap::value_parser!(Track)),
                )
                .arg(arg!(<SEED> "Seed value").value_parser(clap::value_parser!(u64))),
        )
        .subcommand(
            Command::new("solve")
                .about("Runs the initial matching followed by SPLR, GELR and random refinement")
                .arg(
                    arg!(<CHALLENGE> "Challenge json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--hyperparameters [HYPERPARAMETERS] "Hyperparameters json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--initial_only "Stop after the initial strategy")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("brute_force")
                .about("Exhaustive search over all assignments (small instances only)")
                .arg(
                    arg!(<CHALLENGE> "Challenge json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("verify_solution")
                .about("Verifies an allocation and reports its cost")
                .arg(
                    arg!(<CHALLENGE> "Challenge json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(<SOLUTION> "Solution json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--matching "Also require every resource to host at most one task")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("help_hyperparameters").about("Lists solver hyperparameters"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("generate_instance", sub_m)) => generate_instance(
            sub_m.get_one::<Track>("TRACK").cloned(),
            sub_m.get_one::<u64>("SEED").copied(),
        ),
        Some(("solve", sub_m)) => solve(
            sub_m.get_one::<String>("CHALLENGE"),
            sub_m.get_one::<String>("hyperparameters"),
            sub_m.get_flag("initial_only"),
        ),
        Some(("brute_force", sub_m)) => brute_force(sub_m.get_one::<String>("CHALLENGE")),
        Some(("verify_solution", sub_m)) => verify_solution(
            sub_m.get_one::<String>("CHALLENGE"),
            sub_m.get_one::<String>("SOLUTION"),
            sub_m.get_flag("matching"),
        ),
        Some(("help_hyperparameters", _)) => {
            help();
            Ok(())
        }
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn required<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str> {
    value
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument {}", name))
}

fn seed_from_u64(value: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0..8].copy_from_slice(&value.to_le_bytes());
    seed
}

/// Reads `arg` as stdin (`-`), a `.json` file, or an inline json string.
fn load_json<T: DeserializeOwned>(arg: &str, what: &str) -> Result<T> {
    let content = if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| format!("Failed to read {} from stdin", what))?;
        buffer
    } else if arg.ends_with(".json") {
        fs::read_to_string(arg).with_context(|| format!("Failed to read {} file: {}", what, arg))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", what))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn generate_instance(track: Option<Track>, seed: Option<u64>) -> Result<()> {
    let track = track.ok_or_else(|| anyhow!("Missing argument TRACK"))?;
    let seed = seed.ok_or_else(|| anyhow!("Missing argument SEED"))?;
    let challenge = Challenge::generate_instance(&seed_from_u64(seed), &track)?;
    info!(%track, seed, "instance generated");
    print_json(&challenge)
}

fn solve(
    challenge: Option<&String>,
    hyperparameters: Option<&String>,
    initial_only: bool,
) -> Result<()> {
    let challenge: Challenge = load_json(required(challenge, "CHALLENGE")?, "challenge")?;
    let hyperparameters = hyperparameters
        .map(|h| load_json::<Map<String, Value>>(h, "hyperparameters"))
        .transpose()?;

    if initial_only {
        let params = Params::initialize(&hyperparameters)?;
        let strategy = params.strategy_for(&challenge);
        let state = State::new(&challenge, strategy.solve(&challenge)?)?;
        return print_json(&json!({
            "strategy": strategy.name(),
            "total_cost": state.total_cost(),
            "total_utility": state.total_utility(),
            "improving_move": find_improving_move(&state),
            "solution": state.solution(),
        }));
    }

    let report = Solver::solve(&challenge, None, &hyperparameters)?;
    print_json(&report)
}

fn brute_force(challenge: Option<&String>) -> Result<()> {
    let challenge: Challenge = load_json(required(challenge, "CHALLENGE")?, "challenge")?;
    let solution = challenge.compute_brute_force_baseline()?;
    let total_cost = challenge.evaluate_total_cost(&solution)?;
    info!(total_cost, "exhaustive search finished");
    print_json(&json!({
        "total_cost": total_cost,
        "solution": solution,
    }))
}

fn verify_solution(
    challenge: Option<&String>,
    solution: Option<&String>,
    matching: bool,
) -> Result<()> {
    let challenge: Challenge = load_json(required(challenge, "CHALLENGE")?, "challenge")?;
    let solution: Solution = load_json(required(solution, "SOLUTION")?, "solution")?;
    if matching {
        challenge.verify_matching(&solution)?;
    } else {
        challenge.verify_solution(&solution)?;
    }
    let state = State::new(&challenge, solution)?;
    println!("Solution is valid");
    print_json(&json!({
        "total_cost": state.total_cost(),
        "total_utility": state.total_utility(),
        "improving_move": find_improving_move(&state),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_inline() {
        let solution: Solution = load_json(r#"{"assignment":[0,null,2]}"#, "solution").unwrap();
        assert_eq!(solution.assignment, vec![Some(0), None, Some(2)]);
        assert!(load_json::<Solution>("not json", "solution").is_err());
        assert!(load_json::<Solution>("missing.json", "solution").is_err());
    }

    #[test]
    fn test_load_json_validates_challenge() {
        let challenge: Challenge = load_json(
            r#"{"num_tasks":1,"num_resources":2,"cost_matrix":[[2.0,3.0]],"processing_times":[1.0]}"#,
            "challenge",
        )
        .unwrap();
        assert_eq!(challenge.seed, [0; 32]);
        assert!(load_json::<Challenge>(
            r#"{"num_tasks":2,"num_resources":2,"cost_matrix":[[1.0]],"processing_times":[1.0,1.0]}"#,
            "challenge",
        )
        .is_err());
    }

    #[test]
    fn test_seed_from_u64() {
        let seed = seed_from_u64(258);
        assert_eq!(&seed[0..2], &[2, 1]);
        assert!(seed[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_cli_parses_track() {
        let matches = cli()
            .try_get_matches_from(["cloudalloc-runner", "generate_instance", "n_tasks=3,n_resources=4", "9"])
            .unwrap();
        let (_, sub_m) = matches.subcommand().unwrap();
        assert_eq!(
            sub_m.get_one::<Track>("TRACK"),
            Some(&Track {
                n_tasks: 3,
                n_resources: 4
            })
        );
        assert_eq!(sub_m.get_one::<u64>("SEED"), Some(&9));
    }
}
