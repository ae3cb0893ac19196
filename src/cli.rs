//! Command-line interface for the market runner.

use crate::scenario::Scenario;
use lexopt::prelude::*;
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Command-line arguments for the runner.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
    pub scenario_name: String,
    pub scenario_file: Option<PathBuf>,
    pub rounds: Option<usize>,
    pub random_seed: Option<u64>,
    pub initial_cash: Option<Decimal>,
    pub verbose: bool,
    pub quiet: bool,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    List,
    Show,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::Run,
            scenario_name: "exchange".to_string(),
            scenario_file: None,
            rounds: None,
            random_seed: None,
            initial_cash: None,
            verbose: false,
            quiet: false,
            output_file: None,
        }
    }
}

pub fn parse_args() -> Result<CliArgs, lexopt::Error> {
    parse_from(lexopt::Parser::from_env())
}

/// Parse an explicit argument list (without the program name).
pub fn parse_args_from<I>(args: I) -> Result<CliArgs, lexopt::Error>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString>,
{
    parse_from(lexopt::Parser::from_args(args))
}

fn parse_from(mut args: lexopt::Parser) -> Result<CliArgs, lexopt::Error> {
    let mut cli_args = CliArgs::default();
    let mut subcommand = None;

    while let Some(arg) = args.next()? {
        match arg {
            Value(val) if subcommand.is_none() => {
                subcommand = Some(val.string()?);
            }
            Long("scenario") => {
                cli_args.scenario_name = args.value()?.string()?;
            }
            Long("scenario-file") => {
                cli_args.scenario_file = Some(PathBuf::from(args.value()?));
            }
            Long("rounds") | Short('r') => {
                cli_args.rounds = Some(args.value()?.parse()?);
            }
            Long("seed") => {
                cli_args.random_seed = Some(args.value()?.parse()?);
            }
            Long("cash") => {
                cli_args.initial_cash = Some(args.value()?.parse()?);
            }
            Long("verbose") | Short('v') => cli_args.verbose = true,
            Long("quiet") | Short('q') => cli_args.quiet = true,
            Long("output") | Short('o') => {
                cli_args.output_file = Some(PathBuf::from(args.value()?));
            }
            Long("help") | Short('h') => {
                print_help();
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    cli_args.command = match subcommand.as_deref() {
        Some("run") | None => Command::Run,
        Some("list") => Command::List,
        Some("show") => Command::Show,
        Some(cmd) => return Err(lexopt::Error::from(format!("Unknown command: {}", cmd))),
    };

    Ok(cli_args)
}

/// Apply CLI overrides to a scenario.
pub fn apply_overrides(scenario: &mut Scenario, args: &CliArgs) {
    if let Some(rounds) = args.rounds {
        scenario.parameters.rounds = rounds;
    }

    if let Some(seed) = args.random_seed {
        scenario.random_seed = Some(seed);
    }

    if let Some(cash) = args.initial_cash {
        for participant in &mut scenario.participants {
            participant.initial_cash = cash;
        }
    }
}

pub fn print_help() {
    println!("\nMarket Runner - discrete-round double auction\n");
    println!("USAGE:");
    println!("    sim-market-run [COMMAND] [OPTIONS]\n");

    println!("COMMANDS:");
    println!("    run              Run a scenario (default)");
    println!("    list             List built-in scenarios");
    println!("    show             Print a scenario without running it\n");

    println!("SCENARIO OPTIONS:");
    println!("    --scenario <NAME>          Use a built-in scenario (default: exchange)");
    println!("    --scenario-file <FILE>     Load scenario from a JSON or YAML file");
    println!("    -r, --rounds <N>           Number of rounds to trade");
    println!("    --seed <N>                 Random seed for reproducible tie-breaking");
    println!("    --cash <N>                 Override initial cash for all participants\n");

    println!("OUTPUT OPTIONS:");
    println!("    -o, --output <FILE>        Write the event journal to FILE as JSON");
    println!("    -v, --verbose              Log every clearing (RUST_LOG overrides)");
    println!("    -q, --quiet                Only print the final summary");
    println!("    -h, --help                 Print help information\n");

    println!("EXAMPLES:");
    println!("    sim-market-run run --scenario exchange --rounds 50 --seed 7");
    println!("    sim-market-run show --scenario ties");
    println!("    sim-market-run run --scenario-file market.yaml -o events.json");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::create_standard_scenarios;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let args = parse_args_from(Vec::<String>::new()).unwrap();
        assert_eq!(args.command, Command::Run);
        assert_eq!(args.scenario_name, "exchange");
        assert!(args.rounds.is_none());
    }

    #[test]
    fn test_parse_options() {
        let args = parse_args_from([
            "show", "--scenario", "ties", "-r", "25", "--seed", "9", "--cash", "12.5", "-o", "out.json", "-v",
        ])
        .unwrap();
        assert_eq!(args.command, Command::Show);
        assert_eq!(args.scenario_name, "ties");
        assert_eq!(args.rounds, Some(25));
        assert_eq!(args.random_seed, Some(9));
        assert_eq!(args.initial_cash, Some(dec!(12.5)));
        assert_eq!(args.output_file, Some(PathBuf::from("out.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_unknown_command_and_flag() {
        assert!(parse_args_from(["trade-forever"]).is_err());
        assert!(parse_args_from(["run", "--bogus"]).is_err());
        assert!(parse_args_from(["run", "--rounds", "many"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut scenario = create_standard_scenarios().remove("barter").unwrap();
        let args = CliArgs {
            rounds: Some(3),
            random_seed: Some(5),
            initial_cash: Some(dec!(99)),
            ..CliArgs::default()
        };
        apply_overrides(&mut scenario, &args);
        assert_eq!(scenario.parameters.rounds, 3);
        assert_eq!(scenario.random_seed, Some(5));
        assert!(scenario.participants.iter().all(|p| p.initial_cash == dec!(99)));
    }
}
