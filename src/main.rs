use log::LevelFilter;
use std::process;

use sim_market::cli::{self, CliArgs, Command};
use sim_market::metrics::MetricsCalculator;
use sim_market::scenario::{Scenario, ScenarioError, create_standard_scenarios};
use sim_market::simulation::Simulation;

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help();
            process::exit(2);
        }
    };

    init_logging(&args);

    let result = match args.command {
        Command::List => {
            list_scenarios();
            Ok(())
        }
        Command::Show => load_scenario(&args).map(|scenario| println!("{}", scenario)),
        Command::Run => load_scenario(&args).and_then(|scenario| run(scenario, &args)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn list_scenarios() {
    let scenarios = create_standard_scenarios();
    let mut names: Vec<_> = scenarios.keys().collect();
    names.sort();
    println!("Built-in scenarios:");
    for name in names {
        println!("    {:<12} {}", name, scenarios[name].description);
    }
}

fn load_scenario(args: &CliArgs) -> Result<Scenario, ScenarioError> {
    let mut scenario = match &args.scenario_file {
        Some(path) => Scenario::load_from_file(path)?,
        None => create_standard_scenarios()
            .remove(&args.scenario_name)
            .ok_or_else(|| ScenarioError::UnknownScenario(args.scenario_name.clone()))?,
    };
    cli::apply_overrides(&mut scenario, args);
    scenario.validate()?;
    Ok(scenario)
}

fn run(scenario: Scenario, args: &CliArgs) -> Result<(), ScenarioError> {
    if !args.quiet {
        println!("{}", scenario);
    }

    let mut sim = Simulation::new(scenario)?;
    let before = sim.totals();
    sim.run();
    let after = sim.totals();

    println!("\n=== Final Prices (round {}) ===", sim.market().round());
    let mut prices: Vec<_> = sim.market().prices().iter().collect();
    prices.sort();
    for (resource, price) in prices {
        println!("  {:<10} {}", resource, price);
    }

    println!("\n=== Participants ===");
    for config in &sim.scenario().participants {
        if let Some(trader) = sim.trader(&config.name) {
            let trader = trader.borrow();
            let mut holdings: Vec<_> = trader.inventory().iter().collect();
            holdings.sort();
            let holdings = holdings
                .iter()
                .map(|(r, u)| format!("{}:{}", r, u))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "  {:<10} cash {:>10}  value {:>10}  {}",
                config.name,
                trader.cash(),
                trader.value_at(sim.market()),
                holdings
            );
        }
    }

    println!("\n=== Conservation ===");
    println!("  cash   {} -> {}", before.cash, after.cash);
    for (resource, units) in &before.units {
        let now = after.units.get(resource).copied().unwrap_or_default();
        println!("  {:<6} {} -> {}", resource, units, now);
    }
    if before != after {
        log::error!("totals changed across the run");
    }

    let events = sim.events().get_events();
    if !args.quiet {
        let metrics = MetricsCalculator::calculate_market_metrics(events);
        println!("\n=== Metrics ===");
        for (resource, m) in &metrics.resources {
            println!(
                "  {:<10} trades {:>5}  volume {:>10}  vwap {}",
                resource,
                m.trades,
                m.volume,
                m.vwap.map_or_else(|| "-".to_string(), |p| p.round_dp(4).to_string())
            );
        }
        println!("  turnover {}", metrics.total_turnover);
    }

    if let Some(path) = &args.output_file {
        sim.events().save_to_file(path)?;
        println!("\nEvents saved to {}", path.display());
    }

    Ok(())
}
