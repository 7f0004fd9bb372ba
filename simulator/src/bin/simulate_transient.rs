//! Simulate survey observations of a transient and save them to disk
//!
//! # Usage
//!
//! ```bash
//! # Fixed parameters against a survey cadence description
//! cargo run --release --bin simulate_transient -- \
//!     --model power_law --param log10_f0=0.5 --param alpha=1.2 --param beta=0.8 \
//!     --survey survey.json --explosion-time 59999 --seed 42 --name grb_demo
//!
//! # Parameters drawn from the model's default prior, user supplied pointings
//! cargo run --release --bin simulate_transient -- \
//!     --model bazin --prior --pointings pointings.csv --name sn_demo
//!
//! # A population of 100 prior draws
//! cargo run --release --bin simulate_transient -- \
//!     --model bazin --prior --population 100 --survey survey.json --seed 7 --name sn_pop
//! ```
//!
//! Results are written to `<output-dir>/simulated/<name>.csv` together with
//! `<name>_injection_parameters.json`.

use std::path::PathBuf;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{rng, RngCore, SeedableRng};
use transient_simulator::shared_args::{
    load_pointings, load_survey, parameters_from_args, parse_parameter, SharedSimulationArgs,
};
use transient_simulator::{
    default_prior, simulate, simulate_population, PointingSource, Prior, SimulationConfig,
    SimulationResult, SimulationStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "Transient Simulator",
    about = "Simulates noisy survey photometry of a transient light-curve model",
    long_about = None
)]
struct Args {
    /// Built-in model name (bazin, constant_magnitude, exponential_decay, power_law)
    #[arg(long)]
    model: String,

    /// Model parameter as name=value; may be repeated
    #[arg(long = "param", value_parser = parse_parameter)]
    params: Vec<(String, f64)>,

    /// Draw parameters from the model's default prior instead of --param
    #[arg(long, conflicts_with = "params")]
    prior: bool,

    /// Number of independent prior draws to simulate (requires --prior)
    #[arg(long, requires = "prior")]
    population: Option<usize>,

    /// Survey cadence description (JSON)
    #[arg(long, conflicts_with = "pointings", required_unless_present = "pointings")]
    survey: Option<PathBuf>,

    /// Pointing table (CSV with time,band,limiting_magnitude columns)
    #[arg(long)]
    pointings: Option<PathBuf>,

    /// Name the results are saved under
    #[arg(long, default_value = "simulated_transient")]
    name: String,

    #[command(flatten)]
    shared: SharedSimulationArgs,
}

fn summarize(name: &str, result: &SimulationResult) {
    println!(
        "{name}: {} observations, {} detections ({} model)",
        result.len(),
        result.num_detections(),
        result.model()
    );
    for (parameter, value) in result.parameters().iter() {
        println!("  {parameter:>16} = {value:.4}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let shared = &args.shared;

    let pointings: PointingSource = match (&args.survey, &args.pointings) {
        (Some(path), _) => load_survey(path, shared.debug)?.into(),
        (None, Some(path)) => load_pointings(path, shared.debug)?.into(),
        (None, None) => return Err("Either --survey or --pointings is required".into()),
    };

    let mut config = SimulationConfig::new(
        args.model.as_str(),
        parameters_from_args(&args.params),
        pointings,
    )
    .with_snr_threshold(shared.snr_threshold)
    .with_explosion_time(shared.explosion_time)
    .with_data_mode(shared.data_mode.to_data_mode());
    if let Some(end_time) = shared.end_time {
        config = config.with_end_time(end_time);
    }

    let store = SimulationStore::with_path(shared.output_dir.clone());
    let seed = shared.seed.unwrap_or_else(|| rng().next_u64());
    info!("Using seed {seed}");

    if let Some(count) = args.population {
        let prior = default_prior(&args.model)?;
        let results = simulate_population(&config, &prior, count, seed)?;
        for (i, result) in results.iter().enumerate() {
            let name = format!("{}_{i:04}", args.name);
            store.save(result, &name)?;
            if shared.debug {
                summarize(&name, result);
            }
        }
        let detected = results.iter().filter(|r| r.num_detections() > 0).count();
        println!(
            "Simulated {count} transients, {detected} with at least one detection, saved to {}",
            store.simulated_dir().display()
        );
        return Ok(());
    }

    let mut seeded = StdRng::seed_from_u64(seed);
    if args.prior {
        let prior = default_prior(&args.model)?;
        config = config.with_parameters(prior.sample(&mut seeded));
    }
    config = config.with_seed(seeded.next_u64());

    let result = simulate(&config)?;
    let (data_path, parameters_path) = store.save(&result, &args.name)?;

    summarize(&args.name, &result);
    println!("Observations: {}", data_path.display());
    println!("Parameters:   {}", parameters_path.display());

    Ok(())
}
