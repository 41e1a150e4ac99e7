use anyhow::{anyhow, Result};
use clap::{arg, ArgAction, Command};
use log::info;
use oc_engine::{Dynamics, OptimalControl};
use oc_models::{resolve_target, AnyModel};
use oc_structs::core::{OptimizationOutput, RunSettings, SimulationOutput};
use oc_utils::{compress_obj, dejsonify, from_array3, jsonify, to_array2};
use serde::Serialize;
use std::{fs, path::PathBuf};

fn cli() -> Command {
    Command::new("oc-runtime")
        .about("Computes optimal control signals for network models")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("optimize")
                .about("Optimizes the control of a model towards a target")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--iterations [ITERATIONS] "Overrides max_iterations of the settings")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the output data will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the output data will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Simulates a model under its initial control and reports the cost")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the output data will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("optimize", sub_m)) => optimize(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            sub_m.get_one::<usize>("iterations").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_one::<bool>("compress").unwrap().clone(),
        ),
        Some(("simulate", sub_m)) => simulate(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            sub_m.get_one::<PathBuf>("output").cloned(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

pub fn optimize(
    settings: String,
    iterations: Option<usize>,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let settings = load_settings(&settings);
    let mut oc = build_problem(&settings)?;
    let max_iterations = iterations.unwrap_or(settings.max_iterations);
    info!(
        "Optimizing '{}' for at most {} iterations",
        settings.model.name(),
        max_iterations
    );
    let outcome = oc.optimize(max_iterations)?;

    let history = oc.history();
    let output_data = OptimizationOutput {
        model: settings.model.name().to_string(),
        control: from_array3(oc.control().view()),
        cost_history: history.cost_history.clone(),
        step_sizes_history: history.step_sizes_history.clone(),
        step_sizes_loops_history: history.step_sizes_loops_history.clone(),
        termination: outcome.termination,
        iterations: outcome.iterations,
        final_cost: outcome.final_cost,
        validation_cost: outcome.validation_cost,
    };
    write_output(&output_data, output_file, compress)
}

pub fn simulate(settings: String, output_file: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(&settings);
    let mut oc = build_problem(&settings)?;
    oc.simulate_forward();
    let output_data = SimulationOutput {
        model: settings.model.name().to_string(),
        trajectory: from_array3(oc.system().trajectory()),
        cost: oc.compute_total_cost(),
    };
    write_output(&output_data, output_file, false)
}

fn build_problem(settings: &RunSettings) -> Result<OptimalControl<AnyModel>> {
    let mut model = AnyModel::from_config(
        &settings.model,
        &settings.simulation,
        settings.network.as_ref(),
    )?;
    let target = resolve_target(&mut model, &settings.target)?;
    let control_mask = settings.control_mask.as_ref().map(to_array2).transpose()?;
    let cost_mask = settings.cost_mask.as_ref().map(to_array2).transpose()?;
    Ok(OptimalControl::new(
        model,
        target,
        settings.optimizer.clone(),
        control_mask,
        cost_mask,
    )?)
}

fn write_output<T: Serialize>(
    output_data: &T,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    if let Some(path) = output_file {
        if compress {
            fs::write(&path, compress_obj(output_data)?)?;
        } else {
            fs::write(&path, jsonify(output_data)?)?;
        }
        println!("output_data written to: {:?}", path);
    } else {
        println!("{}", jsonify(output_data)?);
    }
    Ok(())
}

fn load_settings(settings: &str) -> RunSettings {
    let settings = if settings.ends_with(".json") {
        fs::read_to_string(settings).unwrap_or_else(|_| {
            eprintln!("Failed to read settings file: {}", settings);
            std::process::exit(1);
        })
    } else {
        settings.to_string()
    };

    dejsonify::<RunSettings>(&settings).unwrap_or_else(|e| {
        eprintln!("Failed to parse settings: {}", e);
        std::process::exit(1);
    })
}
