//! Backup power simulator entry point: CLI wiring and logging setup.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use backup_power::config::ScenarioConfig;
use backup_power::io::export::export_csv;
use backup_power::runner::run_scenario;
use backup_power::settings::BrokerSettings;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
    settings_path: Option<String>,
    save_settings: Option<String>,
}

fn print_help() {
    eprintln!("backup-power: backup generator balancing simulator");
    eprintln!();
    eprintln!("Usage: backup-power [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export evaluation results to CSV");
    eprintln!("  --settings <path>        Load broker settings saved with --save-settings");
    eprintln!("  --save-settings <path>   Write the effective broker settings as TOML");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following a flag or exits with a usage error.
fn flag_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {what} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        telemetry_out: None,
        settings_path: None,
        save_settings: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(flag_value(&args, i, "--scenario", "path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(flag_value(&args, i, "--preset", "name"));
            }
            "--seed" => {
                i += 1;
                let raw = flag_value(&args, i, "--seed", "u64");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--telemetry-out" => {
                i += 1;
                cli.telemetry_out = Some(flag_value(&args, i, "--telemetry-out", "path"));
            }
            "--settings" => {
                i += 1;
                cli.settings_path = Some(flag_value(&args, i, "--settings", "path"));
            }
            "--save-settings" => {
                i += 1;
                cli.save_settings = Some(flag_value(&args, i, "--save-settings", "path"));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = parse_args();

    // --scenario, then --preset, then the baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    // saved settings replace the scenario's own [settings] table
    if let Some(ref path) = cli.settings_path {
        match BrokerSettings::load(Path::new(path)) {
            Ok(settings) => scenario.settings = settings,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let run = match run_scenario(&scenario) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for r in &run.results {
        println!("{r}");
    }
    println!("\n{}", run.kpi);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&run.results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }

    if let Some(ref path) = cli.save_settings {
        if let Err(e) = scenario.settings.clamped().save(Path::new(path)) {
            eprintln!("error: {e}");
            process::exit(1);
        }
        eprintln!("Settings written to {path}");
    }
}
