use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use parcel_reconciler::config::{ConfigKey, ConfigStore, Settings};
use parcel_reconciler::logging::{LogOptions, LoggingContext};
use parcel_reconciler::prompt::{resolve_separator, StdinPrompt};
use parcel_reconciler::{run, OverwritePolicy, RunOutcome};
use tracing::{error, info, warn};

// Settings that can be overridden from the command line
const OVERRIDES: [(ConfigKey, &str); 10] = [
    (ConfigKey::InputCsv, "Path to the input CSV file"),
    (ConfigKey::InputGeojson, "Path to the input GeoJSON file"),
    (ConfigKey::OutputGeojson, "Path to the output GeoJSON file"),
    (ConfigKey::InconsistenciesCsv, "CSV listing owner parcels missing from the GeoJSON"),
    (ConfigKey::InconsistenciesGeojson, "CSV listing GeoJSON parcels without owner data"),
    (ConfigKey::GroupedCsv, "Path of the grouped owners CSV"),
    (ConfigKey::IdCsvColumn, "Column with the parcel ID in the CSV"),
    (ConfigKey::PropName, "Name of the property for the list of owners"),
    (ConfigKey::IndividualPropName, "Base name for individual owner properties (empty to disable)"),
    (ConfigKey::CsvSeparator, "CSV separator"),
];

fn cli() -> Command {
    let mut command = Command::new("Parcel Reconciler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Merges cadastral owner lists into parcel GeoJSON and reports unmatched parcels")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .num_args(1)
                .default_value("config.toml")
                .help("Path to the config file"),
        )
        .arg(
            Arg::new("skip-malformed")
                .long("skip-malformed")
                .action(ArgAction::SetTrue)
                .help("Skip rows with a malformed parcel id instead of aborting"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Overwrite the output GeoJSON without asking"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .num_args(1)
                .default_value("outputs/project.log")
                .help("Log file, in addition to the console"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More detailed logging (-v debug, -vv trace)"),
        );

    for (key, help) in OVERRIDES {
        command = command.arg(Arg::new(key.name()).long(key.name()).num_args(1).help(help));
    }
    command
}

fn load_store(matches: &ArgMatches) -> parcel_reconciler::Result<ConfigStore> {
    let config_path = matches
        .get_one::<String>("config")
        .map_or(Path::new("config.toml"), Path::new);

    let mut store = if config_path.exists() {
        ConfigStore::load(config_path)?
    } else {
        warn!("Config file {} not found, using defaults", config_path.display());
        ConfigStore::in_memory(Settings::default())
    };

    for (key, _) in OVERRIDES {
        if let Some(value) = matches.get_one::<String>(key.name()) {
            store.set(key, value)?;
        }
    }
    if matches.get_flag("skip-malformed") {
        store.set(ConfigKey::SkipMalformed, "true")?;
    }
    info!("Command line arguments processed.");
    Ok(store)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let log_options = LogOptions {
        log_file: matches.get_one::<String>("log-file").map(PathBuf::from),
        verbosity: matches.get_count("verbose"),
    };
    let logging = match LoggingContext::init(&log_options) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = logging.log_file() {
        info!("Logging to {}", path.display());
    }

    let mut store = match load_store(&matches) {
        Ok(store) => store,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut prompt = StdinPrompt;
    let input_csv = store.settings().paths.input_csv.clone();
    let separator = store.get(ConfigKey::CsvSeparator);
    match resolve_separator(&input_csv, &separator, &mut prompt) {
        Ok(resolved) if resolved != separator => {
            if let Err(e) = store.set(ConfigKey::CsvSeparator, &resolved) {
                error!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Ok(_) => {}
        Err(e) => {
            error!("Configuration error or invalid CSV separator: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let overwrite = if matches.get_flag("yes") {
        OverwritePolicy::AssumeYes
    } else {
        OverwritePolicy::Ask
    };

    match run(store.settings(), overwrite, &mut prompt) {
        Ok(RunOutcome::Completed(summary)) => {
            println!(
                "Processed {} of {} features ({} parcels from {} CSV rows)",
                summary.processed, summary.features, summary.parcels, summary.csv_rows
            );
            println!("Output written to {}", summary.output_geojson.display());
            for path in &summary.inconsistency_files {
                println!("Inconsistencies written to {}", path.display());
            }
            if !summary.skipped.is_empty() {
                println!("Skipped {} rows with malformed parcel ids", summary.skipped.len());
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) => {
            println!("Operation cancelled, no output written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error during processing: {}", e);
            ExitCode::FAILURE
        }
    }
}
