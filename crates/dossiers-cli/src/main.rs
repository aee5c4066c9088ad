// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use dossiers_app::Session;
use dossiers_data::{
    DatasetCache, FileMissionData, FileSource, LoadError, MissionDataProvider, StaticMissionData,
};
use dossiers_tui::UiOptions;
use runtime::DashboardRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DOSSIERS_LOG";
const LOG_FILE_NAME: &str = "dossiers.log";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `dossiers --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let data_path = config.data_path(options.data_path.as_deref())?;
    if options.print_data_path {
        println!("{}", data_path.display());
        return Ok(());
    }

    init_logging(options.check_only)?;

    let range = LoadError::checked_range(config.min_year(), config.max_year())?;
    let cache = DatasetCache::new(FileSource::new(&data_path), range).with_ttl(config.cache_ttl()?);
    let dataset = cache.get().with_context(|| {
        format!(
            "load dataset {} -- if this path is wrong, pass --data, set [data].path, or set DOSSIERS_DATA_PATH",
            data_path.display()
        )
    })?;

    let missions: Box<dyn MissionDataProvider> = match config.mission_snapshot_path() {
        Some(path) => Box::new(FileMissionData::new(path)),
        None => Box::new(StaticMissionData),
    };

    if options.check_only {
        let snapshot = missions.mission_snapshot().with_context(|| {
            format!(
                "load mission figures from {}; fix or remove [missions].snapshot_path",
                missions.describe()
            )
        })?;
        let summary = dataset.summary();
        let loaded_at = dataset
            .loaded_at()
            .format(&Rfc3339)
            .context("format dataset load time")?;
        println!("dataset    {}", data_path.display());
        println!(
            "years      {}..={}",
            summary.year_range.min(),
            summary.year_range.max()
        );
        println!("countries  {}", summary.countries);
        println!("records    {}", summary.records);
        println!("missing    {}", summary.missing_values);
        println!("sha256     {}", dataset.checksum());
        println!("loaded at  {loaded_at}");
        println!(
            "missions   {} ({} planned, {} months)",
            missions.describe(),
            snapshot.counters.planned,
            snapshot.monthly.len()
        );
        return Ok(());
    }
    drop(dataset);

    let ui_options = UiOptions {
        status_clear: config.status_clear()?,
    };
    let mut session = Session::default();
    tracing::info!(
        data = %data_path.display(),
        missions = %missions.describe(),
        "starting dashboard"
    );
    let mut runtime = DashboardRuntime::new(&cache, missions);
    dossiers_tui::run_app(&mut session, &mut runtime, ui_options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogTarget {
    Off,
    Stderr,
    File,
}

/// The TUI owns the terminal, so interactive runs log to a file. `--check`
/// has no screen to protect and logs to stderr. `DOSSIERS_LOG=off` skips
/// the subscriber and never touches the log directory.
fn log_target(directive: Option<&str>, to_stderr: bool) -> LogTarget {
    if directive.is_some_and(|value| value.trim().eq_ignore_ascii_case("off")) {
        return LogTarget::Off;
    }
    if to_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File
    }
}

fn init_logging(to_stderr: bool) -> Result<()> {
    let directive = env::var(LOG_ENV).ok();
    let target = log_target(directive.as_deref(), to_stderr);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File => {
            let path = log_file_path()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| {
                    format!("open log file {}; set {LOG_ENV}=off to skip it", path.display())
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    installed.map_err(|error| anyhow!("install log subscriber: {error}"))
}

fn log_file_path() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory for the log file; set {LOG_ENV}=off to skip it")
    })?;
    let log_dir = cache_root.join(dossiers_data::APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| {
            format!(
                "create log directory {}; set {LOG_ENV}=off to skip it",
                log_dir.display()
            )
        })?;
    Ok(log_dir.join(LOG_FILE_NAME))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    data_path: Option<PathBuf>,
    print_config_path: bool,
    print_data_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        data_path: None,
        print_config_path: false,
        print_data_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--data" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--data requires a CSV file path"))?;
                dossiers_data::validate_data_path(value.as_ref())?;
                options.data_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-data-path" => {
                options.print_data_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("dossiers: tableau de bord de suivi des dossiers");
    println!("  --config <path>          Use a specific config path");
    println!("  --data <path>            Read the GDP CSV from this path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-data-path        Print resolved dataset path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Load config + dataset + mission figures, print a summary");
    println!("  --help                   Show this help");
    println!();
    println!("Environment: DOSSIERS_CONFIG_PATH, DOSSIERS_DATA_PATH, {LOG_ENV} (log filter)");
}
