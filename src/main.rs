//! PrimePass settings CLI
//!
//! Resolves the active settings profile once, then validates, prints or
//! compares it. Any resolution error exits non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use primepass_settings::cli::diff::{DiffArgs, DiffFormat};
use primepass_settings::cli::{CheckArgs, Cli, Command, RoutesArgs, ScheduleArgs, ShowArgs};
use primepass_settings::config::{
    Bindings, Profile, ResolveOptions, ResolvedSettings, SettingsLoader,
};
use primepass_settings::diff::diff_profiles;
use primepass_settings::error::{ConfigError, Diagnostic};
use primepass_settings::format::{OutputFormat, format_routes_text, format_schedule_text};
use primepass_settings::logging;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;
use tracing::{Dispatch, debug, info};

/// Marker file container runtimes create at the filesystem root.
const CONTAINER_MARKER: &str = "/.dockerenv";

/// Run `f` under the bootstrap dispatcher, if logging is on.
fn with_bootstrap<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Check(CheckArgs::default()));

    let bootstrap = logging::bootstrap(&cli.log, cli.verbose)?;

    let env = Bindings::from_process_with_env_file(&cli.env_file)
        .with_context(|| format!("Failed to load bindings from {}", cli.env_file.display()))?;
    let in_container = Path::new(CONTAINER_MARKER).exists();
    let options = ResolveOptions::default()
        .with_base_dir(&cli.base_dir)
        .testing(cli.testing)
        .in_container(in_container);
    let loader = SettingsLoader::new(env).with_options(options);

    if let Command::Diff(args) = &command {
        let (left, right) = with_bootstrap(bootstrap.as_ref(), || {
            Ok::<_, ConfigError>((
                loader.load_profile(Profile::Development)?,
                loader.load_profile(Profile::Production)?,
            ))
        })
        .context("Failed to resolve both settings profiles")?;
        if let Some(dispatch) = bootstrap {
            tracing::dispatcher::set_global_default(dispatch)
                .context("Failed to install global log subscriber")?;
        }
        return run_diff(args, &left, &right);
    }

    let outcome = with_bootstrap(bootstrap.as_ref(), || {
        debug!(in_container, "Resolving settings");
        loader.load(cli.settings.as_deref())
    });
    let resolved = match (outcome, &command) {
        (Ok(resolved), _) => resolved,
        (Err(err), Command::Check(CheckArgs { json: true })) => {
            println!("{}", serde_json::to_string_pretty(&Diagnostic::from(&err))?);
            return Ok(ExitCode::FAILURE);
        }
        (Err(err), _) => return Err(err).context("Failed to resolve settings"),
    };

    logging::init(&cli.log, cli.verbose, &resolved.settings().logging)?;
    info!(profile = %resolved.profile(), "Settings ready");

    match command {
        Command::Check(args) => run_check(&args, &resolved),
        Command::Show(args) => run_show(&args, &resolved),
        Command::Routes(args) => run_routes(&args, &resolved),
        Command::Schedule(args) => run_schedule(&args, &resolved),
        Command::Diff(_) => Ok(ExitCode::SUCCESS),
    }
}

fn run_check(args: &CheckArgs, resolved: &ResolvedSettings) -> Result<ExitCode> {
    let plan = resolved.error_reporting();
    let routes = resolved.routes();
    let schedule = resolved.schedule();

    if args.json {
        let report = serde_json::json!({
            "ok": true,
            "profile": resolved.profile(),
            "debug": resolved.settings().core.debug,
            "routes": routes.entries().len(),
            "periodic_jobs": schedule.len(),
            "error_reporting": plan,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}: ok (debug={}, {} routes, {} periodic jobs, error reporting {})",
            resolved.profile(),
            resolved.settings().core.debug,
            routes.entries().len(),
            schedule.len(),
            if plan.is_some() { "on" } else { "off" }
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_show(args: &ShowArgs, resolved: &ResolvedSettings) -> Result<ExitCode> {
    let mut value = if args.reveal {
        resolved.settings().to_value()?
    } else {
        resolved.settings().to_redacted_value()?
    };
    if let (Some(sections), Value::Object(map)) = (&args.sections, &mut value) {
        map.retain(|key, _| sections.contains(key));
    }
    print!("{}", args.format.render(&value)?);
    Ok(ExitCode::SUCCESS)
}

fn run_routes(args: &RoutesArgs, resolved: &ResolvedSettings) -> Result<ExitCode> {
    let table = resolved.routes();

    if let Some(path) = &args.resolve {
        return match table.resolve(path) {
            Some(entry) if args.json => {
                print!("{}", OutputFormat::Json.render(entry)?);
                Ok(ExitCode::SUCCESS)
            }
            Some(entry) => {
                println!("{} -> {}", entry.pattern, entry.handler);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("No route matches '{}'", path);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    if args.json {
        print!("{}", OutputFormat::Json.render(table.entries())?);
    } else {
        print!("{}", format_routes_text(table));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_schedule(args: &ScheduleArgs, resolved: &ResolvedSettings) -> Result<ExitCode> {
    let table = resolved.schedule();

    if let Some(registered) = &args.registered {
        let registry: BTreeSet<String> = registered.iter().cloned().collect();
        let ready = table.dispatchable(&registry);
        info!(
            dispatchable = ready.len(),
            declared = table.len(),
            "Checked periodic jobs against task registry"
        );
    }

    if args.json {
        print!("{}", OutputFormat::Json.render(table)?);
    } else {
        print!("{}", format_schedule_text(table, resolved.task_router()));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_diff(
    args: &DiffArgs,
    left: &ResolvedSettings,
    right: &ResolvedSettings,
) -> Result<ExitCode> {
    let mut diff = diff_profiles(left, right, args.reveal)?;
    diff.changes
        .retain(|change| args.should_include_section(change.section()));

    match args.format {
        DiffFormat::Text => print!("{}", diff),
        DiffFormat::Json => print!("{}", OutputFormat::Json.render(&diff)?),
        DiffFormat::Summary => println!("{}", diff.summary()),
    }
    Ok(ExitCode::SUCCESS)
}
