//! profilectl: isolated local profiles over a single live store.
//!
//! One process hosts many named profiles. Each profile owns a SQLite store
//! under `<root>/Profiles/<id>/`, an optional password in the secret vault
//! and a namespace in the shared preference file. Exactly one profile's
//! store is attached at a time; the [`core::coordinator::Coordinator`]
//! switches between them at runtime.
//!
//! # Architecture
//!
//! ## The coordinator
//!
//! Every attach and detach goes through the coordinator, which:
//! - announces destructive changes (`WillSwitch`, `WillDelete`) before they happen
//! - commits them on a single-threaded FIFO queue, after subscriber work
//! - bumps the switch token last, so observers always see a consistent store
//!
//! ## Subsystems (plugins)
//!
//! - `registry`: enumerate profiles on disk, pick the starting profile
//! - `secrets`: one password per profile in a protected vault
//! - `prefs`: global and per-profile preferences
//! - `archive`: soft-delete by moving a profile folder aside
//! - `purge`: hard-delete a profile's store
//!
//! # Examples
//!
//! ```bash
//! profilectl create "Alex"
//! profilectl create "Sam"
//! profilectl switch Alex
//! profilectl archive Sam
//! profilectl list --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: primitives and the lifecycle coordinator
//! - [`plugins`]: stateless subsystems the coordinator calls

mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Cli, Command, OutputFormat, PasswordCommand, PrefCommand};
use crate::core::coordinator::Coordinator;
use crate::core::db::StorageBackend;
use crate::core::error::ProfileError;
use crate::core::profile::ProfileInfo;
use crate::core::{config, error};
use crate::plugins::archive;
use crate::plugins::secrets::SecretVault;

use clap::Parser;
use colored::Colorize;
use serde_json::{Value, json};

/// Resolves a CLI profile argument: exact id first, then a unique
/// case-insensitive display-name match.
fn resolve_profile<B: StorageBackend, V: SecretVault>(
    coordinator: &Coordinator<B, V>,
    needle: &str,
) -> Result<ProfileInfo, ProfileError> {
    if let Ok(found) = coordinator.find_profile(needle) {
        return Ok(found);
    }
    let matches: Vec<&ProfileInfo> = coordinator
        .list_profiles()
        .iter()
        .filter(|p| p.display_name.eq_ignore_ascii_case(needle))
        .collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(ProfileError::NotFound(format!("profile {:?}", needle))),
        many => Err(ProfileError::ValidationError(format!(
            "{} profiles are named {:?}; use the id instead",
            many.len(),
            needle
        ))),
    }
}

fn profile_json(profile: &ProfileInfo, current: &ProfileInfo) -> Value {
    json!({
        "id": profile.id,
        "displayName": profile.display_name,
        "current": profile.id == current.id,
    })
}

fn print_json(value: &Value) -> Result<(), error::ProfileError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_profile_line(profile: &ProfileInfo, is_current: bool) {
    if is_current {
        println!(
            "{} {}  {}",
            "*".green().bold(),
            profile.display_name.bold(),
            profile.id.dimmed()
        );
    } else {
        println!("  {}  {}", profile.display_name, profile.id.dimmed());
    }
}

fn report_current<B: StorageBackend, V: SecretVault>(
    coordinator: &Coordinator<B, V>,
    format: OutputFormat,
    verb: &str,
) -> Result<(), error::ProfileError> {
    let current = coordinator.current_profile();
    match format {
        OutputFormat::Json => print_json(&json!({
            "status": "ok",
            "action": verb,
            "current": profile_json(current, current),
            "token": coordinator.switch_token().value(),
        })),
        OutputFormat::Text => {
            println!(
                "{} {} ({})",
                verb.green(),
                current.display_name.bold(),
                current.id.dimmed()
            );
            Ok(())
        }
    }
}

pub fn run() -> Result<(), error::ProfileError> {
    let cli = Cli::parse();
    let root = config::resolve_root(cli.root)?;
    let format = cli.format;

    let mut coordinator = Coordinator::open(&root)?;
    coordinator.bootstrap()?;

    match cli.command {
        Command::List => {
            let current = coordinator.current_profile().clone();
            match format {
                OutputFormat::Json => print_json(&json!({
                    "root": root.display().to_string(),
                    "profiles": coordinator
                        .list_profiles()
                        .iter()
                        .map(|p| profile_json(p, &current))
                        .collect::<Vec<_>>(),
                }))?,
                OutputFormat::Text => {
                    if !coordinator.has_profiles() {
                        println!("No profiles yet. Create one with `profilectl create <name>`.");
                    }
                    for profile in coordinator.list_profiles() {
                        print_profile_line(profile, profile.id == current.id);
                    }
                }
            }
        }
        Command::Current => {
            let current = coordinator.current_profile().clone();
            let persisted = coordinator.has_profiles()
                && coordinator.find_profile(&current.id).is_ok();
            match format {
                OutputFormat::Json => print_json(&json!({
                    "current": profile_json(&current, &current),
                    "persisted": persisted,
                }))?,
                OutputFormat::Text => {
                    print_profile_line(&current, true);
                    if !persisted {
                        println!("  {}", "(no profile on disk yet)".yellow());
                    }
                }
            }
        }
        Command::Create { name } => {
            coordinator.create_profile(&name)?;
            report_current(&coordinator, format, "created")?;
        }
        Command::Switch { profile } => {
            let target = resolve_profile(&coordinator, &profile)?;
            coordinator.switch_to(&target)?;
            report_current(&coordinator, format, "switched to")?;
        }
        Command::Rename { name } => {
            coordinator.rename_current(&name)?;
            report_current(&coordinator, format, "renamed to")?;
        }
        Command::Archive { profile } => {
            let target = resolve_profile(&coordinator, &profile)?;
            coordinator.archive_profile(&target)?;
            let moved_to = coordinator
                .last_archive()
                .map(|p| p.display().to_string());
            match format {
                OutputFormat::Json => print_json(&json!({
                    "status": "ok",
                    "archived": target.id,
                    "path": moved_to,
                    "current": profile_json(coordinator.current_profile(), coordinator.current_profile()),
                }))?,
                OutputFormat::Text => {
                    println!("{} {}", "archived".green(), target.display_name.bold());
                    if let Some(path) = moved_to {
                        println!("  -> {}", path);
                    }
                }
            }
        }
        Command::Delete { profile, yes } => {
            let target = resolve_profile(&coordinator, &profile)?;
            if !yes {
                return Err(ProfileError::ValidationError(format!(
                    "refusing to delete {} ({}) without --yes",
                    target.display_name, target.id
                )));
            }
            coordinator.delete_profile(&target)?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "status": "ok",
                    "deleted": target.id,
                    "current": profile_json(coordinator.current_profile(), coordinator.current_profile()),
                }))?,
                OutputFormat::Text => {
                    println!("{} {}", "deleted".red(), target.display_name.bold());
                }
            }
        }
        Command::Archived => {
            let archived = archive::list_archived(coordinator.layout())?;
            match format {
                OutputFormat::Json => print_json(&serde_json::to_value(&archived)?)?,
                OutputFormat::Text => {
                    if archived.is_empty() {
                        println!("No archived profiles.");
                    }
                    for entry in archived {
                        let name = entry
                            .metadata
                            .map(|m| m.display_name)
                            .unwrap_or_else(|| "?".to_string());
                        println!("  {}  {}", name.bold(), entry.folder.dimmed());
                    }
                }
            }
        }
        Command::Password(password_cli) => {
            let current = coordinator.current_profile().clone();
            coordinator.find_profile(&current.id)?;
            let (action, outcome) = match password_cli.command {
                PasswordCommand::Set { password } => {
                    coordinator.set_password(&current, &password)?;
                    ("set", true)
                }
                PasswordCommand::Verify { password } => {
                    ("verify", coordinator.verify_password(&current, &password)?)
                }
                PasswordCommand::Clear => {
                    coordinator.clear_password(&current)?;
                    ("clear", true)
                }
                PasswordCommand::Status => ("status", coordinator.password_exists(&current)?),
            };
            match format {
                OutputFormat::Json => print_json(&json!({
                    "profile": current.id,
                    "action": action,
                    "result": outcome,
                }))?,
                OutputFormat::Text => {
                    let text = match (action, outcome) {
                        ("verify", true) => "password matches".green(),
                        ("verify", false) => "password does not match".red(),
                        ("status", true) => "password is set".green(),
                        ("status", false) => "no password set".yellow(),
                        ("set", _) => "password set".green(),
                        _ => "password cleared".green(),
                    };
                    println!("{}", text);
                }
            }
            if action == "verify" && !outcome {
                std::process::exit(2);
            }
        }
        Command::Pref(pref_cli) => match pref_cli.command {
            PrefCommand::Get { key, global } => {
                let value = if global {
                    coordinator.preferences().get(&key).cloned()
                } else {
                    coordinator.profile_pref(&key).cloned()
                };
                match format {
                    OutputFormat::Json => print_json(&json!({ "key": key, "value": value }))?,
                    OutputFormat::Text => match value {
                        Some(Value::String(s)) => println!("{}", s),
                        Some(other) => println!("{}", other),
                        None => println!("{}", "(unset)".dimmed()),
                    },
                }
            }
            PrefCommand::Set { key, value, global } => {
                let parsed = serde_json::from_str(&value).unwrap_or(Value::String(value));
                if global {
                    coordinator.set_global_pref(&key, parsed)?;
                } else {
                    coordinator.set_profile_pref(&key, parsed)?;
                }
                if format == OutputFormat::Json {
                    print_json(&json!({ "status": "ok", "key": key }))?;
                }
            }
            PrefCommand::Unset { key, global } => {
                let removed = if global {
                    coordinator.remove_global_pref(&key)?
                } else {
                    coordinator.remove_profile_pref(&key)?
                };
                if format == OutputFormat::Json {
                    print_json(&json!({ "status": "ok", "key": key, "removed": removed }))?;
                }
            }
        },
    }
    Ok(())
}
