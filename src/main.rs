use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import our library components
use poser::{
    application::cli::{Args, Command, ProfileCommand},
    application::{resolve_adapter, AgentRotationHooks, SelectionSource},
    config::AppConfig,
    domain::entities::{next_profile_name, pretty_or_raw, select_default_adapter, Adapter, Identifier, ProfileUpdate},
    domain::ports::agent::{AdapterConfigAgent, RestoreReport, SetReport},
    domain::ports::notification::{StatusSink, UserNotification},
    domain::ports::repository::ProfileStore,
    domain::services::{minutes_to_duration, RotationOptions, RotationScheduler},
    infrastructure::factories::{create_container_with_config, DependencyContainer, FactoryConfigBuilder},
    PoserError, Result,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_tracing(args.log_level.as_deref().unwrap_or(&config.log_level));
    if let Some(e) = config_error {
        warn!(error = %e, "using default configuration");
    }

    let factory_config = FactoryConfigBuilder::from_app_config(&config)
        .assume_yes(args.yes || args.json)
        .build();
    let mut container = create_container_with_config(factory_config);

    match run(&args, &config, &mut container).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, retryable = e.is_retryable(), "command failed");
            if args.json {
                println!("{}", json!({ "ok": false, "error": e.to_string() }));
            } else {
                let _ = container.user_notification().show_error(&e.to_string()).await;
            }
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over the flag/config level; logs go to stderr.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

async fn run(args: &Args, config: &AppConfig, container: &mut DependencyContainer) -> Result<()> {
    match &args.command {
        Command::List => handle_list_command(container, args).await,
        Command::Show => handle_show_command(container, args, config).await,
        Command::Random => handle_random_command(args),
        Command::Set { mac } => {
            let requested = Identifier::normalize(mac)?;
            handle_set_command(container, args, config, &requested).await
        }
        Command::Restore => handle_restore_command(container, args, config).await,
        Command::Rotate { interval, no_apply } => {
            let mut options = config.rotation_options();
            if let Some(interval) = interval {
                options.interval = interval.clone();
            }
            options.auto_apply &= !no_apply;
            handle_rotate_command(container, args, config, options).await
        }
        Command::Profile(command) => handle_profile_command(container, args, config, command).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve the target adapter, telling the user when it was guessed.
async fn select_adapter(container: &mut DependencyContainer, args: &Args, config: &AppConfig) -> Result<Adapter> {
    let agent = container.adapter_config_agent();
    let (adapter, source) =
        resolve_adapter(agent.as_ref(), args.adapter.as_deref(), config.default_adapter.as_deref()).await?;
    debug!(adapter = %adapter.name, ?source, "adapter selected");

    if source == SelectionSource::Heuristic && !args.json {
        container
            .user_notification()
            .show_info(&format!("Using {} (pass --adapter to choose another)", adapter.name))
            .await?;
    }
    Ok(adapter)
}

// Handle listing adapters
async fn handle_list_command(container: &mut DependencyContainer, args: &Args) -> Result<()> {
    let agent = container.adapter_config_agent();
    let adapters = agent.list_adapters().await?;
    let default_name = select_default_adapter(&adapters).map(|a| a.name.clone());

    if args.json {
        let rows: Vec<_> = adapters
            .iter()
            .map(|a| {
                let is_default = Some(&a.name) == default_name.as_ref();
                json!({
                    "name": a.name,
                    "description": a.description,
                    "status": a.status,
                    "mac": a.identifier,
                    "guid": a.correlation_id,
                    "default": is_default,
                })
            })
            .collect();
        return print_json(&rows);
    }

    let notifier = container.user_notification();
    if adapters.is_empty() {
        notifier.show_warning("No network adapters reported").await?;
        return Ok(());
    }

    println!("{}", "=".repeat(72));
    for adapter in &adapters {
        let marker = if Some(&adapter.name) == default_name.as_ref() { "*" } else { " " };
        println!(
            "{} {:<24} {:<14} {:<18} {}",
            marker,
            adapter.name,
            adapter.status,
            pretty_or_raw(&adapter.identifier),
            adapter.description
        );
    }
    println!("{}", "=".repeat(72));
    notifier.show_info("* marks the adapter used when --adapter is omitted").await?;

    Ok(())
}

// Handle showing the selected adapter's identifier
async fn handle_show_command(container: &mut DependencyContainer, args: &Args, config: &AppConfig) -> Result<()> {
    let agent = container.adapter_config_agent();
    let adapter = select_adapter(container, args, config).await?;
    let current = agent.get_identifier(&adapter.name).await?;

    if args.json {
        return print_json(&json!({ "ok": true, "adapter": adapter.name, "current": current.agent_form() }));
    }

    container
        .user_notification()
        .show_info(&format!("{}: {}", adapter.name, current))
        .await
}

fn handle_random_command(args: &Args) -> Result<()> {
    let mac = Identifier::generate();
    if args.json {
        print_json(&json!({ "mac": mac.pretty() }))
    } else {
        println!("{}", mac);
        Ok(())
    }
}

// Handle applying an identifier
async fn handle_set_command(
    container: &mut DependencyContainer,
    args: &Args,
    config: &AppConfig,
    requested: &Identifier,
) -> Result<()> {
    let notifier = container.user_notification();
    let agent = container.adapter_config_agent();
    let adapter = select_adapter(container, args, config).await?;

    let confirmed = notifier
        .ask_confirmation(&format!(
            "Apply {} to {}? The adapter will briefly disconnect",
            requested, adapter.name
        ))
        .await?;
    if !confirmed {
        notifier.show_info("Cancelled").await?;
        return Ok(());
    }

    if !args.json {
        notifier
            .show_info(&format!("Applying {} to {}...", requested, adapter.name))
            .await?;
    }
    let outcome = agent.set_identifier(&adapter.name, requested).await?;

    if args.json {
        return print_json(&SetReport::from(&outcome));
    }

    if outcome.is_mismatch() {
        notifier
            .show_warning(&format!(
                "Requested {} but {} reports {}; the driver may not honor overrides",
                outcome.requested, adapter.name, outcome.current
            ))
            .await?;
    } else {
        notifier
            .show_success(&format!("{} now uses {} ({})", adapter.name, outcome.current, outcome.method))
            .await?;
    }
    Ok(())
}

// Handle restoring the hardware identifier
async fn handle_restore_command(container: &mut DependencyContainer, args: &Args, config: &AppConfig) -> Result<()> {
    let notifier = container.user_notification();
    let agent = container.adapter_config_agent();
    let adapter = select_adapter(container, args, config).await?;

    let confirmed = notifier
        .ask_confirmation(&format!(
            "Restore the hardware MAC on {}? The adapter will briefly disconnect",
            adapter.name
        ))
        .await?;
    if !confirmed {
        notifier.show_info("Cancelled").await?;
        return Ok(());
    }

    let outcome = agent.restore_identifier(&adapter.name).await?;

    if args.json {
        return print_json(&RestoreReport::from(&outcome));
    }
    notifier
        .show_success(&format!("{} restored to {}", adapter.name, outcome.current))
        .await
}

// Handle rotation until Ctrl-C
async fn handle_rotate_command(
    container: &mut DependencyContainer,
    args: &Args,
    config: &AppConfig,
    options: RotationOptions,
) -> Result<()> {
    let notifier = container.user_notification();
    let agent = container.adapter_config_agent();
    let sink = container.status_sink();

    // without auto-apply nothing touches the adapter
    let adapter_name = if options.auto_apply {
        let adapter = select_adapter(container, args, config).await?;

        let confirmed = notifier
            .ask_confirmation(&format!(
                "Rotate the MAC of {} every {} minute(s)? The adapter disconnects briefly on each change",
                adapter.name,
                minutes_to_duration(&options.interval).as_secs() / 60
            ))
            .await?;
        if !confirmed {
            notifier.show_info("Cancelled").await?;
            return Ok(());
        }
        adapter.name
    } else {
        String::new()
    };

    let hooks = Arc::new(AgentRotationHooks::new(agent, adapter_name.clone(), sink.clone()));
    let mut scheduler = RotationScheduler::new(hooks.clone());
    scheduler.start(options.clone());

    if options.auto_apply {
        notifier
            .show_info(&format!("Rotating {} (Ctrl-C to stop)", adapter_name))
            .await?;
    } else {
        notifier
            .show_info("Generating identifiers without applying them (Ctrl-C to stop)")
            .await?;
    }

    tokio::signal::ctrl_c().await?;
    scheduler.stop();
    println!();

    if scheduler.has_pending() {
        notifier.show_info("Waiting for the current change to finish...").await?;
    }
    scheduler.drain().await;

    if let Some(last) = hooks.last_offered() {
        notifier.show_info(&format!("Last generated: {}", last)).await?;
    }
    notifier.show_info("Rotation stopped").await
}

// Handle profile management
async fn handle_profile_command(
    container: &mut DependencyContainer,
    args: &Args,
    config: &AppConfig,
    command: &ProfileCommand,
) -> Result<()> {
    let notifier = container.user_notification();
    let store = container.profile_store();

    match command {
        ProfileCommand::List => {
            let profiles = store.list().await?;
            if args.json {
                return print_json(&json!({ "profiles": profiles }));
            }
            if profiles.is_empty() {
                notifier.show_info("No profiles saved yet").await?;
                notifier.show_info("Create one with: poser profile create [NAME]").await?;
                return Ok(());
            }
            for profile in &profiles {
                let mac = if profile.has_saved_identifier() {
                    profile.mac.as_str()
                } else {
                    "(no MAC saved)"
                };
                println!("{}  {:<20} {}", profile.id, profile.name, mac);
            }
            Ok(())
        }

        ProfileCommand::Create { name } => {
            let name = match name {
                Some(name) => name.clone(),
                None => {
                    let existing = store.list().await?;
                    next_profile_name(existing.iter().map(|p| p.name.as_str()))
                }
            };
            let profile = store.create(Some(&name)).await?;
            if args.json {
                return print_json(&profile);
            }
            notifier
                .show_success(&format!("Created profile '{}' ({})", profile.name, profile.id))
                .await
        }

        ProfileCommand::Rename { id, name } => {
            store.get(id).await?;
            let profile = store.update(&ProfileUpdate::rename(id.clone(), name.clone())).await?;
            if args.json {
                return print_json(&profile);
            }
            notifier.show_success(&format!("Renamed {} to '{}'", profile.id, profile.name)).await
        }

        ProfileCommand::Save { id, mac } => {
            let mac = Identifier::normalize(mac)?;
            store.get(id).await?;
            let profile = store
                .update(&ProfileUpdate::save_identifier(id.clone(), mac.pretty()))
                .await?;
            if args.json {
                return print_json(&profile);
            }
            notifier
                .show_success(&format!("Saved {} to '{}'", profile.mac, profile.name))
                .await
        }

        ProfileCommand::Remove { id } => {
            let ack = store.remove(id).await?;
            if args.json {
                return print_json(&ack);
            }
            notifier.show_success(&format!("Removed profile {}", id)).await
        }

        ProfileCommand::Apply { id } => {
            let profile = store.get(id).await?;
            if !profile.has_saved_identifier() {
                return Err(PoserError::InvalidFormat(format!(
                    "profile '{}' has no saved MAC",
                    profile.name
                )));
            }
            let requested = Identifier::normalize(&profile.mac)?;
            handle_set_command(container, args, config, &requested).await
        }
    }
}
