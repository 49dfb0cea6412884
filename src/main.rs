mod console;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use color_print::cprintln;
use emubot_core::{
    build_controller, AppConfig, ChannelLogger, Controller, ControllerGuard, InstallationWaiter,
    PackageName,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(version, about = "Drive an emulator and wait for required apps to be installed")]
struct Cli {
    /// Path to the toml config, defaults are used if it does not exist
    #[arg(short, long, default_value = "emubot.toml")]
    config: PathBuf,

    /// Apply the configured resolution and density before running
    #[arg(long)]
    configure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print whether a package is installed
    Check { package: String },
    /// Block until a package is installed, prompting on the terminal
    Wait { package: String },
    /// Save a screenshot as png
    Screenshot { output: PathBuf },
    /// Wait for a package if needed, then launch it
    Launch { package: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    info!(
        "using {} backend for {}",
        config.controller.backend, config.controller.serial
    );

    let controller: Arc<dyn Controller> = Arc::from(build_controller(&config.controller)?);
    let mut guard = ControllerGuard::new(Arc::clone(&controller));
    guard.set_auto_stop(config.controller.auto_stop);

    guard.create().context("failed to create controller")?;
    if cli.configure {
        guard.configure().context("failed to configure controller")?;
    }
    guard.start().context("failed to start controller")?;

    let waiter = || {
        let (logger, ui_evt_rx) = ChannelLogger::new();
        console::spawn(ui_evt_rx).context("failed to spawn console ui")?;
        anyhow::Ok(InstallationWaiter::new(
            Arc::clone(&controller),
            Arc::new(logger),
            config.installation.clone(),
        ))
    };

    match cli.command {
        Command::Check { package } => {
            let package = PackageName::parse(package)?;
            if guard.is_package_installed(&package)? {
                cprintln!("<green>{package} is installed</green>");
            } else {
                cprintln!("<red>{package} is not installed</red>");
            }
        }
        Command::Wait { package } => {
            waiter()?.ensure_installed(&PackageName::parse(package)?);
        }
        Command::Screenshot { output } => {
            let screen = guard.screenshot()?;
            screen
                .save(&output)
                .with_context(|| format!("failed to save {}", output.display()))?;
            info!(
                "saved {}x{} screenshot to {}",
                screen.width(),
                screen.height(),
                output.display()
            );
        }
        Command::Launch { package } => {
            let package = PackageName::parse(package)?;
            waiter()?.ensure_installed(&package);
            guard.start_app(&package)?;
        }
    }

    Ok(())
}
