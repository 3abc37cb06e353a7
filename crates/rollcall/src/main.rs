use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{Gallery, Identity, OnnxFaceEncoder};
use rollcall_hw::{Camera, V4lCameraProvider};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod annotate;
mod announcer;
mod config;
mod console;
mod controller;
mod engine;
mod policy;

use announcer::Announcer;
use config::Config;
use console::{ConsoleUi, LogHistory};
use controller::App;

#[derive(Parser)]
#[command(name = "rollcall", about = "Live face attendance with spoken greetings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive attendance console (default)
    Run,
    /// List registered users
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

#[derive(Serialize)]
struct ListedUser<'a> {
    #[serde(flatten)]
    identity: &'a Identity,
    stem: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::List { json } => list(&config, json),
        Commands::Devices => {
            devices();
            Ok(())
        }
    }
}

fn load_encoder(config: &Config) -> Result<OnnxFaceEncoder> {
    let encoder = OnnxFaceEncoder::load(&config.scrfd_model_path(), &config.arcface_model_path())
        .with_context(|| {
            format!("failed to load face models from {}", config.model_dir.display())
        })?;
    tracing::info!(dir = %config.model_dir.display(), "face models loaded");
    Ok(encoder)
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("rollcall starting");
    let encoder = load_encoder(&config)?;

    let announcer = match &config.tts_program {
        Some(program) => Announcer::spawn(program.clone(), config.tts_args.clone())
            .unwrap_or_else(|e| {
                tracing::warn!(program = %program, error = %e, "speech disabled");
                Announcer::disabled()
            }),
        None => Announcer::disabled(),
    };

    let period = config.tick_interval;
    let history = LogHistory::default();
    let mut app = App::new(
        config,
        Box::new(encoder),
        Box::new(V4lCameraProvider),
        ConsoleUi::new(history.clone()),
        announcer,
    );
    app.load_gallery();

    let (handle, engine) = engine::spawn_engine(app, period)?;
    console::run_console(handle, history).await?;

    tokio::task::spawn_blocking(move || engine.join())
        .await?
        .map_err(|_| anyhow!("engine thread panicked"))?;

    tracing::info!("rollcall shutting down");
    Ok(())
}

fn list(config: &Config, json: bool) -> Result<()> {
    let mut encoder = load_encoder(config)?;
    let gallery = Gallery::load(&config.dataset_dir, &mut encoder)
        .with_context(|| format!("failed to load gallery from {}", config.dataset_dir.display()))?;

    if json {
        let users: Vec<ListedUser> = gallery
            .entries()
            .iter()
            .map(|e| ListedUser {
                identity: &e.identity,
                stem: e.identity.stem(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if gallery.is_empty() {
        println!("No users registered in {}", config.dataset_dir.display());
        return Ok(());
    }
    println!("{:<12} {:<24} STEM", "ID", "NAME");
    for entry in gallery.entries() {
        let identity = &entry.identity;
        println!(
            "{:<12} {:<24} {}",
            identity.id.as_deref().unwrap_or("-"),
            identity.display_name(),
            identity.stem()
        );
    }
    Ok(())
}

fn devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
        return;
    }
    for d in devices {
        println!("{}  {}  ({}, {})", d.path, d.name, d.driver, d.bus);
    }
}
