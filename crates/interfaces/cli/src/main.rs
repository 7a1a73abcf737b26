mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use plantcare_config::AppConfig;
use plantcare_runtime::{
    CareSweep, Clock, PlantService, SystemClock, mailer_from_config, spawn_sweep_task,
};
use plantcare_scheduler::CarePolicy;
use plantcare_store::RedbStore;

use commands::{CareArgs, Identity};

#[derive(Debug, Parser)]
#[command(
    name = "plantcare",
    version,
    about = "Plant care tracking with watering and fertilizing reminders"
)]
struct Cli {
    /// Configuration file; missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send due care reminders.  Runs until Ctrl-C unless `--once` is given.
    Sweep {
        #[arg(long)]
        once: bool,
    },
    /// Show which plants are due for care without sending anything.
    Check,
    /// Create, edit, inspect and remove plants.
    Plant {
        #[command(subcommand)]
        command: PlantCommands,
    },
    /// Comment on plants.
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },
}

#[derive(Debug, Subcommand)]
enum PlantCommands {
    /// Add a plant owned by `--as`.
    Add {
        #[command(flatten)]
        identity: Identity,
        #[command(flatten)]
        care: CareArgs,
    },
    /// Change care fields; every change is written to the plant's log.
    Update {
        #[command(flatten)]
        identity: Identity,
        id: u64,
        #[command(flatten)]
        care: CareArgs,
    },
    /// Print a plant with its log and comments as JSON.
    Show {
        /// Viewer email; omit to look anonymously.
        #[arg(long = "as")]
        viewer: Option<String>,
        id: u64,
    },
    /// List plants visible to the viewer.
    List {
        #[arg(long = "as")]
        viewer: Option<String>,
    },
    /// Delete a plant with its log and comments.
    Remove {
        #[command(flatten)]
        identity: Identity,
        id: u64,
    },
}

#[derive(Debug, Subcommand)]
enum CommentCommands {
    Add {
        #[command(flatten)]
        identity: Identity,
        plant_id: u64,
        content: String,
    },
    /// List a plant's comments.  The owner listing marks them viewed.
    List {
        #[arg(long = "as")]
        viewer: Option<String>,
        plant_id: u64,
    },
    Remove {
        #[command(flatten)]
        identity: Identity,
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(RedbStore::open(&config.storage.path)?);
    info!(path = %store.path().display(), "store opened");

    match cli.command {
        Commands::Sweep { once } => {
            let sweep = Arc::new(CareSweep::new(
                store,
                mailer_from_config(&config),
                Arc::new(SystemClock),
                CarePolicy::from_config(&config.scheduler),
            ));

            if once || !config.sweep_enabled() {
                if !once {
                    println!("scheduler.sweep_interval_minutes is 0; running a single sweep");
                }
                let report = sweep.run_once().await?;
                commands::print_report(&report);
                return Ok(());
            }

            let interval = Duration::from_secs(config.scheduler.sweep_interval_minutes * 60);
            let (shutdown_tx, _) = tokio::sync::watch::channel(false);
            let handle = spawn_sweep_task(sweep, interval, &shutdown_tx);
            println!(
                "sweeping every {} minute(s); press Ctrl-C to stop",
                config.scheduler.sweep_interval_minutes
            );
            tokio::signal::ctrl_c().await?;
            let _ = shutdown_tx.send(true);
            if let Some(handle) = handle {
                // Give an in-flight sweep a moment to finish before aborting it.
                tokio::time::sleep(Duration::from_millis(200)).await;
                handle.abort();
            }
            println!("sweep stopped");
        }
        Commands::Check => {
            let policy = CarePolicy::from_config(&config.scheduler);
            commands::run_check(store.as_ref(), &policy, SystemClock.now()).await?;
        }
        Commands::Plant { command } => {
            let service = PlantService::new(store, config.retention.clone());
            match command {
                PlantCommands::Add { identity, care } => {
                    let plant = service
                        .add_plant(identity.owner(), care.into_state())
                        .await?;
                    commands::print_json(&plant)?;
                }
                PlantCommands::Update { identity, id, care } => {
                    let existing = service.plant_details(Some(&identity.email), id).await?;
                    let mut incoming = existing.plant.care;
                    care.apply_to(&mut incoming);
                    let plant = service.update_plant(&identity.email, id, incoming).await?;
                    commands::print_json(&plant)?;
                }
                PlantCommands::Show { viewer, id } => {
                    let details = service.plant_details(viewer.as_deref(), id).await?;
                    commands::print_json(&details)?;
                }
                PlantCommands::List { viewer } => {
                    let plants = service.visible_plants(viewer.as_deref()).await?;
                    commands::print_plant_table(&plants);
                }
                PlantCommands::Remove { identity, id } => {
                    service.delete_plant(&identity.email, id).await?;
                    println!("plant {id} deleted");
                }
            }
        }
        Commands::Comment { command } => {
            let service = PlantService::new(store, config.retention.clone());
            match command {
                CommentCommands::Add {
                    identity,
                    plant_id,
                    content,
                } => {
                    let comment = service
                        .add_comment(identity.owner(), plant_id, &content)
                        .await?;
                    commands::print_json(&comment)?;
                }
                CommentCommands::List { viewer, plant_id } => {
                    let comments = service
                        .comments_for_plant(viewer.as_deref(), plant_id)
                        .await?;
                    commands::print_json(&comments)?;
                }
                CommentCommands::Remove { identity, id } => {
                    service.delete_comment(&identity.email, id).await?;
                    println!("comment {id} deleted");
                }
            }
        }
    }

    Ok(())
}
