mod clients;
mod config;
mod helpers;
mod models;
mod refresher;
mod registry;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use clients::StackApi;
use clients::sync::SyncClient;
use config::Config;
use models::stack::{Snapshot, StackAction};
use refresher::Refresher;
use registry::{InstanceFilter, InstanceRegistry};

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncClient>,
    pub refresher: Arc<Refresher>,
}

#[derive(Parser)]
#[command(name = "stack-console", version, about = "Start and stop stacks on remote management servers")]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web console (default)
    Serve,
    /// Fetch once and print every stack
    List {
        /// Instance name, or "All"
        #[arg(short, long, default_value = "All")]
        instance: String,
    },
    /// Start a stack
    Start {
        #[arg(short, long)]
        instance: String,
        /// Stack name or id
        stack: String,
    },
    /// Stop a stack
    Stop {
        #[arg(short, long)]
        instance: String,
        /// Stack name or id
        stack: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stack_console=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    if !config_path.exists() {
        if let Err(e) = Config::write_template(&config_path) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        eprintln!(
            "config file created at {}; set each instance's url and apiKey, then run again",
            config_path.display()
        );
        std::process::exit(1);
    }

    let cfg = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(1);
    });

    let registry = InstanceRegistry::load(&cfg.instances).unwrap_or_else(|e| {
        eprintln!("error loading config {}: {}", config_path.display(), e);
        std::process::exit(1);
    });

    if registry.is_empty() {
        eprintln!("no instances configured");
        std::process::exit(1);
    }

    let api = StackApi::new(cfg.request_timeout()).unwrap_or_else(|e| {
        eprintln!("failed to create HTTP client: {}", e);
        std::process::exit(1);
    });
    let sync = Arc::new(SyncClient::new(api, registry));

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, sync).await,
        Command::List { instance } => list(&sync, &instance).await,
        Command::Start { instance, stack } => {
            toggle(&sync, &instance, &stack, StackAction::Start).await
        }
        Command::Stop { instance, stack } => {
            toggle(&sync, &instance, &stack, StackAction::Stop).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn serve(cfg: &Config, sync: Arc<SyncClient>) -> Result<(), Box<dyn std::error::Error>> {
    let refresher = Arc::new(Refresher::new(sync.clone(), cfg.poll_interval()));

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    // Start polling
    tokio::spawn(refresher.clone().run(shutdown_rx));

    let router = routes::build_router(AppState { sync, refresher });

    let listen_addr = cfg.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {}", listen_addr, e))?;

    info!("stack-console listening on http://{}/ui/", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(());
        })
        .await
        .map_err(|e| format!("server error: {}", e))?;

    Ok(())
}

async fn list(sync: &SyncClient, instance: &str) -> Result<(), Box<dyn std::error::Error>> {
    sync.set_active_filter(InstanceFilter::parse(instance)).await;
    let snapshot = sync.fetch_stacks().await;
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    for f in &snapshot.failures {
        eprintln!("warning: {}: {}", f.instance, f.error);
    }
    for s in &snapshot.stacks {
        println!(
            "{:<40} {:<8} id={}",
            format!("{} @ {}", s.name, s.instance.name),
            s.status,
            s.id
        );
    }
}

async fn toggle(
    sync: &SyncClient,
    instance: &str,
    key: &str,
    action: StackAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = sync.fetch_stacks().await;
    if let Some(f) = snapshot.failures.iter().find(|f| f.instance == instance) {
        return Err(format!("cannot list stacks on {}: {}", instance, f.error).into());
    }
    let stack = snapshot
        .find_by_name_or_id(instance, key)
        .ok_or_else(|| format!("no stack {:?} on instance {:?}", key, instance))?;

    sync.apply(stack, action)
        .await
        .map_err(|e| format!("failed to {} {}: {}", action.path_segment(), stack.name, e))?;
    println!("{} has {}!", stack.name, action.past_tense());

    let after = sync.fetch_stacks().await;
    if let Some(s) = after.find(stack.instance.index, &stack.id.to_string()) {
        println!("{} @ {} is now {}", s.name, s.instance.name, s.status);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
