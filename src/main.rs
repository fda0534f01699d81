use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use hearth::application::events::EventKind;
use hearth::domain::entities::Platform;
use hearth::domain::traits::{ConfigStore, EventSink, IntegrationEvent, MemoryConfigStore};
use hearth::infrastructure::config::HostConfig;
use hearth::infrastructure::integrations::IntegrationManager;
use hearth::infrastructure::modules::ModuleLoader;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "A plugin-driven chat-bot host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "hearth.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_host(cli.config),
        Commands::Version => {
            println!("hearth v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => init_config(cli.config),
    }
}

fn run_host(config_path: String) {
    let config = if Path::new(&config_path).exists() {
        HostConfig::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            HostConfig::default()
        })
    } else {
        HostConfig::default()
    };

    tracing::info!("Starting host: {}", config.name);

    let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new());
    let platform = Arc::new(Platform::new(
        config.name.clone(),
        config.prefix.clone(),
        store.clone(),
    ));
    let modules = ModuleLoader::new(config.modules_dir.clone(), config.builtin_dir.clone());
    let integrations =
        IntegrationManager::new(config.integrations_dir.clone(), config.builtin_dir.clone());

    let rt = tokio::runtime::Runtime::new().expect("Failed to start runtime");
    rt.block_on(async {
        // Log module lifecycle events as they happen.
        let mut lifecycle = modules.events().subscribe();
        tokio::spawn(async move {
            while let Ok(event) = lifecycle.recv().await {
                match event.kind {
                    EventKind::Loading { candidates } => {
                        tracing::info!("Discovering {} module candidates", candidates.len())
                    }
                    EventKind::Load { name } => tracing::info!("Loaded module '{}'", name),
                    EventKind::Fail { name } => tracing::warn!("Module '{}' failed", name),
                    EventKind::Unload { name } => tracing::info!("Unloaded module '{}'", name),
                }
            }
        });

        let available = integrations.list();
        tracing::info!("{} integrations available", available.len());
        if let Err(e) = integrations.select(available) {
            tracing::error!("Failed to select integrations: {}", e);
            return;
        }
        if let Err(e) = integrations.configure(platform.clone()) {
            tracing::error!("Failed to configure integrations: {}", e);
            return;
        }

        let (tx, mut chat_events) = mpsc::unbounded_channel::<IntegrationEvent>();
        tokio::spawn(async move {
            while let Some(event) = chat_events.recv().await {
                tracing::info!(
                    "[{}] {}: {}",
                    event.event_source,
                    event.kind,
                    event.payload
                );
            }
        });
        if let Err(e) = integrations.start(EventSink::new(tx)) {
            tracing::error!("Failed to start integrations: {}", e);
            return;
        }

        modules.load_all(platform.clone()).await;
        tracing::info!("{} modules loaded", modules.registry().len());

        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down");

        if let Err(e) = integrations.stop().await {
            tracing::error!("Failed to stop integrations: {}", e);
        }
        modules.unload_all(store.clone()).await;
    });
}

fn init_config(config_path: String) {
    if Path::new(&config_path).exists() {
        tracing::warn!("{} already exists, not overwriting", config_path);
        return;
    }
    match serde_yaml::to_string(&HostConfig::default()) {
        Ok(yaml) => {
            if let Err(e) = std::fs::write(&config_path, yaml) {
                tracing::error!("Failed to write {}: {}", config_path, e);
            } else {
                tracing::info!("Wrote default config to {}", config_path);
            }
        }
        Err(e) => tracing::error!("Failed to serialize default config: {}", e),
    }
}
