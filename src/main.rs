use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opsconsole::auth::AuthConfig;
use opsconsole::console::{ConsoleBuilder, NavFailurePolicy};
use opsconsole::db::Store;
use opsconsole::media::MediaConfig;
use opsconsole::registry::RegistrationQueue;
use opsconsole::{api, modules};

#[derive(Parser)]
#[command(name = "opsconsole")]
#[command(about = "Extensible admin console for line-of-business applications")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "opsconsole=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let port = match cli.command {
        Some(Commands::Serve { port }) => port,
        None => 3000,
    };

    serve(port).await
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let store = Store::open_default()?;
    store.migrate()?;

    // Start-up registration phase: modules contribute to the queue, then
    // the queue is drained exactly once into the immutable console. All
    // of this completes before the listener starts serving traffic.
    let mut queue = RegistrationQueue::new();
    let installed = modules::install_default_modules(&store, &mut queue)?;

    let mut builder = ConsoleBuilder::new()
        .site_header("Opsconsole")
        .site_title("Opsconsole");

    // Optional: stop rendering a sidebar module after this many failed
    // route resolutions instead of logging every request.
    if let Some(limit) = std::env::var("OPSCONSOLE_NAV_DISABLE_AFTER")
        .ok()
        .and_then(|raw| raw.parse().ok())
    {
        builder = builder.nav_failure_policy(NavFailurePolicy::DisableAfter(limit));
    }

    builder.drain_queue(&mut queue, &installed)?;
    let console = Arc::new(builder.finish());

    tracing::info!(
        entity_types = console.handlers().len(),
        sidebar_modules = console.sidebar_modules().len(),
        "Console built"
    );

    let auth = AuthConfig::from_env();
    let media = MediaConfig::from_env()?;

    let app = api::create_router(console, auth, media);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Opsconsole listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
