use anyhow::Context;
use clap::{Parser, Subcommand};
use pocketchat::{cleanup, config::Config, db, router, AppState, Retention};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal direct-messaging backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Delete messages older than the retention window once, then exit
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let db_pool = db::connect_lazy(&config)?;
    db::migrate(&db_pool).await.context("run migrations")?;

    let retention = Retention(config.retention_window);
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, AppState { db_pool, retention }).await,
        Commands::Sweep => {
            let deleted = cleanup::sweep_old(&db_pool, retention).await.context("sweep old messages")?;
            println!("Deleted {deleted} old messages");
            Ok(())
        }
    }
}

async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(
        "listening on {}, keeping messages for {}",
        config.bind_addr, config.retention_window,
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("could not listen for ctrl-c: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server shutdown")?;

    Ok(())
}
