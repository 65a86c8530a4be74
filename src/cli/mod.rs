use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::auth::TokenAuthority;
use crate::config::{self, AppConfig};
use crate::database::{schema, PgSessionFactory};
use crate::handlers::HandlerFactory;
use crate::router::{self, AppState};
use crate::services::PublicBucket;

#[derive(Parser)]
#[command(name = "ideabank")]
#[command(about = "IdeaBank API - accounts, concepts and their lineage over HTTP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (defaults to API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Keep all data in memory instead of Postgres")]
        in_memory: bool,
    },

    #[command(about = "Print the database schema, or apply it with --apply")]
    Schema {
        #[arg(long)]
        apply: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config();
    info!("Starting IdeaBank API in {:?} mode", config.environment);

    match cli.command {
        Commands::Serve { port, in_memory } => serve(config, port, in_memory).await,
        Commands::Schema { apply } => {
            if !apply {
                print!("{}", schema::script());
                return Ok(());
            }
            let sessions = PgSessionFactory::connect(&config.database).await?;
            sessions.apply_schema().await?;
            sessions.close().await;
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, port: Option<u16>, in_memory: bool) -> anyhow::Result<()> {
    if crate::is_development!() {
        warn!("Development mode: tokens are signed with the default development secret unless JWT_SECRET is set");
    }

    let tokens = TokenAuthority::from_config(&config.security).context("JWT_SECRET must be set")?;
    let depth = config.lineage.max_depth;

    let factory = if in_memory {
        warn!("Serving from memory; nothing will be persisted");
        HandlerFactory::in_memory(tokens, depth)
    } else {
        let sessions = PgSessionFactory::connect(&config.database).await?;
        let storage = PublicBucket::new(&config.storage)?;
        HandlerFactory::new(Arc::new(sessions), Arc::new(storage), Arc::new(tokens), depth)
    };

    let app = router::app(AppState::new(factory), config);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("IdeaBank API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
