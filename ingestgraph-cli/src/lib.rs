//! Operator CLI (spec §4.16, C-facing surface). A deployment binary
//! embeds [`Cli::dispatch`] with its own [`ConnectorRegistry`] and
//! webhook wiring — this crate owns argument parsing and command
//! dispatch, not connector configuration, the same separation
//! `r2e-cli`'s `main.rs` keeps between `Cli`/`Commands` and the
//! `commands::*` modules that do the actual work.

mod commands;
mod registry;

pub use registry::{ConnectorRegistry, ManagedConnector};

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ingestgraph_core::EngineError;
use ingestgraph_webhook::{WebhookRegistry, WebhookSecretProvider};

#[derive(Parser)]
#[command(name = "ingestgraph", version, about = "Operate ingestion connectors: run, inspect health, replay, serve webhooks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one connector: cold start if it has never synced, incremental otherwise
    Run {
        /// Connector id as registered with the `ConnectorRegistry`
        connector_id: String,
    },
    /// Print a health snapshot for every registered connector
    Doctor,
    /// Boot the webhook intake HTTP server
    WebhookServe {
        /// Address to bind, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,
    },
    /// Clear one scope's checkpoint and force a full resync of it
    Replay {
        /// Connector id as registered with the `ConnectorRegistry`
        connector_id: String,
        /// Scope to clear, e.g. a team key or user id
        scope: String,
    },
}

/// Dependencies a deployment supplies to run the CLI against its own
/// connector instances and webhook secrets.
pub struct CliContext {
    pub connectors: Arc<dyn ConnectorRegistry>,
    pub webhook_registry: Arc<dyn WebhookRegistry>,
    pub webhook_secrets: Arc<dyn WebhookSecretProvider>,
}

impl Cli {
    /// Dispatch the parsed command against `ctx`.
    pub async fn dispatch(self, ctx: &CliContext) -> Result<(), EngineError> {
        match self.command {
            Commands::Run { connector_id } => commands::run(ctx.connectors.as_ref(), &connector_id).await,
            Commands::Doctor => commands::doctor(ctx.connectors.as_ref()).await,
            Commands::WebhookServe { addr } => {
                commands::webhook_serve(ctx.webhook_registry.clone(), ctx.webhook_secrets.clone(), addr).await
            }
            Commands::Replay { connector_id, scope } => commands::replay(ctx.connectors.as_ref(), &connector_id, &scope).await,
        }
    }
}
