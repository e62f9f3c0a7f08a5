//! Solver API server.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:8000, keys from .env
//! solver-server
//!
//! # Custom configuration
//! SOLVER_MAX_ROUNDS=5 solver-server --config ./solver.toml --port 9000 --protocol legacy
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coordination::{FaultPolicy, ProtocolVariant};
use solver_server::{build_router, AppState, HttpCallerFactory, ServerConfig, SingleMode};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "solver-server", version, about = "Single-agent vs. debate math solver API")]
struct Args {
    /// TOML configuration file.
    #[arg(long, env = "SOLVER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Debate round cap.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// `structured` or `legacy`.
    #[arg(long)]
    protocol: Option<ProtocolVariant>,

    /// `feed_forward` or `short_circuit`.
    #[arg(long)]
    fault_policy: Option<FaultPolicy>,

    /// `small_model` or `rule_based`.
    #[arg(long)]
    single_mode: Option<SingleMode>,

    /// Per-call model timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(rounds) = self.max_rounds {
            config.debate.max_rounds = rounds;
        }
        if let Some(protocol) = self.protocol {
            config.debate.protocol = protocol;
        }
        if let Some(policy) = self.fault_policy {
            config.debate.fault_policy = policy;
        }
        if let Some(mode) = self.single_mode {
            config.single_mode = mode;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if config.openai.usable_key().is_none() {
        warn!("OPENAI_API_KEY not set; /api/solve/multi requires a per-request key");
    }
    if config.single_mode == SingleMode::SmallModel && config.huggingface.usable_key().is_none() {
        warn!("HUGGINGFACE_API_KEY not set; /api/solve/single will return 500");
    }

    let addr = config.socket_addr()?;
    let callers = HttpCallerFactory::from_config(&config).context("Failed to build HTTP client")?;
    info!(
        %addr,
        protocol = %config.debate.protocol,
        fault_policy = %config.debate.fault_policy,
        max_rounds = config.debate.max_rounds,
        single_mode = %config.single_mode,
        "Solver API starting"
    );

    let app = build_router(AppState::new(config, Arc::new(callers)));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
