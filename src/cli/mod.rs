//! CLI module — command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use deskpilot::agent::GraphExecutor;
use deskpilot::config::Config;
use deskpilot::error::AgentError;
use deskpilot::providers::OpenAIProvider;
use deskpilot::remote::RemoteToolClient;
use deskpilot::router::ToolRouter;
use deskpilot::tools::ToolRegistry;
use deskpilot::TurnRequest;

#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(version)]
#[command(about = "Tool-calling customer support agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message on a conversation thread
    Chat {
        /// The customer message
        message: String,
        /// Thread to continue (defaults to "default")
        #[arg(long)]
        thread: Option<String>,
        /// Customer id to associate with the thread
        #[arg(long)]
        customer_id: Option<i64>,
    },
    /// Answer one message statelessly on a throwaway thread
    Generate {
        /// The customer message
        message: String,
    },
    /// List the merged tool catalog
    Tools,
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Chat {
            message,
            thread,
            customer_id,
        } => {
            let executor = build_executor(&config).await?;
            let mut request = TurnRequest::new(&message);
            if let Some(thread) = thread.as_deref() {
                request = request.with_thread(thread);
            }
            if let Some(customer_id) = customer_id {
                request = request.with_customer(customer_id);
            }

            let turn = executor
                .handle_message(request)
                .await
                .map_err(describe_error)?;
            print_turn(&turn);
        }
        Commands::Generate { message } => {
            let executor = build_executor(&config).await?;
            let turn = executor.generate(&message).await.map_err(describe_error)?;
            print_turn(&turn);
        }
        Commands::Tools => {
            let router = build_router(&config).await?;
            let catalog = router.catalog().await;
            if catalog.is_empty() {
                println!("No tools available.");
            }
            for entry in catalog.iter() {
                println!("{:<32} [{}] {}", entry.name, entry.origin, entry.description);
            }
        }
    }

    Ok(())
}

async fn build_router(config: &Config) -> Result<ToolRouter> {
    let local = ToolRegistry::new();

    let remote = match &config.remote.endpoint {
        Some(endpoint) => {
            let (client, tools) = RemoteToolClient::connect(
                endpoint,
                config.remote_connect_timeout(),
                config.remote_retry_backoff(),
            )
            .await
            .with_context(|| format!("failed to connect to tool host at {}", endpoint))?;
            info!(endpoint = %endpoint, tools = tools.len(), "remote tool host connected");
            Some((client, tools))
        }
        None => None,
    };

    Ok(ToolRouter::new(local, remote, config.tool_timeout())?)
}

async fn build_executor(config: &Config) -> Result<GraphExecutor> {
    let api_key = config
        .provider
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("no API key configured; set DESKPILOT_PROVIDER_API_KEY"))?;

    let provider = match config.provider.api_base.as_deref() {
        Some(base) => OpenAIProvider::with_base_url(api_key, &config.provider.model, base),
        None => OpenAIProvider::new(api_key, &config.provider.model),
    };

    let router = Arc::new(build_router(config).await?);
    Ok(GraphExecutor::with_defaults(
        config.clone(),
        Arc::new(provider),
        router,
    ))
}

/// Enrich a failed turn with the provider error classification: the HTTP
/// status behind it and whether retrying is worthwhile.
fn describe_error(err: AgentError) -> anyhow::Error {
    if let AgentError::Provider(provider) = &err {
        let mut hint = String::new();
        if let Some(code) = provider.status_code() {
            hint.push_str(&format!(" (HTTP {})", code));
        }
        if provider.is_retryable() {
            hint.push_str("; this is usually transient, retry shortly");
        }
        return anyhow!("{}{}", err, hint);
    }
    err.into()
}

fn print_turn(turn: &deskpilot::TurnResponse) {
    println!("{}", turn.response);
    eprintln!();
    eprintln!(
        "[thread {} | intent {} ({:.2}) | {} tool call(s){}]",
        turn.thread_id,
        turn.intent,
        turn.confidence,
        turn.tool_calls.len(),
        if turn.degraded { " | degraded" } else { "" }
    );
    for record in &turn.tool_calls {
        let status = if record.outcome.is_success() { "ok" } else { "failed" };
        eprintln!("  {} {} ({})", status, record.tool_name, record.id);
    }
}
