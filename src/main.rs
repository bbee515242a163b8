//! Process entry point: loads configuration, wires the shared component
//! handles, then runs the worker loop in the background while serving the
//! HTTP intake adapter in the foreground.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cfg = worker::PipelineConfig::from_env()?;

    let broker = Arc::new(broker::Broker::connect(&cfg.broker).await?);
    let scm = scm_client::ScmClientHandle::from_config(cfg.scm.clone())?;
    let llm = llm_driver::LlmDriver::new(cfg.llm.clone())?;

    let sandbox_enabled = std::env::var("SANDBOX_ENABLED").map(|v| v == "true").unwrap_or(false);
    let sandbox = if sandbox_enabled { Some(sandbox_runner::SandboxRunner::connect()?) } else { None };

    let http_state = Arc::new(api::core::app_state::AppState {
        broker: broker.clone(),
        webhook_secret: std::env::var("WEBHOOK_SECRET").unwrap_or_default(),
    });

    tokio::spawn(run_worker_loop(cfg, broker, scm, llm, sandbox));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port())).await?;
    tracing::info!(port = http_port(), "listening for webhooks");
    axum::serve(listener, api::router(http_state)).await?;

    Ok(())
}

/// Claims batches from C5 forever. Runs as a background task for the
/// process lifetime; a claim failure backs off rather than exiting, since
/// the intake endpoint must keep accepting webhooks even if the broker
/// connection blips.
async fn run_worker_loop(
    cfg: worker::PipelineConfig,
    broker: Arc<broker::Broker>,
    scm: scm_client::ScmClientHandle,
    llm: llm_driver::LlmDriver,
    sandbox: Option<sandbox_runner::SandboxRunner>,
) {
    let test_report_parser = worker::test_report::NoTestReport;
    let ctx = worker::PipelineContext {
        scm: &scm,
        broker: &broker,
        llm: &llm,
        sandbox: sandbox.as_ref(),
        test_report_parser: &test_report_parser,
        co_change: None,
        semantic: None,
        cfg: &cfg,
    };

    loop {
        if let Err(e) = worker::claim_and_process_batch(&ctx).await {
            tracing::warn!(error = %e, "batch claim failed; backing off");
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
}

fn http_port() -> u16 {
    std::env::var("HTTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080)
}
