//! C10 Worker Loop: claims queue records and orchestrates C1-C9 per spec
//! §4.10, staged the way `mr-reviewer::run_review` stages its own steps
//! (`Instant`-timed, `debug!`-logged sub-stages, single root error type).

pub mod config;
pub mod errors;
pub mod test_report;

use std::time::Instant;

use broker::{Broker, QueueRecord, ResultRecord};
use chrono::Utc;
use context_engine::strategies::{CoChangeIndex, SemanticRetriever};
use llm_driver::LlmDriver;
use prompt_composer::{ComposerConfig, PromptInputs};
use review_model::{AggregatedReview, ReviewStatus};
use sandbox_runner::SandboxRunner;
use scm_client::ScmClientHandle;
use test_report::TestReportParser;
use tracing::{info, instrument, warn};

pub use config::PipelineConfig;
pub use errors::{WorkerError, WorkerResult};

pub struct PipelineContext<'a> {
    pub scm: &'a ScmClientHandle,
    pub broker: &'a Broker,
    pub llm: &'a LlmDriver,
    pub sandbox: Option<&'a SandboxRunner>,
    pub test_report_parser: &'a dyn TestReportParser,
    pub co_change: Option<&'a dyn CoChangeIndex>,
    pub semantic: Option<&'a dyn SemanticRetriever>,
    pub cfg: &'a PipelineConfig,
}

/// Runs steps 1-7 of §4.10 for one claimed record and returns the
/// aggregated review. Does not write the terminal C12 status or ack C5 —
/// [`handle_record`] does that uniformly for both the success and failure
/// paths.
#[instrument(skip_all, fields(request_id = %request.request_id))]
async fn process_one(ctx: &PipelineContext<'_>, request: &review_model::ReviewRequest) -> WorkerResult<AggregatedReview> {
    let t0 = Instant::now();

    ctx.broker
        .results
        .write(
            &request.request_id,
            &ResultRecord {
                status: ReviewStatus::Processing,
                result: None,
                error: None,
                llm_provider: None,
                llm_model: None,
                processing_time_ms: None,
                completed_at: None,
            },
        )
        .await?;

    let pr_meta = ctx.scm.get_pull_request_metadata(&request.repository_id, request.change_request_id).await.ok();

    // Step 2: fetch diff; 404/410 aborts the request entirely.
    let diff = match ctx.scm.get_diff(&request.repository_id, request.change_request_id).await {
        Ok(d) => d,
        Err(scm_client::ScmError::NotFound) | Err(scm_client::ScmError::HttpStatus(410)) => {
            return Err(WorkerError::ChangeRequestGone);
        }
        Err(e) => return Err(e.into()),
    };
    info!(files = diff.files.len(), "step2: diff fetched");

    // Step 3: C1 -> C2, time-bounded by the orchestrator's own per-strategy
    // timeouts; an empty bundle on total failure still lets the pipeline
    // proceed (C2 fails soft per spec §7).
    let head_ref = pr_meta.as_ref().map(|m| m.diff_refs.head_sha.as_str()).unwrap_or_default();
    let repo_files = ctx.scm.list_repository_files(&request.repository_id, head_ref).await.unwrap_or_else(|e| {
        warn!(error = %e, "step3: listing repository files failed; proceeding with no siblings");
        Vec::new()
    });
    let bundle = context_engine::run(&diff, &repo_files, &ctx.cfg.context, ctx.co_change, ctx.semantic).await;
    info!(matches = bundle.matches.len(), strategies = %bundle.strategy_names, "step3: context enriched");

    // Step 4: optional sandboxed test execution.
    let test_result = run_sandbox_if_enabled(ctx, request, pr_meta.as_ref()).await;

    // Step 5: C3 -> C7, retried up to `decision.maxRetries` with capped
    // exponential backoff; `JsonValidationError` never retries.
    let review_result = invoke_llm_with_retry(ctx, &diff, &bundle, pr_meta.as_ref()).await?;

    // Step 6: C8 -> C9.
    let mut aggregated = aggregator::aggregate(review_result.as_ref(), test_result.as_ref(), &ctx.cfg.aggregation);
    aggregator::partition_by_diff_validity(&mut aggregated, &diff);
    info!(
        findings = aggregated.findings.len(),
        invalid = aggregated.invalid_findings.len(),
        overall_confidence = aggregated.overall_confidence,
        "step6: findings aggregated and validated"
    );

    // Step 7: publish.
    if let Some(meta) = &pr_meta {
        ctx.scm
            .publish_review(&request.repository_id, request.change_request_id, &meta.diff_refs, &aggregated.findings)
            .await?;
        ctx.scm
            .publish_summary_comment(&request.repository_id, request.change_request_id, &aggregated.summary)
            .await?;
    }

    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "step7: published review");
    Ok(aggregated)
}

async fn run_sandbox_if_enabled(
    ctx: &PipelineContext<'_>,
    request: &review_model::ReviewRequest,
    pr_meta: Option<&scm_client::PullRequestMetadata>,
) -> Option<review_model::TestExecutionResult> {
    let runner = ctx.sandbox?;

    let repo_url = services::clone_url(request.provider, &request.repository_id);
    let head_sha = pr_meta.map(|m| m.diff_refs.head_sha.clone());
    let clone_cfg = ctx.cfg.clone.clone();
    let workspace = tokio::task::spawn_blocking(move || {
        services::clone_to(&repo_url, head_sha.as_deref(), clone_cfg.token, std::path::Path::new(&clone_cfg.workspace_root))
    })
    .await
    .ok()?
    .map_err(|e| warn!(error = %e, "step4: workspace clone failed; proceeding without sandboxed tests"))
    .ok()?;

    let sandbox_cfg = sandbox_runner::SandboxConfigBuilder::new()
        .image_name(ctx.cfg.docker.image.clone())
        .memory_limit_bytes(ctx.cfg.docker.memory_bytes)
        .cpu_nano_cores(ctx.cfg.docker.cpu_nano_cores)
        .timeout(ctx.cfg.docker.timeout)
        .network_disabled(ctx.cfg.docker.network_disabled)
        .workspace_volume(workspace.to_string_lossy().to_string())
        .build()
        .ok();

    let result = match sandbox_cfg {
        Some(cfg) => match runner.run(&cfg).await {
            Ok(outcome) => {
                info!(timed_out = outcome.timed_out, exit_code = outcome.exit_code, "step4: sandbox run finished");
                ctx.test_report_parser.parse(&outcome)
            }
            Err(e) => {
                warn!(error = %e, "step4: sandbox run failed; proceeding without test findings");
                None
            }
        },
        None => None,
    };

    services::remove_workspace(&workspace);
    result
}

async fn invoke_llm_with_retry(
    ctx: &PipelineContext<'_>,
    diff: &diff_core::GitDiffDocument,
    bundle: &context_engine::EnrichedBundle,
    pr_meta: Option<&scm_client::PullRequestMetadata>,
) -> WorkerResult<Option<llm_driver::ReviewResult>> {
    let inputs = PromptInputs {
        business_context: None,
        pr_title: pr_meta.map(|m| m.title.as_str()),
        pr_description: pr_meta.and_then(|m| m.description.as_deref()),
        pr_source_branch: pr_meta.and_then(|m| m.source_branch.as_deref()),
        pr_target_branch: pr_meta.and_then(|m| m.target_branch.as_deref()),
        context_matches: bundle.matches.clone(),
        expanded_files: Vec::new(),
        policies: Vec::new(),
        review_focus: None,
    };
    let (system_prompt, user_prompt) = prompt_composer::compose(diff, inputs, &ComposerConfig::default());

    let mut attempt = 0u32;
    loop {
        match ctx.llm.invoke(&system_prompt, &user_prompt).await {
            Ok(result) => return Ok(Some(result)),
            Err(e) => {
                let worker_err = WorkerError::from(e);
                if !worker_err.is_retriable() || attempt >= ctx.cfg.decision.max_retries {
                    return Err(worker_err);
                }
                let delay = ctx.cfg.backoff_for_attempt(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %worker_err, "step5: retrying LLM invocation");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Processes one claimed record end to end, always writing a terminal C12
/// status and returning whether the record should be acked. Every path
/// (success or failure) acks, per spec §7: acking prevents poison-message
/// replay even on a hard failure.
#[instrument(skip_all, fields(request_id = %record.request_id))]
pub async fn handle_record(ctx: &PipelineContext<'_>, record: &QueueRecord) -> WorkerResult<()> {
    let t0 = Instant::now();
    let outcome = process_one(ctx, &record.payload).await;

    let result_record = match &outcome {
        Ok(review) => ResultRecord {
            status: ReviewStatus::Completed,
            result: Some(review.clone()),
            error: None,
            llm_provider: Some(ctx.llm.provider().to_string()),
            llm_model: Some(ctx.llm.model().to_string()),
            processing_time_ms: Some(t0.elapsed().as_millis() as u64),
            completed_at: Some(Utc::now()),
        },
        Err(e) => ResultRecord {
            status: ReviewStatus::Failed,
            result: None,
            error: Some(e.to_string()),
            llm_provider: Some(ctx.llm.provider().to_string()),
            llm_model: Some(ctx.llm.model().to_string()),
            processing_time_ms: Some(t0.elapsed().as_millis() as u64),
            completed_at: Some(Utc::now()),
        },
    };

    ctx.broker.results.write(&record.request_id, &result_record).await?;
    ctx.broker.queue.ack(&ctx.cfg.consumer.group, &record.id).await?;

    if let Err(e) = &outcome {
        warn!(error = %e, "request finalized as FAILED");
    }
    Ok(())
}

/// Claims up to `consumer.batch` records and processes them one at a time.
/// Callers loop this in a `tokio::select!` alongside a shutdown signal.
pub async fn claim_and_process_batch(ctx: &PipelineContext<'_>) -> WorkerResult<usize> {
    ctx.broker.queue.ensure_group(&ctx.cfg.consumer.group).await?;
    let records = ctx
        .broker
        .queue
        .claim(&ctx.cfg.consumer.group, &ctx.cfg.consumer.consumer, ctx.cfg.consumer.batch, ctx.cfg.consumer.block_for)
        .await?;

    let count = records.len();
    for record in &records {
        handle_record(ctx, record).await?;
    }
    Ok(count)
}
