//! C2 Context Retriever: runs the strategy registry and merges results by
//! file path per spec §4.2.

pub mod strategies;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use diff_core::GitDiffDocument;
use review_model::{ContextMatch, MatchReason};
use tracing::{debug, instrument, warn};

use strategies::{ALL_STRATEGIES, CoChangeIndex, ContextStrategyKind, SemanticRetriever};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub enabled: bool,
    pub max_diff_lines: usize,
    pub skip_large_diff: bool,
    pub strategy_timeout: Duration,
    pub enabled_strategies: Vec<ContextStrategyKind>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_diff_lines: 30,
            skip_large_diff: true,
            strategy_timeout: Duration::from_secs(1),
            enabled_strategies: ALL_STRATEGIES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichedBundle {
    pub matches: Vec<ContextMatch>,
    pub strategy_names: String,
    pub execution_time_ms: u64,
    pub total_candidates: usize,
    pub high_confidence_count: usize,
    pub per_reason: HashMap<MatchReason, usize>,
}

const HIGH_CONFIDENCE_CUTOFF: f64 = 0.8;

/// Runs every enabled strategy with an isolating per-strategy timeout,
/// merges by file path keeping the highest-confidence match (ties broken
/// by earliest `priority()`), and aggregates metadata.
#[instrument(skip_all, fields(files = diff.files.len(), total_lines = diff.total_lines()))]
pub async fn run(
    diff: &GitDiffDocument,
    repo_files: &[String],
    cfg: &OrchestratorConfig,
    co_change: Option<&dyn CoChangeIndex>,
    semantic: Option<&dyn SemanticRetriever>,
) -> EnrichedBundle {
    if !cfg.enabled {
        return EnrichedBundle::default();
    }

    if cfg.skip_large_diff && diff.total_lines() > cfg.max_diff_lines {
        debug!(max = cfg.max_diff_lines, "skipping all strategies: diff exceeds max_diff_lines");
        return EnrichedBundle::default();
    }

    let start = Instant::now();
    let mut ran_names = Vec::new();
    let mut per_strategy: Vec<(ContextStrategyKind, Vec<ContextMatch>)> = Vec::new();

    for kind in cfg.enabled_strategies.iter().copied() {
        let fut = async { kind.retrieve(diff, repo_files, co_change) };
        match tokio::time::timeout(cfg.strategy_timeout, fut).await {
            Ok(matches) => {
                ran_names.push(kind.name());
                per_strategy.push((kind, matches));
            }
            Err(_) => {
                warn!(strategy = kind.name(), "strategy timed out; contributing empty result");
                per_strategy.push((kind, Vec::new()));
            }
        }
    }

    if let Some(retriever) = semantic {
        match tokio::time::timeout(cfg.strategy_timeout, strategies::rag::retrieve(diff, retriever)).await {
            Ok(matches) => {
                ran_names.push("RagSemanticStrategy");
                per_strategy.push((ContextStrategyKind::DiffFileReference, matches));
                // priority doesn't matter for the synthetic rag slot: it's merged
                // like any other source by confidence in merge_by_path below.
            }
            Err(_) => warn!("RagSemanticStrategy timed out; contributing empty result"),
        }
    }

    let total_candidates: usize = per_strategy.iter().map(|(_, m)| m.len()).sum();
    let merged = merge_by_path(per_strategy);
    let high_confidence_count = merged.iter().filter(|m| m.confidence >= HIGH_CONFIDENCE_CUTOFF).count();

    let mut per_reason: HashMap<MatchReason, usize> = HashMap::new();
    for m in &merged {
        *per_reason.entry(m.reason).or_insert(0) += 1;
    }

    let mut sorted = merged;
    sorted.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    EnrichedBundle {
        matches: sorted,
        strategy_names: ran_names.join("+"),
        execution_time_ms: start.elapsed().as_millis() as u64,
        total_candidates,
        high_confidence_count,
        per_reason,
    }
}

/// Step 3: keep the highest-confidence match per path; ties broken by
/// earliest-priority strategy.
fn merge_by_path(per_strategy: Vec<(ContextStrategyKind, Vec<ContextMatch>)>) -> Vec<ContextMatch> {
    struct Slot {
        m: ContextMatch,
        priority: u8,
    }

    let mut best: HashMap<String, Slot> = HashMap::new();
    for (kind, matches) in per_strategy {
        for m in matches {
            best.entry(m.file_path.clone())
                .and_modify(|slot| {
                    if m.confidence > slot.m.confidence
                        || (m.confidence == slot.m.confidence && kind.priority() < slot.priority)
                    {
                        slot.m = m.clone();
                        slot.priority = kind.priority();
                    }
                })
                .or_insert(Slot { m: m.clone(), priority: kind.priority() });
        }
    }
    best.into_values().map(|slot| slot.m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_core::FileModification;

    #[tokio::test]
    async fn disabled_flag_short_circuits() {
        let diff = GitDiffDocument { files: vec![FileModification { old_path: "a".into(), new_path: "a".into(), hunks: vec![] }] };
        let cfg = OrchestratorConfig { enabled: false, ..Default::default() };
        let bundle = run(&diff, &[], &cfg, None, None).await;
        assert!(bundle.matches.is_empty());
        assert!(bundle.strategy_names.is_empty());
    }

    #[tokio::test]
    async fn skips_strategies_over_large_diff_threshold() {
        let huge_content = "x".repeat(1);
        let lines = (0..40)
            .map(|i| diff_core::DiffLine::Added { new_line: i, content: huge_content.clone() })
            .collect();
        let diff = GitDiffDocument {
            files: vec![FileModification {
                old_path: "a".into(),
                new_path: "a".into(),
                hunks: vec![diff_core::DiffHunk { old_start: 1, old_count: 0, new_start: 1, new_count: 40, lines }],
            }],
        };
        let cfg = OrchestratorConfig { max_diff_lines: 30, skip_large_diff: true, ..Default::default() };
        let bundle = run(&diff, &[], &cfg, None, None).await;
        assert!(bundle.matches.is_empty());
    }
}
