//! `PipelineConfig`: the single immutable configuration value assembled once
//! at startup from environment variables (spec §6's configuration surface).
//! Config loading is out of scope per spec §1, so this stays a plain struct
//! with a small `from_env()` constructor — no config framework.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn must_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn env_or<T: std::str::FromStr>(name: &'static str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub batch: usize,
    pub block_for: Duration,
}

#[derive(Debug, Clone)]
pub struct CloneConfig {
    pub concurrency: usize,
    pub timeout: Duration,
    pub token: Option<String>,
    /// Parent directory under which each sandboxed run gets its own
    /// clone subdirectory (removed after the run completes).
    pub workspace_root: String,
}

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub image: String,
    pub memory_bytes: i64,
    pub cpu_nano_cores: i64,
    pub timeout: Duration,
    pub network_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct DecisionConfig {
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub consumer: ConsumerConfig,
    pub clone: CloneConfig,
    pub docker: DockerConfig,
    pub aggregation: aggregator::AggregatorConfig,
    pub decision: DecisionConfig,
    pub context: context_engine::OrchestratorConfig,
    pub llm: llm_driver::LlmConfig,
    pub scm: scm_client::ScmConfig,
    pub broker: broker::BrokerConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider_str = must_env("SCM_PROVIDER")?;
        let provider = match provider_str.to_ascii_lowercase().as_str() {
            "github" => review_model::Provider::Github,
            "gitlab" => review_model::Provider::Gitlab,
            "bitbucket" => review_model::Provider::Bitbucket,
            other => {
                return Err(ConfigError::InvalidValue { name: "SCM_PROVIDER", value: other.to_string() });
            }
        };

        let llm = llm_driver::LlmConfig::from_env()
            .map_err(|e| ConfigError::InvalidValue { name: "llm.*", value: e.to_string() })?;

        Ok(Self {
            consumer: ConsumerConfig {
                stream: env_or("CONSUMER_STREAM", "review:requests".to_string()),
                group: env_or("CONSUMER_GROUP", "review-workers".to_string()),
                consumer: env_or("CONSUMER_NAME", "worker-1".to_string()),
                batch: env_or("CONSUMER_BATCH", 10usize),
                block_for: Duration::from_millis(env_or("CONSUMER_BLOCK_FOR_MS", 5000u64)),
            },
            clone: CloneConfig {
                concurrency: env_or("CLONE_CONCURRENCY", 4usize),
                timeout: Duration::from_secs(env_or("CLONE_TIMEOUT_SECS", 60u64)),
                token: std::env::var("CLONE_TOKEN").ok(),
                workspace_root: env_or("CLONE_WORKSPACE_ROOT", "/tmp/review-workspaces".to_string()),
            },
            docker: DockerConfig {
                image: env_or("DOCKER_IMAGE", "alpine:latest".to_string()),
                memory_bytes: env_or("DOCKER_MEMORY_BYTES", sandbox_runner::config::DEFAULT_MEMORY_LIMIT_BYTES),
                cpu_nano_cores: env_or("DOCKER_CPU_NANO_CORES", sandbox_runner::config::DEFAULT_CPU_NANO_CORES),
                timeout: Duration::from_secs(env_or("DOCKER_TIMEOUT_SECS", 600u64)),
                network_disabled: env_or("DOCKER_NETWORK_DISABLED", false),
            },
            aggregation: aggregator::AggregatorConfig {
                confidence_threshold: env_or("AGGREGATION_FILTERING_CONFIDENCE_THRESHOLD", 0.7),
                similarity_threshold: env_or("AGGREGATION_DEDUP_THRESHOLD", 0.85),
                per_file_cap: env_or("AGGREGATION_FILTERING_MAX_ISSUES_PER_FILE", 10usize),
            },
            decision: DecisionConfig { max_retries: env_or("DECISION_MAX_RETRIES", 3u32) },
            context: context_engine::OrchestratorConfig {
                enabled: env_or("CONTEXT_ENABLED", true),
                max_diff_lines: env_or("CONTEXT_MAX_DIFF_LINES", 30usize),
                skip_large_diff: env_or("CONTEXT_ROLLOUT_SKIP_LARGE_DIFF", true),
                strategy_timeout: Duration::from_millis(env_or("CONTEXT_STRATEGY_TIMEOUT_MS", 1000u64)),
                enabled_strategies: context_engine::strategies::ALL_STRATEGIES.to_vec(),
            },
            llm,
            scm: scm_client::ScmConfig {
                provider,
                base_api: must_env("SCM_BASE_API")?,
                token: must_env("SCM_TOKEN")?,
            },
            broker: broker::BrokerConfig {
                redis_url: env_or("BROKER_REDIS_URL", "redis://127.0.0.1:6379".to_string()),
                stream: env_or("CONSUMER_STREAM", "review:requests".to_string()),
                idempotency_ttl_secs: env_or("BROKER_IDEMPOTENCY_TTL_SECS", 24 * 3600u64),
                result_ttl_secs: env_or("BROKER_RESULT_TTL_SECS", 24 * 3600u64),
            },
        })
    }

    /// Backoff delay for retry attempt `n` (0-indexed), capped at 30s per
    /// spec §4.10.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let capped_exp = attempt.min(5);
        let secs = 2u64.saturating_pow(capped_exp);
        Duration::from_secs(secs.min(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> PipelineConfig {
        PipelineConfig {
            consumer: ConsumerConfig {
                stream: "s".into(),
                group: "g".into(),
                consumer: "c".into(),
                batch: 10,
                block_for: Duration::from_secs(1),
            },
            clone: CloneConfig {
                concurrency: 1,
                timeout: Duration::from_secs(1),
                token: None,
                workspace_root: "/tmp/review-workspaces".into(),
            },
            docker: DockerConfig {
                image: "alpine".into(),
                memory_bytes: 1,
                cpu_nano_cores: 1,
                timeout: Duration::from_secs(1),
                network_disabled: false,
            },
            aggregation: aggregator::AggregatorConfig::default(),
            decision: DecisionConfig { max_retries: 3 },
            context: context_engine::OrchestratorConfig::default(),
            llm: llm_driver::LlmConfig {
                provider: llm_driver::LlmProvider::Ollama,
                model: "test".into(),
                base_url: "http://localhost:11434".into(),
                api_key: None,
                timeout: Duration::from_secs(1),
            },
            scm: scm_client::ScmConfig {
                provider: review_model::Provider::Github,
                base_api: "https://example.test".into(),
                token: "t".into(),
            },
            broker: broker::BrokerConfig {
                redis_url: "redis://127.0.0.1:6379".into(),
                stream: "s".into(),
                idempotency_ttl_secs: 1,
                result_ttl_secs: 1,
            },
        }
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let cfg = dummy();
        assert_eq!(cfg.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(cfg.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(cfg.backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(cfg.backoff_for_attempt(5), Duration::from_secs(30));
        assert_eq!(cfg.backoff_for_attempt(20), Duration::from_secs(30));
    }
}
