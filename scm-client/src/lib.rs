//! The hosted-SCM collaborator interface (spec §6): consumed, not owned, by
//! the core pipeline. Dispatch is a plain enum over concrete provider
//! clients — no `async-trait`, no boxed futures — mirroring the teacher's
//! `ProviderClient` pattern.

pub mod bitbucket;
pub mod errors;
pub mod github;
pub mod gitlab;
pub mod types;

use diff_core::GitDiffDocument;
use review_model::{Provider, ReviewFinding};

pub use errors::{ScmError, ScmResult};
pub use types::{AuthorInfo, CommitInfo, DiffRefs, PullRequestMetadata};

/// Runtime configuration for a provider client, injected from the worker's
/// `PipelineConfig`.
#[derive(Debug, Clone)]
pub struct ScmConfig {
    pub provider: Provider,
    pub base_api: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub enum ScmClientHandle {
    GitLab(gitlab::GitLabClient),
    GitHub(github::GitHubClient),
    Bitbucket(bitbucket::BitbucketClient),
}

impl ScmClientHandle {
    pub fn from_config(cfg: ScmConfig) -> ScmResult<Self> {
        let http = reqwest::Client::builder().user_agent("scm-client/0.1").build()?;
        Ok(match cfg.provider {
            Provider::Gitlab => ScmClientHandle::GitLab(gitlab::GitLabClient::new(http, cfg.base_api, cfg.token)),
            Provider::Github => ScmClientHandle::GitHub(github::GitHubClient::new(http, cfg.base_api, cfg.token)),
            Provider::Bitbucket => ScmClientHandle::Bitbucket(bitbucket::BitbucketClient::new(http, cfg.base_api, cfg.token)),
        })
    }

    pub async fn get_diff(&self, repository_id: &str, change_request_id: i64) -> ScmResult<GitDiffDocument> {
        match self {
            Self::GitLab(c) => c.get_diff(repository_id, change_request_id).await,
            Self::GitHub(c) => c.get_diff(repository_id, change_request_id).await,
            Self::Bitbucket(c) => c.get_diff(repository_id, change_request_id).await,
        }
    }

    pub async fn get_file_content(&self, repository_id: &str, path: &str, git_ref: &str) -> ScmResult<Option<Vec<u8>>> {
        match self {
            Self::GitLab(c) => c.get_file_content(repository_id, path, git_ref).await,
            Self::GitHub(c) => c.get_file_content(repository_id, path, git_ref).await,
            Self::Bitbucket(c) => c.get_file_content(repository_id, path, git_ref).await,
        }
    }

    pub async fn get_pull_request_metadata(&self, repository_id: &str, change_request_id: i64) -> ScmResult<PullRequestMetadata> {
        match self {
            Self::GitLab(c) => c.get_pull_request_metadata(repository_id, change_request_id).await,
            Self::GitHub(c) => c.get_pull_request_metadata(repository_id, change_request_id).await,
            Self::Bitbucket(c) => c.get_pull_request_metadata(repository_id, change_request_id).await,
        }
    }

    pub async fn list_repository_files(&self, repository_id: &str, git_ref: &str) -> ScmResult<Vec<String>> {
        match self {
            Self::GitLab(c) => c.list_repository_files(repository_id, git_ref).await,
            Self::GitHub(c) => c.list_repository_files(repository_id, git_ref).await,
            Self::Bitbucket(c) => c.list_repository_files(repository_id, git_ref).await,
        }
    }

    pub async fn publish_review(&self, repository_id: &str, change_request_id: i64, diff_refs: &DiffRefs, findings: &[ReviewFinding]) -> ScmResult<()> {
        match self {
            Self::GitLab(c) => c.publish_review(repository_id, change_request_id, diff_refs, findings).await,
            Self::GitHub(c) => c.publish_review(repository_id, change_request_id, diff_refs, findings).await,
            Self::Bitbucket(c) => c.publish_review(repository_id, change_request_id, diff_refs, findings).await,
        }
    }

    pub async fn publish_summary_comment(&self, repository_id: &str, change_request_id: i64, markdown: &str) -> ScmResult<()> {
        match self {
            Self::GitLab(c) => c.publish_summary_comment(repository_id, change_request_id, markdown).await,
            Self::GitHub(c) => c.publish_summary_comment(repository_id, change_request_id, markdown).await,
            Self::Bitbucket(c) => c.publish_summary_comment(repository_id, change_request_id, markdown).await,
        }
    }

    pub async fn is_change_request_open(&self, repository_id: &str, change_request_id: i64) -> ScmResult<bool> {
        match self {
            Self::GitLab(c) => c.is_change_request_open(repository_id, change_request_id).await,
            Self::GitHub(c) => c.is_change_request_open(repository_id, change_request_id).await,
            Self::Bitbucket(c) => c.is_change_request_open(repository_id, change_request_id).await,
        }
    }

    pub async fn has_write_access(&self, repository_id: &str) -> ScmResult<bool> {
        match self {
            Self::GitLab(c) => c.has_write_access(repository_id).await,
            Self::GitHub(c) => c.has_write_access(repository_id).await,
            Self::Bitbucket(c) => c.has_write_access(repository_id).await,
        }
    }

    pub async fn get_commits_for(&self, repository_id: &str, change_request_id: i64) -> ScmResult<Vec<CommitInfo>> {
        match self {
            Self::GitLab(c) => c.get_commits_for(repository_id, change_request_id).await,
            Self::GitHub(c) => c.get_commits_for(repository_id, change_request_id).await,
            Self::Bitbucket(c) => c.get_commits_for(repository_id, change_request_id).await,
        }
    }

    pub async fn get_commits_since(&self, repository_id: &str, change_request_id: i64, since_sha: &str) -> ScmResult<Vec<CommitInfo>> {
        match self {
            Self::GitLab(c) => c.get_commits_since(repository_id, change_request_id, since_sha).await,
            Self::GitHub(c) => c.get_commits_since(repository_id, change_request_id, since_sha).await,
            Self::Bitbucket(c) => c.get_commits_since(repository_id, change_request_id, since_sha).await,
        }
    }
}
