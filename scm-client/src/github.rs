//! GitHub provider (REST v3): PR metadata, commits, diffs, review comments.
//!
//! Endpoints used:
//!   * GET  /repos/{owner}/{repo}/pulls/{number}
//!   * GET  /repos/{owner}/{repo}/pulls/{number}/commits
//!   * GET  /repos/{owner}/{repo}/pulls/{number}/files (unified diff per file)
//!   * GET  /repos/{owner}/{repo}/contents/{path}?ref={ref}
//!   * GET  /repos/{owner}/{repo}/git/trees/{ref}?recursive=1
//!   * GET  /repos/{owner}/{repo}/collaborators/{user}/permission
//!   * POST /repos/{owner}/{repo}/pulls/{number}/comments
//!   * POST /repos/{owner}/{repo}/issues/{number}/comments

use base64::Engine;
use chrono::{DateTime, Utc};
use diff_core::GitDiffDocument;
use review_model::ReviewFinding;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ScmResult;
use crate::types::{AuthorInfo, CommitInfo, DiffRefs, PullRequestMetadata};

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_api: String,
    token: String,
}

fn split_owner_repo(project: &str) -> ScmResult<(String, String)> {
    project
        .split_once('/')
        .map(|(o, r)| (o.to_string(), r.to_string()))
        .ok_or_else(|| crate::errors::ScmError::InvalidResponse(format!("expected owner/repo, got {project}")))
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    pub async fn get_pull_request_metadata(&self, project: &str, number: i64) -> ScmResult<PullRequestMetadata> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_api);
        debug!(%url, "github get_pull_request_metadata");

        let resp: GitHubPr = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PullRequestMetadata {
            provider: review_model::Provider::Github,
            title: resp.title,
            description: resp.body,
            author: AuthorInfo { id: resp.user.id.to_string(), username: Some(resp.user.login), name: None, web_url: resp.user.html_url },
            state: resp.state,
            web_url: resp.html_url,
            created_at: resp.created_at,
            updated_at: resp.updated_at,
            source_branch: Some(resp.head.ref_field),
            target_branch: Some(resp.base.ref_field),
            diff_refs: DiffRefs { base_sha: resp.base.sha, start_sha: None, head_sha: resp.head.sha },
        })
    }

    pub async fn get_diff(&self, project: &str, number: i64) -> ScmResult<GitDiffDocument> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}/files", self.base_api);
        debug!(%url, "github get_diff");

        let files: Vec<GitHubFile> = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .query(&[("per_page", "100")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut doc = GitDiffDocument::default();
        for f in files {
            let Some(patch) = f.patch else { continue };
            let wrapped = format!("--- a/{0}\n+++ b/{0}\n{patch}\n", f.filename);
            let parsed = diff_core::parse(&wrapped).map_err(|e| crate::errors::ScmError::InvalidResponse(e.to_string()))?;
            doc.files.extend(parsed.files);
        }
        Ok(doc)
    }

    pub async fn get_file_content(&self, project: &str, path: &str, git_ref: &str) -> ScmResult<Option<Vec<u8>>> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_api);

        let resp = self
            .http
            .get(url)
            .query(&[("ref", git_ref)])
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let body: GitHubContent = resp.error_for_status()?.json().await?;
        let cleaned: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| crate::errors::ScmError::InvalidResponse(e.to_string()))?;
        Ok(Some(bytes))
    }

    pub async fn list_repository_files(&self, project: &str, git_ref: &str) -> ScmResult<Vec<String>> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/git/trees/{git_ref}", self.base_api);
        let tree: GitHubTree = self
            .http
            .get(url)
            .query(&[("recursive", "1")])
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tree.tree.into_iter().filter(|e| e.entry_type == "blob").map(|e| e.path).collect())
    }

    pub async fn publish_review(&self, project: &str, number: i64, diff_refs: &DiffRefs, findings: &[ReviewFinding]) -> ScmResult<()> {
        if findings.is_empty() {
            return Ok(());
        }
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}/comments", self.base_api);

        for finding in findings {
            let body = format!("**[{:?}] {}**\n\n{}", finding.severity, finding.title, finding.suggestion);
            let payload = GitHubReviewComment { body: &body, commit_id: &diff_refs.head_sha, path: &finding.file, line: finding.start_line };
            let resp = self
                .http
                .post(&url)
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", "scm-client")
                .json(&payload)
                .send()
                .await?;
            if let Err(err) = resp.error_for_status_ref() {
                warn!(?err, file = %finding.file, "failed to post github review comment");
            }
            let _ = resp.bytes().await;
        }
        Ok(())
    }

    pub async fn publish_summary_comment(&self, project: &str, number: i64, markdown: &str) -> ScmResult<()> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/issues/{number}/comments", self.base_api);
        self.http
            .post(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .json(&serde_json::json!({ "body": markdown }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn is_change_request_open(&self, project: &str, number: i64) -> ScmResult<bool> {
        Ok(self.get_pull_request_metadata(project, number).await?.state == "open")
    }

    pub async fn has_write_access(&self, project: &str) -> ScmResult<bool> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}", self.base_api);
        let repo_info: GitHubRepo = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(repo_info.permissions.map(|p| p.push).unwrap_or(false))
    }

    pub async fn get_commits_for(&self, project: &str, number: i64) -> ScmResult<Vec<CommitInfo>> {
        let (owner, repo) = split_owner_repo(project)?;
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}/commits", self.base_api);
        let raw: Vec<GitHubCommit> = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scm-client")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(raw
            .into_iter()
            .map(|c| CommitInfo { id: c.sha, title: c.commit.message.lines().next().unwrap_or_default().to_string(), message: Some(c.commit.message), author_name: c.commit.author.map(|a| a.name), authored_at: None })
            .collect())
    }

    pub async fn get_commits_since(&self, project: &str, number: i64, since_sha: &str) -> ScmResult<Vec<CommitInfo>> {
        let all = self.get_commits_for(project, number).await?;
        match all.iter().position(|c| c.id == since_sha) {
            Some(idx) => Ok(all[..idx].to_vec()),
            None => Ok(all),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubBranch {
    sha: String,
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPr {
    title: String,
    body: Option<String>,
    html_url: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user: GitHubUser,
    head: GitHubBranch,
    base: GitHubBranch,
}

#[derive(Debug, Deserialize)]
struct GitHubFile {
    filename: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GitHubTreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GitHubPermissions {
    push: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    #[serde(default)]
    permissions: Option<GitHubPermissions>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    message: String,
    #[serde(default)]
    author: Option<GitHubCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitDetail,
}

#[derive(Debug, Serialize)]
struct GitHubReviewComment<'a> {
    body: &'a str,
    commit_id: &'a str,
    path: &'a str,
    line: u32,
}
