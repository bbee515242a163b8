//! Bitbucket Cloud provider (REST 2.0): PR metadata, commits, diffs, comments.
//!
//! Endpoints used:
//!   * GET  /repositories/{workspace}/{repo_slug}/pullrequests/{id}
//!   * GET  /repositories/{workspace}/{repo_slug}/pullrequests/{id}/diff
//!   * GET  /repositories/{workspace}/{repo_slug}/pullrequests/{id}/commits
//!   * GET  /repositories/{workspace}/{repo_slug}/src/{ref}/{path}
//!   * POST /repositories/{workspace}/{repo_slug}/pullrequests/{id}/comments

use chrono::{DateTime, Utc};
use diff_core::GitDiffDocument;
use review_model::ReviewFinding;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ScmResult;
use crate::types::{AuthorInfo, CommitInfo, DiffRefs, PullRequestMetadata};

#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    base_api: String,
    token: String,
}

fn split_workspace_repo(project: &str) -> ScmResult<(String, String)> {
    project
        .split_once('/')
        .map(|(w, r)| (w.to_string(), r.to_string()))
        .ok_or_else(|| crate::errors::ScmError::InvalidResponse(format!("expected workspace/repo_slug, got {project}")))
}

impl BitbucketClient {
    pub fn new(http: reqwest::Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    fn pr_url(&self, project: &str, id: i64, suffix: &str) -> ScmResult<String> {
        let (workspace, repo) = split_workspace_repo(project)?;
        Ok(format!("{}/repositories/{workspace}/{repo}/pullrequests/{id}{suffix}", self.base_api))
    }

    pub async fn get_pull_request_metadata(&self, project: &str, id: i64) -> ScmResult<PullRequestMetadata> {
        let url = self.pr_url(project, id, "")?;
        debug!(%url, "bitbucket get_pull_request_metadata");

        let resp: BitbucketPr = self.http.get(url).bearer_auth(&self.token).send().await?.error_for_status()?.json().await?;

        Ok(PullRequestMetadata {
            provider: review_model::Provider::Bitbucket,
            title: resp.title,
            description: Some(resp.description),
            author: AuthorInfo { id: resp.author.account_id.clone(), username: Some(resp.author.nickname), name: Some(resp.author.display_name), web_url: None },
            state: resp.state,
            web_url: resp.links.html.href,
            created_at: resp.created_on,
            updated_at: resp.updated_on,
            source_branch: Some(resp.source.branch.name),
            target_branch: Some(resp.destination.branch.name),
            diff_refs: DiffRefs { base_sha: resp.destination.commit.hash, start_sha: None, head_sha: resp.source.commit.hash },
        })
    }

    pub async fn get_diff(&self, project: &str, id: i64) -> ScmResult<GitDiffDocument> {
        let url = self.pr_url(project, id, "/diff")?;
        debug!(%url, "bitbucket get_diff");

        let raw = self.http.get(url).bearer_auth(&self.token).send().await?.error_for_status()?.text().await?;
        diff_core::parse(&raw).map_err(|e| crate::errors::ScmError::InvalidResponse(e.to_string()))
    }

    pub async fn get_file_content(&self, project: &str, path: &str, git_ref: &str) -> ScmResult<Option<Vec<u8>>> {
        let (workspace, repo) = split_workspace_repo(project)?;
        let url = format!("{}/repositories/{workspace}/{repo}/src/{git_ref}/{path}", self.base_api);

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let bytes = resp.error_for_status()?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    pub async fn list_repository_files(&self, project: &str, git_ref: &str) -> ScmResult<Vec<String>> {
        let (workspace, repo) = split_workspace_repo(project)?;
        let url = format!("{}/repositories/{workspace}/{repo}/src/{git_ref}/", self.base_api);

        let listing: BitbucketSrcListing = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("max_depth", "25"), ("pagelen", "100")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.values.into_iter().filter(|e| e.entry_type == "commit_file").map(|e| e.path).collect())
    }

    pub async fn publish_review(&self, project: &str, id: i64, _diff_refs: &DiffRefs, findings: &[ReviewFinding]) -> ScmResult<()> {
        if findings.is_empty() {
            return Ok(());
        }
        let url = self.pr_url(project, id, "/comments")?;

        for finding in findings {
            let body = format!("**[{:?}] {}**\n\n{}", finding.severity, finding.title, finding.suggestion);
            let payload = BitbucketCommentCreate {
                content: BitbucketCommentContent { raw: body },
                inline: BitbucketInline { path: finding.file.clone(), to: finding.start_line },
            };
            let resp = self.http.post(&url).bearer_auth(&self.token).json(&payload).send().await?;
            if let Err(err) = resp.error_for_status_ref() {
                warn!(?err, file = %finding.file, "failed to post bitbucket comment");
            }
            let _ = resp.bytes().await;
        }
        Ok(())
    }

    pub async fn publish_summary_comment(&self, project: &str, id: i64, markdown: &str) -> ScmResult<()> {
        let url = self.pr_url(project, id, "/comments")?;
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "content": { "raw": markdown } }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn is_change_request_open(&self, project: &str, id: i64) -> ScmResult<bool> {
        Ok(self.get_pull_request_metadata(project, id).await?.state == "OPEN")
    }

    pub async fn has_write_access(&self, project: &str) -> ScmResult<bool> {
        let (workspace, repo) = split_workspace_repo(project)?;
        let url = format!("{}/repositories/{workspace}/{repo}", self.base_api);
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        // Bitbucket returns the repo only if the token's principal can at least read it;
        // write access requires a dedicated permissions lookup not exposed uniformly across
        // Cloud/Server, so this conservatively reports read-confirmed access.
        Ok(resp.status().is_success())
    }

    pub async fn get_commits_for(&self, project: &str, id: i64) -> ScmResult<Vec<CommitInfo>> {
        let url = self.pr_url(project, id, "/commits")?;
        let page: BitbucketCommitPage = self.http.get(url).bearer_auth(&self.token).send().await?.error_for_status()?.json().await?;
        Ok(page
            .values
            .into_iter()
            .map(|c| CommitInfo { id: c.hash, title: c.message.lines().next().unwrap_or_default().to_string(), message: Some(c.message), author_name: c.author.user.map(|u| u.display_name), authored_at: Some(c.date) })
            .collect())
    }

    pub async fn get_commits_since(&self, project: &str, id: i64, since_sha: &str) -> ScmResult<Vec<CommitInfo>> {
        let all = self.get_commits_for(project, id).await?;
        match all.iter().position(|c| c.id == since_sha) {
            Some(idx) => Ok(all[..idx].to_vec()),
            None => Ok(all),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BitbucketAccount {
    account_id: String,
    nickname: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketHtmlLink {
    href: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketLinks {
    html: BitbucketHtmlLink,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketEndpoint {
    branch: BitbucketBranchRef,
    commit: BitbucketCommitRef,
}

#[derive(Debug, Deserialize)]
struct BitbucketPr {
    title: String,
    #[serde(default)]
    description: String,
    state: String,
    created_on: DateTime<Utc>,
    updated_on: DateTime<Utc>,
    author: BitbucketAccount,
    links: BitbucketLinks,
    source: BitbucketEndpoint,
    destination: BitbucketEndpoint,
}

#[derive(Debug, Deserialize)]
struct BitbucketSrcEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketSrcListing {
    values: Vec<BitbucketSrcEntry>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitUser {
    #[serde(default)]
    user: Option<BitbucketAccount>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommit {
    hash: String,
    message: String,
    date: DateTime<Utc>,
    author: BitbucketCommitUser,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitPage {
    values: Vec<BitbucketCommit>,
}

#[derive(Debug, Serialize)]
struct BitbucketCommentContent {
    raw: String,
}

#[derive(Debug, Serialize)]
struct BitbucketInline {
    path: String,
    to: u32,
}

#[derive(Debug, Serialize)]
struct BitbucketCommentCreate {
    content: BitbucketCommentContent,
    inline: BitbucketInline,
}
