//! GitLab provider (REST v4): MR metadata, commits, diffs, discussions.
//!
//! Endpoints used:
//!   * GET  /projects/:id/merge_requests/:iid
//!   * GET  /projects/:id/merge_requests/:iid/commits
//!   * GET  /projects/:id/merge_requests/:iid/raw_diffs
//!   * GET  /projects/:id/repository/files/:path/raw?ref=:ref
//!   * GET  /projects/:id/repository/tree?ref=:ref&recursive=true
//!   * GET  /projects/:id/members/all?query=...
//!   * POST /projects/:id/merge_requests/:iid/discussions
//!   * POST /projects/:id/merge_requests/:iid/notes

use chrono::{DateTime, Utc};
use diff_core::GitDiffDocument;
use review_model::ReviewFinding;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ScmResult;
use crate::types::{AuthorInfo, CommitInfo, DiffRefs, PullRequestMetadata};

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    base_api: String,
    token: String,
}

impl GitLabClient {
    pub fn new(http: reqwest::Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    fn project_url(&self, project: &str, suffix: &str) -> String {
        format!("{}/projects/{}{}", self.base_api, urlencoding::encode(project), suffix)
    }

    pub async fn get_pull_request_metadata(&self, project: &str, iid: i64) -> ScmResult<PullRequestMetadata> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}"));
        debug!(%url, "gitlab get_pull_request_metadata");

        let resp: GitLabMr = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PullRequestMetadata {
            provider: review_model::Provider::Gitlab,
            title: resp.title,
            description: resp.description,
            author: AuthorInfo {
                id: resp.author.id.to_string(),
                username: Some(resp.author.username),
                name: Some(resp.author.name),
                web_url: resp.author.web_url,
            },
            state: resp.state,
            web_url: resp.web_url,
            created_at: resp.created_at,
            updated_at: resp.updated_at,
            source_branch: Some(resp.source_branch),
            target_branch: Some(resp.target_branch),
            diff_refs: DiffRefs {
                base_sha: resp.diff_refs.base_sha,
                start_sha: Some(resp.diff_refs.start_sha),
                head_sha: resp.diff_refs.head_sha,
            },
        })
    }

    pub async fn get_diff(&self, project: &str, iid: i64) -> ScmResult<GitDiffDocument> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}/raw_diffs"));
        debug!(%url, "gitlab get_diff");

        let raw = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        diff_core::parse(&raw).map_err(|e| crate::errors::ScmError::InvalidResponse(e.to_string()))
    }

    pub async fn get_file_content(&self, project: &str, path: &str, git_ref: &str) -> ScmResult<Option<Vec<u8>>> {
        let url = self.project_url(project, &format!("/repository/files/{}/raw", urlencoding::encode(path)));
        debug!(%url, "gitlab get_file_content");

        let resp = self
            .http
            .get(url)
            .query(&[("ref", git_ref)])
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let bytes = resp.error_for_status()?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    pub async fn list_repository_files(&self, project: &str, git_ref: &str) -> ScmResult<Vec<String>> {
        let url = self.project_url(project, "/repository/tree");
        debug!(%url, "gitlab list_repository_files");

        let entries: Vec<GitLabTreeEntry> = self
            .http
            .get(url)
            .query(&[("ref", git_ref), ("recursive", "true"), ("per_page", "100")])
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entries.into_iter().filter(|e| e.entry_type == "blob").map(|e| e.path).collect())
    }

    pub async fn publish_review(&self, project: &str, iid: i64, diff_refs: &DiffRefs, findings: &[ReviewFinding]) -> ScmResult<()> {
        if findings.is_empty() {
            debug!("no findings to post for gitlab MR");
            return Ok(());
        }
        let url = self.project_url(project, &format!("/merge_requests/{iid}/discussions"));

        for finding in findings {
            let start_sha = diff_refs.start_sha.as_deref().unwrap_or(&diff_refs.base_sha);
            let position = GitLabPosition {
                base_sha: &diff_refs.base_sha,
                start_sha,
                head_sha: &diff_refs.head_sha,
                position_type: "text",
                new_path: &finding.file,
                new_line: finding.start_line,
            };
            let body = format!("**[{:?}] {}**\n\n{}", finding.severity, finding.title, finding.suggestion);
            let payload = GitLabDiscussionCreate { body: &body, position };

            let resp = self.http.post(&url).header("PRIVATE-TOKEN", &self.token).json(&payload).send().await?;
            if let Err(err) = resp.error_for_status_ref() {
                warn!(?err, file = %finding.file, line = finding.start_line, "failed to post gitlab discussion");
            }
            let _ = resp.bytes().await;
        }
        Ok(())
    }

    pub async fn publish_summary_comment(&self, project: &str, iid: i64, markdown: &str) -> ScmResult<()> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}/notes"));
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&GitLabNoteCreate { body: markdown })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn is_change_request_open(&self, project: &str, iid: i64) -> ScmResult<bool> {
        let meta = self.get_pull_request_metadata(project, iid).await?;
        Ok(meta.state == "opened")
    }

    pub async fn has_write_access(&self, project: &str) -> ScmResult<bool> {
        let url = self.project_url(project, "/members/all");
        let members: Vec<GitLabMember> = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        // Developer access level in GitLab is 30; Reporter (20) cannot push.
        Ok(members.iter().any(|m| m.access_level >= 30))
    }

    pub async fn get_commits_for(&self, project: &str, iid: i64) -> ScmResult<Vec<CommitInfo>> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}/commits"));
        let raw: Vec<GitLabCommit> = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(raw
            .into_iter()
            .map(|c| CommitInfo { id: c.id, title: c.title, message: Some(c.message), author_name: Some(c.author_name), authored_at: c.created_at })
            .collect())
    }

    pub async fn get_commits_since(&self, project: &str, iid: i64, since_sha: &str) -> ScmResult<Vec<CommitInfo>> {
        let all = self.get_commits_for(project, iid).await?;
        match all.iter().position(|c| c.id == since_sha) {
            Some(idx) => Ok(all[..idx].to_vec()),
            None => Ok(all),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitLabMr {
    title: String,
    description: Option<String>,
    web_url: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    source_branch: String,
    target_branch: String,
    diff_refs: GitLabDiffRefs,
    author: GitLabUser,
}

#[derive(Debug, Deserialize)]
struct GitLabDiffRefs {
    base_sha: String,
    head_sha: String,
    start_sha: String,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    id: u64,
    username: String,
    name: String,
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabTreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct GitLabMember {
    access_level: u32,
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
    title: String,
    message: String,
    author_name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct GitLabPosition<'a> {
    base_sha: &'a str,
    start_sha: &'a str,
    head_sha: &'a str,
    position_type: &'static str,
    new_path: &'a str,
    new_line: u32,
}

#[derive(Debug, Serialize)]
struct GitLabDiscussionCreate<'a> {
    body: &'a str,
    position: GitLabPosition<'a>,
}

#[derive(Debug, Serialize)]
struct GitLabNoteCreate<'a> {
    body: &'a str,
}
