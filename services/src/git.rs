//! Clones a repository into a fresh workspace directory for the sandbox
//! runner (§4.6/§4.10 step 4). Generalizes the teacher's SSH-key clone into
//! HTTPS token auth, matching `clone.token` in the configuration surface
//! (§6) rather than a filesystem key path.

use std::path::{Path, PathBuf};

use git2::{Cred, FetchOptions, RemoteCallbacks};
use review_model::Provider;
use tracing::{info, instrument, warn};

use crate::errors::ServicesResult;

/// Public clone host per provider. Self-hosted instances are out of scope:
/// callers targeting a private GitLab/Bitbucket deployment should construct
/// `repo_url` themselves and call [`clone_to`] directly.
pub fn clone_url(provider: Provider, repository_id: &str) -> String {
    let host = match provider {
        Provider::Github => "github.com",
        Provider::Gitlab => "gitlab.com",
        Provider::Bitbucket => "bitbucket.org",
    };
    format!("https://{host}/{repository_id}.git")
}

fn extract_repo_name(repo_url: &str) -> Option<String> {
    let last = repo_url.split('/').next_back()?.trim_end_matches(".git");
    Some(last.to_string())
}

fn credentials_callback(token: Option<String>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| match &token {
        Some(token) => Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), token),
        None => Cred::default(),
    });
    callbacks
}

/// Clones `repo_url` into a fresh subdirectory of `workspace_root`, checks
/// out `head_sha` when given, and returns the clone's local path. The
/// caller owns removing the directory once the sandbox run is done.
#[instrument(skip(token), fields(%repo_url))]
pub fn clone_to(repo_url: &str, head_sha: Option<&str>, token: Option<String>, workspace_root: &Path) -> ServicesResult<PathBuf> {
    let dir_name = format!("{}-{}", extract_repo_name(repo_url).unwrap_or_else(|| "repo".to_string()), uuid::Uuid::new_v4());
    let target_dir = workspace_root.join(dir_name);
    std::fs::create_dir_all(workspace_root)?;

    info!(target = %target_dir.display(), "cloning repository into workspace");

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(credentials_callback(token));

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let repo = builder.clone(repo_url, &target_dir)?;

    if let Some(sha) = head_sha {
        let oid = git2::Oid::from_str(sha)?;
        let commit = repo.find_commit(oid)?;
        repo.checkout_tree(commit.as_object(), None)?;
        repo.set_head_detached(oid)?;
    }

    info!(target = %target_dir.display(), "workspace ready");
    Ok(target_dir)
}

/// Best-effort cleanup; failures are logged, not propagated, since a leaked
/// workspace directory is a disk-space concern, not a correctness one.
pub fn remove_workspace(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %e, "failed to remove workspace directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_url_uses_provider_host() {
        assert_eq!(clone_url(Provider::Github, "owner/repo"), "https://github.com/owner/repo.git");
        assert_eq!(clone_url(Provider::Gitlab, "group/project"), "https://gitlab.com/group/project.git");
        assert_eq!(clone_url(Provider::Bitbucket, "team/repo"), "https://bitbucket.org/team/repo.git");
    }

    #[test]
    fn extract_repo_name_strips_git_suffix() {
        assert_eq!(extract_repo_name("https://github.com/owner/repo.git"), Some("repo".to_string()));
        assert_eq!(extract_repo_name("https://github.com/owner/repo"), Some("repo".to_string()));
    }
}
