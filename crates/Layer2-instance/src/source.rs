//! Source resolution
//!
//! Turns the command line's source flags into one concrete git reference.
//! A straightforward mapping with no state of its own; the checkout itself
//! happens in `repo`.

use sprig_foundation::{Error, Result};
use tracing::warn;

/// Default remote for fetch operations
pub const DEFAULT_REMOTE: &str = "origin";

/// Raw source-selection options from the command line
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// First positional argument, treated as a branch name
    pub positional: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    /// GitHub pull-request URL
    pub pr: Option<String>,
    pub remote: Option<String>,
}

/// A resolved git reference to check out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Branch { name: String },
    Tag { name: String },
    Commit { hash: String },
    PullRequest { number: u64, repo_url: String },
}

/// A resolved source plus the remote it fetches through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub source: Source,
    pub remote: String,
}

impl Source {
    /// Display reference name, also used to derive the instance name
    pub fn ref_name(&self) -> String {
        match self {
            Source::Branch { name } => name.clone(),
            Source::Tag { name } => name.clone(),
            Source::Commit { hash } => hash.clone(),
            Source::PullRequest { number, .. } => format!("pr-{number}"),
        }
    }

    /// Repository URL override for sources that carry one (PRs)
    pub fn repo_url(&self) -> Option<&str> {
        match self {
            Source::PullRequest { repo_url, .. } => Some(repo_url),
            _ => None,
        }
    }

    /// Resolve command-line options into a concrete source.
    ///
    /// Precedence follows the original flag handling: PR, then commit, then
    /// tag, then `--branch`, then the positional argument. With nothing
    /// given the branch defaults to `main`.
    pub fn resolve(opts: &SourceOptions) -> Result<ResolvedSource> {
        let remote = opts
            .remote
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        let source = if let Some(pr_url) = &opts.pr {
            parse_github_pr_url(pr_url)?
        } else if let Some(hash) = &opts.commit {
            Source::Commit { hash: hash.clone() }
        } else if let Some(name) = &opts.tag {
            Source::Tag { name: name.clone() }
        } else if let Some(name) = opts.branch.as_ref().or(opts.positional.as_ref()) {
            Source::Branch { name: name.clone() }
        } else {
            warn!("no source (branch, tag, commit, PR) provided, defaulting to branch 'main'");
            Source::Branch {
                name: "main".to_string(),
            }
        };

        Ok(ResolvedSource { source, remote })
    }
}

/// Parse `https://github.com/<owner>/<repo>/pull/<n>` into a PR source
fn parse_github_pr_url(url: &str) -> Result<Source> {
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "unsupported PR provider for URL {url}; only GitHub is currently supported"
            ))
        })?;

    let parts: Vec<&str> = rest.trim_matches('/').split('/').collect();
    match parts.as_slice() {
        [owner, repo, "pull", number] => {
            let number: u64 = number.parse().map_err(|_| {
                Error::InvalidInput(format!("could not parse GitHub PR number from URL {url}"))
            })?;
            Ok(Source::PullRequest {
                number,
                repo_url: format!("https://github.com/{owner}/{repo}.git"),
            })
        }
        _ => Err(Error::InvalidInput(format!(
            "invalid GitHub PR URL format: {url}"
        ))),
    }
}
