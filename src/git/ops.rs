use std::fmt;

use crate::error::Result;
use crate::util::output;
use crate::util::process::{run_checked, to_args, CommandRunner};

/// Two revisions handed to `git diff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRange {
    pub start: String,
    pub end: String,
}

impl fmt::Display for CompareRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.end)
    }
}

impl CompareRange {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let (start, end) = match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None) => (start, end),
            (Some(single), None, None) => single.split_once("..")?,
            _ => return None,
        };
        if start.is_empty() || end.is_empty() {
            return None;
        }
        Some(Self {
            start: start.to_string(),
            end: end.to_string(),
        })
    }
}

/// Branch name from `GITHUB_REF` when CI provides it, else from git.
pub fn current_branch(runner: &dyn CommandRunner, github_ref: Option<&str>) -> Result<String> {
    if let Some(reference) = github_ref.map(str::trim).filter(|r| !r.is_empty()) {
        if let Some(name) = reference.rsplit('/').next() {
            return Ok(name.to_string());
        }
    }

    let stdout = run_checked(runner, "git", &to_args(["rev-parse", "--abbrev-ref", "HEAD"]))?;
    Ok(stdout.trim().to_string())
}

/// On the deploy branch the merge commit's two parents are compared; anywhere
/// else the build head is compared against the remote deploy branch.
pub fn compare_range(current: &str, deploy: &str, remote: &str) -> CompareRange {
    if current == deploy {
        CompareRange {
            start: "HEAD^1".to_string(),
            end: "HEAD^2".to_string(),
        }
    } else {
        CompareRange {
            start: format!("{remote}/{deploy}"),
            end: "HEAD".to_string(),
        }
    }
}

/// CI checkouts are detached and shallow on the refspec; make the deploy
/// branch available locally, then return to the build head. Returns false
/// when already on the deploy branch.
pub fn fetch_deploy_branch(
    runner: &dyn CommandRunner,
    current: &str,
    deploy: &str,
    remote: &str,
) -> Result<bool> {
    if current == deploy {
        return Ok(false);
    }

    let build_head = run_checked(runner, "git", &to_args(["rev-parse", "HEAD"]))?
        .trim()
        .to_string();
    let refspec = format!("+refs/heads/*:refs/remotes/{remote}/*");
    let config_key = format!("remote.{remote}.fetch");

    output::git_op(&format!("fetch {remote} {deploy}"));
    run_checked(
        runner,
        "git",
        &to_args(["config", "--replace-all", config_key.as_str(), refspec.as_str()]),
    )?;
    run_checked(runner, "git", &to_args(["fetch", remote, deploy]))?;
    run_checked(runner, "git", &to_args(["checkout", "-qf", deploy]))?;
    run_checked(runner, "git", &to_args(["checkout", "-q", build_head.as_str()]))?;
    Ok(true)
}

pub fn changed_paths(runner: &dyn CommandRunner, range: &CompareRange) -> Result<Vec<String>> {
    let stdout = run_checked(
        runner,
        "git",
        &to_args([
            "diff",
            "--name-only",
            "--diff-filter=d",
            range.start.as_str(),
            range.end.as_str(),
        ]),
    )?;
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
