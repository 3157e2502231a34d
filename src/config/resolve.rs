use std::env;
use std::path::{Path, PathBuf};

use crate::config::project::CONFIG_FILE;
use crate::config::{ConfigError, ProjectConfig};
use crate::core::version::{parse_latest_policy, LatestPolicy};

/// Explicit values from the command line; they win over env and file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub graph: Option<PathBuf>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub graph_path: PathBuf,
    pub latest_policy: LatestPolicy,
    pub owner: Option<String>,
    pub deploy_branch: Option<String>,
    pub remote: String,
}

impl Settings {
    pub fn resolve(start: impl AsRef<Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(start.as_ref(), overrides, |key| env::var(key).ok())
    }

    fn resolve_with_env(
        start: &Path,
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let root = match overrides.root.or_else(|| lookup("IMAGEGRAPH_ROOT").map(PathBuf::from)) {
            Some(root) if root.is_dir() => root,
            Some(root) => return Err(ConfigError::InvalidRoot(root)),
            None => find_root_from(start).unwrap_or_else(|| start.to_path_buf()),
        };

        let config = load_project_config(&root.join(CONFIG_FILE))?.unwrap_or_default();

        let latest_policy = match config.graph.latest_policy.as_deref() {
            Some(value) => parse_latest_policy(value)
                .ok_or_else(|| ConfigError::InvalidLatestPolicy(value.to_string()))?,
            None => LatestPolicy::default(),
        };

        let graph_path = overrides
            .graph
            .or_else(|| lookup("IMAGEGRAPH_GRAPH").map(PathBuf::from))
            .unwrap_or_else(|| root.join(&config.graph.file));

        let owner = overrides
            .owner
            .or_else(|| lookup("DOCKERHUB_ORG"))
            .or(config.registry.owner)
            .filter(|value| !value.trim().is_empty());
        let deploy_branch = lookup("DEPLOY_BRANCH")
            .or(config.git.deploy_branch)
            .filter(|value| !value.trim().is_empty());
        let remote = config.git.remote.unwrap_or_else(|| "origin".to_string());

        Ok(Self {
            root,
            graph_path,
            latest_policy,
            owner,
            deploy_branch,
            remote,
        })
    }

    pub fn owner(&self) -> Result<&str, ConfigError> {
        self.owner.as_deref().ok_or(ConfigError::MissingOwner)
    }

    pub fn deploy_branch(&self) -> Result<&str, ConfigError> {
        self.deploy_branch
            .as_deref()
            .ok_or(ConfigError::MissingDeployBranch)
    }
}

pub fn load_project_config(path: &Path) -> Result<Option<ProjectConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|ancestor| ancestor.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}
