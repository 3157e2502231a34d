pub mod project;
pub mod resolve;

pub use project::{GitConfig, GraphConfig, ProjectConfig, RegistryConfig};
pub use resolve::Settings;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid repository root: {0}")]
    InvalidRoot(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config at {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("docker hub organization is not set; use --owner, DOCKERHUB_ORG or [registry].owner")]
    MissingOwner,
    #[error("deploy branch is not set; use DEPLOY_BRANCH or [git].deploy_branch")]
    MissingDeployBranch,
    #[error("unknown latest policy '{0}', expected 'merged' or 'highest'")]
    InvalidLatestPolicy(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
