use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ImageGraphError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),
    #[error("dockerfile path must look like <image>/<version>/Dockerfile: {0}")]
    MalformedPath(PathBuf),
    #[error("{dockerfile}: FROM '{reference}' has no tag; base images must be pinned as name:tag")]
    UntaggedParent {
        dockerfile: PathBuf,
        reference: String,
    },
    #[error("invalid image reference '{0}', expected name:version")]
    InvalidImageRef(String),
    #[error("graph file not found: {0}")]
    MissingGraphFile(PathBuf),
    #[error("failed to parse graph at {path}: {source}")]
    GraphParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write graph at {path}: {source}")]
    GraphWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ImageGraphError>;
