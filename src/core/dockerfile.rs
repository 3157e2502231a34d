use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::image::ImageRef;
use crate::error::{ImageGraphError, Result};

static FROM_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*FROM\s+(.*)$").expect("FROM pattern is valid"));

/// A Dockerfile located at `<image>/<version>/Dockerfile`.
#[derive(Debug, Clone)]
pub struct DockerfileLocation {
    pub path: PathBuf,
    pub image: ImageRef,
}

impl DockerfileLocation {
    pub fn resolve(path: &Path) -> Result<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        if !absolute.is_file() {
            return Err(ImageGraphError::DockerfileNotFound(path.to_path_buf()));
        }
        let image = image_from_path(&absolute)
            .ok_or_else(|| ImageGraphError::MalformedPath(path.to_path_buf()))?;
        Ok(Self {
            path: absolute,
            image,
        })
    }
}

/// The parent directory is the version, the one above it the image name.
pub fn image_from_path(path: &Path) -> Option<ImageRef> {
    let version_dir = path.parent()?;
    let name_dir = version_dir.parent()?;
    let version = version_dir.file_name()?.to_str()?;
    let name = name_dir.file_name()?.to_str()?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some(ImageRef::new(name, version))
}

pub fn read_parents(location: &DockerfileLocation) -> Result<Vec<String>> {
    let contents = fs::read_to_string(&location.path)?;
    parse_parents(&contents, &location.path)
}

/// Collects `image:tag` labels from every `FROM` line, in order and without
/// duplicates. `scratch` and references to earlier build stages are skipped.
pub fn parse_parents(contents: &str, dockerfile: &Path) -> Result<Vec<String>> {
    let mut parents = Vec::new();
    let mut stages = HashSet::new();
    for line in contents.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let Some(captures) = FROM_LINE.captures(line) else {
            continue;
        };
        let mut tokens = captures[1]
            .split_whitespace()
            .filter(|token| !token.starts_with("--"));
        let Some(reference) = tokens.next() else {
            continue;
        };
        let alias = match (tokens.next(), tokens.next()) {
            (Some(keyword), Some(name)) if keyword.eq_ignore_ascii_case("as") => {
                Some(name.to_lowercase())
            }
            _ => None,
        };

        let label = base_label(reference);
        let is_stage = stages.contains(&reference.to_lowercase());
        if let Some(alias) = alias {
            stages.insert(alias);
        }
        if is_stage || label.eq_ignore_ascii_case("scratch") {
            continue;
        }
        if ImageRef::parse(&label).is_none() {
            return Err(ImageGraphError::UntaggedParent {
                dockerfile: dockerfile.to_path_buf(),
                reference: reference.to_string(),
            });
        }
        if !parents.contains(&label) {
            parents.push(label);
        }
    }

    Ok(parents)
}

/// `registry:5000/org/image:tag@sha256:..` becomes `image:tag`.
fn base_label(reference: &str) -> String {
    let without_digest = reference.split('@').next().unwrap_or(reference);
    without_digest
        .rsplit('/')
        .next()
        .unwrap_or(without_digest)
        .to_string()
}
