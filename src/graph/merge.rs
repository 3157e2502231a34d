use std::path::Path;

use glob::{glob_with, MatchOptions};

use crate::core::dockerfile::{read_parents, DockerfileLocation};
use crate::core::image::ImageRef;
use crate::core::version::{should_become_latest, LatestPolicy};
use crate::error::{ImageGraphError, Result};
use crate::graph::store::{load_graph, save_graph};
use crate::graph::{ImageNode, RelationGraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub image: ImageRef,
    pub created: bool,
    pub parents: Vec<String>,
    pub ancestors_updated: Vec<ImageRef>,
    pub ancestors_created: Vec<ImageRef>,
    pub latest_moved: bool,
}

/// Merges one Dockerfile into the graph file at `graph_path`.
///
/// The graph is loaded twice: `snapshot` is only read while `working`
/// collects the updates and is written back in full. Every validation error
/// is raised before the write.
pub fn merge_dockerfile(
    dockerfile: &Path,
    graph_path: &Path,
    policy: LatestPolicy,
) -> Result<MergeOutcome> {
    let location = DockerfileLocation::resolve(dockerfile)?;
    let parents = read_parents(&location)?;

    let snapshot = load_graph(graph_path)?;
    let mut working = load_graph(graph_path)?;

    let outcome = merge_image(&snapshot, &mut working, &location.image, &parents, policy)?;
    save_graph(graph_path, &working)?;

    tracing::info!(
        image = %outcome.image,
        created = outcome.created,
        parents = outcome.parents.len(),
        "merged dockerfile into graph"
    );
    Ok(outcome)
}

/// Updates `working` with the node for `image` and adds `image` as a child of
/// every parent. Lookups go to `snapshot`, which is never modified.
pub fn merge_image(
    snapshot: &RelationGraph,
    working: &mut RelationGraph,
    image: &ImageRef,
    parents: &[String],
    policy: LatestPolicy,
) -> Result<MergeOutcome> {
    let ancestors = parents
        .iter()
        .map(|label| {
            ImageRef::parse(label).ok_or_else(|| ImageGraphError::InvalidImageRef(label.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let self_ref = image.to_string();
    let existing = snapshot.node(image);
    let created = existing.is_none();

    let mut node = ImageNode::default();
    for parent in parents.iter().filter(|parent| **parent != self_ref) {
        node.add_parent(parent);
    }
    if let Some(existing) = existing {
        for parent in existing.parents.iter().filter(|parent| **parent != self_ref) {
            node.add_parent(parent);
        }
        for child in &existing.children {
            node.add_child(child);
        }
    }
    working.insert(image, node);

    // A version first recorded as someone's ancestor is not new when its own
    // Dockerfile arrives, so an image without any latest entry claims it too.
    let current_latest = working.latest_version(&image.name);
    let claims_latest = created || current_latest.is_none();
    let mut latest_moved = false;
    if claims_latest && should_become_latest(policy, current_latest, &image.version) {
        latest_moved = !working.is_latest(image);
        working.set_latest(image);
    }

    let mut ancestors_updated = Vec::new();
    let mut ancestors_created = Vec::new();
    for ancestor in ancestors {
        if ancestor == *image {
            tracing::warn!(image = %image, "dockerfile lists itself as a base image, skipping");
            continue;
        }
        match snapshot.node(&ancestor) {
            Some(existing) => {
                let mut updated = existing.clone();
                if updated.add_child(&self_ref) {
                    ancestors_updated.push(ancestor.clone());
                }
                working.insert(&ancestor, updated);
            }
            None => {
                let mut fresh = ImageNode::default();
                fresh.add_child(&self_ref);
                working.insert(&ancestor, fresh);
                ancestors_created.push(ancestor);
            }
        }
    }

    Ok(MergeOutcome {
        image: image.clone(),
        created,
        parents: parents.to_vec(),
        ancestors_updated,
        ancestors_created,
        latest_moved,
    })
}

/// Merges every `<image>/<version>/Dockerfile` under `root`, one at a time, in
/// path order. Hidden directories such as `.github` are not scanned.
pub fn rebuild_graph(
    root: &Path,
    graph_path: &Path,
    policy: LatestPolicy,
) -> Result<Vec<MergeOutcome>> {
    let pattern = root.join("*").join("*").join("Dockerfile");
    let pattern = pattern.to_string_lossy().to_string();
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let mut dockerfiles = glob_with(&pattern, options)
        .map_err(|err| ImageGraphError::Other(anyhow::Error::new(err)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    dockerfiles.sort();

    let mut outcomes = Vec::new();
    for dockerfile in dockerfiles {
        outcomes.push(merge_dockerfile(&dockerfile, graph_path, policy)?);
    }
    Ok(outcomes)
}
