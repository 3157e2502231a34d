use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::Serialize;

use crate::core::image::ImageRef;
use crate::graph::RelationGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    LatestMissingVersion,
    ChildNotLinkedBack,
    UnknownParent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphIssue {
    pub kind: IssueKind,
    pub image: String,
    pub reference: String,
}

#[derive(Debug, Default, Serialize)]
pub struct GraphReport {
    pub issues: Vec<GraphIssue>,
}

impl GraphReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Every image reachable through `children` edges, breadth-first.
pub fn descendants(graph: &RelationGraph, image: &ImageRef) -> Vec<ImageRef> {
    let (edges, indices) = children_graph(graph);
    let Some(start) = indices.get(&image.to_string()).copied() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut bfs = Bfs::new(&edges, start);
    while let Some(index) = bfs.next(&edges) {
        if index == start {
            continue;
        }
        if let Some(child) = ImageRef::parse(&edges[index]) {
            found.push(child);
        }
    }
    found
}

pub fn latest_images(graph: &RelationGraph) -> Vec<ImageRef> {
    graph
        .latest
        .iter()
        .map(|(name, version)| ImageRef::new(name.clone(), version.clone()))
        .collect()
}

/// File each latest image keeps its container checks in.
pub const UNITTEST_FILE: &str = "unittest.yml";

/// `<name>/<version>/unittest.yml` for every latest image, in name order.
/// The version is kept as recorded since it names the directory on disk.
pub fn unittest_paths(graph: &RelationGraph) -> Vec<String> {
    latest_images(graph)
        .into_iter()
        .map(|image| format!("{}/{}/{}", image.name, image.version, UNITTEST_FILE))
        .collect()
}

pub fn check_graph(graph: &RelationGraph) -> GraphReport {
    let mut report = GraphReport::default();

    for image in latest_images(graph) {
        if !graph.contains(&image) {
            report.issues.push(GraphIssue {
                kind: IssueKind::LatestMissingVersion,
                image: image.name.clone(),
                reference: image.version.clone(),
            });
        }
    }

    for (image, node) in graph.iter_nodes() {
        let self_ref = image.to_string();
        for child in &node.children {
            let linked = ImageRef::parse(child)
                .and_then(|child| graph.node(&child))
                .is_some_and(|child_node| child_node.parents.contains(&self_ref));
            if !linked {
                report.issues.push(GraphIssue {
                    kind: IssueKind::ChildNotLinkedBack,
                    image: self_ref.clone(),
                    reference: child.clone(),
                });
            }
        }
        for parent in &node.parents {
            let known = ImageRef::parse(parent).is_some_and(|parent| graph.contains(&parent));
            if !known {
                report.issues.push(GraphIssue {
                    kind: IssueKind::UnknownParent,
                    image: self_ref.clone(),
                    reference: parent.clone(),
                });
            }
        }
    }

    report
}

fn children_graph(graph: &RelationGraph) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
    let mut edges = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();

    let mut index_for = |edges: &mut DiGraph<String, ()>, key: &str| -> NodeIndex {
        *indices
            .entry(key.to_string())
            .or_insert_with(|| edges.add_node(key.to_string()))
    };

    for (image, node) in graph.iter_nodes() {
        let from = index_for(&mut edges, &image.to_string());
        for child in &node.children {
            let to = index_for(&mut edges, child);
            edges.update_edge(from, to, ());
        }
    }

    (edges, indices)
}
