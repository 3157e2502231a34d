use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::image::ImageRef;

pub mod merge;
pub mod query;
pub mod store;

/// Parent and child references of one image version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    #[serde(default, deserialize_with = "deserialize_refs")]
    pub parents: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_refs")]
    pub children: Vec<String>,
}

impl ImageNode {
    pub fn add_parent(&mut self, parent: &str) -> bool {
        push_unique(&mut self.parents, parent)
    }

    pub fn add_child(&mut self, child: &str) -> bool {
        push_unique(&mut self.children, child)
    }
}

/// The persisted relationship graph: `images[name][version]` plus `latest[name]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationGraph {
    pub images: BTreeMap<String, BTreeMap<String, ImageNode>>,
    pub latest: BTreeMap<String, String>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, image: &ImageRef) -> Option<&ImageNode> {
        self.images.get(&image.name)?.get(&image.version)
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.node(image).is_some()
    }

    pub fn insert(&mut self, image: &ImageRef, node: ImageNode) {
        self.images
            .entry(image.name.clone())
            .or_default()
            .insert(image.version.clone(), node);
    }

    pub fn latest_version(&self, name: &str) -> Option<&str> {
        self.latest.get(name).map(String::as_str)
    }

    pub fn set_latest(&mut self, image: &ImageRef) {
        self.latest.insert(image.name.clone(), image.version.clone());
    }

    pub fn is_latest(&self, image: &ImageRef) -> bool {
        self.latest_version(&image.name) == Some(image.version.as_str())
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (ImageRef, &ImageNode)> {
        self.images.iter().flat_map(|(name, versions)| {
            versions
                .iter()
                .map(move |(version, node)| (ImageRef::new(name.clone(), version.clone()), node))
        })
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|existing| existing == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Reference lists written by older tooling may be `null`, the string `none`,
/// or contain `null` entries. All of those load as a clean, duplicate-free list.
fn deserialize_refs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRefs {
        List(Vec<Option<RawRef>>),
        Single(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRef {
        Text(String),
        Number(serde_yaml::Number),
    }

    let raw = Option::<RawRefs>::deserialize(deserializer)?;
    let entries = match raw {
        None => Vec::new(),
        Some(RawRefs::Single(value)) => vec![Some(RawRef::Text(value))],
        Some(RawRefs::List(values)) => values,
    };

    let mut refs = Vec::new();
    for entry in entries.into_iter().flatten() {
        let value = match entry {
            RawRef::Text(text) => text,
            RawRef::Number(number) => number.to_string(),
        };
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("none") {
            continue;
        }
        push_unique(&mut refs, value);
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use crate::core::image::ImageRef;
    use crate::graph::{ImageNode, RelationGraph};

    #[test]
    fn legacy_sentinels_normalise_to_empty_lists() {
        let graph: RelationGraph = serde_yaml::from_str(
            "images:\n  base:\n    '1.0':\n      parents: [null]\n      children: none\n  tool:\n    '2.0':\n      parents:\n      children: [null, 'x:1', 'x:1']\nlatest:\n  base: '1.0'\n",
        )
        .expect("parse graph");

        let base = graph.node(&ImageRef::new("base", "1.0")).expect("base node");
        assert!(base.parents.is_empty());
        assert!(base.children.is_empty());

        let tool = graph.node(&ImageRef::new("tool", "2.0")).expect("tool node");
        assert!(tool.parents.is_empty());
        assert_eq!(tool.children, vec!["x:1"]);
    }

    #[test]
    fn missing_top_level_keys_fail_to_parse() {
        assert!(serde_yaml::from_str::<RelationGraph>("images: {}\n").is_err());
        assert!(serde_yaml::from_str::<RelationGraph>("latest: {}\n").is_err());
    }

    #[test]
    fn add_child_appends_once() {
        let mut node = ImageNode::default();
        assert!(node.add_child("c:1.0"));
        assert!(node.add_child("b:2.0"));
        assert!(!node.add_child("c:1.0"));
        assert_eq!(node.children, vec!["c:1.0", "b:2.0"]);
    }
}
