use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{ImageGraphError, Result};
use crate::graph::RelationGraph;

pub fn load_graph(path: &Path) -> Result<RelationGraph> {
    if !path.is_file() {
        return Err(ImageGraphError::MissingGraphFile(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|source| ImageGraphError::GraphParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Rewrites the whole graph file. The new content lands in a temporary file
/// next to the target and is renamed over it, so a failed write leaves the
/// previous graph untouched.
pub fn save_graph(path: &Path, graph: &RelationGraph) -> Result<()> {
    let contents = serde_yaml::to_string(graph)
        .map_err(|err| ImageGraphError::Other(anyhow::Error::new(err)))?;
    let write_error = |source: std::io::Error| ImageGraphError::GraphWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(contents.as_bytes()).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|err| write_error(err.error))?;

    tracing::debug!(path = %path.display(), "graph saved");
    Ok(())
}

/// Creates an empty graph file. Returns false when one already exists.
pub fn init_graph(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_graph(path, &RelationGraph::new())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::core::image::ImageRef;
    use crate::error::ImageGraphError;
    use crate::graph::store::{init_graph, load_graph, save_graph};
    use crate::graph::{ImageNode, RelationGraph};
    use crate::test_support::unique_temp_dir;

    #[test]
    fn missing_file_is_reported() {
        let root = unique_temp_dir("store-missing");
        let err = load_graph(&root.join("relations.yaml")).expect_err("missing graph");
        assert!(matches!(err, ImageGraphError::MissingGraphFile(_)));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let root = unique_temp_dir("store-invalid");
        let path = root.join("relations.yaml");
        fs::write(&path, "images: [unclosed\n").expect("write graph");
        let err = load_graph(&path).expect_err("invalid graph");
        assert!(matches!(err, ImageGraphError::GraphParse { .. }));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn saved_graph_loads_back_in_key_order() {
        let root = unique_temp_dir("store-save");
        let path = root.join("relations.yaml");

        let mut graph = RelationGraph::new();
        let base = ImageRef::new("base", "1.0.1");
        graph.insert(
            &base,
            ImageNode {
                parents: Vec::new(),
                children: vec!["tool:2.0".to_string()],
            },
        );
        graph.insert(&ImageRef::new("alpha", "0.1"), ImageNode::default());
        graph.set_latest(&base);
        save_graph(&path, &graph).expect("save graph");

        let contents = fs::read_to_string(&path).expect("read graph");
        let alpha = contents.find("alpha").expect("alpha present");
        let base_pos = contents.find("base").expect("base present");
        assert!(alpha < base_pos);
        assert_eq!(load_graph(&path).expect("load graph"), graph);

        let leftovers = fs::read_dir(&root).expect("read dir").count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failed_persist_is_a_write_error_and_leaves_no_temp_file() {
        let root = unique_temp_dir("store-persist");
        let path = root.join("relations.yaml");
        fs::create_dir_all(&path).expect("occupy target with a directory");

        let err = save_graph(&path, &RelationGraph::new()).expect_err("target is a directory");
        assert!(matches!(err, ImageGraphError::GraphWrite { .. }));
        assert!(path.is_dir());
        let leftovers = fs::read_dir(&root).expect("read dir").count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn init_does_not_overwrite_existing_graph() {
        let root = unique_temp_dir("store-init");
        let path = root.join("relations.yaml");
        assert!(init_graph(&path).expect("init graph"));
        assert_eq!(load_graph(&path).expect("load"), RelationGraph::new());

        fs::write(&path, "images: {}\nlatest:\n  base: '1.0'\n").expect("write graph");
        assert!(!init_graph(&path).expect("init graph"));
        let graph = load_graph(&path).expect("load");
        assert_eq!(graph.latest_version("base"), Some("1.0"));
        let _ = fs::remove_dir_all(root);
    }
}
