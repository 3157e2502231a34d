use std::path::PathBuf;

use crate::core::image::ImageRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedDockerfile {
    pub image: ImageRef,
    pub path: PathBuf,
}

/// Picks `<image>/<version>/Dockerfile` entries out of a repo-relative diff.
pub fn changed_dockerfiles(paths: &[String]) -> Vec<ChangedDockerfile> {
    let mut changed: Vec<ChangedDockerfile> = Vec::new();
    for path in paths {
        let parts = path.trim().split('/').collect::<Vec<_>>();
        let [tool, version, filename] = parts.as_slice() else {
            continue;
        };
        if tool.is_empty() || version.is_empty() || !filename.eq_ignore_ascii_case("dockerfile") {
            continue;
        }
        let image = ImageRef::new(*tool, *version);
        if changed.iter().any(|entry| entry.image == image) {
            continue;
        }
        changed.push(ChangedDockerfile {
            image,
            path: PathBuf::from(path.trim()),
        });
    }
    changed
}

/// Images named `test_*` are built but never pushed.
pub fn is_test_image(name: &str) -> bool {
    name.split('_').next() == Some("test")
}

#[cfg(test)]
mod tests {
    use crate::core::changes::{changed_dockerfiles, is_test_image};

    #[test]
    fn selects_only_versioned_dockerfiles() {
        let paths = [
            ".github/workflows/workflow-ci.yml",
            ".gitignore",
            "base/1.0.1/Dockerfile",
            "base/1.0.1/unittest.yml",
            "relations.yaml",
            "scripts/functions.py",
            "tools/extra/nested/Dockerfile",
            "fastqc/0.11.4/dockerfile",
        ]
        .iter()
        .map(|path| path.to_string())
        .collect::<Vec<_>>();

        let changed = changed_dockerfiles(&paths);
        let images = changed
            .iter()
            .map(|entry| entry.image.to_string())
            .collect::<Vec<_>>();
        assert_eq!(images, vec!["base:1.0.1", "fastqc:0.11.4"]);
    }

    #[test]
    fn test_prefix_detection() {
        assert!(is_test_image("test_base"));
        assert!(!is_test_image("testing"));
        assert!(!is_test_image("base"));
    }
}
