use std::path::Path;

use crate::core::changes::{is_test_image, ChangedDockerfile};
use crate::core::image::ImageRef;
use crate::core::version::LatestPolicy;
use crate::docker::{latest_reference, qualified, DockerCommand};
use crate::error::Result;
use crate::graph::merge::merge_dockerfile;
use crate::graph::query::latest_images;
use crate::graph::store::load_graph;
use crate::graph::RelationGraph;
use crate::util::output;
use crate::util::process::{run_checked, CommandRunner};

/// Inputs shared by every step of a build run.
pub struct BuildPlan<'a> {
    pub runner: &'a dyn CommandRunner,
    pub owner: &'a str,
    pub root: &'a Path,
    pub graph_path: &'a Path,
    pub policy: LatestPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub image: ImageRef,
    pub tagged_latest: bool,
}

/// Builds the changed images one after another. Each Dockerfile is merged
/// into the graph first; a failed merge aborts the run before its build.
pub fn build_images(plan: &BuildPlan<'_>, changed: &[ChangedDockerfile]) -> Result<Vec<BuiltImage>> {
    if changed.is_empty() {
        output::info("No changes to Dockerfiles detected, nothing to build.");
        return Ok(Vec::new());
    }

    let mut built = Vec::new();
    for entry in changed {
        let image = &entry.image;
        merge_dockerfile(&plan.root.join(&entry.path), plan.graph_path, plan.policy)?;

        output::docker_op(&format!("build {}", qualified(plan.owner, image)));
        let stdout = run_checked(
            plan.runner,
            "docker",
            &DockerCommand::Build.args(plan.owner, image),
        )?;
        tracing::debug!(image = %image, id = stdout.trim(), "image built");
        output::success(&format!("Successfully built {}", qualified(plan.owner, image)));

        let graph = load_graph(plan.graph_path)?;
        let tagged_latest = graph.is_latest(image);
        if tagged_latest {
            output::docker_op(&format!(
                "tag {} {}",
                qualified(plan.owner, image),
                latest_reference(plan.owner, image)
            ));
            run_checked(
                plan.runner,
                "docker",
                &DockerCommand::Tag.args(plan.owner, image),
            )?;
        }

        built.push(BuiltImage {
            image: image.clone(),
            tagged_latest,
        });
    }

    Ok(built)
}

/// Pushes changed images except `test_*` ones. Each image is built first when
/// the local daemon does not have it. Versions the graph marks as latest are
/// tagged and their `latest` tag pushed as well.
pub fn push_images(
    runner: &dyn CommandRunner,
    owner: &str,
    graph: &RelationGraph,
    changed: &[ChangedDockerfile],
) -> Result<Vec<String>> {
    if changed.is_empty() {
        output::info("No changes to Dockerfiles detected, nothing to push.");
        return Ok(Vec::new());
    }

    let mut pushed = Vec::new();
    for entry in changed {
        let image = &entry.image;
        if is_test_image(&image.name) {
            output::warn(&format!(
                "Test image found: '{}', skipping push",
                qualified(owner, image)
            ));
            continue;
        }

        ensure_local_image(runner, owner, image)?;
        let reference = qualified(owner, image);
        output::docker_op(&format!("push {reference}"));
        run_checked(runner, "docker", &DockerCommand::Push.args(owner, image))?;
        pushed.push(reference);

        if graph.is_latest(image) {
            let latest = latest_reference(owner, image);
            run_checked(runner, "docker", &DockerCommand::Tag.args(owner, image))?;
            output::docker_op(&format!("push {latest}"));
            run_checked(runner, "docker", &["push".to_string(), latest.clone()])?;
            pushed.push(latest);
        }
    }

    Ok(pushed)
}

/// Builds the image locally when `docker images` does not know it yet.
/// Returns true when a build was needed.
pub fn ensure_local_image(runner: &dyn CommandRunner, owner: &str, image: &ImageRef) -> Result<bool> {
    let ids = run_checked(runner, "docker", &DockerCommand::Images.args(owner, image))?;
    if !ids.trim().is_empty() {
        output::info(&format!("Image '{}' already exists locally", qualified(owner, image)));
        return Ok(false);
    }

    output::info(&format!(
        "Image '{}' does not exist locally, building",
        qualified(owner, image)
    ));
    run_checked(runner, "docker", &DockerCommand::Build.args(owner, image))?;
    Ok(true)
}

/// Pulls the `latest` version of every image recorded in the graph.
pub fn pull_latest(runner: &dyn CommandRunner, owner: &str, graph: &RelationGraph) -> Result<Vec<String>> {
    let mut pulled = Vec::new();
    for image in latest_images(graph) {
        let reference = qualified(owner, &image);
        output::docker_op(&format!("pull {reference}"));
        run_checked(runner, "docker", &DockerCommand::Pull.args(owner, &image))?;
        pulled.push(reference);
    }
    Ok(pulled)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use crate::core::changes::changed_dockerfiles;
    use crate::core::image::ImageRef;
    use crate::core::version::LatestPolicy;
    use crate::docker::ops::{build_images, ensure_local_image, pull_latest, push_images, BuildPlan};
    use crate::error::ImageGraphError;
    use crate::graph::store::load_graph;
    use crate::graph::RelationGraph;
    use crate::test_support::unique_temp_dir;
    use crate::util::process::fake::RecordingRunner;

    fn write_dockerfile(root: &Path, name: &str, version: &str, contents: &str) {
        let dir = root.join(name).join(version);
        fs::create_dir_all(&dir).expect("create image dir");
        fs::write(dir.join("Dockerfile"), contents).expect("write dockerfile");
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn build_merges_builds_and_tags_latest() {
        let root = unique_temp_dir("docker-build");
        let graph_path = root.join("relations.yaml");
        fs::write(&graph_path, "images: {}\nlatest: {}\n").expect("write graph");
        write_dockerfile(&root, "base", "1.0.1", "FROM ubuntu:18.04\n");
        write_dockerfile(&root, "tool", "2.0", "FROM bicf/base:1.0.1\n");

        let runner = RecordingRunner::new();
        let plan = BuildPlan {
            runner: &runner,
            owner: "bicf",
            root: &root,
            graph_path: &graph_path,
            policy: LatestPolicy::Merged,
        };
        let changed = changed_dockerfiles(&paths(&["base/1.0.1/Dockerfile", "tool/2.0/Dockerfile"]));
        let built = build_images(&plan, &changed).expect("build images");

        assert_eq!(built.len(), 2);
        assert!(built.iter().all(|image| image.tagged_latest));
        assert_eq!(
            runner.calls(),
            vec![
                "docker build -q -f base/1.0.1/Dockerfile -t bicf/base:1.0.1 base/1.0.1/",
                "docker tag bicf/base:1.0.1 bicf/base:latest",
                "docker build -q -f tool/2.0/Dockerfile -t bicf/tool:2.0 tool/2.0/",
                "docker tag bicf/tool:2.0 bicf/tool:latest",
            ]
        );

        let graph = load_graph(&graph_path).expect("load graph");
        let base = graph.node(&ImageRef::new("base", "1.0.1")).expect("base node");
        assert_eq!(base.children, vec!["tool:2.0"]);
        assert_eq!(base.parents, vec!["ubuntu:18.04"]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failed_merge_aborts_before_docker_build() {
        let root = unique_temp_dir("docker-build-abort");
        let graph_path = root.join("relations.yaml");
        fs::write(&graph_path, "images: {}\nlatest: {}\n").expect("write graph");
        write_dockerfile(&root, "bad", "1.0", "FROM ubuntu\n");

        let runner = RecordingRunner::new();
        let plan = BuildPlan {
            runner: &runner,
            owner: "bicf",
            root: &root,
            graph_path: &graph_path,
            policy: LatestPolicy::Merged,
        };
        let changed = changed_dockerfiles(&paths(&["bad/1.0/Dockerfile"]));
        let err = build_images(&plan, &changed).expect_err("untagged base");
        assert!(matches!(err, ImageGraphError::UntaggedParent { .. }));
        assert!(runner.calls().is_empty());
        assert_eq!(load_graph(&graph_path).expect("load"), RelationGraph::new());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn push_skips_test_images_and_pushes_latest_tag() {
        let graph: RelationGraph = serde_yaml::from_str(
            "images:\n  base:\n    '1.0.1':\n      parents: []\n      children: []\nlatest:\n  base: '1.0.1'\n",
        )
        .expect("parse graph");
        let runner = RecordingRunner::new().respond("docker images", "451fd06cd4d9\n", 0);
        let changed = changed_dockerfiles(&paths(&[
            "test_base/1.0.0/Dockerfile",
            "base/1.0.1/Dockerfile",
            "old/0.9/Dockerfile",
        ]));
        let pushed = push_images(&runner, "bicf", &graph, &changed).expect("push images");
        assert_eq!(
            pushed,
            vec!["bicf/base:1.0.1", "bicf/base:latest", "bicf/old:0.9"]
        );
        assert_eq!(
            runner.calls(),
            vec![
                "docker images bicf/base:1.0.1 -q",
                "docker push bicf/base:1.0.1",
                "docker tag bicf/base:1.0.1 bicf/base:latest",
                "docker push bicf/base:latest",
                "docker images bicf/old:0.9 -q",
                "docker push bicf/old:0.9",
            ]
        );
    }

    #[test]
    fn push_builds_images_missing_locally() {
        let graph = RelationGraph::new();
        let runner = RecordingRunner::new();
        let changed = changed_dockerfiles(&paths(&["base/1.0.1/Dockerfile"]));
        push_images(&runner, "bicf", &graph, &changed).expect("push images");
        assert_eq!(
            runner.calls(),
            vec![
                "docker images bicf/base:1.0.1 -q",
                "docker build -q -f base/1.0.1/Dockerfile -t bicf/base:1.0.1 base/1.0.1/",
                "docker push bicf/base:1.0.1",
            ]
        );
    }

    #[test]
    fn ensure_local_image_builds_only_when_missing() {
        let image = ImageRef::new("base", "1.0.0");
        let runner = RecordingRunner::new().respond("docker images", "451fd06cd4d9\n", 0);
        assert!(!ensure_local_image(&runner, "bicf", &image).expect("present"));
        assert_eq!(runner.calls().len(), 1);

        let runner = RecordingRunner::new();
        assert!(ensure_local_image(&runner, "bicf", &image).expect("missing"));
        assert_eq!(
            runner.calls().last().map(String::as_str),
            Some("docker build -q -f base/1.0.0/Dockerfile -t bicf/base:1.0.0 base/1.0.0/")
        );
    }

    #[test]
    fn pull_latest_follows_graph_latest() {
        let graph: RelationGraph =
            serde_yaml::from_str("images: {}\nlatest:\n  base: '1.0+1'\n  tool: '2'\n")
                .expect("parse graph");
        let runner = RecordingRunner::new();
        let pulled = pull_latest(&runner, "bicf", &graph).expect("pull");
        assert_eq!(pulled, vec!["bicf/base:1.0_1", "bicf/tool:2"]);
    }
}
