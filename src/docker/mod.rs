use crate::core::image::ImageRef;

pub mod ops;

pub const LATEST_TAG: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerCommand {
    Build,
    Images,
    Pull,
    Push,
    Tag,
}

impl DockerCommand {
    /// Arguments for `docker`, relative to the repository root. `Tag` points
    /// the image's `latest` tag at the given version.
    pub fn args(self, owner: &str, image: &ImageRef) -> Vec<String> {
        let reference = qualified(owner, image);
        match self {
            Self::Build => {
                let context = format!("{}/{}/", image.name, image.version);
                vec![
                    "build".to_string(),
                    "-q".to_string(),
                    "-f".to_string(),
                    format!("{context}Dockerfile"),
                    "-t".to_string(),
                    reference,
                    context,
                ]
            }
            Self::Images => vec!["images".to_string(), reference, "-q".to_string()],
            Self::Pull => vec!["pull".to_string(), reference],
            Self::Push => vec!["push".to_string(), reference],
            Self::Tag => vec!["tag".to_string(), reference, latest_reference(owner, image)],
        }
    }
}

/// `owner/name:version`; Docker tags cannot carry `+`, so it becomes `_`.
pub fn qualified(owner: &str, image: &ImageRef) -> String {
    format!("{}/{}:{}", owner, image.name, image.version.replace('+', "_"))
}

pub fn latest_reference(owner: &str, image: &ImageRef) -> String {
    format!("{}/{}:{}", owner, image.name, LATEST_TAG)
}
