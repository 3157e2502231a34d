use std::fmt;
use std::str::FromStr;

use crate::error::ImageGraphError;

/// A `name:version` pair identifying one node of the relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
    pub name: String,
    pub version: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Splits on the last `:` so registry ports never end up in the version.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, version) = raw.trim().rsplit_once(':')?;
        if name.is_empty() || version.is_empty() || version.contains('/') {
            return None;
        }
        Some(Self::new(name, version))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for ImageRef {
    type Err = ImageGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ImageGraphError::InvalidImageRef(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::image::ImageRef;

    #[test]
    fn parse_splits_name_and_version() {
        let image = ImageRef::parse("fastqc:0.11.4").expect("parse image");
        assert_eq!(image.name, "fastqc");
        assert_eq!(image.version, "0.11.4");
        assert_eq!(image.to_string(), "fastqc:0.11.4");
    }

    #[test]
    fn parse_rejects_untagged_and_empty_parts() {
        assert!(ImageRef::parse("ubuntu").is_none());
        assert!(ImageRef::parse(":1.0").is_none());
        assert!(ImageRef::parse("ubuntu:").is_none());
        assert!(ImageRef::parse("localhost:5000/ubuntu").is_none());
    }

    #[test]
    fn from_str_reports_invalid_reference() {
        let err = "nope".parse::<ImageRef>().expect_err("untagged ref");
        assert!(err.to_string().contains("nope"));
    }
}
