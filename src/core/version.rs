use std::cmp::Ordering;

/// How a newly merged node affects the `latest` alias of its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatestPolicy {
    /// The most recently merged new version wins.
    #[default]
    Merged,
    /// A new version wins only if it orders at or above the current latest.
    Highest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVersion {
    pub raw: String,
    pub semver: Option<semver::Version>,
}

impl ImageVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let semver = lenient_semver(&raw);
        Self { raw, semver }
    }
}

impl PartialOrd for ImageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ImageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semver, &other.semver) {
            (Some(left), Some(right)) => left.cmp(right).then_with(|| self.raw.cmp(&other.raw)),
            _ => self.raw.cmp(&other.raw),
        }
    }
}

pub fn parse_latest_policy(input: &str) -> Option<LatestPolicy> {
    match input.to_ascii_lowercase().as_str() {
        "merged" | "newest-merged" => Some(LatestPolicy::Merged),
        "highest" => Some(LatestPolicy::Highest),
        _ => None,
    }
}

/// Decides whether `candidate` should replace `current` as the latest version.
pub fn should_become_latest(policy: LatestPolicy, current: Option<&str>, candidate: &str) -> bool {
    match (policy, current) {
        (_, None) => true,
        (LatestPolicy::Merged, Some(_)) => true,
        (LatestPolicy::Highest, Some(current)) => {
            ImageVersion::new(candidate) >= ImageVersion::new(current)
        }
    }
}

/// Image tags are often `1.0` or `2`; pad them so semver can order them.
fn lenient_semver(raw: &str) -> Option<semver::Version> {
    if let Ok(version) = semver::Version::parse(raw) {
        return Some(version);
    }
    let split_at = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, rest) = raw.split_at(split_at);
    let segments = core.split('.').count();
    if segments == 0 || segments > 2 || !core.split('.').all(is_numeric) {
        return None;
    }
    let padded = if segments == 1 {
        format!("{core}.0.0{rest}")
    } else {
        format!("{core}.0{rest}")
    };
    semver::Version::parse(&padded).ok()
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use crate::core::version::{
        parse_latest_policy, should_become_latest, ImageVersion, LatestPolicy,
    };

    #[test]
    fn short_versions_are_padded_for_ordering() {
        let short = ImageVersion::new("1.2");
        assert_eq!(short.semver.as_ref().map(|v| v.to_string()).as_deref(), Some("1.2.0"));
        assert!(ImageVersion::new("1.10") > ImageVersion::new("1.9"));
        assert!(ImageVersion::new("2") > ImageVersion::new("1.9.9"));
    }

    #[test]
    fn non_semver_versions_fall_back_to_text_order() {
        let version = ImageVersion::new("0.11.4_1");
        assert!(version.semver.is_none());
        assert!(ImageVersion::new("b") > ImageVersion::new("a"));
    }

    #[test]
    fn merged_policy_always_moves_latest() {
        assert!(should_become_latest(LatestPolicy::Merged, Some("2.0"), "1.0"));
        assert!(should_become_latest(LatestPolicy::Merged, None, "1.0"));
    }

    #[test]
    fn highest_policy_keeps_newer_latest() {
        assert!(!should_become_latest(LatestPolicy::Highest, Some("2.0"), "1.0"));
        assert!(should_become_latest(LatestPolicy::Highest, Some("1.0"), "1.0.1"));
        assert!(should_become_latest(LatestPolicy::Highest, None, "0.1"));
    }

    #[test]
    fn policy_parser_accepts_expected_values() {
        assert_eq!(parse_latest_policy("highest"), Some(LatestPolicy::Highest));
        assert_eq!(parse_latest_policy("MERGED"), Some(LatestPolicy::Merged));
        assert_eq!(parse_latest_policy("newest"), None);
    }
}
