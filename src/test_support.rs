use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Creates an empty directory under the system temp dir. Callers remove it.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("imagegraph-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
