use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn imagegraph_bin() -> PathBuf {
    PathBuf::from(
        std::env::var("CARGO_BIN_EXE_imagegraph")
            .expect("CARGO_BIN_EXE_imagegraph is not set for integration test"),
    )
}

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir().join(format!("imagegraph-{prefix}-{pid}-{nanos}"))
}
