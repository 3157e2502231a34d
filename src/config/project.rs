use serde::Deserialize;

pub const CONFIG_FILE: &str = ".imagegraph.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_file")]
    pub file: String,
    #[serde(default)]
    pub latest_policy: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            file: default_graph_file(),
            latest_policy: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitConfig {
    #[serde(default)]
    pub deploy_branch: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
}

fn default_graph_file() -> String {
    "relations.yaml".to_string()
}
