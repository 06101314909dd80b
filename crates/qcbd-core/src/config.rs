//! `qcbd.toml` configuration.
//!
//! Lookup order: explicit path, `./qcbd.toml`, then `<config_dir>/qcbd/qcbd.toml`.
//! A missing file means defaults. Environment variables override the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{QcbdError, QcbdResult};

pub const CONFIG_FILE: &str = "qcbd.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_graph")]
    pub graph: PathBuf,
    #[serde(default = "default_snapshots")]
    pub snapshots: PathBuf,
    #[serde(default = "default_sqlite")]
    pub sqlite: PathBuf,
    /// JSONL files, or directories scanned for `*.jsonl`.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub expert: Option<PathBuf>,
}

fn default_graph() -> PathBuf {
    PathBuf::from("data/knowledge_graph.json")
}
fn default_snapshots() -> PathBuf {
    PathBuf::from("data/snapshots")
}
fn default_sqlite() -> PathBuf {
    PathBuf::from("data/qcbd.db")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            graph: default_graph(),
            snapshots: default_snapshots(),
            sqlite: default_sqlite(),
            inputs: Vec::new(),
            expert: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}
fn default_user() -> String {
    "neo4j".to_string()
}
fn default_password() -> String {
    "qcbd_dev".to_string()
}
fn default_database() -> String {
    "neo4j".to_string()
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_dims")]
    pub dims: usize,
}

fn default_dims() -> usize {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dims: default_dims() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub create_stubs: bool,
}

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> QcbdResult<Self> {
        let config: Config = toml::from_str(text)?;
        if config.embedding.dims == 0 {
            return Err(QcbdError::config("embedding.dims must be greater than zero"));
        }
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> QcbdResult<Self> {
        let path = match explicit {
            Some(p) if !p.exists() => {
                return Err(QcbdError::config(format!("config file not found: {}", p.display())));
            }
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(),
        };

        let mut config = match path {
            Some(p) => {
                debug!(path = %p.display(), "Loading config");
                Self::from_toml(&std::fs::read_to_string(&p)?)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        discover_in(Path::new("."), dirs::config_dir())
    }

    /// Apply `NEO4J_*` and `QCBD_SQLITE` overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("NEO4J_URI") {
            self.neo4j.uri = v;
        }
        if let Some(v) = lookup("NEO4J_USER") {
            self.neo4j.user = v;
        }
        if let Some(v) = lookup("NEO4J_PASSWORD") {
            self.neo4j.password = v;
        }
        if let Some(v) = lookup("QCBD_SQLITE") {
            self.paths.sqlite = PathBuf::from(v);
        }
    }
}

/// First existing config file: `<cwd>/qcbd.toml`, then `<config_dir>/qcbd/qcbd.toml`.
fn discover_in(cwd: &Path, config_dir: Option<PathBuf>) -> Option<PathBuf> {
    let local = cwd.join(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    config_dir
        .map(|d| d.join("qcbd").join(CONFIG_FILE))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.paths.graph, PathBuf::from("data/knowledge_graph.json"));
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.embedding.dims, 256);
        assert!(!config.validation.strict);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [paths]
            graph = "kg.json"
            inputs = ["data/processed"]

            [validation]
            strict = true
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.graph, PathBuf::from("kg.json"));
        assert_eq!(config.paths.inputs, vec![PathBuf::from("data/processed")]);
        assert_eq!(config.paths.sqlite, PathBuf::from("data/qcbd.db"));
        assert!(config.validation.strict);
    }

    #[test]
    fn test_zero_dims_rejected() {
        assert!(Config::from_toml("[embedding]\ndims = 0").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "NEO4J_URI" => Some("bolt://graph:7687".to_string()),
            "QCBD_SQLITE" => Some("/tmp/q.db".to_string()),
            _ => None,
        });
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.paths.sqlite, PathBuf::from("/tmp/q.db"));
    }

    #[test]
    fn test_discover_prefers_working_dir() {
        let cwd = tempfile::tempdir().unwrap();
        let config_dir = tempfile::tempdir().unwrap();
        let user_file = config_dir.path().join("qcbd").join(CONFIG_FILE);

        assert_eq!(discover_in(cwd.path(), Some(config_dir.path().to_path_buf())), None);

        std::fs::create_dir_all(user_file.parent().unwrap()).unwrap();
        std::fs::write(&user_file, "").unwrap();
        assert_eq!(
            discover_in(cwd.path(), Some(config_dir.path().to_path_buf())),
            Some(user_file.clone())
        );

        let local = cwd.path().join(CONFIG_FILE);
        std::fs::write(&local, "").unwrap();
        assert_eq!(discover_in(cwd.path(), Some(config_dir.path().to_path_buf())), Some(local));
        assert_eq!(discover_in(cwd.path(), None), Some(cwd.path().join(CONFIG_FILE)));
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(QcbdError::Config(_))));

        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[embedding]\ndims = 64\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.embedding.dims, 64);
    }
}
