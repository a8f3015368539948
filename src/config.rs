use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SsotMcpError};

/// Name of the configuration file stored inside the `.ssot-mcp` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding server configuration.
pub const CONFIG_DIR: &str = ".ssot-mcp";

/// Repository-relative location of the SSOT document.
pub const DEFAULT_SSOT_PATH: &str = ".github/copilot-instructions.md";

/// Repository-relative location of the dependency graph artifact.
pub const DEFAULT_GRAPH_PATH: &str = "dependency_graph_production.json";

/// Environment variable overriding the SSOT document path.
pub const SSOT_PATH_ENV: &str = "SSOT_PATH";

/// Environment variable overriding the dependency graph path.
pub const GRAPH_PATH_ENV: &str = "DEPENDENCY_GRAPH_PATH";

/// Configuration for the MCP server.
///
/// Paths may be absolute or relative to `root_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Repository root walked by the scanner.
    pub root_dir: String,
    /// SSOT document hashed by `validate_ssot_integrity`.
    pub ssot_path: String,
    /// Graph artifact read by `query_dependency_graph`.
    pub graph_path: String,
    /// Directory names never descended into during a scan.
    pub exclude_dirs: Vec<String>,
    /// Number of files listed in a scan preview.
    pub preview_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            root_dir: String::new(),
            ssot_path: DEFAULT_SSOT_PATH.to_string(),
            graph_path: DEFAULT_GRAPH_PATH.to_string(),
            exclude_dirs: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "target".to_string(),
            ],
            preview_limit: 50,
        }
    }
}

impl ServerConfig {
    /// Absolute repository root.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.root_dir)
    }

    /// Absolute path of the SSOT document.
    pub fn ssot_file(&self) -> PathBuf {
        self.resolve(&self.ssot_path)
    }

    /// Absolute path of the dependency graph artifact.
    pub fn graph_file(&self) -> PathBuf {
        self.resolve(&self.graph_path)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root().join(p)
        }
    }

    /// Applies `SSOT_PATH` and `DEPENDENCY_GRAPH_PATH` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(SSOT_PATH_ENV) {
            self.ssot_path = path;
        }
        if let Some(path) = non_empty_env(GRAPH_PATH_ENV) {
            self.graph_path = path;
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the path to the `.ssot-mcp` directory within the given root.
pub fn get_config_dir(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR)
}

/// Returns the path to the configuration file within the `.ssot-mcp` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_config_dir(project_root).join(CONFIG_FILENAME)
}

/// Walks upward from `start` to the first directory containing `.git`.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Resolves the repository root: an explicit path wins, then the nearest
/// `.git` ancestor of the current directory, then the current directory.
pub fn resolve_root(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(p) = explicit {
        return p;
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_repo_root(&cwd).unwrap_or(cwd)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns a default configuration
/// with `root_dir` set to the given project root. `root_dir` always reflects
/// the root the server was started with.
pub fn load_config(project_root: &Path) -> Result<ServerConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(ServerConfig {
            root_dir: project_root.to_string_lossy().to_string(),
            ..ServerConfig::default()
        });
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| SsotMcpError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let mut config: ServerConfig =
        serde_json::from_str(&contents).map_err(|e| SsotMcpError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;
    config.root_dir = project_root.to_string_lossy().to_string();

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
pub fn save_config(project_root: &Path, config: &ServerConfig) -> Result<()> {
    let config_dir = get_config_dir(project_root);
    fs::create_dir_all(&config_dir).map_err(|e| SsotMcpError::Config {
        message: format!(
            "failed to create config directory '{}': {}",
            config_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| SsotMcpError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| SsotMcpError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| SsotMcpError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
