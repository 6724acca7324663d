//! Configuration loading for repowiki.
//!
//! Settings come from an optional user-level file under `dirs::config_dir()`
//! and an optional project-level `repowiki.toml` at the repository root.
//! Project settings win field-for-field; unset fields fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub budgets: BudgetConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// One of "openai", "anthropic", "ollama" or "openai-compatible".
    #[serde(default = "default_style")]
    pub style: String,
    /// Name of the environment variable holding the API key. The key value
    /// itself is never stored in config.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            api_key_env: default_api_key_env(),
            base_url: None,
            model: default_model(),
        }
    }
}

fn default_style() -> String {
    "openai".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_excerpt_lines")]
    pub max_excerpt_lines: usize,
    #[serde(default = "default_max_tool_output_chars")]
    pub max_tool_output_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_excerpt_lines: default_max_excerpt_lines(),
            max_tool_output_chars: default_max_tool_output_chars(),
        }
    }
}

fn default_max_steps() -> usize {
    8
}

fn default_max_excerpt_lines() -> usize {
    120
}

fn default_max_tool_output_chars() -> usize {
    8000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexConfig {
    /// Overrides the `<repoRoot>/.repo-wiki/index.db` convention.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Loads and merges global then project config, falling back to
    /// defaults for anything neither file sets.
    pub fn load(repo_root: &Path) -> ConfigResult<Config> {
        let global = load_optional(&global_config_path())?;
        let project = load_optional(&project_config_path(repo_root))?;

        Ok(match (global, project) {
            (Some(g), Some(p)) => merge(g, p),
            (Some(g), None) => g,
            (None, Some(p)) => p,
            (None, None) => Config::default(),
        })
    }

    /// Resolves the on-disk location of the full-text index database,
    /// honoring an explicit override before falling back to the
    /// `<repoRoot>/.repo-wiki/index.db` convention.
    pub fn index_db_path(&self, repo_root: &Path) -> PathBuf {
        self.index
            .db_path
            .clone()
            .unwrap_or_else(|| repo_root.join(".repo-wiki").join("index.db"))
    }
}

fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("repowiki")
        .join("config.toml")
}

fn project_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join("repowiki.toml")
}

fn load_optional(path: &Path) -> ConfigResult<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(config))
}

/// Merges project config over global config. Project settings win
/// field-for-field since every field here is a per-repo concern (budgets,
/// model choice); there is no global-only setting analogous to an update
/// release channel.
fn merge(global: Config, project: Config) -> Config {
    Config {
        provider: project.provider,
        budgets: project.budgets,
        index: IndexConfig {
            db_path: project.index.db_path.or(global.index.db_path),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.budgets.max_steps, 8);
        assert_eq!(cfg.budgets.max_excerpt_lines, 120);
        assert_eq!(cfg.budgets.max_tool_output_chars, 8000);
    }

    #[test]
    fn index_db_path_uses_convention_by_default() {
        let cfg = Config::default();
        let root = Path::new("/tmp/some-repo");
        assert_eq!(
            cfg.index_db_path(root),
            root.join(".repo-wiki").join("index.db")
        );
    }

    #[test]
    fn index_db_path_honors_override() {
        let mut cfg = Config::default();
        cfg.index.db_path = Some(PathBuf::from("/custom/index.db"));
        assert_eq!(
            cfg.index_db_path(Path::new("/tmp/some-repo")),
            PathBuf::from("/custom/index.db")
        );
    }

    #[test]
    fn load_falls_back_to_defaults_without_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.provider.style, "openai");
    }

    #[test]
    fn project_config_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("repowiki.toml"),
            "[provider]\nmodel = \"gpt-4o\"\n",
        )
        .unwrap();
        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.provider.model, "gpt-4o");
    }
}
