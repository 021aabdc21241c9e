use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding one materialized copy per repository.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// File extensions (without the dot) that qualify a file for the context.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names excluded at any depth.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignored_dirs: default_ignored_dirs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["py", "js", "ts", "jsx", "tsx", "go", "rs", "c", "cpp", "java"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignored_dirs() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "venv",
        "__pycache__",
        "dist",
        "build",
        ".next",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GitConfig {
    #[serde(default)]
    pub shallow: bool,
    /// Branch to clone. Empty means the remote's default branch.
    #[serde(default)]
    pub branch: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the env var holding the API key (never the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_include_thoughts")]
    pub include_thoughts: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            include_thoughts: default_include_thoughts(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_include_thoughts() -> bool {
    true
}

impl OracleConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// All defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.context.extensions.is_empty() {
        anyhow::bail!("context.extensions must not be empty");
    }

    for pattern in &config.context.exclude_globs {
        Glob::new(pattern)
            .with_context(|| format!("Invalid context.exclude_globs pattern: '{}'", pattern))?;
    }

    if config.oracle.timeout_secs == 0 {
        anyhow::bail!("oracle.timeout_secs must be > 0");
    }

    match config.oracle.provider.as_str() {
        "gemini" => {
            if config.oracle.model.trim().is_empty() {
                anyhow::bail!("oracle.model must be specified when provider is 'gemini'");
            }
        }
        "disabled" => {}
        other => anyhow::bail!(
            "Unknown oracle provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.data.base_dir, PathBuf::from("./data"));
        assert_eq!(config.context.extensions.len(), 10);
        assert!(config.context.ignored_dirs.contains(&"node_modules".to_string()));
        assert_eq!(config.oracle.provider, "gemini");
        assert_eq!(config.oracle.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_overrides() {
        let file = write_config(
            r#"
[data]
base_dir = "/tmp/pilot"

[context]
extensions = ["md"]
exclude_globs = ["docs/**"]

[git]
shallow = true
branch = "main"

[oracle]
provider = "disabled"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.data.base_dir, PathBuf::from("/tmp/pilot"));
        assert_eq!(config.context.extensions, vec!["md".to_string()]);
        assert!(config.git.shallow);
        assert_eq!(config.git.branch, "main");
        assert!(!config.oracle.is_enabled());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let file = write_config("[oracle]\nprovider = \"carrier-pigeon\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown oracle provider"));
    }

    #[test]
    fn test_rejects_empty_extensions() {
        let file = write_config("[context]\nextensions = []\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_bad_glob() {
        let file = write_config("[context]\nexclude_globs = [\"a[\"]\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.oracle.timeout_secs, 300);
    }
}
