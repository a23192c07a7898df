//! Resolver configuration (jsdeps.toml)
//!
//! ```toml
//! roots = ["src", "third_party/closure"]
//! excludes = "_test\\.js$"
//! pattern = "namespace"
//! write_deps_js = true
//! deps_js_path = "build/deps.js"
//! ```
//!
//! Relative paths in a configuration file are taken relative to the file's
//! directory.

use crate::cache::CacheStore;
use crate::pattern::{AmdPattern, NamespacePattern, PatternKind};
use crate::walk::WalkFilter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Scratch directory for default output locations
const SCRATCH_DIR: &str = "_jsdeps";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Exclusion or extension pattern is not a valid regular expression
    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Built-in extraction patterns selectable by name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternName {
    #[default]
    Namespace,
    Amd,
}

impl FromStr for PatternName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "namespace" | "closure" => Ok(PatternName::Namespace),
            "amd" => Ok(PatternName::Amd),
            other => Err(format!("unknown pattern '{other}' (expected namespace or amd)")),
        }
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternName::Namespace => f.write_str("namespace"),
            PatternName::Amd => f.write_str("amd"),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directories searched for source files
    pub roots: Vec<PathBuf>,

    /// Regular expression over full paths; matches are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,

    /// Source file extension without the dot
    pub extension: String,

    /// Where the deps.js manifest is written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deps_js_path: Option<PathBuf>,

    /// Write the manifest after every resolution
    pub write_deps_js: bool,

    /// Extraction pattern
    pub pattern: PatternName,

    /// Namespace object for the namespace pattern
    pub namespace: String,

    /// Directory AMD module ids are relative to (default: first root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amd_base: Option<PathBuf>,

    /// Declaration cache file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Keep the declaration cache in memory only
    pub memory_cache: bool,

    /// Directory cache keys are relative to (default: current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_base: Option<PathBuf>,

    /// Directory manifest paths are relative to (default: the manifest's directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_base: Option<PathBuf>,

    /// Warn about unresolved symbols instead of failing
    pub skip_unresolved: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            excludes: None,
            extension: "js".to_string(),
            deps_js_path: None,
            write_deps_js: false,
            pattern: PatternName::Namespace,
            namespace: crate::pattern::DEFAULT_NAMESPACE.to_string(),
            amd_base: None,
            cache_path: None,
            memory_cache: false,
            cache_base: None,
            manifest_base: None,
            skip_unresolved: false,
        }
    }
}

impl ResolverConfig {
    /// Create a configuration with default options for the given roots
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a configuration file
    ///
    /// # Arguments
    /// * `path` - Path to a jsdeps.toml file
    ///
    /// # Returns
    /// * `Ok(ResolverConfig)` - Validated configuration, paths rebased on the file's directory
    /// * `Err(ConfigError)` - Read, parse or validation failure
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(dir) = path.parent() {
            config.rebase(dir);
        }
        Ok(config)
    }

    /// Parse a configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::MissingField("roots".to_string()));
        }
        self.walk_filter()?;
        Ok(())
    }

    fn rebase(&mut self, dir: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };
        self.roots.iter_mut().for_each(rebase);
        for path in [
            &mut self.deps_js_path,
            &mut self.amd_base,
            &mut self.cache_path,
            &mut self.cache_base,
            &mut self.manifest_base,
        ]
        .into_iter()
        .flatten()
        {
            rebase(path);
        }
    }

    pub fn with_excludes(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_deps_js_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.deps_js_path = Some(path.into());
        self
    }

    pub fn with_write_deps_js(mut self, write: bool) -> Self {
        self.write_deps_js = write;
        self
    }

    pub fn with_pattern(mut self, pattern: PatternName) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_amd_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.amd_base = Some(base.into());
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_memory_cache(mut self, memory: bool) -> Self {
        self.memory_cache = memory;
        self
    }

    pub fn with_cache_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.cache_base = Some(base.into());
        self
    }

    pub fn with_manifest_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.manifest_base = Some(base.into());
        self
    }

    pub fn with_skip_unresolved(mut self, skip: bool) -> Self {
        self.skip_unresolved = skip;
        self
    }

    /// Manifest location, defaulting to a scratch directory under the system temp dir
    pub fn deps_js_path(&self) -> PathBuf {
        self.deps_js_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR).join("deps.js"))
    }

    /// Cache file location, defaulting to a scratch directory under the system temp dir
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR).join("deps-cache.json"))
    }

    /// Backing store selected by `memory_cache` / `cache_path`
    pub fn cache_store(&self) -> CacheStore {
        if self.memory_cache {
            CacheStore::Memory
        } else {
            CacheStore::File(self.cache_path())
        }
    }

    /// File filter built from `extension` and `excludes`
    pub fn walk_filter(&self) -> Result<WalkFilter, ConfigError> {
        Ok(WalkFilter::new(&self.extension, self.excludes.as_deref())?)
    }

    /// Instantiate the selected built-in pattern
    ///
    /// AMD module ids fall back to `default_amd_base` when `amd_base` is unset.
    pub fn build_pattern(&self, default_amd_base: &Path) -> PatternKind {
        match self.pattern {
            PatternName::Namespace => {
                PatternKind::Namespace(NamespacePattern::new(self.namespace.clone()))
            }
            PatternName::Amd => PatternKind::Amd(AmdPattern::new(
                self.amd_base
                    .clone()
                    .unwrap_or_else(|| default_amd_base.to_path_buf()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::new(["src"]);
        assert_eq!(config.roots, vec![PathBuf::from("src")]);
        assert_eq!(config.extension, "js");
        assert_eq!(config.pattern, PatternName::Namespace);
        assert_eq!(config.namespace, "goog");
        assert!(!config.write_deps_js);
        assert!(config.deps_js_path().ends_with("_jsdeps/deps.js"));
        assert_eq!(
            config.cache_store(),
            CacheStore::File(std::env::temp_dir().join("_jsdeps").join("deps-cache.json"))
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            roots = ["src", "lib"]
            excludes = "_test\\.js$"
            pattern = "amd"
            write_deps_js = true
            memory_cache = true
        "#;
        let config = ResolverConfig::from_str(toml).unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.pattern, PatternName::Amd);
        assert_eq!(config.excludes.as_deref(), Some("_test\\.js$"));
        assert!(config.write_deps_js);
        assert_eq!(config.cache_store(), CacheStore::Memory);
    }

    #[test]
    fn test_missing_roots() {
        let result = ResolverConfig::from_str("pattern = \"namespace\"");
        assert!(matches!(result, Err(ConfigError::MissingField(field)) if field == "roots"));
    }

    #[test]
    fn test_invalid_exclusion() {
        let result = ResolverConfig::from_str("roots = [\"src\"]\nexcludes = \"(\"");
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_unknown_pattern() {
        let result = ResolverConfig::from_str("roots = [\"src\"]\npattern = \"commonjs\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        assert!("commonjs".parse::<PatternName>().is_err());
        assert_eq!("amd".parse::<PatternName>(), Ok(PatternName::Amd));
    }

    #[test]
    fn test_from_file_rebases_relative_paths() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("jsdeps.toml");
        std::fs::write(
            &file,
            "roots = [\"src\", \"/abs/lib\"]\ndeps_js_path = \"out/deps.js\"\n",
        )
        .unwrap();

        let config = ResolverConfig::from_file(&file).unwrap();
        assert_eq!(config.roots[0], temp.path().join("src"));
        assert_eq!(config.roots[1], PathBuf::from("/abs/lib"));
        assert_eq!(config.deps_js_path(), temp.path().join("out/deps.js"));
    }

    #[test]
    fn test_build_pattern() {
        let config = ResolverConfig::new(["/src"]).with_pattern(PatternName::Amd);
        match config.build_pattern(Path::new("/src")) {
            PatternKind::Amd(pattern) => assert_eq!(pattern.base(), Path::new("/src")),
            other => panic!("expected AMD pattern, got {other:?}"),
        }

        let config = ResolverConfig::new(["/src"]).with_namespace("lib");
        match config.build_pattern(Path::new("/src")) {
            PatternKind::Namespace(pattern) => assert_eq!(pattern.namespace(), "lib"),
            other => panic!("expected namespace pattern, got {other:?}"),
        }
    }
}
