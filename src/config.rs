//! Validator configuration.
//!
//! Settings are layered, later sources winning:
//! - built-in defaults
//! - `jocf-validator.toml`, `jocf-validator.json` or
//!   `config/validator_config.json` in the project root
//! - an explicit file passed with `--config` (must exist)
//! - environment variables prefixed `VALIDATOR_`, with `__` between section
//!   and key (`VALIDATOR_SCHEMA__ROOT_PATH=/srv/jocf/schema`)
//!
//! ## Example config file (jocf-validator.toml):
//! ```toml
//! [schema]
//! root_path = "${JOCF_HOME}/schema"
//! file_suffix = ".schema.json"
//!
//! [validation]
//! max_errors_per_object = 50
//! document_pattern = "*.jocf.json"
//!
//! [output]
//! format = "json"
//! log_level = "debug"
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use config_crate::{Config, Environment, File};
use globset::{Glob, GlobMatcher};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::index::SCHEMA_FILE_SUFFIX;
use crate::object_validator::DEFAULT_MAX_ERRORS_PER_OBJECT;

/// Config files picked up from the project root, in load order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "jocf-validator.toml",
    "jocf-validator.json",
    "config/validator_config.json",
];

/// Entries whose presence marks a directory as the project root.
const PROJECT_MARKERS: &[&str] = &[".git", "mkdocs.yml", "Cargo.toml"];

const ENV_PREFIX: &str = "VALIDATOR";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub schema: SchemaSettings,
    pub validation: ValidationSettings,
    pub output: OutputSettings,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    project_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Schema corpus root; may contain `${VAR}` references.
    pub root_path: String,
    pub file_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub max_errors_per_object: usize,
    /// Glob selecting documents during directory validation.
    pub document_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub log_level: String,
}

/// How the CLI renders results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            root_path: "schema".to_string(),
            file_suffix: SCHEMA_FILE_SUFFIX.to_string(),
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_errors_per_object: DEFAULT_MAX_ERRORS_PER_OBJECT,
            document_pattern: "*.jocf.json".to_string(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration for the current working directory.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::load_with(&find_project_root(&cwd), config_path, environment())
    }

    fn load_with(
        project_root: &Path,
        config_path: Option<&Path>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::from(project_root.join(name)).required(false));
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(env);

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.project_root = project_root.to_path_buf();
        config.check()?;
        tracing::debug!(project_root = %project_root.display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults rooted at `project_root`, ignoring files and environment.
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Override the schema corpus root.
    pub fn with_schema_root(mut self, root: impl AsRef<Path>) -> Self {
        self.schema.root_path = root.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Schema corpus root with `${VAR}`s expanded, made absolute against the
    /// project root.
    pub fn schema_root(&self) -> PathBuf {
        let expanded = expand_env_vars(&self.schema.root_path, |name| std::env::var(name).ok());
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            self.project_root.join(path)
        }
    }

    /// Matcher for [`ValidationSettings::document_pattern`], applied to file names.
    pub fn document_matcher(&self) -> Result<GlobMatcher, ConfigError> {
        let pattern = &self.validation.document_pattern;
        Glob::new(pattern)
            .map(|glob| glob.compile_matcher())
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.schema.root_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "schema.root_path",
                message: "must not be empty".into(),
            });
        }
        if self.schema.file_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "schema.file_suffix",
                message: "must not be empty".into(),
            });
        }
        if self.validation.max_errors_per_object == 0 {
            return Err(ConfigError::InvalidValue {
                key: "validation.max_errors_per_object",
                message: "must be at least 1".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.output.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "output.log_level",
                message: format!(
                    "unknown level \"{}\", expected one of {}",
                    self.output.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        self.document_matcher().map(|_| ())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Nearest ancestor of `start` holding a project marker, else `start`.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Replace `${NAME}` with `lookup(NAME)`. Unknown variables stay verbatim.
pub fn expand_env_vars(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    static VAR: OnceLock<Regex> = OnceLock::new();
    let var = VAR.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable pattern is valid")
    });
    var.replace_all(value, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn defaults() {
        let dir = TempDir::new().unwrap();
        let config = ValidatorConfig::load_with(dir.path(), None, env(&[])).unwrap();
        assert_eq!(config.schema.root_path, "schema");
        assert_eq!(config.schema.file_suffix, ".schema.json");
        assert_eq!(config.validation.max_errors_per_object, 100);
        assert_eq!(config.validation.document_pattern, "*.jocf.json");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.schema_root(), dir.path().join("schema"));
    }

    #[test]
    fn project_file_then_env() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("jocf-validator.toml"),
            "[schema]\nroot_path = \"corpus\"\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = ValidatorConfig::load_with(dir.path(), None, env(&[])).unwrap();
        assert_eq!(config.schema_root(), dir.path().join("corpus"));
        assert_eq!(config.output.format, OutputFormat::Json);

        let config = ValidatorConfig::load_with(
            dir.path(),
            None,
            env(&[
                ("VALIDATOR_SCHEMA__ROOT_PATH", "/srv/jocf/schema"),
                ("VALIDATOR_VALIDATION__MAX_ERRORS_PER_OBJECT", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(config.schema_root(), PathBuf::from("/srv/jocf/schema"));
        assert_eq!(config.validation.max_errors_per_object, 5);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn legacy_json_location() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config/validator_config.json"),
            r#"{ "validation": { "document_pattern": "*.json" } }"#,
        )
        .unwrap();
        let config = ValidatorConfig::load_with(dir.path(), None, env(&[])).unwrap();
        assert_eq!(config.validation.document_pattern, "*.json");
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ValidatorConfig::load_with(dir.path(), Some(&missing), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Source(_)));
    }

    #[test]
    fn explicit_config_overrides_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("jocf-validator.toml"), "[schema]\nroot_path = \"a\"\n").unwrap();
        let explicit = dir.path().join("ci.toml");
        fs::write(&explicit, "[schema]\nroot_path = \"b\"\n").unwrap();

        let config = ValidatorConfig::load_with(dir.path(), Some(&explicit), env(&[])).unwrap();
        assert_eq!(config.schema.root_path, "b");
    }

    #[test]
    fn rejects_bad_values() {
        let dir = TempDir::new().unwrap();

        let err = ValidatorConfig::load_with(
            dir.path(),
            None,
            env(&[("VALIDATOR_VALIDATION__MAX_ERRORS_PER_OBJECT", "0")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "validation.max_errors_per_object", .. }
        ));

        let err = ValidatorConfig::load_with(
            dir.path(),
            None,
            env(&[("VALIDATOR_VALIDATION__DOCUMENT_PATTERN", "[unclosed")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));

        let err = ValidatorConfig::load_with(
            dir.path(),
            None,
            env(&[("VALIDATOR_OUTPUT__LOG_LEVEL", "loud")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "output.log_level", .. }));
    }

    #[test]
    fn expands_known_variables_only() {
        let vars: HashMap<&str, &str> = [("JOCF_HOME", "/opt/jocf")].into_iter().collect();
        let lookup = |name: &str| vars.get(name).map(|v| v.to_string());
        assert_eq!(expand_env_vars("${JOCF_HOME}/schema", lookup), "/opt/jocf/schema");
        assert_eq!(expand_env_vars("${UNSET_VAR}/schema", lookup), "${UNSET_VAR}/schema");
        assert_eq!(expand_env_vars("plain", lookup), "plain");
    }

    #[test]
    fn project_root_detection() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mkdocs.yml"), "site_name: jocf\n").unwrap();
        let nested = dir.path().join("docs/schema/objects");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), dir.path());
    }

    #[test]
    fn document_matcher_matches_file_names() {
        let config = ValidatorConfig::with_project_root("/tmp");
        let matcher = config.document_matcher().unwrap();
        assert!(matcher.is_match("cap-table.jocf.json"));
        assert!(!matcher.is_match("cap-table.json"));
    }
}
