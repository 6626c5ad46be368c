//! Application configuration for dynrepo.
//!
//! The config file path is taken from the `PYCSW_CONFIG` environment variable
//! (the CLI's `--config` flag overrides it). The file is loaded once, has its
//! `$VAR` / `${VAR}` placeholders resolved, and is then passed by reference to
//! every component that needs it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DynRepoError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PYCSW_CONFIG";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[repository]` section.
    pub repository: RepositoryConfig,

    /// `[pycsw-dynamic]` section.
    #[serde(rename = "pycsw-dynamic")]
    pub dynamic: DynamicConfig,
}

/// `[repository]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Connection string, e.g. `sqlite:////srv/pycsw/records.db`.
    pub database: String,
    /// Name of the records table.
    pub table: String,
}

/// `[pycsw-dynamic]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfig {
    /// Filesystem path of the ISO 19139 XML template.
    pub iso_template: PathBuf,

    /// Fail rendering on undefined template variables instead of rendering them empty.
    #[serde(default)]
    pub strict_undefined: bool,
}

impl DynamicConfig {
    /// Directory the template loader is scoped to.
    pub fn template_dir(&self) -> &Path {
        self.iso_template
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// File name of the template inside [`template_dir`](Self::template_dir).
    pub fn template_name(&self) -> Result<String> {
        self.iso_template
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .ok_or_else(|| {
                DynRepoError::config(format!(
                    "iso_template '{}' does not name a file",
                    self.iso_template.display()
                ))
            })
    }
}

impl AppConfig {
    /// Resolve environment placeholders in every string value.
    pub fn resolve_env(&mut self) {
        self.resolve_with(&|name| std::env::var(name).ok());
    }

    fn resolve_with(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        self.repository.database = interpolate_with(&self.repository.database, lookup);
        self.repository.table = interpolate_with(&self.repository.table, lookup);
        let template = self.dynamic.iso_template.to_string_lossy().into_owned();
        self.dynamic.iso_template = PathBuf::from(interpolate_with(&template, lookup));
    }

    /// Check values that would otherwise fail much later.
    pub fn validate(&self) -> Result<()> {
        static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex")
        });

        if self.repository.database.trim().is_empty() {
            return Err(DynRepoError::config("repository.database is empty"));
        }
        if !IDENT_RE.is_match(&self.repository.table) {
            return Err(DynRepoError::config(format!(
                "repository.table '{}' is not a valid table name",
                self.repository.table
            )));
        }
        self.dynamic.template_name()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Environment interpolation
// ---------------------------------------------------------------------------

/// Expand `$NAME` and `${NAME}` from the process environment.
/// Unknown variables are left untouched.
pub fn interpolate_env(value: &str) -> String {
    interpolate_with(value, &|name| std::env::var(name).ok())
}

fn interpolate_with(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$(?:\{([A-Za-z0-9_]+)\}|([A-Za-z0-9_]+))").expect("valid regex")
    });

    VAR_RE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file named by `PYCSW_CONFIG`.
pub fn config_path_from_env() -> Result<PathBuf> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(val) if !val.is_empty() => Ok(PathBuf::from(val)),
        _ => Err(DynRepoError::config(format!(
            "{CONFIG_ENV_VAR} is not set; point it at the dynrepo config file"
        ))),
    }
}

/// Load the config from the file named by `PYCSW_CONFIG`.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path_from_env()?;
    load_config_from(&path)
}

/// Load, interpolate and validate the config at `path`.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DynRepoError::io(path, e))?;

    let mut config: AppConfig = toml::from_str(&content).map_err(|e| {
        DynRepoError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.resolve_env();
    config.validate()?;

    tracing::debug!(?path, table = %config.repository.table, "loaded config");
    Ok(config)
}

/// Write a starter config file to `path`. Returns the path written.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DynRepoError::io(parent, e))?;
    }

    let config = AppConfig {
        repository: RepositoryConfig {
            database: "sqlite:///${PWD}/records.db".into(),
            table: "records".into(),
        },
        dynamic: DynamicConfig {
            iso_template: PathBuf::from("${PWD}/templates/iso19139.xml"),
            strict_undefined: false,
        },
    };
    let content =
        toml::to_string_pretty(&config).map_err(|e| DynRepoError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| DynRepoError::io(path, e))?;
    tracing::info!(?path, "created starter config file");

    Ok(path.to_path_buf())
}
