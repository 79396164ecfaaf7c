//! Project configuration consumed by the startup coordinator and launcher.
//!
//! The coordinator only reads [`ProjectConfig::cache_dir`]; the launcher
//! reads [`ProjectConfig::server`]. Everything else is carried for the
//! launcher's benefit.

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

const DEFAULT_CACHE_SUBDIR: &str = "analysis-server";
const FALLBACK_CACHE_DIR: &str = ".cache";
const CURRENT_DIR: &str = ".";

// ============================================
// CONFIG STRUCTS
// ============================================

/// How to start the analysis server for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Defaults to the project root when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl ServerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub root_dir: PathBuf,
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub server: ServerCommand,
}

/// On-disk shape; `cache_dir` may be omitted and paths may be relative.
#[derive(Debug, Deserialize)]
struct RawProjectConfig {
    name: String,
    #[serde(default)]
    root_dir: Option<PathBuf>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    server: ServerCommand,
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ProjectConfig {
    pub fn new(
        name: impl Into<String>,
        root_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            root_dir: root_dir.into(),
            cache_dir: cache_dir.into(),
            server: ServerCommand::default(),
        }
    }

    pub fn with_server(mut self, server: ServerCommand) -> Self {
        self.server = server;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Load a project config from a TOML file.
    ///
    /// Relative `root_dir` and `cache_dir` are resolved against the directory
    /// containing the file. `root_dir` defaults to that directory; `cache_dir`
    /// defaults to the platform cache dir (see [`default_cache_dir`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid TOML
    /// for this shape, or fails [`ProjectConfig::validate`].
    #[track_caller]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::caller(),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_toml_str(&contents, path)?;
        info!(
            "Project config '{}' loaded from {}",
            config.name,
            path.display()
        );
        Ok(config)
    }

    /// Parse a config as if it had been read from `origin`.
    #[track_caller]
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawProjectConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: origin.to_path_buf(),
                reason: e.to_string(),
            })?;

        // A bare file name has an empty parent, which is not a usable directory.
        let base_dir = origin
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new(CURRENT_DIR))
            .to_path_buf();

        let root_dir = match raw.root_dir {
            Some(dir) => resolve(&base_dir, dir),
            None => base_dir.clone(),
        };

        let cache_dir = match raw.cache_dir {
            Some(dir) => resolve(&base_dir, dir),
            None => {
                let dir = default_cache_dir(&raw.name, &root_dir);
                debug!("No cache_dir configured, using {}", dir.display());
                dir
            }
        };

        let config = ProjectConfig {
            name: raw.name,
            root_dir,
            cache_dir,
            server: raw.server,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "Project name cannot be empty".to_string(),
            });
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "cache_dir cannot be empty".to_string(),
            });
        }

        if self.server.program.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::caller(),
                reason: "server.program cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// `<platform cache>/analysis-server/<name>`, or `<root>/.cache` when the
/// platform has no cache directory.
pub fn default_cache_dir(project_name: &str, root_dir: &Path) -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join(DEFAULT_CACHE_SUBDIR).join(project_name),
        None => root_dir.join(FALLBACK_CACHE_DIR),
    }
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
