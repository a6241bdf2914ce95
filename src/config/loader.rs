//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/zipfolio/config.toml)
//! 3. Project config (.zipfolio/config.toml)
//! 4. Environment variables (ZIPFOLIO_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{FolioError, Result};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults -> global -> project -> env vars.
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. ZIPFOLIO_LLM_MODEL -> llm.model
        figment = figment.merge(Env::prefixed("ZIPFOLIO_").split('_').lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| FolioError::Config(format!("Configuration error: {}", e)))?;

        // API keys only ever come from the environment or an explicit file.
        if config.llm.api_key.is_none() {
            config.llm.api_key = env::var("ZIPFOLIO_LLM_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (tests, `--config`).
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| FolioError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Path to the global config directory (~/.config/zipfolio/).
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("zipfolio"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".zipfolio/config.toml")
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(".zipfolio")
    }

    // =========================================================================
    // Config commands
    // =========================================================================

    /// Print the resolved configuration file paths with existence markers.
    pub fn show_paths() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Initialize the global configuration directory and default config
    /// file. An existing config is left alone unless `force` is set.
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            FolioError::Config("Cannot determine global config directory".to_string())
        })?;
        let config_path = global_dir.join("config.toml");
        Self::write_default_config(&config_path, force)?;
        Ok(config_path)
    }

    /// Initialize the project configuration file under `.zipfolio/`.
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let config_path = Self::project_config_path();
        Self::write_default_config(&config_path, force)?;
        Ok(config_path)
    }

    fn write_default_config(path: &Path, force: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() && !force {
            info!("Config exists, not overwriting: {}", path.display());
            return Ok(());
        }

        let rendered = toml::to_string_pretty(&Config::default())
            .map_err(|e| FolioError::Config(e.to_string()))?;
        fs::write(path, rendered)?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    /// Render a configuration for display: TOML by default, JSON on
    /// request.
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| FolioError::Config(e.to_string()))
        }
    }
}
