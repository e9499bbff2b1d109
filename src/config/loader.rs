//! Configuration Loader (Figment-based)
//!
//! Loads and merges settings from multiple sources:
//! 1. Built-in mode-profile defaults (Serialized)
//! 2. Project config (.enhance/config.toml)
//! 3. Environment variables (ENHANCE_* prefix)

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::error::{EnhanceError, Result};

use super::mode::Mode;
use super::settings::Settings;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<Settings> {
        Self::load_with_mode(Mode::default())
    }

    pub fn load_with_mode(mode: Mode) -> Result<Settings> {
        let defaults = Settings::from_mode(mode, &std::collections::HashMap::new())?;
        let mut figment = Figment::new().merge(Serialized::defaults(&defaults));

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!(path = %project_path.display(), "loading project config");
            figment = figment.merge(Toml::file(&project_path));
        }

        figment = figment.merge(Env::prefixed("ENHANCE_").split('_').lowercase(true));

        figment
            .extract()
            .map_err(|e| EnhanceError::Config(format!("configuration error: {e}")))
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Settings> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| EnhanceError::Config(format!("configuration error: {e}")))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(".enhance")
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    pub fn is_project_initialized() -> bool {
        Self::project_dir().exists()
    }

    pub fn init_project() -> Result<PathBuf> {
        let dir = Self::project_dir();
        std::fs::create_dir_all(&dir)?;
        std::fs::create_dir_all(dir.join("presets"))?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            let defaults = Settings::default();
            let toml_str = toml::to_string_pretty(&defaults)
                .map_err(|e| EnhanceError::Config(format!("failed to render default config: {e}")))?;
            std::fs::write(&config_path, toml_str)?;
        }

        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_default_config_is_performance_mode() {
        let settings = ConfigLoader::load().unwrap();
        assert_eq!(settings.mode, Mode::Performance);
    }

    #[test]
    fn load_from_file_applies_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = \"secure\"\n[pipeline]\nmax_passes = 7\n").unwrap();

        let settings = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(settings.mode, Mode::Secure);
        assert_eq!(settings.pipeline.max_passes, 7);
    }

    #[test]
    fn env_override_changes_llm_primary() {
        unsafe {
            std::env::set_var("ENHANCE_LLM_PRIMARY", "remote");
        }
        let settings = ConfigLoader::load().unwrap();
        assert_eq!(settings.llm.primary, "remote");
        unsafe {
            std::env::remove_var("ENHANCE_LLM_PRIMARY");
        }
    }
}
