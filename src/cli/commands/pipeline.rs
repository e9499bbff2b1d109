//! `enhance pipeline {list,create,apply}` - manage saved configuration presets.

use std::collections::HashMap;

use crate::config::{ConfigLoader, Mode, Settings};

fn presets_dir() -> std::path::PathBuf {
    ConfigLoader::project_dir().join("presets")
}

pub fn list() -> anyhow::Result<bool> {
    let dir = presets_dir();
    if !dir.exists() {
        println!("No presets saved yet; run `enhance pipeline create <name>` to save one.");
        return Ok(true);
    }

    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    names.sort();

    if names.is_empty() {
        println!("No presets saved yet.");
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(true)
}

pub fn create(name: &str, mode: Option<Mode>) -> anyhow::Result<bool> {
    ConfigLoader::init_project()?;
    let settings = Settings::from_mode(mode.unwrap_or_default(), &HashMap::new())?;
    let toml_str = toml::to_string_pretty(&settings)?;
    let path = presets_dir().join(format!("{name}.toml"));
    std::fs::write(&path, toml_str)?;
    println!("Saved preset '{name}' to {}", path.display());
    Ok(true)
}

pub fn apply(name: &str) -> anyhow::Result<bool> {
    let preset_path = presets_dir().join(format!("{name}.toml"));
    if !preset_path.exists() {
        anyhow::bail!("preset '{name}' not found; run `enhance pipeline list` to see available presets");
    }
    ConfigLoader::init_project()?;
    std::fs::copy(&preset_path, ConfigLoader::project_config_path())?;
    println!("Applied preset '{name}' to {}", ConfigLoader::project_config_path().display());
    Ok(true)
}
