use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::tree::LayoutDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStrategy {
    Stream,
    Poll,
}

impl Default for DataStrategy {
    fn default() -> Self {
        Self::Stream
    }
}

impl DataStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Poll => "poll",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub api_base_url: String,
    pub strategy: DataStrategy,
    pub fallback_to_polling: bool,
    pub poll_interval_ms: u64,
    pub simulate_interval_ms: u64,
    pub demo_fallback: bool,
    pub simulated_stages: Vec<String>,
    pub layout_direction: LayoutDirection,
    pub max_visible_nodes: usize,
    pub sidebar_open_on_start: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            strategy: DataStrategy::Stream,
            fallback_to_polling: true,
            poll_interval_ms: 2000,
            simulate_interval_ms: 800,
            demo_fallback: true,
            simulated_stages: default_stages(),
            layout_direction: LayoutDirection::LeftRight,
            max_visible_nodes: 1200,
            sidebar_open_on_start: false,
        }
    }
}

// worker names reported by the analysis backend
fn default_stages() -> Vec<String> {
    [
        "IQVIA Insights",
        "Patent Landscape",
        "Clinical Trials",
        "Web Intelligence",
        "Report Generator",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "pipegraph")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid viewer config, using defaults");
            ViewerConfig::default()
        }
    }
}

pub fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}
