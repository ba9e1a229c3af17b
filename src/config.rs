use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_HOME_DIR: &str = "dynamic_parameter";
pub const DEFAULT_BASE_DIR: &str = "classpath";
/// Staging directory on worker nodes, relative to the agent workspace.
pub const DEFAULT_REMOTE_STAGING_DIR: &str = "dynamic_parameter_classpath";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingLayout {
    /// Every execution copies into the same directory. Concurrent stagings to one node race.
    #[default]
    Shared,
    /// Every execution gets its own sub-directory, removed once the call returns.
    PerExecution,
}

/// 插件配置
/// 由宿主应用负责加载和保存，显式传入 Dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicParameterConfig {
    pub home_directory: PathBuf,
    /// Classpath base directory; `<home>/classpath` when unset.
    pub base_directory: Option<PathBuf>,
    pub remote_staging_dir: String,
    pub staging_layout: StagingLayout,
    /// Deadline for a single remote call. `None` waits forever.
    pub call_timeout_secs: Option<u64>,
}

impl Default for DynamicParameterConfig {
    fn default() -> Self {
        Self {
            home_directory: PathBuf::from(DEFAULT_HOME_DIR),
            base_directory: None,
            remote_staging_dir: DEFAULT_REMOTE_STAGING_DIR.to_string(),
            staging_layout: StagingLayout::Shared,
            call_timeout_secs: None,
        }
    }
}

impl DynamicParameterConfig {
    pub fn with_base_directory(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: Some(base_directory.into()),
            ..Self::default()
        }
    }

    pub fn base_directory(&self) -> PathBuf {
        self.base_directory
            .clone()
            .unwrap_or_else(|| self.home_directory.join(DEFAULT_BASE_DIR))
    }

    pub fn set_base_directory(&mut self, base_directory: impl Into<PathBuf>) {
        self.base_directory = Some(base_directory.into());
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to deserialize config from {}", path.display()))?;
        Ok(config)
    }

    /// Missing file gives the defaults; a broken one is logged and also gives the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "Cannot load configuration, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}
