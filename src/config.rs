//! Preferences persisted between sessions
//!
//! Stored as TOML at `~/.kubenav/config.toml`; `KUBENAV_CONFIG` points at an
//! alternative file. Every mutation is written through immediately and write
//! failures are only logged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use kubenav_types::{PreferenceStore, RecentCategory, push_recent};

/// Environment variable overriding the preferences path
pub const CONFIG_ENV: &str = "KUBENAV_CONFIG";

/// Directory under the home directory holding preferences and the log file
pub const APP_DIR: &str = ".kubenav";

/// On-disk preference document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    pub recent_kubeconfigs: Vec<String>,
    pub recent_commands: Vec<String>,
    pub recent_log_searches: Vec<String>,
    /// Namespace to deployments
    pub recent_deployments: BTreeMap<String, Vec<String>>,
    /// Deployment to pods
    pub recent_pods: BTreeMap<String, Vec<String>>,
}

impl Preferences {
    fn list(&self, category: RecentCategory, scope: &str) -> Option<&Vec<String>> {
        match category {
            RecentCategory::Contexts => Some(&self.recent_kubeconfigs),
            RecentCategory::Actions => Some(&self.recent_commands),
            RecentCategory::LogSearches => Some(&self.recent_log_searches),
            RecentCategory::Resources => self.recent_deployments.get(scope),
            RecentCategory::Instances => self.recent_pods.get(scope),
        }
    }

    fn list_mut(&mut self, category: RecentCategory, scope: &str) -> &mut Vec<String> {
        match category {
            RecentCategory::Contexts => &mut self.recent_kubeconfigs,
            RecentCategory::Actions => &mut self.recent_commands,
            RecentCategory::LogSearches => &mut self.recent_log_searches,
            RecentCategory::Resources => self.recent_deployments.entry(scope.to_string()).or_default(),
            RecentCategory::Instances => self.recent_pods.entry(scope.to_string()).or_default(),
        }
    }
}

/// Default preferences path, honoring `KUBENAV_CONFIG`
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    Some(dirs::home_dir()?.join(APP_DIR).join("config.toml"))
}

/// [`PreferenceStore`] backed by a TOML file
#[derive(Debug)]
pub struct FilePreferences {
    path: Option<PathBuf>,
    data: Preferences,
}

impl FilePreferences {
    /// Load from the default location. A missing file yields defaults; an
    /// unreadable or malformed one is reported.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self {
                path: None,
                data: Preferences::default(),
            }),
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("failed to parse preferences {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read preferences {}", path.display()));
            }
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    pub fn data(&self) -> &Preferences {
        &self.data
    }

    /// Kubeconfig path used by the last session
    pub fn kubeconfig(&self) -> Option<&str> {
        self.data.kubeconfig.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(path, &toml::to_string_pretty(&self.data)?)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("failed to save preferences: {:#}", e);
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, content).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

impl PreferenceStore for FilePreferences {
    fn recent(&self, category: RecentCategory, scope: &str) -> Vec<String> {
        self.data.list(category, scope).cloned().unwrap_or_default()
    }

    fn record_recent(&mut self, category: RecentCategory, scope: &str, item: &str) {
        push_recent(self.data.list_mut(category, scope), item);
        self.persist();
    }

    fn last_namespace(&self) -> Option<String> {
        self.data.last_namespace.clone()
    }

    fn set_last_namespace(&mut self, namespace: &str) {
        self.data.last_namespace = Some(namespace.to_string());
        self.persist();
    }

    fn last_context_path(&self) -> Option<String> {
        self.data.kubeconfig.clone()
    }

    fn set_last_context_path(&mut self, path: &str) {
        self.data.kubeconfig = Some(path.to_string());
        self.persist();
    }
}
