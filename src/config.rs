//! Reader configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration. CLI flags are applied on top by the binary.

use crate::error::{NovelQuestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_PAGE_SIZE: usize = 275;

/// Which saved position wins when neither the local nor the remote copy
/// refers to the document being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivergencePolicy {
    /// Use this device's last page index, whatever document it came from.
    #[default]
    PreferLocal,
    PreferRemote,
    /// Use whichever position was written most recently.
    PreferNewest,
    /// Ignore both and start at the first page.
    StartOver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Words per page
    pub page_size: usize,
    /// Minimum visible ratio for a page to count as the one being read
    pub dominance_ratio: f64,
    /// Quiet interval before a remote position write fires
    pub remote_debounce_ms: u64,
    /// Delay before the restore scroll, so pages can mount first
    pub restore_delay_ms: u64,
    /// How long viewport events caused by the restore scroll are ignored
    pub restore_settle_ms: u64,
    pub divergence_policy: DivergencePolicy,
    /// Root for the device store and the document backend
    pub data_dir: PathBuf,
    pub link_content_limit: usize,
    pub link_title_limit: usize,
    pub pdf_page_limit: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            dominance_ratio: 0.5,
            remote_debounce_ms: 1500,
            restore_delay_ms: 100,
            restore_settle_ms: 1000,
            divergence_policy: DivergencePolicy::PreferLocal,
            data_dir: PathBuf::from("./.novel-quest"),
            link_content_limit: 12_000,
            link_title_limit: 60,
            pdf_page_limit: 20,
            fetch_timeout_secs: 10,
        }
    }
}

impl ReaderConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NovelQuestError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| NovelQuestError::Config {
            reason: format!("Invalid config file {}: {}", path.display(), e),
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(NovelQuestError::Config {
                reason: "page_size must be greater than 0".to_string(),
            });
        }

        if !(self.dominance_ratio > 0.0 && self.dominance_ratio <= 1.0) {
            return Err(NovelQuestError::Config {
                reason: format!(
                    "dominance_ratio must be in (0, 1], got {}",
                    self.dominance_ratio
                ),
            });
        }

        Ok(())
    }

    pub fn remote_debounce(&self) -> Duration {
        Duration::from_millis(self.remote_debounce_ms)
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn device_store_path(&self) -> PathBuf {
        self.data_dir.join("device.json")
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.data_dir.join("accounts")
    }
}
