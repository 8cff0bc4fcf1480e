//! Store configuration (`results.json` at the store root)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File name of the optional store configuration.
pub const CONFIG_FILE: &str = "results.json";

/// Default number of histogram buckets.
pub const DEFAULT_PLOT_WIDTH: usize = 65;

const fn default_plot_width() -> usize {
    DEFAULT_PLOT_WIDTH
}

/// Per-store settings.
///
/// ```json
/// { "ignored_facts": ["nixos_system"], "plot_width": 80 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Facts the comparator always treats as ignored
    #[serde(default)]
    pub ignored_facts: Vec<String>,
    /// Histogram buckets per group
    #[serde(default = "default_plot_width")]
    pub plot_width: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ignored_facts: Vec::new(),
            plot_width: DEFAULT_PLOT_WIDTH,
        }
    }
}

impl StoreConfig {
    /// Read `results.json` from the store root, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but cannot be read or
    /// parsed, or sets `plot_width` to zero
    pub fn load(store_root: &Path) -> Result<Self> {
        let path = store_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_error = |message: String| Error::Config {
            path: path.clone(),
            message,
        };
        let text = std::fs::read_to_string(&path).map_err(|e| config_error(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        if config.plot_width == 0 {
            return Err(config_error("plot_width must be at least 1".to_string()));
        }
        tracing::debug!(path = %path.display(), ?config, "loaded store config");
        Ok(config)
    }
}
