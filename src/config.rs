//! Application configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/zentile/config.json`.  Every key is optional; a missing
//! file or a minimal `{}` gives the compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "keybindings": {
//!     "Control-Shift-t": "tile",
//!     "Control-Shift-v": "set layout vertical",
//!     "Control-Shift-w": "for workspace 0, tile"
//!   },
//!   "ignore": ["ulauncher", "Steam"],
//!   "layouts": ["vertical", "fullscreen"],
//!   "gap": 8,
//!   "proportion": 0.05,
//!   "remove_decorations": true
//! }
//! ```
//!
//! Keybinding values use the command grammar, so one chord can run a whole
//! sequence.

use crate::tiler::TilerOptions;
use crate::workspace::LayoutKind;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Action names that older configuration files used as keybinding *keys*,
/// with the chord as the value.
const LEGACY_ACTIONS: [&str; 10] = [
    "tile",
    "untile",
    "make_active_window_master",
    "increase_master",
    "decrease_master",
    "switch_layout",
    "next_window",
    "previous_window",
    "increment_master",
    "decrement_master",
];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key chord → command sequence.
    pub keybindings: BTreeMap<String, String>,
    /// Window classes that are never tiled.
    pub ignore: Vec<String>,
    /// Layout cycle order.
    pub layouts: Vec<String>,
    /// Spacing between tiled windows, in pixels.
    pub gap: u32,
    /// Master-area change per `increment_master` / `decrement_master`.
    pub proportion: f64,
    /// Number of workspaces to manage.
    pub workspaces: usize,
    /// Path of the control socket.
    pub socket_path: String,
    /// Strip window decorations while a workspace is tiled.
    pub remove_decorations: bool,
}

fn default_keybindings() -> BTreeMap<String, String> {
    [
        ("Control-Shift-t", "tile"),
        ("Control-Shift-u", "untile"),
        ("Control-Shift-m", "make_active_window_master"),
        ("Control-Shift-i", "increase_master"),
        ("Control-Shift-d", "decrease_master"),
        ("Control-Shift-s", "switch_layout"),
        ("Control-Shift-n", "next_window"),
        ("Control-Shift-p", "previous_window"),
        ("Control-bracketright", "increment_master"),
        ("Control-bracketleft", "decrement_master"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keybindings: default_keybindings(),
            ignore: Vec::new(),
            layouts: LayoutKind::DEFAULT_CYCLE
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
            gap: 5,
            proportion: 0.1,
            workspaces: 10,
            socket_path: "/tmp/zentile.sock".into(),
            remove_decorations: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e.0)))
    }

    /// Write the default configuration to `path` unless a file is already
    /// there, creating missing parent directories.  Returns whether a file
    /// was written.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| ConfigError(format!("failed to create {}: {}", dir.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError(e.to_string()))?;
        std::fs::write(path, json + "\n")
            .map_err(|e| ConfigError(format!("failed to write {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Parse configuration text, then rewrite legacy keybindings.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError(e.to_string()))?;
        config.invert_legacy_keybindings();
        Ok(config)
    }

    /// Turn `"tile": "Control-Shift-t"` into `"Control-Shift-t": "tile"`.
    fn invert_legacy_keybindings(&mut self) {
        for action in LEGACY_ACTIONS {
            if let Some(chord) = self.keybindings.remove(action) {
                self.keybindings.insert(chord, action.to_string());
            }
        }
    }

    /// The configured layout cycle.  Unknown names are skipped; an empty
    /// result falls back to the default cycle.
    pub fn layout_cycle(&self) -> Vec<LayoutKind> {
        let cycle: Vec<LayoutKind> = self
            .layouts
            .iter()
            .filter_map(|name| {
                let kind = LayoutKind::from_name(name);
                if kind.is_none() {
                    warn!("unknown layout {:?} in config, skipping", name);
                }
                kind
            })
            .collect();
        if cycle.is_empty() {
            LayoutKind::DEFAULT_CYCLE.to_vec()
        } else {
            cycle
        }
    }

    pub fn tiler_options(&self) -> TilerOptions {
        TilerOptions {
            layouts: self.layout_cycle(),
            ignore: self.ignore.clone(),
            proportion_step: self.proportion,
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
