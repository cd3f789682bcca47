//! Dashboard configuration loaded from TOML and the environment.
//!
//! Sources, later wins: built-in defaults, the file named by `VOXGRID_CONFIG`
//! (default `config/voxgrid.toml`, skipped when missing), then environment
//! variables with prefix `VOXGRID` and `__` as the nesting separator, e.g.
//! `VOXGRID__REMOTE__WEBHOOK_ID=abc123`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use voxgrid_synth::{CompilerOptions, PropertyBag};

const DEFAULT_CONFIG_PATH: &str = "config/voxgrid.toml";

fn default_slot() -> String {
    "dashboard-widgets".to_string()
}

fn default_base_url() -> String {
    "http://localhost:5678/webhook".to_string()
}

fn default_webhook_id() -> String {
    "voice-widget".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_manual_prompt() -> String {
    "Create a widget".to_string()
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.5
}

fn default_properties() -> PropertyBag {
    let props = json!({
        "city": "San Francisco",
        "temperature": 72,
        "condition": "Sunny",
    });
    props.as_object().cloned().unwrap_or_default()
}

/// Durable store section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Key holding the serialized widget list.
    #[serde(default = "default_slot")]
    pub slot: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slot: default_slot(),
        }
    }
}

/// Remote snippet source (`GET {base_url}/{webhook_id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_webhook_id")]
    pub webhook_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transcription sent by the manual "Display Widget" trigger.
    #[serde(default = "default_manual_prompt")]
    pub manual_prompt: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            webhook_id: default_webhook_id(),
            timeout_secs: default_timeout_secs(),
            manual_prompt: default_manual_prompt(),
        }
    }
}

impl RemoteConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.webhook_id.trim_start_matches('/')
        )
    }
}

/// Grid geometry and placement policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "GridConfig::default_columns")]
    pub columns: i64,
    /// Row height in pixels.
    #[serde(default = "GridConfig::default_cell_height")]
    pub cell_height: f32,
    /// Gap between cells in pixels.
    #[serde(default = "GridConfig::default_margin")]
    pub margin: f32,
    /// Allow overlapping cells. When false, collisions push cells down.
    #[serde(default = "default_true")]
    pub float: bool,
    #[serde(default = "GridConfig::default_slots_per_row")]
    pub slots_per_row: i64,
    #[serde(default = "GridConfig::default_span")]
    pub default_width: i64,
    #[serde(default = "GridConfig::default_span")]
    pub default_height: i64,
    /// Upper bound on rows; 0 means unbounded.
    #[serde(default)]
    pub max_rows: i64,
}

impl GridConfig {
    fn default_columns() -> i64 {
        12
    }
    fn default_cell_height() -> f32 {
        80.0
    }
    fn default_margin() -> f32 {
        10.0
    }
    fn default_slots_per_row() -> i64 {
        3
    }
    fn default_span() -> i64 {
        4
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: Self::default_columns(),
            cell_height: Self::default_cell_height(),
            margin: Self::default_margin(),
            float: true,
            slots_per_row: Self::default_slots_per_row(),
            default_width: Self::default_span(),
            default_height: Self::default_span(),
            max_rows: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Transcripts at or below this confidence are rejected.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Properties given to freshly synthesized widgets.
    #[serde(default = "default_properties")]
    pub default_properties: PropertyBag,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            default_properties: default_properties(),
        }
    }
}

/// Global dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub app_name: String,
    /// Base directory for the sled store.
    pub storage_path: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub synth: CompilerOptions,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "Voice Widget Dashboard".to_string(),
            storage_path: "./data".to_string(),
            store: StoreConfig::default(),
            remote: RemoteConfig::default(),
            grid: GridConfig::default(),
            synth: CompilerOptions::default(),
            voice: VoiceConfig::default(),
            widget: WidgetConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load from `VOXGRID_CONFIG` (or `config/voxgrid.toml`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("VOXGRID_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load with an explicit file path; a missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("app_name", "Voice Widget Dashboard")?
            .set_default("storage_path", "./data")?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VOXGRID").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// Directory of the sled database.
    pub fn store_dir(&self) -> PathBuf {
        Path::new(&self.storage_path).join("voxgrid_store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CoreConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.store.slot, "dashboard-widgets");
        assert_eq!(cfg.grid.columns, 12);
        assert_eq!(cfg.grid.cell_height, 80.0);
        assert!(cfg.grid.float);
        assert_eq!(cfg.remote.timeout_secs, 30);
        assert_eq!(cfg.synth.entry_suffix, "Widget");
        assert_eq!(cfg.voice.confidence_threshold, 0.5);
        assert_eq!(cfg.widget.default_properties["city"], "San Francisco");
    }

    #[test]
    fn file_overrides_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxgrid.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
app_name = "Kitchen Board"
storage_path = "/tmp/kitchen"

[remote]
webhook_id = "abc123"

[grid]
float = false
max_rows = 20

[synth]
entry_suffix = "Card"
"#
        )
        .unwrap();

        let cfg = CoreConfig::load_from(&path).unwrap();
        assert_eq!(cfg.app_name, "Kitchen Board");
        assert_eq!(cfg.remote.webhook_id, "abc123");
        assert_eq!(cfg.remote.base_url, "http://localhost:5678/webhook");
        assert!(!cfg.grid.float);
        assert_eq!(cfg.grid.max_rows, 20);
        assert_eq!(cfg.grid.columns, 12);
        assert_eq!(cfg.synth.entry_suffix, "Card");
        assert_eq!(cfg.synth.scaffold_names, vec!["App".to_string()]);
        assert_eq!(cfg.store_dir(), PathBuf::from("/tmp/kitchen/voxgrid_store"));
    }

    #[test]
    fn endpoint_joins_cleanly() {
        let remote = RemoteConfig {
            base_url: "http://host:5678/webhook/".into(),
            webhook_id: "/xyz".into(),
            ..RemoteConfig::default()
        };
        assert_eq!(remote.endpoint(), "http://host:5678/webhook/xyz");
    }
}
