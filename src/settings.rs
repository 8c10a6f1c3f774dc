// Import necessary libraries and modules for file I/O and serialization.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::gateway::SkyboxStyle;

pub const DEFAULT_SKYBOX_URL: &str = "https://blockade-platform-production.s3.amazonaws.com/images/imagine/high_quality_detailed_digital_painting_cd_vr_computer_render_fantasy__6c9ca4a642910ce8__6154819_.jpg?ver=1";

// Application settings, read once at startup and handed to the constructors that need them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub blockade_api_key: Option<String>,
    pub scenario_api_key: Option<String>,

    pub narrative_model: String, // Completion model used for campaign events and character sheets.
    pub max_tokens: u32,
    pub embedding_model: String,
    pub embedding_dimensions: usize,

    pub similarity_threshold: f64,
    pub use_vector_search: bool, // Disable to always regenerate assets.
    pub default_skybox_url: String,

    pub blockade_base_url: String,
    pub skybox_style: SkyboxStyle,
    pub scenario_base_url: String,
    pub scenario_model: String,

    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,

    pub database_path: Option<PathBuf>, // Defaults to `<data dir>/chatrpg.db`.
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None,
            blockade_api_key: None,
            scenario_api_key: None,
            narrative_model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimensions: 1536,
            similarity_threshold: crate::semantic_cache::DEFAULT_SIMILARITY_THRESHOLD,
            use_vector_search: true,
            default_skybox_url: DEFAULT_SKYBOX_URL.to_string(),
            blockade_base_url: "https://backend.blockadelabs.com/api/v1".to_string(),
            skybox_style: SkyboxStyle::FantasyLand,
            scenario_base_url: "https://api.cloud.scenario.com/v1".to_string(),
            scenario_model: "EnoXc8q4QlqAfCfoObmW3Q".to_string(), // Public Scenario generator.
            poll_interval_ms: 1000,
            max_poll_attempts: 300,
            database_path: None,
            debug_mode: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // Directory holding the settings file, the log and the default database.
    pub fn data_dir() -> io::Result<PathBuf> {
        let home_dir = dir::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Failed to get home directory")
        })?;
        Ok(home_dir.join("chatrpg").join("data"))
    }

    // Load settings from the default file path.
    pub fn load() -> io::Result<Self> {
        Self::load_settings_from_file(Self::data_dir()?.join("settings.json"))
    }

    // Save current settings to the default file path.
    pub fn save(&self) -> io::Result<()> {
        self.save_to_file(Self::data_dir()?.join("settings.json"))
    }

    pub fn load_settings_from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    /// Environment variables win over keys stored on disk.
    pub fn with_env_overrides(mut self) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(key) = read("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = read("BLOCKADE_API_KEY") {
            self.blockade_api_key = Some(key);
        }
        if let Some(key) = read("SCENARIO_API_KEY") {
            self.scenario_api_key = Some(key);
        }
        self
    }

    pub fn database_path(&self) -> io::Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("chatrpg.db")),
        }
    }

    pub fn poll_policy(&self) -> crate::gateway::PollPolicy {
        crate::gateway::PollPolicy {
            interval: std::time::Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            timeout: None,
        }
    }
}
