/// Server configuration
use crate::error::{Result, ServerError};
use lit_pipeline::{PipelineConfig, StagingConfig, DEFAULT_TOOL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_processing")]
    pub processing: ProcessingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Directory holding uploaded sources and their working files
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// Base URL under which `audio_dir` is served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingSettings {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Per-stage limit in seconds; unset means no limit
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,

    #[serde(default = "default_working_suffix")]
    pub working_suffix: String,

    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,
}

impl ServerConfig {
    /// Load configuration from `path` (or `config.toml` when absent) and the environment
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. LIT_STORAGE__AUDIO_DIR
        settings = settings.add_source(
            config::Environment::with_prefix("LIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.audio_dir.as_os_str().is_empty() {
            return Err(ServerError::Config(
                "Audio directory is required (set LIT_STORAGE__AUDIO_DIR)".to_string(),
            ));
        }

        if self.storage.public_base_url.is_empty() {
            return Err(ServerError::Config(
                "Public base URL is required".to_string(),
            ));
        }

        self.to_pipeline_config()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Pipeline settings derived from the `processing` section
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            tool_path: self.processing.ffmpeg_path.clone(),
            stage_timeout: self.processing.stage_timeout_secs.map(Duration::from_secs),
            staging: StagingConfig {
                working_suffix: self.processing.working_suffix.clone(),
                temp_suffix: self.processing.temp_suffix.clone(),
            },
        }
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        audio_dir: default_audio_dir(),
        public_base_url: default_public_base_url(),
    }
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("/app/audio")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_processing() -> ProcessingSettings {
    ProcessingSettings {
        ffmpeg_path: default_ffmpeg_path(),
        stage_timeout_secs: None,
        working_suffix: default_working_suffix(),
        temp_suffix: default_temp_suffix(),
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from(DEFAULT_TOOL)
}

fn default_working_suffix() -> String {
    StagingConfig::default().working_suffix
}

fn default_temp_suffix() -> String {
    StagingConfig::default().temp_suffix
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            processing: default_processing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.audio_dir, PathBuf::from("/app/audio"));
    }

    #[test]
    fn test_pipeline_config_conversion() {
        let mut config = ServerConfig::default();
        config.processing.stage_timeout_secs = Some(30);

        let pipeline = config.to_pipeline_config();
        assert_eq!(pipeline.tool_path, PathBuf::from("ffmpeg"));
        assert_eq!(pipeline.stage_timeout, Some(Duration::from_secs(30)));
        assert_eq!(pipeline.staging, StagingConfig::default());
    }

    #[test]
    fn test_invalid_processing_settings_are_rejected() {
        let mut config = ServerConfig::default();
        config.processing.stage_timeout_secs = Some(0);
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let mut config = ServerConfig::default();
        config.processing.temp_suffix = config.processing.working_suffix.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lit.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[storage]
audio_dir = "/srv/audio"

[processing]
stage_timeout_secs = 120
"#,
        )
        .unwrap();

        let config = ServerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.audio_dir, PathBuf::from("/srv/audio"));
        assert_eq!(config.processing.stage_timeout_secs, Some(120));
        assert_eq!(config.processing.working_suffix, "_denoised");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ServerConfig::load_from(Some(Path::new("/nonexistent/lit.toml")));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
