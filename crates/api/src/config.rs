use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storyforge_comfyui::gateway::PollSettings;
use storyforge_pipeline::PipelineSettings;
use storyforge_synthesis::SynthesisConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight generation tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_parse("SHUTDOWN_TIMEOUT_SECS", 30),
        }
    }
}

/// Settings for the external services the generation pipeline talks to.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// ComfyUI base URL.
    pub comfyui_url: String,
    pub synthesis: SynthesisConfig,
    /// Directory holding `catalog.json` and the workflow files.
    pub workflow_catalog_dir: PathBuf,
    pub poll_interval_secs: u64,
    pub image_timeout_secs: u64,
    pub video_timeout_secs: u64,
}

impl GenerationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                   |
    /// |--------------------------|-------------------------------------------|
    /// | `COMFYUI_URL`            | `http://127.0.0.1:8188`                   |
    /// | `SYNTHESIS_URL`          | `http://127.0.0.1:5001/v1/workflows/run`  |
    /// | `SYNTHESIS_API_KEY`      | unset                                     |
    /// | `SYNTHESIS_USER`         | `storyforge`                              |
    /// | `SYNTHESIS_TIMEOUT_SECS` | `60`                                      |
    /// | `WORKFLOW_CATALOG_DIR`   | `./workflows`                             |
    /// | `POLL_INTERVAL_SECS`     | `3`                                       |
    /// | `IMAGE_TIMEOUT_SECS`     | `600`                                     |
    /// | `VIDEO_TIMEOUT_SECS`     | `3600`                                    |
    pub fn from_env() -> Self {
        let defaults = SynthesisConfig::default();
        let synthesis = SynthesisConfig {
            url: env_or("SYNTHESIS_URL", &defaults.url),
            api_key: std::env::var("SYNTHESIS_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            user: env_or("SYNTHESIS_USER", &defaults.user),
            timeout: Duration::from_secs(env_parse(
                "SYNTHESIS_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
        };

        Self {
            comfyui_url: env_or("COMFYUI_URL", "http://127.0.0.1:8188"),
            synthesis,
            workflow_catalog_dir: PathBuf::from(env_or("WORKFLOW_CATALOG_DIR", "./workflows")),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 3),
            image_timeout_secs: env_parse("IMAGE_TIMEOUT_SECS", 600),
            video_timeout_secs: env_parse("VIDEO_TIMEOUT_SECS", 3600),
        }
    }

    /// Poll budgets handed to the orchestrator.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let interval = Duration::from_secs(self.poll_interval_secs.max(1));
        PipelineSettings {
            image_poll: PollSettings {
                interval,
                timeout: Duration::from_secs(self.image_timeout_secs),
            },
            video_poll: PollSettings {
                interval,
                timeout: Duration::from_secs(self.video_timeout_secs),
            },
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse an env var, panicking on a malformed value so misconfiguration
/// fails at startup.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
