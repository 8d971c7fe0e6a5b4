use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration shared by the CLI and the HTTP server.
///
/// Parsed from environment variables with fallback defaults. The binary loads
/// a `.env` file (via `dotenvy`) before calling [`GardenConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct GardenConfig {
    /// Garden root directory (default `{data_dir}/garden`).
    pub garden_dir: Option<PathBuf>,
    /// Model used for embeddings (default `all-minilm`).
    pub embed_model: String,
    /// Minimum cosine similarity for semantic connections (default 0.7).
    pub similarity_threshold: f32,
    /// Port for the analysis API (default 8001).
    pub port: u16,
    /// Pause between autonomous exploration iterations (default 1s).
    pub explore_pause: Duration,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            garden_dir: None,
            embed_model: "all-minilm".to_string(),
            similarity_threshold: 0.7,
            port: 8001,
            explore_pause: Duration::from_millis(1000),
        }
    }
}

impl GardenConfig {
    /// Parses configuration from environment variables.
    ///
    /// Falls back to defaults when env vars are not set or invalid.
    ///
    /// # Environment Variables
    ///
    /// - `GARDEN_DIR` (path): Garden root directory
    /// - `GARDEN_EMBED_MODEL` (string, default `all-minilm`): Embedding model
    /// - `GARDEN_SIMILARITY_THRESHOLD` (f32, default 0.7): Semantic connection cutoff
    /// - `GARDEN_PORT` (u16, default 8001): Analysis API port
    /// - `GARDEN_EXPLORE_PAUSE_MS` (u64, default 1000): Exploration pacing
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let garden_dir = std::env::var("GARDEN_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let embed_model = std::env::var("GARDEN_EMBED_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.embed_model);

        let similarity_threshold = std::env::var("GARDEN_SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|t: &f32| (-1.0..=1.0).contains(t))
            .unwrap_or(defaults.similarity_threshold);

        let port = std::env::var("GARDEN_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let explore_pause = std::env::var("GARDEN_EXPLORE_PAUSE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.explore_pause);

        Self {
            garden_dir,
            embed_model,
            similarity_threshold,
            port,
            explore_pause,
        }
    }
}
