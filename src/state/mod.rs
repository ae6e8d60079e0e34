pub mod error;

use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::pipeline::RagPipeline;

pub use error::InitializationError;

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: AppConfig,
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    /// Loads configuration from disk and wires up every pipeline component.
    ///
    /// Missing or unreadable config files fall back to defaults; values that
    /// fail validation abort start-up.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let pipeline = RagPipeline::from_config(settings.clone(), &paths)
            .map_err(|e| InitializationError::Pipeline(e.into()))?;

        Ok(Arc::new(Self::from_parts(paths, config, settings, pipeline)))
    }

    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        pipeline: RagPipeline,
    ) -> Self {
        Self {
            paths,
            config,
            settings,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn default_session_id(&self) -> &str {
        &self.settings.app.default_session_id
    }
}
