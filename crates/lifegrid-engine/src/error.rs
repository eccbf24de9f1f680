//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lifegrid_core::config::ConfigError,
    },

    /// The simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: lifegrid_core::runner::RunnerError,
    },

    /// Drawing a generation failed.
    #[error("render error: {source}")]
    Render {
        /// The underlying render error.
        #[from]
        source: lifegrid_core::render::RenderError,
    },

    /// The final-state run failed.
    #[error("service error: {source}")]
    Game {
        /// The underlying service error.
        #[from]
        source: lifegrid_service::GameError,
    },
}
