//! Configuration loading and typed config structures for the Lifegrid engine.
//!
//! The canonical configuration lives in `lifegrid-config.yaml` next to the
//! binary. Every field has a default, so an empty file (or no file at all)
//! yields a runnable configuration.
//!
//! ```yaml
//! grid:
//!   width: 36
//!   height: 36
//!   seed: 7
//! simulation:
//!   rule: "B3/S23"
//!   max_iterations: 100
//!   snapshot_workers: 4
//! render:
//!   mode: console
//!   generations: 36
//!   delay_ms: 1750
//! logging:
//!   level: info
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::rule::RulePolicy;

/// Upper bound on `simulation.max_iterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Initial grid shape and seed.
    #[serde(default)]
    pub grid: GridConfig,

    /// Rule and batch parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Output settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `LIFEGRID_SEED` and `LIFEGRID_RULE` override the file's values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. An empty document yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `LIFEGRID_SEED` is not a `u64`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup("LIFEGRID_SEED") {
            let seed = seed.trim().parse().map_err(|_err| ConfigError::Invalid {
                field: "grid.seed",
                reason: format!("LIFEGRID_SEED={seed:?} is not an unsigned integer"),
            })?;
            self.grid.seed = Some(seed);
        }
        if let Some(rule) = lookup("LIFEGRID_RULE") {
            self.simulation.rule = rule;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::Invalid {
                field: "grid",
                reason: format!(
                    "dimensions must be non-zero (got {}x{})",
                    self.grid.width, self.grid.height
                ),
            });
        }
        if self.simulation.max_iterations == 0
            || self.simulation.max_iterations > MAX_ITERATIONS_LIMIT
        {
            return Err(ConfigError::Invalid {
                field: "simulation.max_iterations",
                reason: format!(
                    "must be in 1..={MAX_ITERATIONS_LIMIT} (got {})",
                    self.simulation.max_iterations
                ),
            });
        }
        if self.simulation.snapshot_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.snapshot_workers",
                reason: "at least one worker is required".to_owned(),
            });
        }
        if self.render.cell_size == 0 {
            return Err(ConfigError::Invalid {
                field: "render.cell_size",
                reason: "must be at least one pixel".to_owned(),
            });
        }
        self.simulation.policy()?;
        Ok(())
    }
}

/// Initial grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_dimension")]
    pub width: usize,

    /// Number of rows.
    #[serde(default = "default_dimension")]
    pub height: usize,

    /// Seed for the initial random grid; `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            seed: None,
        }
    }
}

/// Rule and batch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Rule in `B/S` notation.
    #[serde(default = "default_rule")]
    pub rule: String,

    /// Generation cap for the final-state run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Parallelism of the snapshot pool.
    #[serde(default = "default_snapshot_workers")]
    pub snapshot_workers: usize,
}

impl SimulationConfig {
    /// Parse [`rule`](Self::rule) into a policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the notation does not parse.
    pub fn policy(&self) -> Result<RulePolicy, ConfigError> {
        RulePolicy::from_notation(&self.rule).map_err(|err| ConfigError::Invalid {
            field: "simulation.rule",
            reason: err.to_string(),
        })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rule: default_rule(),
            max_iterations: default_max_iterations(),
            snapshot_workers: default_snapshot_workers(),
        }
    }
}

/// Where generations are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Block glyphs on standard output.
    #[default]
    Console,
    /// One PNG per generation.
    Image,
    /// Nothing is drawn.
    None,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Renderer to use.
    #[serde(default)]
    pub mode: RenderMode,

    /// Generations to draw before the final-state run.
    #[serde(default = "default_render_generations")]
    pub generations: u32,

    /// Pause between drawn generations, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Output directory for [`RenderMode::Image`].
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Edge length of one cell in pixels for [`RenderMode::Image`].
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,

    /// Clear the terminal before each console frame.
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            generations: default_render_generations(),
            delay_ms: default_delay_ms(),
            image_dir: default_image_dir(),
            cell_size: default_cell_size(),
            clear_screen: default_clear_screen(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_dimension() -> usize {
    36
}

fn default_rule() -> String {
    RulePolicy::Conway.notation()
}

const fn default_max_iterations() -> u32 {
    MAX_ITERATIONS_LIMIT
}

const fn default_snapshot_workers() -> usize {
    crate::snapshot::DEFAULT_SNAPSHOT_WORKERS
}

const fn default_render_generations() -> u32 {
    36
}

const fn default_delay_ms() -> u64 {
    1750
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("frames")
}

const fn default_cell_size() -> u32 {
    8
}

const fn default_clear_screen() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}
