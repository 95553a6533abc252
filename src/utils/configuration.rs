use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::error::PhyslrError;
use crate::graph::graph_filter::FilterConfig;
use crate::graph::overlap_graph::OverlapConfig;

const ENV_PREFIX: &str = "PHYSLR";
const LOG_FORMATS: [&str; 2] = ["pretty", "compact"];
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Runtime configuration, layered from built-in defaults, an optional TOML file
/// and `PHYSLR__SECTION__KEY` environment variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyslrConfig {
    /// Repetitive-marker filter used by `overlap`
    pub overlap: OverlapConfig,
    /// Default thresholds for `filter`
    pub filter: FilterConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads for molecule partitioning
    pub num_threads: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get().clamp(1, 16),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log output format (pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

pub struct ConfigurationManager {
    config: PhyslrConfig,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    /// Built-in defaults overlaid with environment variables
    pub fn new() -> Result<Self, PhyslrError> {
        Self::load(None)
    }

    /// Load configuration from a specific TOML file
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, PhyslrError> {
        Self::load(Some(config_path.as_ref()))
    }

    /// Defaults, then the file when given, then the environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, PhyslrError> {
        let mut builder = Config::builder().add_source(Config::try_from(&PhyslrConfig::default())?);
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(PhyslrError::ConfigurationError {
                    message: format!("configuration file not found: {}", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: PhyslrConfig = builder.build()?.try_deserialize()?;
        let manager = Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
        };
        manager.validate_configuration()?;
        Ok(manager)
    }

    /// Validate configuration parameters
    pub fn validate_configuration(&self) -> Result<(), PhyslrError> {
        validate(&self.config)
    }

    /// Get configuration reference
    pub fn config(&self) -> &PhyslrConfig {
        &self.config
    }

    /// Get mutable configuration reference
    pub fn config_mut(&mut self) -> &mut PhyslrConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Save current configuration to file
    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), PhyslrError> {
        let toml_string = generate_config_template(&self.config)?;
        std::fs::write(path.as_ref(), toml_string).map_err(|e| PhyslrError::ConfigurationError {
            message: format!("Failed to write configuration file: {e}"),
        })?;
        info!("💾 Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Defaults with a single worker thread and quiet logging
    pub fn create_minimal_config() -> PhyslrConfig {
        PhyslrConfig {
            performance: PerformanceConfig { num_threads: 1 },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: "compact".to_string(),
            },
            ..PhyslrConfig::default()
        }
    }
}

/// Reject settings no command could run with
pub fn validate(config: &PhyslrConfig) -> Result<(), PhyslrError> {
    if !config.overlap.coef.is_finite() || config.overlap.coef < 0.0 {
        return Err(PhyslrError::ValidationError {
            field: "overlap.coef".to_string(),
            reason: format!("must be a non-negative number, got {}", config.overlap.coef),
        });
    }

    if config.performance.num_threads == 0 {
        return Err(PhyslrError::ValidationError {
            field: "performance.num_threads".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    let available_threads = num_cpus::get();
    if config.performance.num_threads > available_threads * 2 {
        warn!(
            "Configured threads ({}) exceeds available cores ({})",
            config.performance.num_threads, available_threads
        );
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(PhyslrError::ValidationError {
            field: "logging.format".to_string(),
            reason: format!("must be one of {}", LOG_FORMATS.join(", ")),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        return Err(PhyslrError::ValidationError {
            field: "logging.level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
    Ok(())
}

/// Render a configuration as a commented TOML template
pub fn generate_config_template(config: &PhyslrConfig) -> Result<String, PhyslrError> {
    let body = toml::to_string_pretty(config).map_err(|e| PhyslrError::ConfigurationError {
        message: format!("Failed to serialize configuration: {e}"),
    })?;
    Ok(format!(
        "# physlr configuration\n\
         # Every key may be overridden with {ENV_PREFIX}__SECTION__KEY environment variables.\n\n\
         {body}"
    ))
}

/// Initialise the global tracing subscriber. Logs always go to stderr; `verbose`
/// raises the level to debug. `RUST_LOG` takes precedence over both.
pub fn setup_logging(config: &LoggingConfig, verbose: bool) -> Result<(), PhyslrError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let level = if verbose { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = match config.format.as_str() {
        "compact" => tracing::subscriber::set_global_default(
            subscriber.with(fmt::layer().compact().with_writer(std::io::stderr)),
        ),
        _ => tracing::subscriber::set_global_default(
            subscriber.with(
                fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    result.map_err(|e| PhyslrError::ConfigurationError {
        message: format!("Failed to initialise logging: {e}"),
    })?;
    Ok(())
}
