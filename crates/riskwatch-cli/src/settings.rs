//! Layered settings: scenario defaults, optional file, environment.

use riskwatch_pipeline::{PipelineConfig, Scenario, SourceConfig};
use serde::{Deserialize, Serialize};

/// Environment variable prefix; nested keys use `__`, e.g.
/// `RISKWATCH_PIPELINE__ALERTS__FLOOR=HIGH`.
pub const ENV_PREFIX: &str = "RISKWATCH";

/// Keys whose values are replaced wholesale by a config file instead of
/// being merged element by element.
const REPLACED_KEYS: [&str; 6] = [
    "pipeline.features",
    "pipeline.calibration",
    "pipeline.confidence",
    "pipeline.segments",
    "pipeline.actions",
    "pipeline.carry_columns",
];

/// Everything one CLI invocation runs with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Built-in settings of a scenario.
    pub fn defaults(scenario: Scenario) -> anyhow::Result<Self> {
        Ok(Self {
            source: scenario.source(),
            pipeline: scenario.config()?,
            logging: LoggingConfig::default(),
        })
    }

    /// Scenario defaults, then `path` (TOML, JSON or YAML by extension), then
    /// `RISKWATCH_*` environment variables.
    ///
    /// Lists and tagged sections set in the file replace the defaults
    /// outright, ahead of the environment: a two-band segment table must not
    /// inherit a third band from a three-band default.
    pub fn load(scenario: Scenario, path: Option<&str>) -> anyhow::Result<Self> {
        let defaults = Self::defaults(scenario)?;
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        if let Some(path) = path {
            let file = config::Config::builder()
                .add_source(config::File::with_name(path))
                .build()?;
            for key in REPLACED_KEYS {
                if let Ok(value) = file.get::<config::Value>(key) {
                    builder = builder.set_override(key, value)?;
                }
            }
            builder = builder.add_source(file);
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}
