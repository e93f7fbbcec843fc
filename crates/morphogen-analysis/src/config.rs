//! Configuration loading and typed config structures for the analyzer.
//!
//! Configuration is optional: every field has a default matching the
//! scoring model's reference constants, so an empty YAML document (or no
//! file at all) yields a fully usable [`AnalysisConfig`]. A config file only
//! needs to name the values it changes:
//!
//! ```yaml
//! reader:
//!   trailing_events: synthetic_step
//! scoring:
//!   breach_max_threat: 1.25
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::harness::EvolutionConfig;

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

    /// A value parsed but is outside its valid range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level analyzer configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Input reading behaviour.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Fitness weights, normalizers, and breach thresholds.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Dashboard export defaults.
    #[serde(default)]
    pub export: ExportConfig,

    /// Mutation harness parameters.
    #[serde(default)]
    pub harness: EvolutionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnalysisConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `MORPHOGEN_LOG_LEVEL` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` when given, otherwise start from the defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Returns any [`from_file`](Self::from_file) error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::parse(""),
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        if self.harness.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "harness.batch_size",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.harness.archive_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "harness.archive_limit",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// What to do with events that follow the final `StepSummary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingEvents {
    /// Drop them. Matches the behaviour of earlier tooling.
    #[default]
    Discard,
    /// Finalize them as one extra step after the last boundary.
    SyntheticStep,
}

/// Input reading configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReaderConfig {
    /// Handling of events after the last boundary.
    #[serde(default)]
    pub trailing_events: TrailingEvents,

    /// Maximum number of physical lines read from each input (unlimited
    /// when absent).
    #[serde(default)]
    pub line_limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Fitness model constants.
///
/// The defaults are the reference model; changing them changes every
/// fitness score and recommendation downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the normalized average threat.
    #[serde(default = "default_threat_weight")]
    pub threat_weight: f64,

    /// Weight of the replication suppression component.
    #[serde(default = "default_suppression_weight")]
    pub suppression_weight: f64,

    /// Weight of the cell loss component.
    #[serde(default = "default_cell_loss_weight")]
    pub cell_loss_weight: f64,

    /// Weight of the lineage component.
    #[serde(default = "default_lineage_weight")]
    pub lineage_weight: f64,

    /// Weight of the stimulus component.
    #[serde(default = "default_stimulus_weight")]
    pub stimulus_weight: f64,

    /// Average threat that saturates the threat component.
    #[serde(default = "default_threat_scale")]
    pub threat_scale: f64,

    /// Per-step stimulus that saturates the stimulus component.
    #[serde(default = "default_stimulus_scale")]
    pub stimulus_scale: f64,

    /// Per-step lineage shift rate that saturates lineage pressure.
    #[serde(default = "default_lineage_pressure_scale")]
    pub lineage_pressure_scale: f64,

    /// Share of lineage pressure inside the lineage component.
    #[serde(default = "default_lineage_pressure_mix")]
    pub lineage_pressure_mix: f64,

    /// Share of lineage focus inside the lineage component.
    #[serde(default = "default_lineage_focus_mix")]
    pub lineage_focus_mix: f64,

    /// Fitness above which a breach is declared.
    #[serde(default = "default_breach_fitness")]
    pub breach_fitness: f64,

    /// Peak threat above which a breach is declared.
    #[serde(default = "default_breach_max_threat")]
    pub breach_max_threat: f64,

    /// Cell loss component above which a breach is declared.
    #[serde(default = "default_breach_cell_loss")]
    pub breach_cell_loss: f64,

    /// Lineage component above which a breach is declared.
    #[serde(default = "default_breach_lineage")]
    pub breach_lineage: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threat_weight: default_threat_weight(),
            suppression_weight: default_suppression_weight(),
            cell_loss_weight: default_cell_loss_weight(),
            lineage_weight: default_lineage_weight(),
            stimulus_weight: default_stimulus_weight(),
            threat_scale: default_threat_scale(),
            stimulus_scale: default_stimulus_scale(),
            lineage_pressure_scale: default_lineage_pressure_scale(),
            lineage_pressure_mix: default_lineage_pressure_mix(),
            lineage_focus_mix: default_lineage_focus_mix(),
            breach_fitness: default_breach_fitness(),
            breach_max_threat: default_breach_max_threat(),
            breach_cell_loss: default_breach_cell_loss(),
            breach_lineage: default_breach_lineage(),
        }
    }
}

impl ScoringConfig {
    /// Reject negative weights and non-positive scales.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("scoring.threat_weight", self.threat_weight),
            ("scoring.suppression_weight", self.suppression_weight),
            ("scoring.cell_loss_weight", self.cell_loss_weight),
            ("scoring.lineage_weight", self.lineage_weight),
            ("scoring.stimulus_weight", self.stimulus_weight),
            ("scoring.lineage_pressure_mix", self.lineage_pressure_mix),
            ("scoring.lineage_focus_mix", self.lineage_focus_mix),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("weight must be a non-negative number, got {value}"),
                });
            }
        }

        let scales = [
            ("scoring.threat_scale", self.threat_scale),
            ("scoring.stimulus_scale", self.stimulus_scale),
            ("scoring.lineage_pressure_scale", self.lineage_pressure_scale),
        ];
        for (field, value) in scales {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("scale must be positive, got {value}"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Metric columns charted when the caller does not name any.
pub const DEFAULT_CHART_METRICS: &[&str] = &[
    "threat_score",
    "cell_count",
    "replications",
    "signals_total",
    "lineage_shifts_total",
    "stimulus_total",
    "fitness_score",
];

/// Dashboard export defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Columns folded into the chart spec.
    #[serde(default = "default_chart_metrics")]
    pub chart_metrics: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chart_metrics: default_chart_metrics(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` still wins
    /// when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Override the level with `MORPHOGEN_LOG_LEVEL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MORPHOGEN_LOG_LEVEL") {
            self.level = val;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_threat_weight() -> f64 {
    0.35
}

const fn default_suppression_weight() -> f64 {
    0.20
}

const fn default_cell_loss_weight() -> f64 {
    0.15
}

const fn default_lineage_weight() -> f64 {
    0.20
}

const fn default_stimulus_weight() -> f64 {
    0.10
}

const fn default_threat_scale() -> f64 {
    1.5
}

const fn default_stimulus_scale() -> f64 {
    1.5
}

const fn default_lineage_pressure_scale() -> f64 {
    0.6
}

const fn default_lineage_pressure_mix() -> f64 {
    0.6
}

const fn default_lineage_focus_mix() -> f64 {
    0.4
}

const fn default_breach_fitness() -> f64 {
    0.65
}

const fn default_breach_max_threat() -> f64 {
    1.1
}

const fn default_breach_cell_loss() -> f64 {
    0.45
}

const fn default_breach_lineage() -> f64 {
    0.8
}

fn default_chart_metrics() -> Vec<String> {
    DEFAULT_CHART_METRICS
        .iter()
        .map(|metric| (*metric).to_owned())
        .collect()
}

fn default_log_level() -> String {
    "info".to_owned()
}
