//! Configuration sections and their defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::backend::BackendCatalog;

/// Main configuration structure for Conclave
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Dispatch timing and generation parameters
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Aggregation heuristics thresholds
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Known backends and the guaranteed primary
    #[serde(default)]
    pub catalog: BackendCatalog,

    /// Assumed token volume used for cost projection
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (console only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Emit logs on stderr
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_console: true,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatchConfig {
    /// Per-call timeout in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Delay between calls for throttled sequential workflows
    #[serde(default = "default_sequential_delay_ms")]
    pub sequential_delay_ms: u64,

    /// Max tokens for pass-1 calls
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Max tokens for the synthesis pass
    #[serde(default = "default_synthesis_max_tokens")]
    pub synthesis_max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Overall dispatch deadline; unbounded when unset
    #[serde(default)]
    pub request_deadline_secs: Option<u64>,
}

const fn default_call_timeout_secs() -> u64 {
    60
}

const fn default_sequential_delay_ms() -> u64 {
    4000
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_synthesis_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.7
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            sequential_delay_ms: default_sequential_delay_ms(),
            max_tokens: default_max_tokens(),
            synthesis_max_tokens: default_synthesis_max_tokens(),
            temperature: default_temperature(),
            request_deadline_secs: None,
        }
    }
}

/// Thresholds for the consensus, variance, outlier and derivative heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Fragments shorter than this (in chars, after trimming) are not claims
    #[serde(default = "default_min_claim_chars")]
    pub min_claim_chars: usize,

    /// Leave-one-out z-score above which a response is a numeric outlier
    #[serde(default = "default_outlier_z_threshold")]
    pub outlier_z_threshold: f64,

    /// Only numbers strictly below this count for the numeric outlier pass
    #[serde(default = "default_numeric_ceiling")]
    pub numeric_ceiling: f64,

    /// Minimum responses with qualifying numbers before the numeric pass runs
    #[serde(default = "default_min_numeric_responses")]
    pub min_numeric_responses: usize,

    /// Mean pairwise Jaccard below which a response is a lexical outlier
    #[serde(default = "default_lexical_similarity_threshold")]
    pub lexical_similarity_threshold: f64,

    /// Words must be longer than this to enter a word set
    #[serde(default = "default_min_word_len")]
    pub min_word_len: usize,

    /// Magnitude ratio (either direction) that classifies a hallucination
    #[serde(default = "default_hallucination_ratio")]
    pub hallucination_ratio: f64,

    /// Vocabulary overlap below which a response misunderstood the query
    #[serde(default = "default_misunderstood_overlap")]
    pub misunderstood_overlap: f64,

    /// Coefficient of variation above which numbers form a distribution
    #[serde(default = "default_distribution_cv")]
    pub distribution_cv: f64,

    /// Largest severity score still rated medium (0 is always low)
    #[serde(default = "default_severity_medium_max")]
    pub severity_medium_max: usize,

    /// Number of consensus claims quoted in the summary
    #[serde(default = "default_summary_claims")]
    pub summary_claims: usize,
}

const fn default_min_claim_chars() -> usize {
    20
}

const fn default_outlier_z_threshold() -> f64 {
    2.5
}

const fn default_numeric_ceiling() -> f64 {
    100.0
}

const fn default_min_numeric_responses() -> usize {
    3
}

const fn default_lexical_similarity_threshold() -> f64 {
    0.3
}

const fn default_min_word_len() -> usize {
    3
}

const fn default_hallucination_ratio() -> f64 {
    10.0
}

const fn default_misunderstood_overlap() -> f64 {
    0.2
}

const fn default_distribution_cv() -> f64 {
    0.3
}

const fn default_severity_medium_max() -> usize {
    2
}

const fn default_summary_claims() -> usize {
    3
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_claim_chars: default_min_claim_chars(),
            outlier_z_threshold: default_outlier_z_threshold(),
            numeric_ceiling: default_numeric_ceiling(),
            min_numeric_responses: default_min_numeric_responses(),
            lexical_similarity_threshold: default_lexical_similarity_threshold(),
            min_word_len: default_min_word_len(),
            hallucination_ratio: default_hallucination_ratio(),
            misunderstood_overlap: default_misunderstood_overlap(),
            distribution_cv: default_distribution_cv(),
            severity_medium_max: default_severity_medium_max(),
            summary_claims: default_summary_claims(),
        }
    }
}

/// Token volume assumed per call when projecting workflow cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectionConfig {
    /// Prompt tokens assumed per call
    #[serde(default = "default_assumed_input_tokens")]
    pub assumed_input_tokens: u64,

    /// Completion tokens assumed per call
    #[serde(default = "default_assumed_output_tokens")]
    pub assumed_output_tokens: u64,
}

const fn default_assumed_input_tokens() -> u64 {
    2000
}

const fn default_assumed_output_tokens() -> u64 {
    1500
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            assumed_input_tokens: default_assumed_input_tokens(),
            assumed_output_tokens: default_assumed_output_tokens(),
        }
    }
}
