//! Configuration loading from fastpick.toml
//!
//! fastpick configuration can be specified in a `fastpick.toml` file in the
//! project root. The configuration is discovered by walking up from the
//! current directory. CLI flags override anything set here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up by [`FastpickConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "fastpick.toml";

/// fastpick configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FastpickConfig {
    /// Timing configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Sandbox limits
    #[serde(default)]
    pub sandbox: SandboxSettings,
    /// Module validation requirements
    #[serde(default)]
    pub module: ModuleSettings,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Subprocess harness configuration
    #[serde(default)]
    pub harness: HarnessConfig,
}

/// Runner configuration for timed execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Warmup duration before measurement (e.g., "250ms")
    #[serde(default = "default_warmup")]
    pub warmup_time: String,
    /// Measurement duration per candidate (e.g., "1s")
    #[serde(default = "default_measurement")]
    pub measurement_time: String,
    /// Fixed iteration count: skip warmup, run exactly N iterations
    #[serde(default)]
    pub samples: Option<u64>,
    /// Minimum number of iterations
    #[serde(default)]
    pub min_iterations: Option<u64>,
    /// Maximum number of iterations
    #[serde(default)]
    pub max_iterations: Option<u64>,
    /// Number of samples to aim for per candidate
    #[serde(default = "default_target_samples")]
    pub target_samples: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup(),
            measurement_time: default_measurement(),
            samples: None,
            min_iterations: None,
            max_iterations: None,
            target_samples: default_target_samples(),
        }
    }
}

fn default_warmup() -> String {
    "250ms".to_string()
}
fn default_measurement() -> String {
    "1s".to_string()
}
fn default_target_samples() -> usize {
    fastpick_core::DEFAULT_SAMPLE_COUNT
}

/// Sandbox limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Budget for evaluating a candidate's source
    #[serde(default = "default_eval_timeout")]
    pub eval_timeout: String,
    /// Budget for each call of the entry point
    #[serde(default = "default_call_timeout")]
    pub call_timeout: String,
    /// Heap limit per candidate runtime, in MiB
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
    /// Stack limit per candidate runtime, in KiB
    #[serde(default)]
    pub max_stack_kb: Option<u64>,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            eval_timeout: default_eval_timeout(),
            call_timeout: default_call_timeout(),
            memory_limit_mb: None,
            max_stack_kb: None,
        }
    }
}

fn default_eval_timeout() -> String {
    "1s".to_string()
}
fn default_call_timeout() -> String {
    "1s".to_string()
}

/// Module validation requirements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ModuleSettings {
    /// Fail when the module has no `entryPointName`
    #[serde(default)]
    pub require_entry_point: bool,
    /// Fail when the module has no `testData`
    #[serde(default)]
    pub require_test_data: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "protocol", "human", "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "protocol".to_string()
}

/// Subprocess harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Outer timeout for an isolated run (e.g., "60s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}

impl FastpickConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path of the nearest `fastpick.toml`, walking up from the current directory
    pub fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let path = Self::find()?;
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# fastpick Configuration

[runner]
# Warmup duration before measurement
warmup_time = "250ms"
# Measurement duration per candidate
measurement_time = "1s"
# Samples to aim for per candidate
target_samples = 50
# Fixed iteration count: skip warmup, run exactly N iterations (uncomment to enable)
# samples = 100
# Minimum iterations (uncomment to enable)
# min_iterations = 10
# Maximum iterations (uncomment to enable)
# max_iterations = 1000000

[sandbox]
# Budget for evaluating a candidate's source
eval_timeout = "1s"
# Budget for each call of the entry point
call_timeout = "1s"
# Heap limit per candidate, in MiB (uncomment to enable)
# memory_limit_mb = 256
# Stack limit per candidate, in KiB (uncomment to enable)
# max_stack_kb = 1024

[module]
# Fail when the module has no entryPointName
require_entry_point = false
# Fail when the module has no testData
require_test_data = false

[output]
# Default output format: protocol, human, json
format = "protocol"

[harness]
# Outer timeout for `fastpick isolated`
timeout = "60s"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}
