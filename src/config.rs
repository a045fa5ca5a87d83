//! Startup configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`VU_MONITOR_*`)
//! 2. TOML file named by `VU_MONITOR_CONFIG`, else `./vu_monitor.toml`
//! 3. Compiled defaults
//!
//! Immutable once the scheduler starts.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::actuator::{ChannelId, ChannelSpec, OutputProfile};
use crate::constants::{
    CONFIG_ENV, CURVE_B0, CURVE_CEILING, CURVE_K, DEFAULT_CONFIG_FILE,
    MAX_BANDWIDTH_BYTES_PER_SEC, POLLING_WINDOW_TICKS, TICK_INTERVAL_SECS,
};
use crate::curve::{CurveKind, ResponseCurve};
use crate::error::ConfigError;
use crate::sampler::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Terminal meter when stdout is a terminal, log lines otherwise.
    #[default]
    Auto,
    Terminal,
    Log,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "terminal" => Ok(Backend::Terminal),
            "log" => Ok(Backend::Log),
            other => Err(format!("unknown backend `{other}`")),
        }
    }
}

/// A metric driving one actuator channel. Order of the list is write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub metric: Metric,
    pub channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub profile: OutputProfile,
    pub backend: Backend,
    /// Empty means the profile's default wiring.
    pub channels: Vec<ChannelBinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interfaces to sum. Empty means all of them.
    pub interfaces: Vec<String>,
    pub include_loopback: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            include_loopback: true,
        }
    }
}

/// The `[curve]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub kind: CurveKind,
    pub b0: f64,
    pub k: f64,
    /// Unset means 700 on the converters and the needle max on PWM outputs.
    pub ceiling: Option<f64>,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            kind: CurveKind::Saturating,
            b0: CURVE_B0,
            k: CURVE_K,
            ceiling: None,
        }
    }
}

impl From<ResponseCurve> for CurveConfig {
    fn from(curve: ResponseCurve) -> Self {
        Self {
            kind: curve.kind,
            b0: curve.b0,
            k: curve.k,
            ceiling: Some(curve.ceiling),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tick_interval_secs: f64,
    pub polling_window_ticks: u32,
    pub max_bandwidth_bytes_per_sec: u64,
    /// Needle full deflection. Defaults to the output profile's value.
    pub actuator_max: Option<f64>,
    pub log_level: String,
    pub curve: CurveConfig,
    pub output: OutputConfig,
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_secs: TICK_INTERVAL_SECS,
            polling_window_ticks: POLLING_WINDOW_TICKS,
            max_bandwidth_bytes_per_sec: MAX_BANDWIDTH_BYTES_PER_SEC,
            actuator_max: None,
            log_level: "info".to_string(),
            curve: CurveConfig::default(),
            output: OutputConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Load from the process environment and the file system.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_with(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE), |key| {
            std::env::var(key).ok()
        })
    }

    /// Same as [`Config::load`] with the inputs made explicit.
    ///
    /// `explicit` must exist when given; `fallback` is only read if present.
    pub fn load_with(
        explicit: Option<&Path>,
        fallback: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if fallback.exists() => Self::from_file(fallback)?,
            None => Self::default(),
        };
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = parse_env(&env, "VU_MONITOR_WINDOW_TICKS")? {
            self.polling_window_ticks = v;
        }
        if let Some(v) = parse_env(&env, "VU_MONITOR_TICK_SECS")? {
            self.tick_interval_secs = v;
        }
        if let Some(v) = parse_env(&env, "VU_MONITOR_MAX_BANDWIDTH")? {
            self.max_bandwidth_bytes_per_sec = v;
        }
        if let Some(v) = parse_env(&env, "VU_MONITOR_ACTUATOR_MAX")? {
            self.actuator_max = Some(v);
        }
        if let Some(v) = parse_env(&env, "VU_MONITOR_BACKEND")? {
            self.output.backend = v;
        }
        if let Some(v) = env("VU_MONITOR_LOG") {
            self.log_level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_window_ticks == 0 {
            return Err(ConfigError::invalid("polling_window_ticks", "must be at least 1"));
        }
        if !self.tick_interval_secs.is_finite() || self.tick_interval_secs <= 0.0 {
            return Err(ConfigError::invalid(
                "tick_interval_secs",
                "must be a positive number of seconds",
            ));
        }
        if self.max_bandwidth_bytes_per_sec == 0 {
            return Err(ConfigError::invalid(
                "max_bandwidth_bytes_per_sec",
                "must be greater than 0",
            ));
        }

        let profile = self.output.profile;
        let max = self.actuator_max();
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::invalid("actuator_max", "must be greater than 0"));
        }
        if max > profile.full_scale() {
            return Err(ConfigError::invalid(
                "actuator_max",
                format!("exceeds the {:?} full scale of {}", profile, profile.full_scale()),
            ));
        }

        let curve = self.response_curve();
        if !(curve.b0.is_finite() && curve.k.is_finite() && curve.ceiling.is_finite()) {
            return Err(ConfigError::invalid("curve", "parameters must be finite"));
        }
        if curve.kind == CurveKind::Saturating {
            if curve.k < 0.0 {
                return Err(ConfigError::invalid("curve.k", "must not be negative"));
            }
            if curve.ceiling < curve.b0 {
                return Err(ConfigError::invalid(
                    "curve.ceiling",
                    format!("must not be below b0 ({})", curve.b0),
                ));
            }
        }

        let bindings = self.bindings();
        if bindings.is_empty() {
            return Err(ConfigError::invalid("output.channels", "no channel is bound"));
        }
        let mut seen = BTreeSet::new();
        for binding in &bindings {
            if binding.channel.0 >= profile.channel_count() {
                return Err(ConfigError::invalid(
                    "output.channels",
                    format!(
                        "channel {} does not exist on a {}-channel output",
                        binding.channel,
                        profile.channel_count()
                    ),
                ));
            }
            if !seen.insert(binding.channel) {
                return Err(ConfigError::invalid(
                    "output.channels",
                    format!("channel {} is bound twice", binding.channel),
                ));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }

    pub fn actuator_max(&self) -> f64 {
        self.actuator_max
            .unwrap_or_else(|| self.output.profile.default_max())
    }

    /// The curve with its ceiling resolved against the output profile.
    pub fn response_curve(&self) -> ResponseCurve {
        let ceiling = self.curve.ceiling.unwrap_or_else(|| match self.output.profile {
            OutputProfile::DualDac | OutputProfile::SingleDac => CURVE_CEILING,
            OutputProfile::SoftPwm | OutputProfile::HardPwm => self.actuator_max(),
        });
        ResponseCurve {
            kind: self.curve.kind,
            b0: self.curve.b0,
            k: self.curve.k,
            ceiling,
        }
    }

    /// Configured wiring, or the profile default: network on channel 1 and
    /// CPU on channel 0, network written first. A single channel shows
    /// network load.
    pub fn bindings(&self) -> Vec<ChannelBinding> {
        if !self.output.channels.is_empty() {
            return self.output.channels.clone();
        }
        match self.output.profile.channel_count() {
            1 => vec![ChannelBinding {
                metric: Metric::Network,
                channel: ChannelId(0),
            }],
            _ => vec![
                ChannelBinding {
                    metric: Metric::Network,
                    channel: ChannelId(1),
                },
                ChannelBinding {
                    metric: Metric::Cpu,
                    channel: ChannelId(0),
                },
            ],
        }
    }

    /// One spec per bound channel, in write order.
    pub fn channel_specs(&self) -> Vec<ChannelSpec> {
        let max = self.actuator_max();
        self.bindings()
            .into_iter()
            .map(|binding| ChannelSpec {
                id: binding.channel,
                label: binding.metric.to_string(),
                max,
            })
            .collect()
    }
}

fn parse_env<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse `{raw}`"))),
    }
}
