//! Drives analog panel meters from host CPU and network load.
//!
//! Each tick the [`sampler::MetricSampler`] blocks for the tick interval and
//! reports percentages, the [`scheduler::Scheduler`] averages them over a
//! polling window, shapes the average with a [`curve::ResponseCurve`] and
//! writes the clamped result to an [`actuator::Actuator`] channel.

pub mod accumulator;
pub mod actuator;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod curve;
pub mod error;
pub mod network;
pub mod sampler;
pub mod scheduler;
pub mod util;

pub use accumulator::WindowAccumulator;
pub use actuator::{Actuator, ChannelId, OutputProfile};
pub use cancel::CancellationToken;
pub use config::Config;
pub use curve::{clamp_output, CurveKind, ResponseCurve};
pub use error::{ActuatorError, ConfigError, MonitorError, SamplingError};
pub use sampler::{Metric, MetricSampler, Sample, SystemSampler};
pub use scheduler::{Scheduler, SchedulerState, ShutdownReason};
