//! OS metric sampling. The blocking `sample` call is the loop's clock.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use sysinfo::{Networks, System};
use tracing::trace;

use crate::cancel::CancellationToken;
use crate::config::NetworkConfig;
use crate::error::SamplingError;
use crate::network::{byte_delta, network_percent, InterfaceSelection, NetCounters};
use crate::util::describe_traffic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Network,
    Cpu,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Network => write!(f, "network"),
            Metric::Cpu => write!(f, "cpu"),
        }
    }
}

/// One tick's readings, both in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub network_percent: f64,
    pub cpu_percent: f64,
}

impl Sample {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Network => self.network_percent,
            Metric::Cpu => self.cpu_percent,
        }
    }
}

/// Source of per-tick samples.
///
/// `sample` blocks for `interval` and reports activity over that span, so it
/// doubles as the scheduler's tick provider. A non-blocking timer paired with
/// an async metric fetch can stand in without touching the window logic.
pub trait MetricSampler {
    fn sample(&mut self, interval: Duration) -> Result<Sample, SamplingError>;
}

impl<S: MetricSampler + ?Sized> MetricSampler for Box<S> {
    fn sample(&mut self, interval: Duration) -> Result<Sample, SamplingError> {
        (**self).sample(interval)
    }
}

/// Samples the host through `sysinfo`.
///
/// CPU usage is measured between two refreshes: the previous call (or
/// construction) and the end of this interval. With a zero interval that is
/// the usage since the last call, like a non-blocking utilization query.
pub struct SystemSampler {
    system: System,
    networks: Networks,
    selection: InterfaceSelection,
    max_bandwidth: u64,
    cancel: CancellationToken,
}

impl SystemSampler {
    pub fn new(
        network: &NetworkConfig,
        max_bandwidth: u64,
        cancel: CancellationToken,
    ) -> Result<Self, SamplingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SamplingError::Unsupported);
        }
        let selection = InterfaceSelection::resolve(network)?;

        let mut system = System::new();
        system.refresh_cpu_usage();
        let networks = Networks::new_with_refreshed_list();

        let sampler = Self {
            system,
            networks,
            selection,
            max_bandwidth,
            cancel,
        };
        // fail at startup rather than on the first tick
        sampler.read_counters()?;
        Ok(sampler)
    }

    fn read_counters(&self) -> Result<NetCounters, SamplingError> {
        let list = self.networks.list();
        if let Some(missing) = self.selection.required().find(|name| !list.contains_key(*name)) {
            return Err(SamplingError::InterfaceVanished(missing.to_string()));
        }

        let mut counters = NetCounters::default();
        for (name, data) in list {
            if self.selection.includes(name) {
                counters.bytes_recv = counters.bytes_recv.wrapping_add(data.total_received());
                counters.bytes_sent = counters.bytes_sent.wrapping_add(data.total_transmitted());
            }
        }
        Ok(counters)
    }
}

impl MetricSampler for SystemSampler {
    fn sample(&mut self, interval: Duration) -> Result<Sample, SamplingError> {
        self.networks.refresh();
        let before = self.read_counters()?;

        // interrupted waits still report, the scheduler discards the tick
        if !interval.is_zero() {
            self.cancel.wait_timeout(interval);
        }

        self.system.refresh_cpu_usage();
        let cpu = f64::from(self.system.global_cpu_usage());
        self.networks.refresh();
        let after = self.read_counters()?;

        let delta = byte_delta(before, after).max(0) as u64;
        trace!(
            traffic = %describe_traffic(delta, interval, self.max_bandwidth),
            "network counters"
        );

        Ok(Sample {
            network_percent: network_percent(before, after, self.max_bandwidth),
            cpu_percent: if cpu.is_finite() { cpu.clamp(0.0, 100.0) } else { 0.0 },
        })
    }
}
