use std::collections::BTreeSet;

use pnet::datalink;

use crate::config::NetworkConfig;
use crate::error::SamplingError;

/// Cumulative byte counters summed over the selected interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// Traffic between two counter readings relative to the bandwidth ceiling,
/// clamped to `[0, 100]`. A counter that went backwards (reset or wrap)
/// yields 0.
pub fn network_percent(before: NetCounters, after: NetCounters, max_bandwidth: u64) -> f64 {
    let delta = byte_delta(before, after);
    let percent = delta as f64 / max_bandwidth as f64 * 100.0;
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Received plus sent bytes between two readings; may be negative on wrap.
pub fn byte_delta(before: NetCounters, after: NetCounters) -> i128 {
    (after.bytes_recv as i128 - before.bytes_recv as i128)
        + (after.bytes_sent as i128 - before.bytes_sent as i128)
}

/// Which interfaces contribute to the network counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSelection {
    only: Option<BTreeSet<String>>,
    excluded: BTreeSet<String>,
}

impl InterfaceSelection {
    pub fn includes(&self, name: &str) -> bool {
        if self.excluded.contains(name) {
            return false;
        }
        match &self.only {
            Some(only) => only.contains(name),
            None => true,
        }
    }

    /// Interfaces that were asked for by name and must stay present.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.only.iter().flatten().map(String::as_str)
    }

    /// Build a selection from `(name, is_loopback)` pairs.
    pub fn from_available(
        available: &[(String, bool)],
        config: &NetworkConfig,
    ) -> Result<Self, SamplingError> {
        if available.is_empty() {
            return Err(SamplingError::NoInterfaces);
        }

        let excluded: BTreeSet<String> = if config.include_loopback {
            BTreeSet::new()
        } else {
            available
                .iter()
                .filter(|(_, loopback)| *loopback)
                .map(|(name, _)| name.clone())
                .collect()
        };

        let only = if config.interfaces.is_empty() {
            None
        } else {
            let mut wanted = BTreeSet::new();
            for name in &config.interfaces {
                if !available.iter().any(|(n, _)| n == name) {
                    return Err(SamplingError::UnknownInterface(name.clone()));
                }
                wanted.insert(name.clone());
            }
            Some(wanted)
        };

        let selection = Self { only, excluded };
        if !available.iter().any(|(name, _)| selection.includes(name)) {
            return Err(SamplingError::NoInterfaces);
        }
        Ok(selection)
    }

    /// Resolve the configured interfaces against the OS interface list.
    pub fn resolve(config: &NetworkConfig) -> Result<Self, SamplingError> {
        let available: Vec<(String, bool)> = datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let loopback = iface.is_loopback();
                (iface.name, loopback)
            })
            .collect();
        Self::from_available(&available, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 15_000_000;

    fn counters(recv: u64, sent: u64) -> NetCounters {
        NetCounters {
            bytes_recv: recv,
            bytes_sent: sent,
        }
    }

    #[test]
    fn full_bandwidth_saturates_at_100() {
        let pct = network_percent(counters(1000, 0), counters(1000, MAX), MAX);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn over_range_clamps_to_100() {
        let pct = network_percent(counters(0, 0), counters(MAX, MAX), MAX);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn counter_wrap_clamps_to_zero() {
        let pct = network_percent(counters(5_000, 5_000), counters(10, 10), MAX);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn receive_and_send_are_added() {
        let pct = network_percent(counters(0, 0), counters(1_500_000, 1_500_000), MAX);
        assert!((pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn counters_near_u64_max_do_not_overflow() {
        let before = counters(u64::MAX - 10, u64::MAX);
        let after = counters(u64::MAX, 0);
        assert_eq!(byte_delta(before, after), 10 - u64::MAX as i128);
        assert_eq!(network_percent(before, after, MAX), 0.0);
    }

    fn available() -> Vec<(String, bool)> {
        vec![
            ("lo".to_string(), true),
            ("eth0".to_string(), false),
            ("wlan0".to_string(), false),
        ]
    }

    #[test]
    fn default_selection_takes_everything() {
        let selection =
            InterfaceSelection::from_available(&available(), &NetworkConfig::default()).unwrap();
        assert!(selection.includes("lo"));
        assert!(selection.includes("eth0"));
        assert_eq!(selection.required().count(), 0);
    }

    #[test]
    fn loopback_can_be_excluded() {
        let config = NetworkConfig {
            include_loopback: false,
            ..NetworkConfig::default()
        };
        let selection = InterfaceSelection::from_available(&available(), &config).unwrap();
        assert!(!selection.includes("lo"));
        assert!(selection.includes("wlan0"));
    }

    #[test]
    fn named_interfaces_restrict_the_sum() {
        let config = NetworkConfig {
            interfaces: vec!["eth0".to_string()],
            ..NetworkConfig::default()
        };
        let selection = InterfaceSelection::from_available(&available(), &config).unwrap();
        assert!(selection.includes("eth0"));
        assert!(!selection.includes("wlan0"));
        assert_eq!(selection.required().collect::<Vec<_>>(), vec!["eth0"]);
    }

    #[test]
    fn unknown_interface_is_rejected() {
        let config = NetworkConfig {
            interfaces: vec!["eth9".to_string()],
            ..NetworkConfig::default()
        };
        let err = InterfaceSelection::from_available(&available(), &config).unwrap_err();
        assert!(matches!(err, SamplingError::UnknownInterface(name) if name == "eth9"));
    }

    #[test]
    fn only_loopback_without_loopback_is_empty() {
        let config = NetworkConfig {
            interfaces: vec!["lo".to_string()],
            include_loopback: false,
        };
        let err = InterfaceSelection::from_available(&available(), &config).unwrap_err();
        assert!(matches!(err, SamplingError::NoInterfaces));
    }
}
