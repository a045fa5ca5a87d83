//! Output side: the `Actuator` capability and what every backend shares.
//!
//! The four driver variants (dual and single channel converters, software and
//! hardware duty cycle) differ only in channel count, full scale value and
//! resolution. [`OutputProfile`] captures that, and [`ChannelBank`] applies it
//! so each backend only has to render the value.

mod log;
mod terminal;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DAC_FULL_SCALE, DAC_MAX, HARD_PWM_FULL_SCALE, HARD_PWM_MAX, SOFT_PWM_FULL_SCALE, SOFT_PWM_MAX,
};
use crate::error::ActuatorError;

pub use self::log::LogActuator;
pub use self::terminal::TerminalMeter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u8);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sink that renders a number as a physical signal, one value per channel.
pub trait Actuator {
    fn set_value(&mut self, channel: ChannelId, value: f64) -> Result<(), ActuatorError>;

    fn shutdown(&mut self, channel: ChannelId) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_value(&mut self, channel: ChannelId, value: f64) -> Result<(), ActuatorError> {
        (**self).set_value(channel, value)
    }

    fn shutdown(&mut self, channel: ChannelId) -> Result<(), ActuatorError> {
        (**self).shutdown(channel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Register or duty cycle steps, written truncated toward zero.
    Integer,
    Continuous,
}

impl Resolution {
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Resolution::Integer => value.trunc(),
            Resolution::Continuous => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputProfile {
    /// Two channel 12 bit bus converter.
    #[default]
    DualDac,
    /// One channel 12 bit bus converter.
    SingleDac,
    /// Software timed duty cycle, 0-100 scale.
    SoftPwm,
    /// Hardware timed duty cycle, integer scale.
    HardPwm,
}

impl OutputProfile {
    pub fn channel_count(self) -> u8 {
        match self {
            OutputProfile::SingleDac => 1,
            OutputProfile::DualDac | OutputProfile::SoftPwm | OutputProfile::HardPwm => 2,
        }
    }

    pub fn full_scale(self) -> f64 {
        match self {
            OutputProfile::DualDac | OutputProfile::SingleDac => DAC_FULL_SCALE,
            OutputProfile::SoftPwm => SOFT_PWM_FULL_SCALE,
            OutputProfile::HardPwm => HARD_PWM_FULL_SCALE,
        }
    }

    /// Where the needle reaches full deflection.
    pub fn default_max(self) -> f64 {
        match self {
            OutputProfile::DualDac | OutputProfile::SingleDac => DAC_MAX,
            OutputProfile::SoftPwm => SOFT_PWM_MAX,
            OutputProfile::HardPwm => HARD_PWM_MAX,
        }
    }

    pub fn resolution(self) -> Resolution {
        match self {
            OutputProfile::SoftPwm => Resolution::Continuous,
            _ => Resolution::Integer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub label: String,
    pub max: f64,
}

#[derive(Debug, Clone)]
struct ChannelState {
    spec: ChannelSpec,
    current: f64,
    shut_down: bool,
}

/// Channel bookkeeping shared by the backends: id lookup, range check,
/// resolution and the last written value.
#[derive(Debug, Clone)]
pub struct ChannelBank {
    channels: Vec<ChannelState>,
    resolution: Resolution,
}

impl ChannelBank {
    pub fn new(specs: Vec<ChannelSpec>, resolution: Resolution) -> Self {
        let channels = specs
            .into_iter()
            .map(|spec| ChannelState {
                spec,
                current: 0.0,
                shut_down: false,
            })
            .collect();
        Self {
            channels,
            resolution,
        }
    }

    fn state_mut(&mut self, channel: ChannelId) -> Result<&mut ChannelState, ActuatorError> {
        self.channels
            .iter_mut()
            .find(|state| state.spec.id == channel)
            .ok_or(ActuatorError::UnknownChannel(channel))
    }

    /// Validate and record a write, returning the value to put on the wire.
    pub fn write(&mut self, channel: ChannelId, value: f64) -> Result<f64, ActuatorError> {
        let resolution = self.resolution;
        let state = self.state_mut(channel)?;
        if state.shut_down {
            return Err(ActuatorError::ChannelShutDown(channel));
        }
        if !value.is_finite() || value < 0.0 || value > state.spec.max {
            return Err(ActuatorError::OutOfRange {
                channel,
                value,
                max: state.spec.max,
            });
        }
        let value = resolution.quantize(value);
        state.current = value;
        Ok(value)
    }

    /// Mark a channel as released. Repeated calls are harmless.
    pub fn shutdown(&mut self, channel: ChannelId) -> Result<(), ActuatorError> {
        let state = self.state_mut(channel)?;
        state.shut_down = true;
        Ok(())
    }

    pub fn label(&self, channel: ChannelId) -> &str {
        self.channels
            .iter()
            .find(|state| state.spec.id == channel)
            .map_or("?", |state| state.spec.label.as_str())
    }

    pub fn all_shut_down(&self) -> bool {
        self.channels.iter().all(|state| state.shut_down)
    }

    pub fn specs(&self) -> impl Iterator<Item = (&ChannelSpec, f64)> {
        self.channels.iter().map(|state| (&state.spec, state.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(resolution: Resolution) -> ChannelBank {
        ChannelBank::new(
            vec![
                ChannelSpec {
                    id: ChannelId(0),
                    label: "cpu".into(),
                    max: 600.0,
                },
                ChannelSpec {
                    id: ChannelId(1),
                    label: "network".into(),
                    max: 600.0,
                },
            ],
            resolution,
        )
    }

    #[test]
    fn integer_profiles_truncate() {
        let mut bank = bank(Resolution::Integer);
        assert_eq!(bank.write(ChannelId(1), 599.9).unwrap(), 599.0);
        let current: Vec<f64> = bank.specs().map(|(_, v)| v).collect();
        assert_eq!(current, vec![0.0, 599.0]);
    }

    #[test]
    fn continuous_profiles_pass_through() {
        let mut bank = bank(Resolution::Continuous);
        assert_eq!(bank.write(ChannelId(0), 4.25).unwrap(), 4.25);
    }

    #[test]
    fn rejects_unknown_channel_and_out_of_range() {
        let mut bank = bank(Resolution::Integer);
        assert!(matches!(
            bank.write(ChannelId(7), 1.0),
            Err(ActuatorError::UnknownChannel(ChannelId(7)))
        ));
        assert!(matches!(
            bank.write(ChannelId(0), 600.5),
            Err(ActuatorError::OutOfRange { .. })
        ));
        assert!(matches!(
            bank.write(ChannelId(0), -0.1),
            Err(ActuatorError::OutOfRange { .. })
        ));
        assert!(matches!(
            bank.write(ChannelId(0), f64::NAN),
            Err(ActuatorError::OutOfRange { .. })
        ));
    }

    #[test]
    fn writes_after_shutdown_fail() {
        let mut bank = bank(Resolution::Integer);
        bank.shutdown(ChannelId(0)).unwrap();
        bank.shutdown(ChannelId(0)).unwrap();
        assert!(!bank.all_shut_down());
        assert!(matches!(
            bank.write(ChannelId(0), 0.0),
            Err(ActuatorError::ChannelShutDown(ChannelId(0)))
        ));
        bank.shutdown(ChannelId(1)).unwrap();
        assert!(bank.all_shut_down());
    }

    #[test]
    fn profiles_describe_the_hardware() {
        assert_eq!(OutputProfile::SingleDac.channel_count(), 1);
        assert_eq!(OutputProfile::DualDac.default_max(), 600.0);
        assert_eq!(OutputProfile::SoftPwm.resolution(), Resolution::Continuous);
        assert_eq!(OutputProfile::HardPwm.default_max(), 200.0);
        assert!(OutputProfile::HardPwm.default_max() <= OutputProfile::HardPwm.full_scale());
    }
}
