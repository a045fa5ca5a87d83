use tracing::info;

use super::{Actuator, ChannelBank, ChannelId, ChannelSpec, Resolution};
use crate::error::ActuatorError;

/// Reports needle positions as log events. Useful headless or without hardware.
pub struct LogActuator {
    bank: ChannelBank,
}

impl LogActuator {
    pub fn new(specs: Vec<ChannelSpec>, resolution: Resolution) -> Self {
        Self {
            bank: ChannelBank::new(specs, resolution),
        }
    }
}

impl Actuator for LogActuator {
    fn set_value(&mut self, channel: ChannelId, value: f64) -> Result<(), ActuatorError> {
        let written = self.bank.write(channel, value)?;
        info!(%channel, label = self.bank.label(channel), value = written, "needle");
        Ok(())
    }

    fn shutdown(&mut self, channel: ChannelId) -> Result<(), ActuatorError> {
        self.bank.shutdown(channel)?;
        info!(%channel, label = self.bank.label(channel), "channel released");
        Ok(())
    }
}
