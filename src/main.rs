use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vu_monitor::{
    actuator::{Actuator, LogActuator, TerminalMeter},
    config::{Backend, Config},
    CancellationToken, MonitorError, Scheduler, ShutdownReason, SystemSampler,
};

const EXIT_FATAL: u8 = 1;
const EXIT_STARTUP: u8 = 2;

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vu_monitor: {e}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    init_tracing(&config.log_level);

    let cancel = CancellationToken::new();
    let (sampler, actuator) = match setup(&config, &cancel) {
        Ok(parts) => parts,
        Err(e) => {
            error!("startup failed: {e:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let mut scheduler = Scheduler::new(&config, sampler, actuator, cancel);
    let outcome = scheduler.run();
    match &outcome {
        Ok(reason) => info!(?reason, "clean exit"),
        Err(e) => error!(error = %e, "exiting after fatal error"),
    }
    ExitCode::from(exit_status(&outcome))
}

/// Process status once the loop has run. Startup failures never get here.
fn exit_status(outcome: &Result<ShutdownReason, MonitorError>) -> u8 {
    match outcome {
        Ok(ShutdownReason::Cancelled) => 0,
        Err(_) => EXIT_FATAL,
    }
}

// stdout belongs to the terminal meter
fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn setup(
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<(SystemSampler, Box<dyn Actuator>)> {
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("installing the interrupt handler")?;

    let sampler = SystemSampler::new(
        &config.network,
        config.max_bandwidth_bytes_per_sec,
        cancel.clone(),
    )
    .context("opening the metric source")?;

    let actuator = open_actuator(config).context("opening the output")?;
    Ok((sampler, actuator))
}

fn open_actuator(config: &Config) -> anyhow::Result<Box<dyn Actuator>> {
    let specs = config.channel_specs();
    let resolution = config.output.profile.resolution();
    let backend = match config.output.backend {
        Backend::Auto if io::stdout().is_terminal() => Backend::Terminal,
        Backend::Auto => Backend::Log,
        other => other,
    };
    info!(?backend, profile = ?config.output.profile, "output");

    Ok(match backend {
        Backend::Terminal => Box::new(TerminalMeter::new(specs, resolution)?),
        Backend::Log | Backend::Auto => Box::new(LogActuator::new(specs, resolution)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vu_monitor::{ActuatorError, ChannelId, SamplingError};

    #[test]
    fn exit_status_follows_the_outcome() {
        assert_eq!(exit_status(&Ok(ShutdownReason::Cancelled)), 0);
        assert_eq!(
            exit_status(&Err(SamplingError::NoInterfaces.into())),
            EXIT_FATAL
        );
        let write_failed = MonitorError::Actuator {
            channel: ChannelId(1),
            source: ActuatorError::ChannelShutDown(ChannelId(1)),
        };
        assert_eq!(exit_status(&Err(write_failed)), 1);
    }

    #[test]
    fn startup_failures_are_told_apart() {
        assert_eq!(EXIT_STARTUP, 2);
        assert_ne!(EXIT_STARTUP, EXIT_FATAL);
    }
}
