//! The control loop: sample, accumulate, shape, actuate, and always leave the
//! needles at rest on the way out.

use std::time::Duration;

use tracing::{debug, error, info, info_span, warn};

use crate::accumulator::WindowAccumulator;
use crate::actuator::{Actuator, ChannelId};
use crate::cancel::CancellationToken;
use crate::config::{ChannelBinding, Config};
use crate::constants::NEUTRAL_VALUE;
use crate::curve::{clamp_output, ResponseCurve};
use crate::error::{MonitorError, Result};
use crate::sampler::MetricSampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Cancelled,
}

struct Track {
    binding: ChannelBinding,
    window: WindowAccumulator,
}

pub struct Scheduler<S, A> {
    sampler: S,
    actuator: A,
    cancel: CancellationToken,
    curve: ResponseCurve,
    actuator_max: f64,
    tick_interval: Duration,
    window_ticks: u32,
    tracks: Vec<Track>,
    ticks_in_window: u32,
    state: SchedulerState,
}

impl<S: MetricSampler, A: Actuator> Scheduler<S, A> {
    /// `config` is expected to have passed [`Config::validate`].
    pub fn new(config: &Config, sampler: S, actuator: A, cancel: CancellationToken) -> Self {
        let window_ticks = config.polling_window_ticks.max(1);
        let tracks = config
            .bindings()
            .into_iter()
            .map(|binding| Track {
                binding,
                window: WindowAccumulator::new(window_ticks),
            })
            .collect();

        Self {
            sampler,
            actuator,
            cancel,
            curve: config.response_curve(),
            actuator_max: config.actuator_max(),
            tick_interval: config.tick_interval(),
            window_ticks,
            tracks,
            ticks_in_window: 0,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Drive the needles until cancelled or a fatal error occurs.
    ///
    /// Either way every channel gets the neutral value and is shut down
    /// before this returns, and the state ends at `Stopped`.
    pub fn run(&mut self) -> Result<ShutdownReason> {
        let span = info_span!("scheduler");
        let _enter = span.enter();
        debug_assert_eq!(self.state, SchedulerState::Idle, "scheduler already ran");

        let result = self.start().and_then(|()| self.run_loop());

        self.state = SchedulerState::ShuttingDown;
        let failed_channel = match &result {
            Ok(reason) => {
                info!(?reason, "shutting down");
                None
            }
            Err(e) => {
                error!(error = %e, "fatal, shutting down");
                match e {
                    MonitorError::Actuator { channel, .. } => Some(*channel),
                    _ => None,
                }
            }
        };
        self.rest_all(failed_channel);
        self.state = SchedulerState::Stopped;
        info!("stopped");
        result
    }

    fn start(&mut self) -> Result<()> {
        self.state = SchedulerState::Running;
        info!(
            window_ticks = self.window_ticks,
            tick_secs = self.tick_interval.as_secs_f64(),
            actuator_max = self.actuator_max,
            curve = ?self.curve.kind,
            ceiling = self.curve.ceiling,
            channels = self.tracks.len(),
            "starting"
        );
        for track in &self.tracks {
            let channel = track.binding.channel;
            self.actuator
                .set_value(channel, NEUTRAL_VALUE)
                .map_err(|source| MonitorError::Actuator { channel, source })?;
        }
        Ok(())
    }

    fn run_loop(&mut self) -> Result<ShutdownReason> {
        // first sample has no pre-delay
        let mut interval = Duration::ZERO;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(ShutdownReason::Cancelled);
            }

            let sample = self.sampler.sample(interval)?;

            // a tick cut short by the interrupt never reaches the window
            if self.cancel.is_cancelled() {
                return Ok(ShutdownReason::Cancelled);
            }

            for track in &mut self.tracks {
                track.window.add(sample.get(track.binding.metric));
            }
            self.ticks_in_window += 1;
            debug!(
                tick = self.ticks_in_window,
                network = sample.network_percent,
                cpu = sample.cpu_percent,
                "sample"
            );

            if self.ticks_in_window == self.window_ticks {
                self.actuate()?;
                self.ticks_in_window = 0;
            }

            interval = self.tick_interval;
        }
    }

    /// Window complete: average, shape, clamp, write. Channels are written in
    /// binding order.
    fn actuate(&mut self) -> Result<()> {
        for track in &mut self.tracks {
            let average = track.window.drain_average();
            let value = clamp_output(self.curve.apply(average), self.actuator_max);
            let channel = track.binding.channel;
            info!(
                metric = %track.binding.metric,
                %channel,
                average,
                value,
                "window complete"
            );
            self.actuator
                .set_value(channel, value)
                .map_err(|source| MonitorError::Actuator { channel, source })?;
        }
        Ok(())
    }

    /// Best effort: neutral value to every channel except one that just
    /// failed, then release them all. Failures here are logged only.
    fn rest_all(&mut self, skip: Option<ChannelId>) {
        for track in &self.tracks {
            let channel = track.binding.channel;
            if Some(channel) == skip {
                continue;
            }
            if let Err(e) = self.actuator.set_value(channel, NEUTRAL_VALUE) {
                warn!(%channel, error = %e, "could not return channel to rest");
            }
        }
        for track in &self.tracks {
            let channel = track.binding.channel;
            if let Err(e) = self.actuator.shutdown(channel) {
                warn!(%channel, error = %e, "could not shut channel down");
            }
        }
    }
}
