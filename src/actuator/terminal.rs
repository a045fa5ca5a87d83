use std::io::{self, Stdout, Write};

use chrono::{DateTime, Local};
use crossterm::{cursor::Show, execute, style::Print};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph},
    Terminal, TerminalOptions, Viewport,
};

use super::{Actuator, ChannelBank, ChannelId, ChannelSpec, Resolution};
use crate::error::ActuatorError;

const GAUGE_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 1;

/// Draws each channel as a gauge in an inline viewport below the prompt.
///
/// Raw mode stays off, so Ctrl-C still raises the interrupt signal.
pub struct TerminalMeter {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    bank: ChannelBank,
    last_update: Option<DateTime<Local>>,
    cursor_restored: bool,
}

impl TerminalMeter {
    pub fn new(specs: Vec<ChannelSpec>, resolution: Resolution) -> Result<Self, ActuatorError> {
        let height = specs.len() as u16 * GAUGE_HEIGHT + STATUS_HEIGHT;
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        )?;
        let mut meter = Self {
            terminal,
            bank: ChannelBank::new(specs, resolution),
            last_update: None,
            cursor_restored: false,
        };
        meter.draw()?;
        Ok(meter)
    }

    fn draw(&mut self) -> io::Result<()> {
        let bank = &self.bank;
        let updated = self
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        self.terminal.draw(|f| {
            let mut constraints: Vec<Constraint> = bank
                .specs()
                .map(|_| Constraint::Length(GAUGE_HEIGHT))
                .collect();
            constraints.push(Constraint::Length(STATUS_HEIGHT));

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(f.size());

            for (i, (spec, value)) in bank.specs().enumerate() {
                let ratio = if spec.max > 0.0 {
                    (value / spec.max).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let color = if ratio > 0.8 {
                    Color::Red
                } else if ratio > 0.5 {
                    Color::LightYellow
                } else {
                    Color::Green
                };
                let gauge = Gauge::default()
                    .block(
                        Block::default()
                            .title(format!(" {} [ch {}] ", spec.label, spec.id))
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .gauge_style(Style::default().fg(color))
                    .ratio(ratio)
                    .label(format!("{:.1} / {:.0}", value, spec.max));
                f.render_widget(gauge, chunks[i]);
            }

            let status = Line::from(vec![
                Span::styled(
                    " VU ",
                    Style::default()
                        .bg(Color::White)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" updated {} ", updated), Style::default().fg(Color::DarkGray)),
                Span::raw("| Ctrl-C to quit"),
            ]);
            f.render_widget(Paragraph::new(status), chunks[chunks.len() - 1]);
        })?;
        Ok(())
    }

    fn restore_cursor(&mut self) -> io::Result<()> {
        if !self.cursor_restored {
            self.cursor_restored = true;
            release_cursor(self.terminal.backend_mut())?;
        }
        Ok(())
    }
}

/// Shows the cursor again and moves it below the meters.
fn release_cursor<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, Show, Print("\r\n"))
}

impl Actuator for TerminalMeter {
    fn set_value(&mut self, channel: ChannelId, value: f64) -> Result<(), ActuatorError> {
        self.bank.write(channel, value)?;
        self.last_update = Some(Local::now());
        self.draw()?;
        Ok(())
    }

    fn shutdown(&mut self, channel: ChannelId) -> Result<(), ActuatorError> {
        self.bank.shutdown(channel)?;
        if self.bank.all_shut_down() {
            self.draw()?;
            self.restore_cursor()?;
        }
        Ok(())
    }
}

impl Drop for TerminalMeter {
    fn drop(&mut self) {
        let _ = self.restore_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_cursor_is_visible_on_a_fresh_line() {
        let mut out = Vec::new();
        release_cursor(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[?25h\r\n");
    }
}
