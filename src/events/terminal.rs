// ABOUTME: Terminal rendering of bus events: a spinner while a step runs, a permanent line once it ends

use super::EventSink;
use crate::models::{Event, EventStatus};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders events as a spinner plus one colored line per finished step.
#[derive(Default)]
pub struct TerminalSink {
    spinner: Option<ProgressBar>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }
}

impl EventSink for TerminalSink {
    fn handle(&mut self, event: &Event) {
        // The spinner must be gone before a permanent line is printed
        self.stop_spinner();

        let indicator = event.status.indicator();
        match event.status {
            EventStatus::Running => self.start_spinner(&event.name),
            EventStatus::Success => println!("{} {}", indicator.green(), event.message),
            EventStatus::Error => println!("{}", format!("{} {}", indicator, event.message).red()),
            EventStatus::Info => println!("{} {}", indicator.yellow(), event.message),
            EventStatus::Skipped => println!("{}", format!("{} {}", indicator, event.message).dimmed()),
        }
    }

    fn close(&mut self) {
        self.stop_spinner();
    }
}
