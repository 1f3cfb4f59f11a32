use std::borrow::Cow;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::ui;

const TICK: Duration = Duration::from_millis(120);

/// Stderr spinner for the long phases of a command (connect, write,
/// reconcile). Drawn into a hidden bar when progress output is off.
pub struct Progress(ProgressBar);

impl Progress {
    #[must_use]
    pub fn spinner(message: &'static str) -> Self {
        if !ui::prefs().progress {
            return Self(ProgressBar::hidden());
        }

        let bar = ProgressBar::new_spinner().with_message(message);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(TICK);
        Self(bar)
    }

    pub fn set_message(&self, message: impl Into<Cow<'static, str>>) {
        self.0.set_message(message);
    }

    pub fn finish_clear(&self) {
        self.0.finish_and_clear();
    }

    pub fn finish_err(&self, message: &'static str) {
        self.0.abandon_with_message(message);
    }
}
