//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for directory staging.
///
/// Shows an indicatif bar of files staged out of files found in an
/// interactive terminal; silent otherwise.
pub struct StageProgress {
    bar: Option<ProgressBar>,
}

impl StageProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        if !ctx.use_fancy_output() {
            return Self::hidden();
        }

        let bar = ProgressBar::new(0);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("  {spinner:.cyan} Staging {prefix}  {bar:24.cyan/dim} {pos}/{len}  {elapsed:.dim}")
        {
            bar.set_style(
                bar_style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
        }
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    /// A progress indicator that draws nothing
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    /// Record `done` of `total` files staged
    pub fn update(&self, done: usize, total: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
