use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "    [{msg}] [{bar:30}] {bytes}/{total_bytes}";
const SPINNER_TEMPLATE: &str = "    [{msg}] {spinner} {bytes}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading { count: usize },
    Deleting { count: usize },
}

/// Hooks fired while the mods folder is reconciled. All default to no-ops.
pub trait ProgressReporter {
    fn on_phase(&mut self, _phase: Phase) {}
    fn on_download_started(&mut self, _name: &str, _total: Option<u64>) {}
    fn on_download_progress(&mut self, _name: &str, _downloaded: u64, _total: Option<u64>) {}
    fn on_download_complete(&mut self, _name: &str, _bytes: u64) {}
    fn on_download_failed(&mut self, _name: &str, _reason: &str) {}
    fn on_deleted(&mut self, _name: &str) {}
    fn on_delete_failed(&mut self, _name: &str, _reason: &str) {}
}

#[cfg(test)]
pub struct SilentProgress;

#[cfg(test)]
impl ProgressReporter for SilentProgress {}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#.")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One bar per download on stdout; a spinner when the length is unknown.
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
    target: fn() -> ProgressDrawTarget,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: None,
            target: ProgressDrawTarget::stdout,
        }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: None,
            target: ProgressDrawTarget::hidden,
        }
    }

    fn start_bar(&self, name: &str, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => ProgressBar::with_draw_target(Some(total), (self.target)())
                .with_style(bar_style()),
            None => {
                ProgressBar::with_draw_target(None, (self.target)()).with_style(spinner_style())
            }
        };
        bar.set_message(name.to_string());
        bar
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn on_phase(&mut self, phase: Phase) {
        match phase {
            Phase::Downloading { count } => println!("[3/4] Downloading {count} new mods..."),
            Phase::Deleting { count } => println!("[4/4] Deleting {count} outdated mods..."),
        }
    }

    fn on_download_started(&mut self, name: &str, total: Option<u64>) {
        if let Some(previous) = self.bar.take() {
            previous.abandon();
        }
        self.bar = Some(self.start_bar(name, total));
    }

    fn on_download_progress(&mut self, _name: &str, downloaded: u64, total: Option<u64>) {
        if let Some(bar) = &self.bar {
            if total.is_some_and(|total| total < downloaded) {
                bar.set_length(downloaded);
            }
            bar.set_position(downloaded);
        }
    }

    fn on_download_complete(&mut self, _name: &str, _bytes: u64) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }

    fn on_download_failed(&mut self, name: &str, reason: &str) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
        println!("    Failed to download {name}: {reason}");
    }

    fn on_deleted(&mut self, name: &str) {
        println!("    Deleting: {name}");
    }

    fn on_delete_failed(&mut self, name: &str, reason: &str) {
        println!("    Could not delete {name}: {reason}");
    }
}
