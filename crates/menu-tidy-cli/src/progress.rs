use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use menu_tidy_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress on stderr using indicatif.
///
/// - Walk: spinner (item count unknown upfront)
/// - Metadata reads and execution: bar over the known total
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }

    fn start_counted(&self, label: &str, unit: &str, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(&format!(
                "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {}",
                label, unit
            ))
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }
}

fn done(message: String) {
    eprintln!("  {} {}", "✓".green(), message);
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message("Walking the menu tree...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_progress(&self, items_found: usize) {
        self.with_bar(|pb| pb.set_message(format!("Walking... {} items found", items_found)));
    }

    fn on_scan_complete(&self, total_items: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!("Walk complete: {} items in {:.2}s", total_items, duration_secs));
    }

    fn on_metadata_start(&self, total_items: usize) {
        self.start_counted("Reading", "shortcuts", total_items);
    }

    fn on_metadata_progress(&self, items_read: usize) {
        self.with_bar(|pb| pb.set_position(items_read as u64));
    }

    fn on_metadata_complete(&self, failures: usize, duration_secs: f64) {
        self.finish_bar();
        if failures > 0 {
            eprintln!(
                "  {} Metadata read in {:.2}s, {} items saved without metadata",
                "!".yellow(),
                duration_secs,
                failures
            );
        } else {
            done(format!("Metadata read in {:.2}s", duration_secs));
        }
    }

    fn on_execute_start(&self, total_actions: usize) {
        self.start_counted("Applying", "actions", total_actions);
    }

    fn on_action_complete(&self, completed: usize, _total: usize) {
        self.with_bar(|pb| pb.set_position(completed as u64));
    }

    fn on_execute_complete(&self, successes: usize, errors: usize, duration_secs: f64) {
        self.finish_bar();
        done(format!(
            "Applied {} actions ({} failed) in {:.2}s",
            successes + errors,
            errors,
            duration_secs
        ));
    }
}
