//! Terminal progress display for indexing runs

use eeindex_indexer::{IndexEvent, ProgressReporter};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(message.to_string());
    pb
}

pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

/// One spinner for the whole run with running totals
pub struct RunSpinner {
    spinner: ProgressBar,
    totals: Mutex<(usize, usize)>,
}

impl RunSpinner {
    pub fn new() -> Self {
        Self {
            spinner: create_spinner("Resolving target..."),
            totals: Mutex::new((0, 0)),
        }
    }
}

impl ProgressReporter for RunSpinner {
    fn report(&self, event: IndexEvent) {
        match event {
            IndexEvent::TargetResolved { product, asset_id, .. } => {
                self.spinner.set_message(format!("Indexing {} from {}", product, asset_id));
            }
            IndexEvent::PageFetched { written, dropped, .. } => {
                let mut totals = self.totals.lock().unwrap();
                totals.0 += written;
                totals.1 += dropped;
                self.spinner
                    .set_message(format!("Indexing... {} written, {} dropped", totals.0, totals.1));
            }
            IndexEvent::RunFinished { written, cancelled, .. } => {
                if cancelled {
                    finish_error(&self.spinner, &format!("Cancelled after writing {} records", written));
                } else {
                    finish_success(&self.spinner, &format!("Wrote {} records", written));
                }
            }
            _ => {}
        }
    }
}

impl Drop for RunSpinner {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl Default for RunSpinner {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall bucket bar plus one spinner per running bucket.
///
/// Locks are only poisoned by a panic inside `report`, so they are unwrapped.
pub struct BucketProgress {
    multi: MultiProgress,
    overall: Mutex<Option<ProgressBar>>,
    buckets: Mutex<HashMap<usize, ProgressBar>>,
}

impl BucketProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            overall: Mutex::new(None),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn advance_overall(&self) {
        if let Some(overall) = self.overall.lock().unwrap().as_ref() {
            overall.inc(1);
        }
    }

    fn take_bucket(&self, index: usize) -> Option<ProgressBar> {
        self.buckets.lock().unwrap().remove(&index)
    }
}

impl Default for BucketProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BucketProgress {
    fn report(&self, event: IndexEvent) {
        match event {
            IndexEvent::PlanReady { mode, buckets, count_before, .. } => {
                let bar = self.multi.add(create_progress_bar(
                    buckets as u64,
                    &format!("{} run over {} bucket(s), {} records before", mode, buckets, count_before),
                ));
                *self.overall.lock().unwrap() = Some(bar);
            }
            IndexEvent::BucketStarted { index, window } => {
                let spinner = self.multi.add(create_spinner(&format!("{}: starting", window)));
                self.buckets.lock().unwrap().insert(index, spinner);
            }
            IndexEvent::PageFetched { index, documents, written, dropped } => {
                if let Some(spinner) = self.buckets.lock().unwrap().get(&index) {
                    spinner.set_message(format!(
                        "bucket {}: page of {} ({} written, {} dropped)",
                        index, documents, written, dropped
                    ));
                }
            }
            IndexEvent::BucketFinished { index, fetched, written, dropped } => {
                if let Some(spinner) = self.take_bucket(index) {
                    finish_success(
                        &spinner,
                        &format!("bucket {}: {} fetched, {} written, {} dropped", index, fetched, written, dropped),
                    );
                }
                self.advance_overall();
            }
            IndexEvent::BucketFailed { index, reason } => {
                if let Some(spinner) = self.take_bucket(index) {
                    finish_error(&spinner, &format!("bucket {}: {}", index, reason));
                }
                self.advance_overall();
            }
            IndexEvent::RunFinished { cancelled, .. } => {
                for (_, spinner) in self.buckets.lock().unwrap().drain() {
                    spinner.abandon_with_message("interrupted");
                }
                if let Some(overall) = self.overall.lock().unwrap().take() {
                    if cancelled {
                        overall.abandon_with_message("Cancelled");
                    } else {
                        overall.finish_with_message("All buckets processed");
                    }
                }
            }
            IndexEvent::TargetResolved { .. } => {}
        }
    }
}
