//! Terminal progress bar for the apply stage.

use indicatif::{ProgressBar, ProgressStyle};

use bulkedit_apply::{CommitProgress, ProgressSink, RecordReport, TracingProgress};

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Advances a bar per record and logs each commit.
pub struct BarProgress {
    bar: ProgressBar,
    log: TracingProgress,
}

impl BarProgress {
    pub fn new(total_records: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total_records as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            log: TracingProgress,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarProgress {
    fn on_commit(&mut self, progress: &CommitProgress) {
        self.bar.set_message(progress.to_string());
        let log = &mut self.log;
        self.bar.suspend(|| log.on_commit(progress));
    }

    fn on_record(&mut self, _record: &RecordReport) {
        self.bar.inc(1);
    }
}
