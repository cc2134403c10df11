use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Creates a progress handle for every file transfer.
pub trait ProgressReporter: Send + Sync {
    fn start_file(&self, name: &str, total: Option<u64>) -> Box<dyn FileProgress>;
}

/// Progress of a single transfer.
pub trait FileProgress: Send {
    /// Cumulative number of bytes written so far.
    fn set_written(&mut self, written: u64);
    fn finish(&mut self);
    fn abandon(&mut self);
}

pub struct NoProgress;

struct Silent;

impl FileProgress for Silent {
    fn set_written(&mut self, _: u64) {}
    fn finish(&mut self) {}
    fn abandon(&mut self) {}
}

impl ProgressReporter for NoProgress {
    fn start_file(&self, _: &str, _: Option<u64>) -> Box<dyn FileProgress> {
        Box::new(Silent)
    }
}

/// Terminal progress bars, one line per file being downloaded.
#[derive(Default)]
pub struct ProgressBars {
    multi: MultiProgress,
}

impl ProgressBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the bars cleared, so text written by `f` does not tear them.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }
}

struct Bar(ProgressBar);

impl FileProgress for Bar {
    fn set_written(&mut self, written: u64) {
        self.0.set_position(written);
    }

    fn finish(&mut self) {
        self.0.finish();
    }

    fn abandon(&mut self) {
        self.0.abandon();
    }
}

impl ProgressReporter for ProgressBars {
    fn start_file(&self, name: &str, total: Option<u64>) -> Box<dyn FileProgress> {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg:30!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg:30!} {bytes} ({bytes_per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(name.to_string());
        Box::new(Bar(self.multi.add(bar)))
    }
}
