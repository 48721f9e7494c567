//! Per-file progress for the batch driver.
//!
//! The `<n> files found in <root>` and `<i>/<n> files processed.` lines are
//! console output and are written to the given writer (stdout in the binary),
//! never to the bar's stderr target. While the bar is drawn it is suspended
//! around each line so the two do not interleave. In log-only mode the bar is
//! hidden and only the lines remain.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set once from `--log-only` in main.
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Elapsed time for the end-of-run summary: `850ms`, `12.4s`, `3m 07s`.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

fn file_bar(total: usize, root: &Path) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if is_log_only() {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
                .expect("static progress template")
                .progress_chars("=> "),
        );
    }
    bar.set_message(format!("Loading {}", root.display()));
    bar
}

/// Progress of one batch over `total` files.
pub struct FileProgress<W: Write = Stdout> {
    bar: ProgressBar,
    out: W,
    total: usize,
    done: usize,
}

impl FileProgress<Stdout> {
    pub fn stdout(root: &Path, total: usize) -> Self {
        Self::with_writer(root, total, io::stdout())
    }
}

impl<W: Write> FileProgress<W> {
    pub fn with_writer(root: &Path, total: usize, out: W) -> Self {
        Self {
            bar: file_bar(total, root),
            out,
            total,
            done: 0,
        }
    }

    /// Announce the batch: `<n> files found in <root>`.
    pub fn found(&mut self, root: &Path) -> io::Result<()> {
        let line = format!("{} files found in {}", self.total, root.display());
        self.emit(&line)
    }

    /// Record one committed file: `<i>/<n> files processed.`
    pub fn file_done(&mut self) -> io::Result<()> {
        self.done += 1;
        self.bar.inc(1);
        let line = format!("{}/{} files processed.", self.done, self.total);
        self.emit(&line)
    }

    pub fn finish(self) -> W {
        self.bar.finish_and_clear();
        self.out
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        let out = &mut self.out;
        self.bar.suspend(|| {
            writeln!(out, "{}", line)?;
            out.flush()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(850)), "850ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_elapsed(Duration::from_secs(187)), "3m 07s");
    }

    #[test]
    fn test_lines_go_to_writer_with_bar_enabled() {
        // bar left in its default (drawn) mode; lines must still reach the writer
        let root = Path::new("/data/log_data");
        let mut progress = FileProgress::with_writer(root, 2, Vec::new());
        progress.found(root).unwrap();
        progress.file_done().unwrap();
        progress.file_done().unwrap();
        let out = String::from_utf8(progress.finish()).unwrap();
        assert_eq!(
            out,
            "2 files found in /data/log_data\n1/2 files processed.\n2/2 files processed.\n"
        );
    }

    #[test]
    fn test_empty_batch_announces_zero() {
        let root = Path::new("/data/song_data");
        let mut progress = FileProgress::with_writer(root, 0, Vec::new());
        progress.found(root).unwrap();
        let out = String::from_utf8(progress.finish()).unwrap();
        assert_eq!(out, "0 files found in /data/song_data\n");
    }
}
