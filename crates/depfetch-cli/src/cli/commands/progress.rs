//! Progress line printed while a file is being fetched.

use depfetch_core::fetcher::{FetchProgress, ProgressFn};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Observer that redraws one stderr line at most every `PROGRESS_INTERVAL`,
/// and always on the last chunk of a file with a known size.
pub fn progress_printer() -> ProgressFn {
    let last_print: Mutex<Option<Instant>> = Mutex::new(None);
    Arc::new(move |p: &FetchProgress<'_>| {
        let done = p.expected_total.is_some_and(|t| p.bytes_on_disk >= t);
        let mut last = last_print.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if !done && last.is_some_and(|t| now.duration_since(t) < PROGRESS_INTERVAL) {
            return;
        }
        *last = Some(now);

        let line = format_progress(p);
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{line}  ");
        if done {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    })
}

fn format_progress(p: &FetchProgress<'_>) -> String {
    let done_mib = p.bytes_on_disk as f64 / 1_048_576.0;
    match p.expected_total {
        Some(total) if total > 0 => {
            let total_mib = total as f64 / 1_048_576.0;
            let pct = p.bytes_on_disk as f64 * 100.0 / total as f64;
            format!(
                "  {}: {:.1} / {:.1} MiB ({:.1}%)",
                p.description, done_mib, total_mib, pct
            )
        }
        _ => format!("  {}: {:.1} MiB", p.description, done_mib),
    }
}
