//! Upload progress tracking
//!
//! A single tracker shared by all workers; counters coalesce under one
//! mutex and rendering reads a consistent snapshot.

use std::sync::Mutex;
use std::time::Instant;

#[derive(Default)]
struct Counters {
    completed_files: usize,
    failed_files: usize,
    skipped_files: usize,
    uploaded_bytes: i64,
    current_file: String,
}

/// Tracks upload progress across multiple files
pub struct ProgressTracker {
    total_files: usize,
    total_bytes: i64,
    start: Instant,
    counters: Mutex<Counters>,
}

impl ProgressTracker {
    pub fn new(total_files: usize, total_bytes: i64) -> Self {
        Self {
            total_files,
            total_bytes,
            start: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn set_current_file(&self, file_name: &str) {
        self.counters.lock().unwrap().current_file = file_name.to_string();
    }

    pub fn add_completed_file(&self) {
        self.counters.lock().unwrap().completed_files += 1;
    }

    pub fn add_failed_file(&self) {
        self.counters.lock().unwrap().failed_files += 1;
    }

    pub fn add_skipped_file(&self) {
        self.counters.lock().unwrap().skipped_files += 1;
    }

    pub fn add_uploaded_bytes(&self, bytes: i64) {
        self.counters.lock().unwrap().uploaded_bytes += bytes;
    }

    /// Snapshot: (completed, failed, skipped, total, uploaded bytes, total bytes)
    pub fn stats(&self) -> (usize, usize, usize, usize, i64, i64) {
        let counters = self.counters.lock().unwrap();
        (
            counters.completed_files,
            counters.failed_files,
            counters.skipped_files,
            self.total_files,
            counters.uploaded_bytes,
            self.total_bytes,
        )
    }

    /// One-line progress rendering for terminal output
    pub fn render(&self) -> String {
        let counters = self.counters.lock().unwrap();
        let processed = counters.completed_files + counters.failed_files + counters.skipped_files;

        let percent = if self.total_bytes > 0 {
            counters.uploaded_bytes as f64 / self.total_bytes as f64 * 100.0
        } else if self.total_files > 0 {
            processed as f64 / self.total_files as f64 * 100.0
        } else {
            0.0
        };

        let elapsed = self.start.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            format!(
                " @ {}/s",
                format_bytes((counters.uploaded_bytes as f64 / elapsed) as i64)
            )
        } else {
            String::new()
        };

        const BAR_WIDTH: usize = 30;
        let filled = ((percent * BAR_WIDTH as f64 / 100.0) as usize).min(BAR_WIDTH);
        let bar: String = "█".repeat(filled) + &"░".repeat(BAR_WIDTH - filled);

        let mut status = format!(
            "[{}/{}] {} [{}] {:.1}% ({} / {}){}",
            processed,
            self.total_files,
            truncate_file_name(&counters.current_file, 30),
            bar,
            percent,
            format_bytes(counters.uploaded_bytes),
            format_bytes(self.total_bytes),
            speed
        );
        if counters.failed_files > 0 {
            status.push_str(&format!(" | {} failed", counters.failed_files));
        }
        if counters.skipped_files > 0 {
            status.push_str(&format!(" | {} skipped", counters.skipped_files));
        }
        status
    }

    /// Multi-line session summary
    pub fn summary(&self) -> String {
        let counters = self.counters.lock().unwrap();
        let mut summary = format!(
            "\nUpload complete in {}s\n  Completed: {}\n",
            self.start.elapsed().as_secs(),
            counters.completed_files
        );
        if counters.skipped_files > 0 {
            summary.push_str(&format!("  Skipped (duplicates): {}\n", counters.skipped_files));
        }
        if counters.failed_files > 0 {
            summary.push_str(&format!("  Failed: {}\n", counters.failed_files));
        }
        summary.push_str(&format!(
            "  Total uploaded: {}\n",
            format_bytes(counters.uploaded_bytes)
        ));
        summary
    }
}

/// Human-readable byte count (1024-based)
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!(
        "{:.1} {}B",
        bytes as f64 / div as f64,
        ['K', 'M', 'G', 'T', 'P', 'E'][exp]
    )
}

fn truncate_file_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let prefix: String = name.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", prefix)
}
