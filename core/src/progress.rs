use std::cell::Cell;
use std::time::{Duration, Instant};

/// Tolerated overrun past the expected total before the ratio is clamped;
/// covers header/framing slack from servers that over-deliver slightly.
const OVERRUN_SLACK_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub transferred: u64,
    pub total: Option<u64>,
    /// 0.0..=1.0, clamped; never decreases within an attempt.
    pub ratio: Option<f64>,
    pub speed_bps: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn bar(&self, width: usize) -> String {
        let filled = match self.ratio {
            Some(ratio) => ((ratio * width as f64) as usize).min(width),
            None => 0,
        };
        let mut out = String::with_capacity(width);
        for _ in 0..filled {
            out.push('#');
        }
        for _ in filled..width {
            out.push('-');
        }
        out
    }

    pub fn percent(&self) -> String {
        match self.ratio {
            Some(ratio) => format!("{:.1}%", ratio * 100.0),
            None => "--%".to_string(),
        }
    }

    pub fn eta(&self) -> String {
        match self.total {
            Some(total) if self.speed_bps > 0 && total > self.transferred => {
                format_duration((total - self.transferred) / self.speed_bps)
            }
            _ => "--:--".to_string(),
        }
    }
}

/// Converts a running byte counter into renderable snapshots. Rendering is
/// sampled: `advance` yields a snapshot at most once per interval so output
/// volume stays bounded no matter how small the chunks are.
pub struct ProgressTracker {
    expected_total: Option<u64>,
    transferred: u64,
    started: Instant,
    last_render: Option<Instant>,
    interval: Duration,
    overrun_logged: Cell<bool>,
}

impl ProgressTracker {
    pub fn new(expected_total: Option<u64>, interval: Duration) -> Self {
        Self {
            expected_total,
            transferred: 0,
            started: Instant::now(),
            last_render: None,
            interval,
            overrun_logged: Cell::new(false),
        }
    }

    #[cfg(test)]
    fn started_at(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn advance(&mut self, bytes: u64) -> Option<ProgressSnapshot> {
        self.transferred = self.transferred.saturating_add(bytes);
        let now = Instant::now();
        let due = match self.last_render {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_render = Some(now);
        Some(self.snapshot())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.started.elapsed();
        let ratio = self.expected_total.map(|total| {
            if self.transferred >= total {
                // Warn once per attempt, not on every render past the bound.
                if self.transferred > total.saturating_add(OVERRUN_SLACK_BYTES)
                    && !self.overrun_logged.replace(true)
                {
                    log::warn!(
                        "received {} bytes, {} more than expected",
                        self.transferred,
                        self.transferred - total
                    );
                }
                1.0
            } else {
                self.transferred as f64 / total as f64
            }
        });
        let secs = elapsed.as_secs_f64();
        let speed_bps = if secs > 0.0 {
            (self.transferred as f64 / secs) as u64
        } else {
            0
        };
        ProgressSnapshot {
            transferred: self.transferred,
            total: self.expected_total,
            ratio,
            speed_bps,
            elapsed,
        }
    }

    /// Terminal snapshot; ratio forced to exactly 100% when a total is
    /// known.
    pub fn finish(&mut self) -> ProgressSnapshot {
        let mut snapshot = self.snapshot();
        if snapshot.total.is_some() {
            snapshot.ratio = Some(1.0);
        }
        snapshot
    }
}

/// Render sink for progress updates. The engine never touches the terminal
/// itself.
pub trait ProgressObserver {
    fn update(&self, label: &str, snapshot: &ProgressSnapshot);
    fn finish(&self, label: &str, snapshot: &ProgressSnapshot);
}

pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn update(&self, _label: &str, _snapshot: &ProgressSnapshot) {}
    fn finish(&self, _label: &str, _snapshot: &ProgressSnapshot) {}
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2}GB", b / GB)
    } else if b >= MB {
        format!("{:.2}MB", b / MB)
    } else if b >= KB {
        format!("{:.2}KB", b / KB)
    } else {
        format!("{}B", bytes)
    }
}

pub fn format_duration(mut seconds: u64) -> String {
    let hours = seconds / 3600;
    seconds %= 3600;
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
