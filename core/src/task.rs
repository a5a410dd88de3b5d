use std::fmt;
use std::path::{Path, PathBuf};

pub const PART_SUFFIX: &str = ".part";
pub const SAMPLE_SUFFIX: &str = ".sample";

/// One transfer, immutable for its whole lifetime. Attempt-local state
/// lives inside the engine.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub url: String,
    pub dest_path: PathBuf,
    /// Opaque referer/session context supplied by the caller; the engine
    /// only forwards it on the wire.
    pub referer: Option<String>,
    pub max_retries: u32,
    /// `Some(n)` caps the transfer at exactly `n` bytes (sample mode).
    pub sample_cap: Option<u64>,
    pub label: String,
}

impl TransferTask {
    pub fn new(url: impl Into<String>, dest_path: impl Into<PathBuf>) -> Self {
        let url = url.into();
        let dest_path = dest_path.into();
        let label = dest_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("download")
            .to_string();
        Self {
            url,
            dest_path,
            referer: None,
            max_retries: 3,
            sample_cap: None,
            label,
        }
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_sample_cap(mut self, cap: Option<u64>) -> Self {
        self.sample_cap = cap.filter(|value| *value > 0);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_sample(&self) -> bool {
        self.sample_cap.is_some()
    }

    /// Final artifact path. Sample outputs carry a distinct suffix so they
    /// never collide with a full download of the same resource.
    pub fn final_path(&self) -> PathBuf {
        if self.is_sample() {
            append_suffix(&self.dest_path, SAMPLE_SUFFIX)
        } else {
            self.dest_path.clone()
        }
    }

    /// In-progress artifact path, authoritative across process restarts.
    pub fn part_path(&self) -> PathBuf {
        append_suffix(&self.final_path(), PART_SUFFIX)
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Destination already held the full resource; no bytes were streamed.
    AlreadyComplete,
    Downloaded,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::AlreadyComplete => "already-complete",
            TransferStatus::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_download_keeps_caller_path() {
        let task = TransferTask::new("http://cdn.test/v.mp4", "out/v.mp4");
        assert_eq!(task.final_path(), PathBuf::from("out/v.mp4"));
        assert_eq!(task.part_path(), PathBuf::from("out/v.mp4.part"));
    }

    #[test]
    fn sample_artifacts_never_collide_with_full() {
        let full = TransferTask::new("http://cdn.test/v.mp4", "out/v.mp4");
        let sample = TransferTask::new("http://cdn.test/v.mp4", "out/v.mp4")
            .with_sample_cap(Some(65536));
        assert_eq!(sample.final_path(), PathBuf::from("out/v.mp4.sample"));
        assert_ne!(sample.final_path(), full.final_path());
        assert_ne!(sample.part_path(), full.part_path());
    }

    #[test]
    fn zero_cap_means_full_download() {
        let task = TransferTask::new("http://cdn.test/v.mp4", "out/v.mp4")
            .with_sample_cap(Some(0));
        assert!(!task.is_sample());
    }

    #[test]
    fn retry_budget_is_at_least_one() {
        let task = TransferTask::new("http://cdn.test/v.mp4", "out/v.mp4").with_max_retries(0);
        assert_eq!(task.max_retries, 1);
    }
}
