use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::fsutil;
use crate::limiter::CappedWriter;
use crate::net::{FetchRequest, HttpClient, ReqwestHttpClient};
use crate::probe::probe;
use crate::progress::{NullObserver, ProgressObserver, ProgressTracker};
use crate::task::{TransferStatus, TransferTask};

enum Plan {
    AlreadyComplete,
    Start { offset: u64 },
}

/// Drives one resource from remote URL to final local artifact: offset
/// resolution, ranged streaming, bounded retries, atomic promotion.
///
/// The engine holds no task-level state, so disjoint tasks may run
/// concurrently from caller-owned threads. Two tasks must never share a
/// destination path; the temp/final rename protocol assumes exclusive
/// ownership, and that invariant is the caller's to enforce.
pub struct TransferEngine {
    client: Arc<dyn HttpClient>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(config: TransferConfig) -> TransferResult<Self> {
        let client = ReqwestHttpClient::new(&config)?;
        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    pub fn with_client(config: TransferConfig, client: Arc<dyn HttpClient>) -> Self {
        Self { client, config }
    }

    pub fn transfer(&self, task: &TransferTask) -> TransferResult<TransferStatus> {
        self.run(task, &NullObserver)
    }

    pub fn run(
        &self,
        task: &TransferTask,
        observer: &dyn ProgressObserver,
    ) -> TransferResult<TransferStatus> {
        let final_path = task.final_path();
        let part_path = task.part_path();
        fsutil::ensure_parent_dir(&final_path)?;

        let mut offset = match self.resolve_offset(task, &final_path, &part_path)? {
            Plan::AlreadyComplete => {
                log::info!("{}: already complete, skipping", task.label);
                return Ok(TransferStatus::AlreadyComplete);
            }
            Plan::Start { offset } => offset,
        };

        let mut last_error: Option<TransferError> = None;
        for attempt in 1..=task.max_retries {
            match self.attempt(task, offset, &part_path, observer) {
                Ok(()) => {
                    fsutil::promote(&part_path, &final_path)?;
                    log::info!("{}: downloaded to {}", task.label, final_path.display());
                    return Ok(TransferStatus::Downloaded);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    // The temp file stays on disk; it is the resume
                    // checkpoint for the next attempt or a later run.
                    log::warn!(
                        "{}: attempt {}/{} failed: {}",
                        task.label,
                        attempt,
                        task.max_retries,
                        err
                    );
                    offset = if task.is_sample() {
                        0
                    } else {
                        fsutil::file_size(&part_path).unwrap_or(0)
                    };
                    if attempt < task.max_retries {
                        thread::sleep(self.config.retry_backoff * attempt);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(TransferError::Exhausted {
            attempts: task.max_retries,
            last: last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    /// Where the next attempt starts. Sample transfers always restart from
    /// zero; their artifacts are cheap and must match the cap exactly.
    fn resolve_offset(
        &self,
        task: &TransferTask,
        final_path: &Path,
        part_path: &Path,
    ) -> TransferResult<Plan> {
        if task.is_sample() {
            return Ok(Plan::Start { offset: 0 });
        }

        let final_size = fsutil::file_size(final_path).filter(|size| *size > 0);
        if let Some(local) = final_size {
            let capability = probe(
                self.client.as_ref(),
                &task.url,
                task.referer.as_deref(),
                &self.config.user_agent,
            );
            if let Some(total) = capability.size_bytes {
                if local >= total {
                    return Ok(Plan::AlreadyComplete);
                }
            }
            if let Some(part_size) = fsutil::file_size(part_path) {
                return Ok(Plan::Start { offset: part_size });
            }
            if capability.supports_ranges {
                // Adopt the incomplete final file as the in-progress
                // artifact and pick up where it left off.
                fs::rename(final_path, part_path)
                    .map_err(|err| TransferError::Io(err.to_string()))?;
                return Ok(Plan::Start { offset: local });
            }
            log::info!(
                "{}: remote does not support ranges, restarting from zero",
                task.label
            );
            return Ok(Plan::Start { offset: 0 });
        }

        if let Some(part_size) = fsutil::file_size(part_path) {
            log::info!("{}: resuming at {} bytes", task.label, part_size);
            return Ok(Plan::Start { offset: part_size });
        }
        Ok(Plan::Start { offset: 0 })
    }

    fn attempt(
        &self,
        task: &TransferTask,
        offset: u64,
        part_path: &Path,
        observer: &dyn ProgressObserver,
    ) -> TransferResult<()> {
        let mut req = FetchRequest::new(task.url.as_str(), self.config.user_agent.as_str());
        req.referer = task.referer.clone();
        if let Some(cap) = task.sample_cap {
            req.range = Some((0, Some(cap.saturating_sub(1))));
        } else if offset > 0 {
            req.range = Some((offset, None));
        }

        let started = Instant::now();
        let resp = self.client.get(&req)?;

        if offset > 0 && resp.status_code == 416 {
            // The resume offset is at or past the end of the resource:
            // everything is already on disk (a crash can land between the
            // final streamed byte and promotion). Nothing left to fetch.
            log::info!("{}: remote reports nothing beyond {} bytes", task.label, offset);
            return Ok(());
        }
        if offset > 0 && !resp.is_partial() {
            if resp.is_success() {
                // The server sent the whole resource despite the range
                // request; appending it would corrupt the artifact.
                drop(resp);
                let _ = fs::remove_file(part_path);
                return Err(TransferError::RangeNotHonored);
            }
            return Err(TransferError::Status(resp.status_code));
        }
        if !resp.is_success() {
            return Err(TransferError::Status(resp.status_code));
        }

        let expected = match task.sample_cap {
            Some(cap) => Some(cap),
            None => resp
                .content_range
                .and_then(|range| range.total)
                .map(|total| total.saturating_sub(offset))
                .or(resp.content_length),
        };

        let file = if offset > 0 {
            OpenOptions::new().create(true).append(true).open(part_path)
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(part_path)
        }
        .map_err(|err| TransferError::Io(err.to_string()))?;

        // The cap applies even when the server granted a matching range;
        // a full-download attempt gets an unreachable cap.
        let mut writer = CappedWriter::new(file, task.sample_cap.unwrap_or(u64::MAX));
        let mut tracker = ProgressTracker::new(expected, self.config.progress_interval);
        let mut body = resp.body;
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let read = body
                .read(&mut buffer)
                .map_err(|err| TransferError::Network(err.to_string()))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .map_err(|err| TransferError::Io(err.to_string()))?;
            if let Some(snapshot) = tracker.advance(read as u64) {
                observer.update(&task.label, &snapshot);
            }
            if writer.is_satisfied() {
                // Cap reached: stop the upstream read. This is the
                // sample-mode success path, not a failure.
                break;
            }
        }
        drop(body);

        writer
            .flush()
            .map_err(|err| TransferError::Io(err.to_string()))?;
        observer.finish(&task.label, &tracker.finish());
        log::debug!(
            "{}: attempt moved {} bytes in {:?}",
            task.label,
            tracker.transferred(),
            started.elapsed()
        );
        Ok(())
    }
}
