//! Scan worker: buffered overlap scanning of whole files.
//!
//! Each file is read in windows of `chunk_size` primary bytes framed by an
//! `overlap` look-behind and an `overlap` look-ahead. A match is accepted only
//! when it starts inside the primary region; a match starting in the look-ahead
//! is found again, at the same absolute offset, as part of the next window.
//! The look-behind keeps the regex context of the preceding bytes. Each
//! pattern resumes its search at the end of the last match it consumed, so
//! matches line up the same way as in a single pass over the whole file.
//! Every match no longer than the overlap is therefore reported exactly once.

use crate::core::config::ScanConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{IocCategory, MatchCallback, MatchEvent};
use crate::detection::{PatternSet, WhitelistIndex};
use crate::scanner::context::RunContext;
use crate::scanner::dispatch::{BlockQueue, WorkerEvent};
use crate::scanner::results::FileResult;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Chunking and filtering parameters of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_match_size: usize,
}

impl From<&ScanConfig> for ChunkOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            max_match_size: config.max_match_size,
        }
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

/// Byte range of a window whose matches belong to it.
#[derive(Debug, Clone, Copy)]
struct Region {
    start: usize,
    end: usize,
}

/// Why a raw match was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Undecodable,
    TooLong,
    Whitelisted,
}

/// Scans files against the shared pattern set.
#[derive(Clone)]
pub struct ScanWorker {
    patterns: Arc<PatternSet>,
    whitelist: Arc<WhitelistIndex>,
    options: ChunkOptions,
    context: Arc<RunContext>,
    on_match: Option<MatchCallback>,
}

impl ScanWorker {
    pub fn new(
        patterns: Arc<PatternSet>,
        whitelist: Arc<WhitelistIndex>,
        options: ChunkOptions,
        context: Arc<RunContext>,
    ) -> Self {
        Self {
            patterns,
            whitelist,
            options,
            context,
            on_match: None,
        }
    }

    /// Invoke `callback` for every accepted, non-whitelisted match.
    pub fn with_match_callback(mut self, callback: Option<MatchCallback>) -> Self {
        self.on_match = callback;
        self
    }

    /// Pull blocks from the queue until it is empty or the run is cancelled.
    ///
    /// Completed results are sent to the collector; a failing file is
    /// reported and skipped without affecting the rest of the block.
    pub fn drain(&self, queue: &BlockQueue, tx: &mpsc::Sender<WorkerEvent>) -> Result<()> {
        while let Some(block) = queue.pop()? {
            log::debug!("Got block of {} file(s) from queue", block.len());

            for path in block.paths() {
                if self.context.is_cancelled() {
                    return Ok(());
                }

                let event = match self.scan_file(path) {
                    Ok(result) => WorkerEvent::Scanned(result),
                    Err(e) => {
                        log::warn!("[!] {}: {}", e, source_message(&e));
                        WorkerEvent::Failed {
                            path: path.clone(),
                            reason: source_message(&e),
                        }
                    }
                };

                tx.blocking_send(event).map_err(|_| Error::ChannelSend {
                    context: "worker result".to_string(),
                })?;
            }

            self.context.complete_block(block.len());
        }
        Ok(())
    }

    /// Scan one file from disk.
    pub fn scan_file(&self, path: &Path) -> Result<FileResult> {
        log::debug!("Processing {}", path.display());

        let mut file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| Error::file_read(path, e))?
            .len();

        self.scan_stream(path, &mut file, size)
            .map_err(|e| Error::file_read(path, e))
    }

    /// Scan `size` bytes of a seekable stream, attributing matches to `path`.
    pub fn scan_stream<R: Read + Seek>(
        &self,
        path: &Path,
        reader: &mut R,
        size: u64,
    ) -> io::Result<FileResult> {
        let mut result = FileResult::new(path);

        let (buf_size, overlap) = if size < self.options.chunk_size as u64 {
            (size as usize, 0)
        } else {
            (self.options.chunk_size, self.options.overlap)
        };

        // Look-behind, primary region and look-ahead of one window.
        let mut buffer = vec![0u8; overlap + buf_size + overlap];
        let mut file_pos: u64 = 0;
        // Absolute end of the last match consumed, per pattern.
        let mut resume = vec![0u64; self.patterns.pattern_count()];

        while file_pos < size {
            if self.context.is_cancelled() {
                break;
            }

            let behind = if file_pos == 0 { 0 } else { overlap };
            let window_start = file_pos - behind as u64;
            let window = &mut buffer[..behind + buf_size + overlap];

            reader.seek(SeekFrom::Start(window_start))?;
            let read = fill_buffer(reader, window)?;
            if read <= behind {
                break;
            }

            let at_eof = read < window.len() || window_start + read as u64 >= size;
            let primary = Region {
                start: behind,
                // Nothing follows the last window, so its look-ahead is primary too.
                end: if at_eof { read } else { behind + buf_size },
            };

            self.scan_chunk(
                &window[..read],
                primary,
                window_start,
                &mut resume,
                &mut result,
            );

            file_pos = if at_eof {
                size
            } else {
                file_pos + buf_size as u64
            };
        }

        Ok(result)
    }

    /// Run every pattern over one window and record matches starting in `primary`.
    fn scan_chunk(
        &self,
        chunk: &[u8],
        primary: Region,
        window_start: u64,
        resume: &mut [u64],
        result: &mut FileResult,
    ) {
        let patterns = self
            .patterns
            .iter()
            .flat_map(|group| group.patterns.iter().map(move |p| (group.category, p)));

        for ((category, pattern), next) in patterns.zip(resume.iter_mut()) {
            let mut at = next.saturating_sub(window_start).min(chunk.len() as u64) as usize;

            while at <= chunk.len() {
                let Some(m) = pattern.find_at(chunk, at) else {
                    break;
                };
                if m.start() >= primary.end {
                    // Starts in the look-ahead; the next window owns it.
                    break;
                }
                at = if m.is_empty() { m.end() + 1 } else { m.end() };
                if m.start() < primary.start {
                    // Recorded by the previous window.
                    continue;
                }

                let offset = window_start + m.start() as u64;
                *next = window_start + m.end() as u64;
                match self.accept(m.as_bytes()) {
                    Ok(matched) => {
                        result.record(category, matched, offset);
                        self.notify(&result.path, category, matched, offset);
                    }
                    Err(rejection) => self.count_rejection(rejection),
                }
            }
        }
    }

    /// Decode a raw match and apply the size and whitelist filters.
    fn accept<'m>(&self, raw: &'m [u8]) -> std::result::Result<&'m str, Rejection> {
        let matched = std::str::from_utf8(raw).map_err(|_| Rejection::Undecodable)?;

        if matched.chars().count() > self.options.max_match_size {
            return Err(Rejection::TooLong);
        }

        if self.whitelist.is_match_whitelisted(matched) {
            return Err(Rejection::Whitelisted);
        }

        Ok(matched)
    }

    fn count_rejection(&self, rejection: Rejection) {
        match rejection {
            Rejection::Undecodable => {
                log::trace!("Discarded match that is not valid UTF-8");
                self.context.increment_undecodable_matches();
            }
            Rejection::TooLong => self.context.increment_oversized_matches(),
            Rejection::Whitelisted => self.context.increment_whitelisted_matches(),
        }
    }

    fn notify(&self, path: &Path, category: IocCategory, matched: &str, offset: u64) {
        if let Some(ref callback) = self.on_match {
            callback(&MatchEvent {
                path,
                category,
                matched,
                offset,
            });
        }
    }
}

/// Read until `buf` is full or the stream ends.
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// The innermost error message, for one-line per-file diagnostics.
fn source_message(err: &Error) -> String {
    let mut current: &dyn std::error::Error = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
