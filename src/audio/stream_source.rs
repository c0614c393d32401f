use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Condvar, Mutex};

/// How far the download may run ahead of the decoder before it waits.
const MAX_BUFFERED_AHEAD: usize = 8 * 1024 * 1024;

/// State shared between the download task and the symphonia reader.
struct SharedBuffer {
    /// Every byte downloaded so far. Append-only, retained for backward
    /// seeks.
    bytes: Vec<u8>,
    read_pos: usize,
    /// Download ran to the end.
    complete: bool,
    /// Reader side was dropped; the writer should stop.
    closed: bool,
    failed: Option<String>,
}

/// Progressive-download audio source. Implements `Read`/`Seek` over the
/// bytes downloaded so far, blocking until more arrive, which makes a plain
/// HTTP response usable as a symphonia `MediaSource`.
pub struct HttpStreamSource {
    shared: Arc<(Mutex<SharedBuffer>, Condvar)>,
}

/// Producer half handed to the download task.
pub struct StreamWriter {
    shared: Arc<(Mutex<SharedBuffer>, Condvar)>,
}

impl HttpStreamSource {
    pub fn new() -> (Self, StreamWriter) {
        let shared = Arc::new((
            Mutex::new(SharedBuffer {
                bytes: Vec::new(),
                read_pos: 0,
                complete: false,
                closed: false,
                failed: None,
            }),
            Condvar::new(),
        ));
        let writer = StreamWriter {
            shared: Arc::clone(&shared),
        };
        (Self { shared }, writer)
    }
}

impl Read for HttpStreamSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();

        while state.read_pos >= state.bytes.len() && !state.complete && state.failed.is_none() {
            state = cvar.wait(state).unwrap();
        }

        if let Some(ref message) = state.failed {
            return Err(io::Error::new(io::ErrorKind::Other, message.clone()));
        }

        // A seek past the downloaded end reads as EOF once complete.
        let available = state.bytes.len().saturating_sub(state.read_pos);
        if available == 0 {
            return Ok(0);
        }

        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&state.bytes[state.read_pos..state.read_pos + n]);
        state.read_pos += n;

        // Wake the writer if it is waiting on back-pressure.
        cvar.notify_all();
        Ok(n)
    }
}

impl Seek for HttpStreamSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (lock, _) = &*self.shared;
        let mut state = lock.lock().unwrap();

        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => state.read_pos as i64 + offset,
            SeekFrom::End(offset) => state.bytes.len() as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }

        state.read_pos = target as usize;
        Ok(state.read_pos as u64)
    }
}

impl symphonia::core::io::MediaSource for HttpStreamSource {
    fn is_seekable(&self) -> bool {
        true
    }

    /// Unknown until the download completes.
    fn byte_len(&self) -> Option<u64> {
        let (lock, _) = &*self.shared;
        let state = lock.lock().unwrap();
        if state.complete {
            Some(state.bytes.len() as u64)
        } else {
            None
        }
    }
}

impl Drop for HttpStreamSource {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.closed = true;
        cvar.notify_all();
    }
}

impl StreamWriter {
    /// Appends downloaded bytes, waiting when too far ahead of the reader.
    /// Returns false once the reader is gone and the download should stop.
    pub fn push(&self, data: &[u8]) -> bool {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();

        while state.bytes.len().saturating_sub(state.read_pos) >= MAX_BUFFERED_AHEAD
            && !state.closed
        {
            state = cvar.wait(state).unwrap();
        }
        if state.closed {
            return false;
        }

        state.bytes.extend_from_slice(data);
        cvar.notify_all();
        true
    }

    pub fn complete(&self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.complete = true;
        cvar.notify_all();
    }

    pub fn fail(&self, message: String) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.failed = Some(message);
        state.complete = true;
        cvar.notify_all();
    }
}

/// Streams a CDN URL into the writer chunk by chunk. Runs until the
/// download finishes, fails, or the reader goes away.
pub async fn run_download(writer: StreamWriter, url: String, client: reqwest::Client) {
    use futures_util::StreamExt;

    log::debug!("Starting audio download: {}", redact(&url));
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            writer.fail(format!("Download request failed: {}", e));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        writer.fail(format!("Download failed: HTTP {}", status.as_u16()));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut total: u64 = 0;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                total += bytes.len() as u64;
                if !writer.push(&bytes) {
                    log::debug!("Audio download abandoned after {} bytes", total);
                    return;
                }
            }
            Err(e) => {
                writer.fail(format!("Download interrupted: {}", e));
                return;
            }
        }
    }
    log::debug!("Audio download complete: {} bytes", total);
    writer.complete();
}

/// Signed CDN URLs carry credentials in the query string; keep those out of
/// the logs.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
