use crate::api::models::TrackSource;
use crate::audio::backend::AudioBackend;
use crate::audio::decoder::{extension_hint, TrackDecoder};
use crate::audio::stream_source::{run_download, HttpStreamSource};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use symphonia::core::io::MediaSource;

/// Sentinel: no seek requested.
const NO_SEEK: u64 = u64::MAX;

/// Interleaved samples between the decode thread and the output callback.
struct SampleRing {
    samples: VecDeque<f32>,
    finished: bool,
}

#[derive(Clone, Copy)]
struct SampleSpec {
    rate: u32,
    channels: usize,
}

/// Everything both sides of the decode thread need to see.
#[derive(Clone)]
struct Shared {
    ring: Arc<(Mutex<SampleRing>, Condvar)>,
    volume: Arc<Mutex<f32>>,
    played: Arc<AtomicU64>,
    spec: Arc<Mutex<SampleSpec>>,
    playing: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
    load_error: Arc<Mutex<Option<String>>>,
    duration: Arc<Mutex<f64>>,
    seek_ms: Arc<AtomicU64>,
}

impl Shared {
    fn new() -> Self {
        Self {
            ring: Arc::new((
                Mutex::new(SampleRing {
                    samples: VecDeque::new(),
                    finished: false,
                }),
                Condvar::new(),
            )),
            volume: Arc::new(Mutex::new(1.0)),
            played: Arc::new(AtomicU64::new(0)),
            spec: Arc::new(Mutex::new(SampleSpec {
                rate: 44100,
                channels: 2,
            })),
            playing: Arc::new(AtomicBool::new(false)),
            ready: Arc::new(AtomicBool::new(false)),
            load_error: Arc::new(Mutex::new(None)),
            duration: Arc::new(Mutex::new(0.0)),
            seek_ms: Arc::new(AtomicU64::new(NO_SEEK)),
        }
    }
}

/// Decode-and-output backend: one worker thread per loaded track probes the
/// source, owns the cpal stream, and keeps a ring of decoded samples topped
/// up. The cpal stream never leaves that thread, so no Send shims are
/// needed; `load` only spawns and returns.
pub struct StreamBackend {
    shared: Shared,
    decode_handle: Option<std::thread::JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    http: reqwest::Client,
    runtime: Option<tokio::runtime::Handle>,
}

impl StreamBackend {
    /// The HTTP client is shared with the API layer; remote downloads need a
    /// tokio runtime, captured here when one is running.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            shared: Shared::new(),
            decode_handle: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            http,
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }

    fn fail_load(&self, message: String) {
        log::error!("{}", message);
        *self.shared.load_error.lock().unwrap() = Some(message);
    }

    fn reset_for_load(&mut self, duration_hint: f64) {
        self.shared.ready.store(false, Ordering::SeqCst);
        *self.shared.load_error.lock().unwrap() = None;
        self.shared.played.store(0, Ordering::SeqCst);
        self.shared.seek_ms.store(NO_SEEK, Ordering::SeqCst);
        *self.shared.duration.lock().unwrap() = duration_hint.max(0.0);

        let (lock, cvar) = &*self.shared.ring;
        let mut ring = lock.lock().unwrap();
        ring.samples.clear();
        ring.finished = false;
        cvar.notify_all();
    }

    /// Signals the worker, wakes it, and waits for it to drop its stream.
    /// After this returns no callback from the previous item can fire.
    fn stop_internal(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.shared.playing.store(false, Ordering::SeqCst);
        {
            let (_, cvar) = &*self.shared.ring;
            cvar.notify_all();
        }
        if let Some(handle) = self.decode_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioBackend for StreamBackend {
    fn load(&mut self, source: &TrackSource, duration_hint: f64) {
        self.stop_internal();
        self.reset_for_load(duration_hint);

        let (media, hint): (Box<dyn MediaSource>, Option<String>) = match source {
            TrackSource::Local { path } => {
                let hint = extension_hint(&path.to_string_lossy());
                match std::fs::File::open(path) {
                    Ok(file) => (Box::new(file), hint),
                    Err(e) => {
                        self.fail_load(format!("Cannot open {}: {}", path.display(), e));
                        return;
                    }
                }
            }
            TrackSource::Remote { url } => {
                let runtime = match &self.runtime {
                    Some(runtime) => runtime,
                    None => {
                        self.fail_load("No async runtime for remote playback".into());
                        return;
                    }
                };
                let (stream, writer) = HttpStreamSource::new();
                runtime.spawn(run_download(writer, url.clone(), self.http.clone()));
                (Box::new(stream), extension_hint(url))
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        self.stop_signal = Arc::clone(&stop);
        let shared = self.shared.clone();

        self.decode_handle = Some(std::thread::spawn(move || {
            decode_worker(shared, stop, media, hint);
        }));
    }

    fn play(&mut self) {
        self.shared.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.stop_internal();
        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.played.store(0, Ordering::SeqCst);
        *self.shared.duration.lock().unwrap() = 0.0;

        // Leave no stale end-of-track flag behind; a stopped backend
        // reports not-finished until the next item finishes.
        let (lock, _) = &*self.shared.ring;
        let mut ring = lock.lock().unwrap();
        ring.samples.clear();
        ring.finished = false;
    }

    fn seek(&mut self, position: f64) {
        let ms = (position.max(0.0) * 1000.0) as u64;
        self.shared.seek_ms.store(ms, Ordering::SeqCst);

        // Wake the worker if it is parked on a full ring.
        let (_, cvar) = &*self.shared.ring;
        cvar.notify_all();

        // Move the position clock immediately; the worker catches up.
        let spec = *self.shared.spec.lock().unwrap();
        let samples = (position.max(0.0) * spec.rate as f64 * spec.channels as f64) as u64;
        self.shared.played.store(samples, Ordering::SeqCst);
    }

    fn position(&self) -> f64 {
        let samples = self.shared.played.load(Ordering::Relaxed) as f64;
        let spec = *self.shared.spec.lock().unwrap();
        if spec.rate == 0 || spec.channels == 0 {
            return 0.0;
        }
        samples / (spec.rate as f64 * spec.channels as f64)
    }

    fn duration(&self) -> f64 {
        *self.shared.duration.lock().unwrap()
    }

    fn is_loaded(&self) -> bool {
        self.shared.ready.load(Ordering::Relaxed)
    }

    fn is_finished(&self) -> bool {
        let (lock, _) = &*self.shared.ring;
        let ring = lock.lock().unwrap();
        ring.finished && ring.samples.is_empty()
    }

    fn take_load_error(&mut self) -> Option<String> {
        self.shared.load_error.lock().unwrap().take()
    }

    fn set_volume(&mut self, volume: f32) {
        *self.shared.volume.lock().unwrap() = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        *self.shared.volume.lock().unwrap()
    }
}

impl Drop for StreamBackend {
    fn drop(&mut self) {
        self.stop_internal();
    }
}

/// Runs on its own thread per loaded track: probe, open the output stream,
/// then decode ahead of the callback until EOF or stop. After EOF the
/// thread parks, keeping the stream alive while the ring drains.
fn decode_worker(
    shared: Shared,
    stop: Arc<AtomicBool>,
    media: Box<dyn MediaSource>,
    hint: Option<String>,
) {
    let mut decoder = match TrackDecoder::new(media, hint.as_deref()) {
        Ok(decoder) => decoder,
        Err(e) => {
            log::error!("Track load failed: {}", e);
            *shared.load_error.lock().unwrap() = Some(e.to_string());
            return;
        }
    };

    let rate = decoder.sample_rate();
    let channels = decoder.channels();
    *shared.spec.lock().unwrap() = SampleSpec { rate, channels };

    // Container metadata wins over a missing or zero hint.
    {
        let mut duration = shared.duration.lock().unwrap();
        if *duration <= 0.0 {
            if let Some(meta) = decoder.duration_seconds() {
                *duration = meta;
            }
        }
    }

    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            *shared.load_error.lock().unwrap() = Some("No audio output device".into());
            return;
        }
    };
    let config = cpal::StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let ring = Arc::clone(&shared.ring);
    let volume = Arc::clone(&shared.volume);
    let played = Arc::clone(&shared.played);
    let playing = Arc::clone(&shared.playing);

    let stream = match device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if !playing.load(Ordering::Relaxed) {
                data.fill(0.0);
                return;
            }
            let vol = *volume.lock().unwrap();
            let (lock, cvar) = &*ring;
            let mut ring = lock.lock().unwrap();

            let available = ring.samples.len().min(data.len());
            for (i, sample) in data.iter_mut().enumerate() {
                *sample = if i < available {
                    ring.samples.pop_front().unwrap_or(0.0) * vol
                } else {
                    0.0
                };
            }
            played.fetch_add(available as u64, Ordering::Relaxed);
            cvar.notify_all();
        },
        |err| log::error!("Output stream error: {}", err),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            *shared.load_error.lock().unwrap() =
                Some(format!("Cannot open output stream: {}", e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        *shared.load_error.lock().unwrap() = Some(format!("Cannot start output stream: {}", e));
        return;
    }

    shared.ready.store(true, Ordering::SeqCst);

    // Keep roughly two seconds decoded ahead of the callback.
    let ring_cap = rate as usize * channels * 2;

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let pending = shared.seek_ms.swap(NO_SEEK, Ordering::SeqCst);
        if pending != NO_SEEK {
            let target = pending as f64 / 1000.0;
            {
                let (lock, cvar) = &*shared.ring;
                let mut ring = lock.lock().unwrap();
                ring.samples.clear();
                cvar.notify_all();
            }
            if let Err(e) = decoder.seek(target) {
                log::warn!("Seek to {:.2}s failed: {}", target, e);
            }
            let samples = (target * rate as f64 * channels as f64) as u64;
            shared.played.store(samples, Ordering::SeqCst);
            continue;
        }

        {
            let (lock, cvar) = &*shared.ring;
            let mut guard = lock.lock().unwrap();
            while guard.samples.len() >= ring_cap
                && !stop.load(Ordering::Relaxed)
                && shared.seek_ms.load(Ordering::Relaxed) == NO_SEEK
            {
                guard = cvar.wait(guard).unwrap();
            }
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if shared.seek_ms.load(Ordering::Relaxed) != NO_SEEK {
            continue;
        }

        match decoder.decode_next() {
            Ok(Some(batch)) => {
                let (lock, cvar) = &*shared.ring;
                let mut ring = lock.lock().unwrap();
                ring.samples.extend(batch.samples.iter());
                cvar.notify_all();
            }
            Ok(None) => {
                mark_finished(&shared);
                break;
            }
            Err(e) => {
                // A broken stream still finishes, otherwise the session
                // would wait on it forever.
                log::error!("Decode failed, ending track: {}", e);
                mark_finished(&shared);
                break;
            }
        }
    }

    // Park until stopped so buffered samples keep flowing to the device.
    let (lock, cvar) = &*shared.ring;
    let mut guard = lock.lock().unwrap();
    while !stop.load(Ordering::Relaxed) {
        let (next, _) = cvar
            .wait_timeout(guard, Duration::from_millis(200))
            .unwrap();
        guard = next;
    }
    drop(guard);
    drop(stream);
}

fn mark_finished(shared: &Shared) {
    let (lock, cvar) = &*shared.ring;
    let mut ring = lock.lock().unwrap();
    ring.finished = true;
    cvar.notify_all();
}
