use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::api::models::Track;
use crate::audio::backend::AudioBackend;
use crate::audio::queue::{Completion, PlaybackMode, PlaybackQueue, QueueState, Skip};
use crate::events::{EventBus, PlaybackState, PlayerEvent};
use crate::remote::{MediaControls, NowPlayingInfo, RemoteCommand};

/// Delay between observing end-of-track and dispatching the completion
/// policy. Reloading is never done inside the poll that saw the end.
const COMPLETION_DISPATCH_DELAY: Duration = Duration::from_millis(50);

/// Platform audio-session interruption (incoming call, another app
/// claiming the output device).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

/// What a single poll observed. `TrackEnded` means the current item was
/// torn down and a completion dispatch is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    None,
    TrackEnded,
}

/// Single owner of audio playback for the process.
///
/// All commands mutate state through `&mut self`; callers that need
/// shared access wrap the manager in a `tokio::sync::Mutex` and drive
/// [`run_ticker`] next to it. The backend and media-control sink are
/// injected so tests can script them.
pub struct PlayerManager {
    backend: Box<dyn AudioBackend>,
    controls: Box<dyn MediaControls>,
    queue: PlaybackQueue,
    state: PlaybackState,
    events: EventBus,
    pending_play: bool,
}

impl PlayerManager {
    pub fn new(backend: Box<dyn AudioBackend>, controls: Box<dyn MediaControls>) -> Self {
        Self {
            backend,
            controls,
            queue: PlaybackQueue::default(),
            state: PlaybackState::Idle,
            events: EventBus::default(),
            pending_play: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.queue.current_index()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.queue.mode()
    }

    pub fn queue_state(&self) -> QueueState {
        self.queue.state()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Replaces the queue. An empty list stops playback and leaves the
    /// manager idle; otherwise the start track (index clamped) is loaded
    /// without autoplay, settling in `Paused` once ready.
    pub fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        if tracks.is_empty() {
            log::info!("Queue replaced with empty list, stopping");
            self.queue.clear();
            self.events.emit(PlayerEvent::QueueChanged);
            self.stop();
            return;
        }
        self.queue.set_tracks(tracks, start_index);
        self.events.emit(PlayerEvent::QueueChanged);
        self.load_current(false);
    }

    /// Loads and plays the track at `index`. Out-of-range is a no-op.
    pub fn play_track_at(&mut self, index: usize) {
        if !self.queue.select(index) {
            log::warn!("play_track_at: index {} out of range", index);
            return;
        }
        self.load_current(true);
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.backend.pause();
                self.set_state(PlaybackState::Paused);
                self.push_now_playing();
            }
            PlaybackState::Paused => {
                self.backend.play();
                self.set_state(PlaybackState::Playing);
                self.push_now_playing();
            }
            PlaybackState::Idle | PlaybackState::Completed => {
                if self.queue.current_track().is_some() {
                    self.load_current(true);
                }
            }
            // A load is in flight; the pending_play flag already decides
            // what happens when it becomes ready.
            PlaybackState::Loading => {}
        }
    }

    pub fn skip_next(&mut self) {
        match self.queue.skip_next() {
            Skip::Play(_) => self.load_current(true),
            Skip::EndOfQueue => self.finish_queue(),
            Skip::Empty => {}
        }
    }

    pub fn skip_previous(&mut self) {
        match self.queue.skip_previous() {
            Skip::Play(_) => self.load_current(true),
            Skip::EndOfQueue | Skip::Empty => {}
        }
    }

    /// Moves the playhead, clamped to `[0, duration]`. No-op while idle.
    pub fn seek(&mut self, position: f64) {
        if self.state == PlaybackState::Idle {
            return;
        }
        let duration = self.backend.duration();
        let clamped = position.max(0.0).min(duration.max(0.0));
        self.backend.seek(clamped);
        self.push_now_playing();
    }

    /// Pure policy change; applies at the next completion or skip.
    pub fn set_mode(&mut self, mode: PlaybackMode) {
        log::debug!("Playback mode set to {}", mode.as_str());
        self.queue.set_mode(mode);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.backend.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.backend.volume()
    }

    /// Releases the current item and goes idle. The queue itself is kept
    /// so playback can be restarted from the same position.
    pub fn stop(&mut self) {
        self.backend.stop();
        self.pending_play = false;
        self.set_state(PlaybackState::Idle);
        self.events.emit(PlayerEvent::TrackChanged { track: None });
        self.controls.clear();
    }

    pub fn handle_interruption(&mut self, interruption: Interruption) {
        match interruption {
            Interruption::Began => {
                if self.state == PlaybackState::Playing {
                    log::info!("Audio session interrupted, pausing");
                    self.backend.pause();
                    self.set_state(PlaybackState::Paused);
                    self.push_now_playing();
                }
            }
            Interruption::Ended { should_resume } => {
                if should_resume && self.state == PlaybackState::Paused {
                    log::info!("Interruption ended, resuming");
                    self.backend.play();
                    self.set_state(PlaybackState::Playing);
                    self.push_now_playing();
                }
            }
        }
    }

    pub fn handle_remote(&mut self, command: RemoteCommand) {
        log::debug!("Remote command: {:?}", command);
        match command {
            RemoteCommand::Play => {
                if !matches!(self.state, PlaybackState::Playing | PlaybackState::Loading) {
                    self.toggle_play_pause();
                }
            }
            RemoteCommand::Pause => {
                if self.state == PlaybackState::Playing {
                    self.toggle_play_pause();
                }
            }
            RemoteCommand::TogglePlayPause => self.toggle_play_pause(),
            RemoteCommand::NextTrack => self.skip_next(),
            RemoteCommand::PreviousTrack => self.skip_previous(),
            RemoteCommand::Seek(position) => self.seek(position),
        }
    }

    /// Drives the session forward one step. Call at sub-second intervals;
    /// [`run_ticker`] does this on a timer.
    ///
    /// While loading: surfaces load failures (state falls back to `Idle`,
    /// never an error upward) and promotes a ready item to `Playing` or
    /// `Paused`. While playing: emits progress and detects end-of-track,
    /// returning [`Tick::TrackEnded`] after tearing the item down. The
    /// completion policy deliberately does not run here.
    pub fn poll(&mut self) -> Tick {
        match self.state {
            PlaybackState::Loading => {
                if let Some(message) = self.backend.take_load_error() {
                    log::error!("Track failed to load: {}", message);
                    self.pending_play = false;
                    self.set_state(PlaybackState::Idle);
                } else if self.backend.is_loaded() {
                    let duration = self.backend.duration();
                    self.events.emit(PlayerEvent::DurationChanged { duration });
                    if self.pending_play {
                        self.pending_play = false;
                        self.backend.play();
                        self.set_state(PlaybackState::Playing);
                    } else {
                        self.set_state(PlaybackState::Paused);
                    }
                    self.push_now_playing();
                }
                Tick::None
            }
            PlaybackState::Playing => {
                if self.backend.is_finished() {
                    log::info!("Track finished");
                    self.backend.stop();
                    return Tick::TrackEnded;
                }
                let position = self.backend.position();
                let duration = self.backend.duration();
                self.events.emit(PlayerEvent::Progress { position, duration });
                self.push_now_playing();
                Tick::None
            }
            _ => Tick::None,
        }
    }

    /// Applies the mode policy after a natural end-of-track. Guarded on
    /// `Playing`: a stop or skip issued during the dispatch delay wins.
    pub fn dispatch_completion(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        match self.queue.advance_on_completion() {
            Completion::Replay | Completion::Advanced(_) => self.load_current(true),
            Completion::EndOfQueue => {
                log::info!("Queue complete");
                self.pending_play = false;
                self.set_state(PlaybackState::Completed);
                self.push_now_playing();
            }
        }
    }

    /// Tears down the previous item and starts loading the current queue
    /// track. `backend.load` joins the old decode worker first, so no
    /// stale completion can fire across the switch.
    fn load_current(&mut self, autoplay: bool) {
        let Some(track) = self.queue.current_track().cloned() else {
            return;
        };
        log::info!("Loading track: {} ({})", track.title, track.id);
        self.pending_play = autoplay;
        self.backend.load(&track.source(), track.duration);
        self.set_state(PlaybackState::Loading);
        self.events.emit(PlayerEvent::TrackChanged {
            track: Some(track),
        });
        self.push_now_playing();
    }

    fn finish_queue(&mut self) {
        self.backend.stop();
        self.pending_play = false;
        self.set_state(PlaybackState::Completed);
        self.push_now_playing();
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.events.emit(PlayerEvent::StateChanged { state });
    }

    fn push_now_playing(&self) {
        match self.queue.current_track() {
            Some(track) => {
                let backend_duration = self.backend.duration();
                let duration = if backend_duration > 0.0 {
                    backend_duration
                } else {
                    track.duration
                };
                self.controls.update(&NowPlayingInfo {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                    duration,
                    position: self.backend.position(),
                    playing: self.state == PlaybackState::Playing,
                });
            }
            None => self.controls.clear(),
        }
    }
}

impl Drop for PlayerManager {
    fn drop(&mut self) {
        self.backend.stop();
        self.controls.clear();
    }
}

/// Polls the manager on a fixed interval and dispatches completions
/// after [`COMPLETION_DISPATCH_DELAY`], with the lock released in
/// between so user commands issued meanwhile take priority.
pub async fn run_ticker(manager: Arc<Mutex<PlayerManager>>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let tick = manager.lock().await.poll();
        if tick == Tick::TrackEnded {
            tokio::time::sleep(COMPLETION_DISPATCH_DELAY).await;
            manager.lock().await.dispatch_completion();
        }
    }
}

/// Forwards platform remote-control commands into the manager until the
/// sending side hangs up.
pub async fn run_remote(
    manager: Arc<Mutex<PlayerManager>>,
    mut commands: mpsc::Receiver<RemoteCommand>,
) {
    while let Some(command) = commands.recv().await {
        manager.lock().await.handle_remote(command);
    }
}
