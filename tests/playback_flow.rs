//! Session-level playback scenarios: queue set-up through natural
//! completion and skips, driven by the real ticker loop against a
//! simulated backend.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};

use qingyu::api::models::{Track, TrackSource};
use qingyu::audio::{run_remote, run_ticker, AudioBackend, PlaybackMode, PlayerManager};
use qingyu::remote::{NoopControls, RemoteCommand};
use qingyu::{PlaybackState, PlayerEvent};

const TICK: Duration = Duration::from_millis(10);

#[derive(Default)]
struct SimState {
    loads: Vec<TrackSource>,
    loaded: bool,
    playing: bool,
    finished: bool,
    position: f64,
    duration: f64,
    volume: f32,
}

/// Backend that becomes ready as soon as a source is loaded; the test
/// flips `finished` on the shared handle to end a track.
struct SimBackend {
    state: Arc<StdMutex<SimState>>,
}

impl SimBackend {
    fn new() -> (Self, Arc<StdMutex<SimState>>) {
        let state = Arc::new(StdMutex::new(SimState {
            volume: 1.0,
            ..SimState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl AudioBackend for SimBackend {
    fn load(&mut self, source: &TrackSource, duration_hint: f64) {
        let mut s = self.state.lock().unwrap();
        s.loads.push(source.clone());
        s.loaded = true;
        s.playing = false;
        s.finished = false;
        s.position = 0.0;
        s.duration = duration_hint;
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn stop(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.loaded = false;
        s.playing = false;
        s.finished = false;
        s.position = 0.0;
        s.duration = 0.0;
    }

    fn seek(&mut self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    fn is_loaded(&self) -> bool {
        self.state.lock().unwrap().loaded
    }

    fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    fn take_load_error(&mut self) -> Option<String> {
        None
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }
}

fn track(id: &str, duration: f64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        artist: "Ambient".to_string(),
        duration,
        url: format!("https://cdn.example.com/{}.mp3", id),
        artwork_url: None,
        scene_tags: vec!["sleep".to_string()],
        offline: false,
        local_path: None,
    }
}

fn shared_manager(backend: SimBackend) -> Arc<Mutex<PlayerManager>> {
    Arc::new(Mutex::new(PlayerManager::new(
        Box::new(backend),
        Box::new(NoopControls),
    )))
}

fn sim_loads(sim: &Arc<StdMutex<SimState>>) -> usize {
    sim.lock().unwrap().loads.len()
}

async fn wait_until<F>(manager: &Arc<Mutex<PlayerManager>>, description: &str, predicate: F)
where
    F: Fn(&PlayerManager) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if predicate(&*manager.lock().await) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn sequential_queue_plays_finishes_and_completes_on_skip() {
    qingyu::init_logging();
    let (backend, sim) = SimBackend::new();
    let manager = shared_manager(backend);

    // Collect state transitions for the whole scenario.
    let mut events = manager.lock().await.subscribe();
    let states: Arc<StdMutex<Vec<PlaybackState>>> = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let collector = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PlayerEvent::StateChanged { state }) => sink.lock().unwrap().push(state),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    {
        let mut m = manager.lock().await;
        m.set_queue(vec![track("a", 30.0), track("b", 20.0)], 0);
        m.set_mode(PlaybackMode::Sequential);
        m.play_track_at(0);
    }
    let ticker = tokio::spawn(run_ticker(Arc::clone(&manager), TICK));

    wait_until(&manager, "track A playing", |m| {
        m.state() == PlaybackState::Playing && m.current_index() == Some(0)
    })
    .await;

    // A reaches its natural end; the completion handler advances to B.
    sim.lock().unwrap().finished = true;
    wait_until(&manager, "track B playing", |m| {
        m.state() == PlaybackState::Playing && m.current_index() == Some(1)
    })
    .await;

    // Skipping forward past the last track completes the session.
    manager.lock().await.skip_next();
    {
        let m = manager.lock().await;
        assert_eq!(m.state(), PlaybackState::Completed);
        assert_eq!(m.current_index(), Some(1));
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while states.lock().unwrap().last() != Some(&PlaybackState::Completed) {
        if tokio::time::Instant::now() > deadline {
            panic!("completed state never reached the subscriber");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        states.lock().unwrap().clone(),
        vec![
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Completed,
        ]
    );

    ticker.abort();
    collector.abort();
}

#[tokio::test]
async fn single_loop_replays_same_track_seamlessly() {
    let (backend, sim) = SimBackend::new();
    let manager = shared_manager(backend);

    {
        let mut m = manager.lock().await;
        m.set_queue(vec![track("a", 30.0), track("b", 20.0)], 0);
        assert_eq!(m.mode(), PlaybackMode::SingleLoop);
        m.play_track_at(0);
    }
    let ticker = tokio::spawn(run_ticker(Arc::clone(&manager), TICK));

    wait_until(&manager, "first play", |m| {
        m.state() == PlaybackState::Playing
    })
    .await;

    sim.lock().unwrap().finished = true;
    wait_until(&manager, "replay of the same track", |m| {
        m.state() == PlaybackState::Playing && sim_loads(&sim) >= 2
    })
    .await;

    let m = manager.lock().await;
    assert_eq!(m.current_index(), Some(0));
    let loads = sim.lock().unwrap().loads.clone();
    assert!(loads
        .iter()
        .all(|s| matches!(s, TrackSource::Remote { url } if url.ends_with("/a.mp3"))));

    drop(m);
    ticker.abort();
}

#[tokio::test]
async fn shuffle_completion_lands_on_a_valid_index() {
    let (backend, sim) = SimBackend::new();
    let manager = shared_manager(backend);

    {
        let mut m = manager.lock().await;
        m.set_queue(
            vec![track("a", 30.0), track("b", 20.0), track("c", 25.0)],
            0,
        );
        m.set_mode(PlaybackMode::Shuffle);
        m.play_track_at(0);
    }
    let ticker = tokio::spawn(run_ticker(Arc::clone(&manager), TICK));

    wait_until(&manager, "first play", |m| {
        m.state() == PlaybackState::Playing
    })
    .await;

    sim.lock().unwrap().finished = true;
    wait_until(&manager, "shuffled follow-up", |m| {
        m.state() == PlaybackState::Playing && sim_loads(&sim) >= 2
    })
    .await;

    let index = manager.lock().await.current_index().unwrap();
    assert!(index < 3);

    ticker.abort();
}

#[tokio::test]
async fn remote_channel_drives_the_session() {
    let (backend, _sim) = SimBackend::new();
    let manager = shared_manager(backend);

    {
        let mut m = manager.lock().await;
        m.set_queue(vec![track("a", 30.0), track("b", 20.0)], 0);
        m.set_mode(PlaybackMode::Sequential);
    }
    let ticker = tokio::spawn(run_ticker(Arc::clone(&manager), TICK));
    let (commands, receiver) = mpsc::channel(8);
    let remote = tokio::spawn(run_remote(Arc::clone(&manager), receiver));

    // set_queue loads without autoplay; the session settles in Paused.
    wait_until(&manager, "paused after queue load", |m| {
        m.state() == PlaybackState::Paused
    })
    .await;

    commands.send(RemoteCommand::Play).await.unwrap();
    wait_until(&manager, "playing via remote", |m| {
        m.state() == PlaybackState::Playing
    })
    .await;

    commands.send(RemoteCommand::NextTrack).await.unwrap();
    wait_until(&manager, "next track playing", |m| {
        m.current_index() == Some(1) && m.state() == PlaybackState::Playing
    })
    .await;

    commands.send(RemoteCommand::Pause).await.unwrap();
    wait_until(&manager, "paused via remote", |m| {
        m.state() == PlaybackState::Paused
    })
    .await;

    drop(commands);
    remote.await.unwrap();
    ticker.abort();
}
