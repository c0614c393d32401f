use crate::api::models::Track;
use serde::Serialize;
use tokio::sync::broadcast;

/// Session state of the playback manager. `Completed` is distinct from
/// `Idle`: the queue position is retained so playback can be restarted.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Completed,
}

impl PlaybackState {
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing)
    }
}

/// Typed notifications pushed to subscribers on every observable change.
/// UI layers subscribe instead of observing player internals.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlayerEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged { state: PlaybackState },
    #[serde(rename_all = "camelCase")]
    TrackChanged { track: Option<Track> },
    #[serde(rename_all = "camelCase")]
    Progress { position: f64, duration: f64 },
    #[serde(rename_all = "camelCase")]
    DurationChanged { duration: f64 },
    QueueChanged,
}

/// Fan-out wrapper over a broadcast channel. Slow subscribers lose the
/// oldest events rather than blocking the player.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: PlayerEvent) {
        // Err just means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
