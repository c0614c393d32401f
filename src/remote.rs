use serde::Serialize;

/// Commands arriving from system media controls (lock screen, media keys).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    Seek(f64),
}

/// Metadata pushed to the system now-playing surface.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub position: f64,
    pub playing: bool,
}

/// Sink for now-playing metadata. The macOS implementation talks to
/// MPNowPlayingInfoCenter; headless and test builds use [`NoopControls`].
pub trait MediaControls: Send {
    fn update(&self, info: &NowPlayingInfo);
    fn clear(&self);
}

pub struct NoopControls;

impl MediaControls for NoopControls {
    fn update(&self, info: &NowPlayingInfo) {
        log::trace!(
            "now playing: {} - {} ({}/{}s)",
            info.artist,
            info.title,
            info.position,
            info.duration
        );
    }

    fn clear(&self) {
        log::trace!("now playing cleared");
    }
}
