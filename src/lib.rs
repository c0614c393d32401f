//! Client core for the QingYu ambient-sound service: a typed REST client
//! for the catalog/user API and a playback session manager that streams,
//! decodes, and sequences tracks. Headless; UI layers subscribe to
//! [`events::PlayerEvent`] and issue commands on [`audio::PlayerManager`].

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod remote;

#[cfg(target_os = "macos")]
pub mod macos;

pub use api::{ApiClient, AudioFilter};
pub use audio::{PlaybackMode, PlayerManager, StreamBackend};
pub use config::{AppConfig, ClientConfig};
pub use error::{AppError, AppResult};
pub use events::{PlaybackState, PlayerEvent};
pub use remote::{MediaControls, NowPlayingInfo, RemoteCommand};

/// Installs the crate-scoped logger. Safe to call more than once; later
/// calls are ignored. Binaries and tests call this, the library never
/// logs through anything but the `log` facade.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("qingyu=info"),
    )
    .try_init();
}
