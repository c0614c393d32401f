pub mod media_keys;
pub mod now_playing;

pub use media_keys::register_remote_handlers;
pub use now_playing::MpNowPlaying;
