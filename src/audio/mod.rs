pub mod backend;
pub mod manager;
pub mod output;
pub mod queue;

mod decoder;
mod stream_source;

pub use backend::AudioBackend;
pub use manager::{run_remote, run_ticker, Interruption, PlayerManager, Tick};
pub use output::StreamBackend;
pub use queue::{PlaybackMode, PlaybackQueue};
