use crate::api::models::Track;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the session chooses the next track. Wire names match the service's
/// preference strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[serde(rename = "singleLoop")]
    SingleLoop,
    #[serde(rename = "sequence")]
    Sequential,
    #[serde(rename = "random")]
    Shuffle,
}

impl PlaybackMode {
    /// Unknown strings fall back to single-loop, the service default.
    pub fn parse(value: &str) -> Self {
        match value {
            "sequence" => PlaybackMode::Sequential,
            "random" => PlaybackMode::Shuffle,
            _ => PlaybackMode::SingleLoop,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::SingleLoop => "singleLoop",
            PlaybackMode::Sequential => "sequence",
            PlaybackMode::Shuffle => "random",
        }
    }
}

/// Outcome of an explicit skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Load and play the track now at this index.
    Play(usize),
    /// Sequential queue ran out going forward; index is left unchanged.
    EndOfQueue,
    Empty,
}

/// Outcome of a track finishing naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Same track again from the start.
    Replay,
    Advanced(usize),
    EndOfQueue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
    pub mode: PlaybackMode,
}

/// Track list plus a cursor. Shuffle randomizes the cursor rather than
/// reordering the list, so indices shown to the UI stay stable.
pub struct PlaybackQueue {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    mode: PlaybackMode,
}

impl PlaybackQueue {
    pub fn new(mode: PlaybackMode) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: None,
            mode,
        }
    }

    /// Wholesale replacement. An out-of-range start index clamps to the last
    /// track; an empty list leaves no selection.
    pub fn set_tracks(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.tracks = tracks;
        self.current_index = if self.tracks.is_empty() {
            None
        } else {
            Some(start_index.min(self.tracks.len() - 1))
        };
    }

    /// Move the cursor iff the index is in bounds.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn skip_next(&mut self) -> Skip {
        if self.tracks.is_empty() {
            return Skip::Empty;
        }
        let current = self.current_index.unwrap_or(0);
        match self.mode {
            PlaybackMode::SingleLoop => Skip::Play(current),
            PlaybackMode::Shuffle => {
                let next = self.random_index();
                self.current_index = Some(next);
                Skip::Play(next)
            }
            PlaybackMode::Sequential => {
                if current + 1 < self.tracks.len() {
                    self.current_index = Some(current + 1);
                    Skip::Play(current + 1)
                } else {
                    Skip::EndOfQueue
                }
            }
        }
    }

    pub fn skip_previous(&mut self) -> Skip {
        if self.tracks.is_empty() {
            return Skip::Empty;
        }
        match self.mode {
            PlaybackMode::Shuffle => {
                let prev = self.random_index();
                self.current_index = Some(prev);
                Skip::Play(prev)
            }
            _ => {
                // Clamp at the start: index 0 replays the first track.
                let prev = self.current_index.unwrap_or(0).saturating_sub(1);
                self.current_index = Some(prev);
                Skip::Play(prev)
            }
        }
    }

    pub fn advance_on_completion(&mut self) -> Completion {
        if self.tracks.is_empty() {
            return Completion::EndOfQueue;
        }
        let current = self.current_index.unwrap_or(0);
        match self.mode {
            PlaybackMode::SingleLoop => Completion::Replay,
            PlaybackMode::Shuffle => {
                let next = self.random_index();
                self.current_index = Some(next);
                Completion::Advanced(next)
            }
            PlaybackMode::Sequential => {
                if current + 1 < self.tracks.len() {
                    self.current_index = Some(current + 1);
                    Completion::Advanced(current + 1)
                } else {
                    Completion::EndOfQueue
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
    }

    pub fn state(&self) -> QueueState {
        QueueState {
            tracks: self.tracks.clone(),
            current_index: self.current_index,
            mode: self.mode,
        }
    }

    fn random_index(&self) -> usize {
        rand::thread_rng().gen_range(0..self.tracks.len())
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new(PlaybackMode::SingleLoop)
    }
}
