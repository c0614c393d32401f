use crate::audio::queue::PlaybackMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Every endpoint wraps its payload in this envelope. `success=false`
/// responses carry a machine-readable `code` alongside the message.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

// User & account types

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub apple_user_id: String,
    pub preferences: UserPreferences,
    #[serde(default)]
    pub favorites: Vec<FavoriteAudio>,
    #[serde(default)]
    pub cached_audios: Vec<CachedAudio>,
    pub total_play_time: u64,
    pub total_sessions: u64,
    pub is_premium: bool,
    pub favorite_count: Option<u32>,
    pub cached_count: Option<u32>,
    pub total_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub language: String,
    pub playback_mode: String,
    pub auto_cache: bool,
    pub background_playback: bool,
    pub lock_screen_control: bool,
    pub audio_quality: String,
    pub cache_storage_limit: u64,
}

impl UserPreferences {
    /// `"auto"` defers to the given fallback; anything else is taken as-is.
    pub fn effective_language(&self, fallback: &str) -> String {
        if self.language == "auto" {
            fallback.to_string()
        } else {
            self.language.clone()
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::parse(&self.playback_mode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteAudio {
    pub audio_id: String,
    pub added_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAudio {
    pub audio_id: String,
    pub cached_at: String,
    pub file_size: u64,
    pub quality: String,
}

/// Login payload. The server issues a bearer token alongside the user
/// record; only the token is persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: User,
    pub token: String,
}

// Catalog types

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub artist: String,
    /// Whole seconds.
    pub duration: u32,
    pub cover_image: Option<String>,
    pub scenes: String,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub nature_sounds: Vec<String>,
    pub moods: Option<Vec<String>>,
    pub tempo: Option<u32>,
    pub key: Option<String>,
    pub is_premium: bool,
    pub is_featured: bool,
    pub play_stats: Option<PlayStats>,
    pub favorite_count: u32,
    pub cache_count: u32,
    pub created_at: String,
    pub published_at: Option<String>,
    pub audio_urls: AudioUrls,
    pub is_favorite: Option<bool>,
    pub is_cached: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioUrls {
    pub standard: String,
    pub high: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayStats {
    pub total_plays: u64,
    pub unique_players: u64,
    pub average_play_time: u64,
    pub completion_rate: u32,
    pub last_played_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub translations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: String,
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub translations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total: u32,
    pub total_pages: u32,
    pub limit: u32,
}

// Per-endpoint payloads

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioListData {
    pub audios: Vec<AudioItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesData {
    pub favorites: Vec<AudioItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneAudioData {
    pub scene: String,
    pub audios: Vec<AudioItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub query: String,
    pub audios: Vec<AudioItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularData {
    pub period: String,
    pub audios: Vec<AudioItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedData {
    pub based_on: String,
    pub audios: Vec<AudioItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenesData {
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentsData {
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub download_url: String,
    pub quality: String,
    pub file_size: u64,
    pub expires_at: String,
}

// Playback model

/// What the player works with. Immutable once enqueued; changing queue
/// contents means replacing the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub url: String,
    pub artwork_url: Option<String>,
    pub scene_tags: Vec<String>,
    pub offline: bool,
    pub local_path: Option<PathBuf>,
}

/// Where the backend reads audio bytes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    Remote { url: String },
    Local { path: PathBuf },
}

impl Track {
    pub fn source(&self) -> TrackSource {
        match (self.offline, &self.local_path) {
            (true, Some(path)) => TrackSource::Local { path: path.clone() },
            _ => TrackSource::Remote {
                url: self.url.clone(),
            },
        }
    }
}

impl AudioItem {
    /// Catalog record to playback track. Standard quality URL; cached items
    /// resolve to their conventional local file name.
    pub fn to_track(&self) -> Track {
        let cached = self.is_cached.unwrap_or(false);
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            duration: self.duration as f64,
            url: self.audio_urls.standard.clone(),
            artwork_url: self.cover_image.clone(),
            scene_tags: vec![self.scenes.clone()],
            offline: cached,
            local_path: cached.then(|| PathBuf::from(format!("{}.mp3", self.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(cached: Option<bool>) -> AudioItem {
        AudioItem {
            id: "aud_1".into(),
            title: "Rain on Leaves".into(),
            description: None,
            artist: "QingYu Studio".into(),
            duration: 183,
            cover_image: Some("https://cdn.example.com/covers/aud_1.jpg".into()),
            scenes: "sleep".into(),
            instruments: vec!["guzheng".into()],
            nature_sounds: vec!["rain".into()],
            moods: None,
            tempo: None,
            key: None,
            is_premium: false,
            is_featured: true,
            play_stats: None,
            favorite_count: 12,
            cache_count: 3,
            created_at: "2024-01-01T00:00:00Z".into(),
            published_at: None,
            audio_urls: AudioUrls {
                standard: "https://cdn.example.com/audio/aud_1_std.mp3".into(),
                high: "https://cdn.example.com/audio/aud_1_hi.mp3".into(),
            },
            is_favorite: Some(false),
            is_cached: cached,
        }
    }

    #[test]
    fn envelope_decodes_success() {
        let json = r#"{"success":true,"message":null,"code":null,"data":{"scenes":[]}}"#;
        let envelope: ApiEnvelope<ScenesData> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert!(envelope.data.unwrap().scenes.is_empty());
    }

    #[test]
    fn envelope_decodes_failure_without_data() {
        let json = r#"{"success":false,"message":"token expired","code":"AUTH_401"}"#;
        let envelope: ApiEnvelope<User> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.code.as_deref(), Some("AUTH_401"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn to_track_uses_standard_url_and_single_scene_tag() {
        let track = sample_item(None).to_track();
        assert_eq!(track.url, "https://cdn.example.com/audio/aud_1_std.mp3");
        assert_eq!(track.scene_tags, vec!["sleep".to_string()]);
        assert_eq!(track.duration, 183.0);
        assert!(!track.offline);
        assert!(track.local_path.is_none());
        assert_eq!(track.source(), TrackSource::Remote {
            url: "https://cdn.example.com/audio/aud_1_std.mp3".into()
        });
    }

    #[test]
    fn cached_item_resolves_local_source() {
        let track = sample_item(Some(true)).to_track();
        assert!(track.offline);
        assert_eq!(track.local_path, Some(PathBuf::from("aud_1.mp3")));
        assert_eq!(
            track.source(),
            TrackSource::Local {
                path: PathBuf::from("aud_1.mp3")
            }
        );
    }

    #[test]
    fn preferences_resolve_language_and_mode() {
        let mut prefs = UserPreferences {
            language: "auto".into(),
            playback_mode: "sequence".into(),
            auto_cache: false,
            background_playback: true,
            lock_screen_control: true,
            audio_quality: "standard".into(),
            cache_storage_limit: 1_073_741_824,
        };
        assert_eq!(prefs.effective_language("zh-Hans"), "zh-Hans");
        assert_eq!(prefs.mode(), PlaybackMode::Sequential);
        prefs.language = "en".into();
        assert_eq!(prefs.effective_language("zh-Hans"), "en");
    }

    #[test]
    fn audio_item_round_trips_camel_case() {
        let json = serde_json::to_value(sample_item(Some(false))).unwrap();
        assert!(json.get("coverImage").is_some());
        assert!(json.get("natureSounds").is_some());
        assert!(json.get("audioUrls").is_some());
        let back: AudioItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, "aud_1");
    }
}
