use crate::api::client::ApiClient;
use crate::api::models::{
    AudioItem, AudioListData, DownloadInfo, InstrumentsData, PopularData, RecommendedData,
    SceneAudioData, ScenesData, SearchData,
};
use crate::error::AppResult;

/// Optional narrowing for the catalog listing. Instrument and nature-sound
/// filters are sent as comma-separated lists.
#[derive(Debug, Clone, Default)]
pub struct AudioFilter {
    pub scene: Option<String>,
    pub instruments: Option<Vec<String>>,
    pub nature_sounds: Option<Vec<String>>,
    pub search: Option<String>,
}

impl ApiClient {
    pub async fn list_audio(
        &self,
        page: u32,
        limit: u32,
        filter: &AudioFilter,
    ) -> AppResult<AudioListData> {
        let mut query = vec![
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("language", self.language()),
        ];
        if let Some(scene) = &filter.scene {
            query.push(("scene", scene.clone()));
        }
        if let Some(instruments) = &filter.instruments {
            query.push(("instruments", instruments.join(",")));
        }
        if let Some(sounds) = &filter.nature_sounds {
            query.push(("natureSounds", sounds.join(",")));
        }
        if let Some(search) = &filter.search {
            query.push(("search", search.clone()));
        }
        self.get_json("/audio", &query).await
    }

    pub async fn get_audio_by_scene(
        &self,
        scene: &str,
        page: u32,
        limit: u32,
    ) -> AppResult<SceneAudioData> {
        let path = format!("/audio/scene/{}", urlencoding::encode(scene));
        let query = [
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("language", self.language()),
        ];
        self.get_json(&path, &query).await
    }

    pub async fn search_audio(&self, text: &str, page: u32, limit: u32) -> AppResult<SearchData> {
        let query = [
            ("q", text.to_string()),
            ("language", self.language()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json("/audio/search", &query).await
    }

    pub async fn get_audio_detail(&self, audio_id: &str) -> AppResult<AudioItem> {
        let path = format!("/audio/{}", audio_id);
        let query = [("language", self.language())];
        self.get_json(&path, &query).await
    }

    /// Time-limited CDN location for caching a track locally.
    pub async fn get_download_url(&self, audio_id: &str, quality: &str) -> AppResult<DownloadInfo> {
        let path = format!("/audio/{}/download", audio_id);
        let query = [
            ("quality", quality.to_string()),
            ("action", "cache".to_string()),
        ];
        self.get_json(&path, &query).await
    }

    pub async fn get_popular_audio(&self, period: &str, limit: u32) -> AppResult<PopularData> {
        let query = [
            ("period", period.to_string()),
            ("language", self.language()),
            ("limit", limit.to_string()),
        ];
        self.get_json("/audio/popular", &query).await
    }

    pub async fn get_recommended_audio(
        &self,
        based_on: Option<&str>,
        limit: u32,
    ) -> AppResult<RecommendedData> {
        let mut query = vec![
            ("language", self.language()),
            ("limit", limit.to_string()),
        ];
        if let Some(based_on) = based_on {
            query.push(("basedOn", based_on.to_string()));
        }
        self.get_json("/audio/recommended", &query).await
    }

    pub async fn get_scenes(&self) -> AppResult<ScenesData> {
        let query = [("language", self.language())];
        self.get_json("/audio/scenes", &query).await
    }

    pub async fn get_instruments(&self) -> AppResult<InstrumentsData> {
        let query = [("language", self.language())];
        self.get_json("/audio/instruments", &query).await
    }
}
