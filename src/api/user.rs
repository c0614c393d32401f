use crate::api::client::ApiClient;
use crate::api::models::{FavoritesData, User, UserPreferences};
use crate::error::AppResult;
use serde_json::json;

impl ApiClient {
    /// Fetch the authenticated user's profile and refresh the snapshot.
    pub async fn get_user_profile(&self) -> AppResult<User> {
        let user: User = self.get_json("/users/profile", &[]).await?;
        self.set_current_user(Some(user.clone())).await;
        Ok(user)
    }

    /// Returns the preferences as the server saved them.
    pub async fn update_preferences(
        &self,
        preferences: &UserPreferences,
    ) -> AppResult<UserPreferences> {
        let body = json!({ "preferences": preferences });
        self.put_json("/users/preferences", &body).await
    }

    pub async fn add_favorite(&self, audio_id: &str) -> AppResult<()> {
        let body = json!({ "audioId": audio_id });
        self.post_unit("/users/favorites", Some(&body)).await
    }

    pub async fn remove_favorite(&self, audio_id: &str) -> AppResult<()> {
        let body = json!({ "audioId": audio_id });
        self.delete_unit("/users/favorites", Some(&body)).await
    }

    pub async fn get_favorites(&self, page: u32, limit: u32) -> AppResult<FavoritesData> {
        let query = [
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json("/users/favorites", &query).await
    }

    /// Report how long a track was played and whether it ran to completion.
    pub async fn record_play_stats(
        &self,
        audio_id: &str,
        seconds: u32,
        completed: bool,
    ) -> AppResult<()> {
        let body = json!({
            "audioId": audio_id,
            "duration": seconds,
            "completed": completed,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let path = format!("/audio/{}/stats", audio_id);
        self.post_unit(&path, Some(&body)).await
    }
}
