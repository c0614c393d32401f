use crate::api::client::ApiClient;
use crate::api::models::{LoginData, User, UserPreferences};
use crate::error::AppResult;
use serde_json::json;

impl ApiClient {
    /// Sign-in with an Apple user identifier. On success the issued bearer
    /// token is persisted to the config store and the user snapshot is
    /// replaced; on any failure both are left untouched.
    pub async fn login(
        &self,
        apple_user_id: &str,
        preferences: Option<&UserPreferences>,
    ) -> AppResult<User> {
        let device = &self.config().device;
        let mut body = json!({
            "appleUserId": apple_user_id,
            "deviceInfo": {
                "deviceId": device.device_id,
                "deviceModel": device.device_model,
                "osVersion": device.os_version,
                "appVersion": device.app_version,
            },
        });
        if let Some(preferences) = preferences {
            body["preferences"] = serde_json::to_value(preferences)?;
        }

        let data: LoginData = self.post_json("/users/auth/login", &body).await?;

        {
            let mut store = self.store().write().await;
            store.auth_token = Some(data.token.clone());
            if let Err(e) = store.save() {
                log::warn!("Failed to persist auth token: {}", e);
            }
        }
        self.set_current_user(Some(data.user.clone())).await;
        log::info!("Logged in as user {}", data.user.id);

        Ok(data.user)
    }

    /// Ends the session server-side, then clears the local token and user
    /// snapshot.
    pub async fn logout(&self) -> AppResult<()> {
        self.post_unit("/users/logout", None).await?;

        {
            let mut store = self.store().write().await;
            store.auth_token = None;
            if let Err(e) = store.save() {
                log::warn!("Failed to persist cleared token: {}", e);
            }
        }
        self.set_current_user(None).await;
        log::info!("Logged out");

        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store().read().await.is_authenticated()
    }
}
