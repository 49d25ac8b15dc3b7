/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Browser sessions established by the OIDC login flow.

use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use toolgate_store::StoreProvider;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

/// One browser session, stored in the cache backend under its TTL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier carried by the session cookie.
    pub session_id: String,
    /// Access token of the logged in user.
    pub access_token: String,
    /// Refresh token, when the issuer granted one.
    pub refresh_token: Option<String>,
    /// ID token, kept for RP-initiated logout.
    pub id_token: Option<String>,
    /// Decoded user claims for `/auth/me`.
    pub user_info: serde_json::Value,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Expiry in epoch microseconds.
    pub expires_at_micros: u64,
}

/** Session bookkeeping on top of the cache backend.

Sessions live under `sess:{session_id}` and disappear on logout or TTL
expiry. The cache backend is treated as linearizable per session id.
*/
pub struct SessionManager {
    store: Arc<StoreProvider>,
    ttl_micros: u64,
}

impl SessionManager {
    const KEY_PREFIX: &str = "sess:";

    /// Return a new instance.
    pub fn new(store: &Arc<StoreProvider>, ttl_micros: u64) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::clone(store),
            ttl_micros,
        })
    }

    /// Create a session for freshly obtained tokens.
    pub async fn create(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        id_token: Option<&str>,
        user_info: serde_json::Value,
    ) -> SessionRecord {
        let now = time::get_timestamp_micros();
        let record = SessionRecord {
            session_id: uuid::Uuid::new_v4().to_string(),
            access_token: access_token.to_owned(),
            refresh_token: refresh_token.map(str::to_owned),
            id_token: id_token.map(str::to_owned),
            user_info,
            created_at: time::as_rfc3339(now),
            expires_at_micros: now + self.ttl_micros,
        };
        self.persist(&record).await;
        log::info!("Created session '{}'.", record.session_id);
        record
    }

    /// Get an unexpired session.
    pub async fn by_id(&self, session_id: &str) -> Option<SessionRecord> {
        self.store
            .cache_facade()
            .kv_get(&format!("{}{session_id}", Self::KEY_PREFIX))
            .await
            .and_then(|value| serde_json::from_str(&value).ok())
    }

    /// Replace the tokens of a session after a refresh grant.
    pub async fn update_tokens(
        &self,
        session_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Option<SessionRecord> {
        let mut record = self.by_id(session_id).await?;
        record.access_token = access_token.to_owned();
        if refresh_token.is_some() {
            record.refresh_token = refresh_token.map(str::to_owned);
        }
        self.persist(&record).await;
        Some(record)
    }

    /// Delete a session.
    pub async fn delete(&self, session_id: &str) {
        self.store
            .cache_facade()
            .kv_remove(&format!("{}{session_id}", Self::KEY_PREFIX))
            .await;
        log::info!("Deleted session '{session_id}'.");
    }

    async fn persist(&self, record: &SessionRecord) {
        self.store
            .cache_facade()
            .kv_put(
                &format!("{}{}", Self::KEY_PREFIX, record.session_id),
                &serde_json::to_string(record).unwrap_or_default(),
                record.expires_at_micros,
            )
            .await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store_mem::InMemStoreProvider;

    #[tokio::test]
    async fn session_lifecycle() {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let sessions = SessionManager::new(&store, 3600_000_000);
        let record = sessions
            .create(
                "access-1",
                Some("refresh-1"),
                None,
                serde_json::json!({ "preferred_username": "alice" }),
            )
            .await;
        let loaded = sessions.by_id(&record.session_id).await.unwrap();
        assert_eq!(loaded.access_token, "access-1");
        let updated = sessions
            .update_tokens(&record.session_id, "access-2", None)
            .await
            .unwrap();
        assert_eq!(updated.access_token, "access-2");
        assert_eq!(updated.refresh_token.as_deref(), Some("refresh-1"));
        sessions.delete(&record.session_id).await;
        assert!(sessions.by_id(&record.session_id).await.is_none());
    }
}
