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

//! Ephemeral in-memory implementation of [CacheFacade].

use crate::InMemStoreProvider;
use crossbeam_skiplist::map::Entry;
use std::sync::Arc;
use toolgate_store::provider::facades::CacheFacade;
use toolgate_store::time;

/// Ephemeral in-memory implementation of [CacheFacade].
///
/// Expired entries are filtered on read and purged by a background loop of
/// the provider.
pub struct InMemCacheFacade {
    inmem_provider: Arc<InMemStoreProvider>,
}

impl InMemCacheFacade {
    /// Return a new instance.
    pub fn new(inmem_provider: &Arc<InMemStoreProvider>) -> Self {
        Self {
            inmem_provider: Arc::clone(inmem_provider),
        }
    }
}

#[async_trait::async_trait]
impl CacheFacade for InMemCacheFacade {
    async fn kv_put(&self, key: &str, value: &str, expires_micros: u64) {
        self.inmem_provider
            .cache_entries
            .insert(key.to_owned(), (expires_micros, value.to_owned()));
    }

    async fn kv_get(&self, key: &str) -> Option<String> {
        let now = time::get_timestamp_micros();
        self.inmem_provider
            .cache_entries
            .get(key)
            .as_ref()
            .map(Entry::value)
            .filter(|(expires_micros, _)| expires_micros > &now)
            .map(|(_, value)| value.to_owned())
    }

    async fn kv_remove(&self, key: &str) {
        self.inmem_provider.cache_entries.remove(key);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::provider::facades::StoreProviderFacades;

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let provider = InMemStoreProvider::new().await;
        let store = provider.as_store_provider();
        let cache = store.cache_facade();
        let now = time::get_timestamp_micros();
        cache.kv_put("fresh", "value", now + 60_000_000).await;
        cache.kv_put("stale", "value", now.saturating_sub(1)).await;
        assert_eq!(cache.kv_get("fresh").await.as_deref(), Some("value"));
        assert!(cache.kv_get("stale").await.is_none());
        cache.kv_remove("fresh").await;
        assert!(cache.kv_get("fresh").await.is_none());
    }
}
