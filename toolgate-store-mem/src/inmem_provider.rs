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

//! Ephemeral in-memory implementation of [StoreProvider].

mod inmem_facades;
mod inmem_stream;

use self::inmem_facades::InMemProviderFacades;
use self::inmem_stream::InMemStream;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use toolgate_store::StoreProvider;
use toolgate_store::model::DomainEvent;
use toolgate_store::time;

/// Ephemeral in-memory implementation of [StoreProvider].
pub struct InMemStoreProvider {
    streams: SkipMap<String, Arc<InMemStream>>,
    global_log: SkipMap<u64, DomainEvent>,
    global_head: AtomicU64,
    collections: SkipMap<String, SkipMap<String, String>>,
    checkpoints: SkipMap<String, u64>,
    cache_entries: SkipMap<String, (u64, String)>,
}

impl InMemStoreProvider {
    /// Purge expired cache entries roughly this often.
    const CACHE_PURGE_INTERVAL_MICROS: u64 = 30_000_000;

    /// Return a new instance.
    pub async fn new() -> Arc<Self> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Using in-mem store provider.");
        }
        Arc::new(Self {
            streams: SkipMap::default(),
            global_log: SkipMap::default(),
            global_head: AtomicU64::default(),
            collections: SkipMap::default(),
            checkpoints: SkipMap::default(),
            cache_entries: SkipMap::default(),
        })
        .init()
        .await
    }

    /// Initialize background tasks.
    async fn init(self: Arc<Self>) -> Arc<Self> {
        let self_clone = Arc::clone(&self);
        tokio::spawn(async move { self_clone.purge_expired_cache_entries().await });
        self
    }

    /// Get [StoreProvider] instance.
    pub fn as_store_provider(self: &Arc<Self>) -> StoreProvider {
        StoreProvider::new(Arc::new(InMemProviderFacades::new(self)))
    }

    /// Get or create the stream with the provided identifier.
    fn stream_by_id(&self, stream_id: &str) -> Arc<InMemStream> {
        Arc::clone(
            self.streams
                .get_or_insert_with(stream_id.to_owned(), Arc::default)
                .value(),
        )
    }

    /// Get or create a read-model collection.
    fn collection_by_name(
        &self,
        collection: &str,
    ) -> crossbeam_skiplist::map::Entry<'_, String, SkipMap<String, String>> {
        self.collections
            .get_or_insert_with(collection.to_owned(), SkipMap::default)
    }

    /// Remove all expired cache entries.
    async fn purge_expired_cache_entries(&self) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_micros(
                Self::CACHE_PURGE_INTERVAL_MICROS,
            ))
            .await;
            let now = time::get_timestamp_micros();
            for entry in self.cache_entries.iter() {
                if entry.value().0 < now {
                    entry.remove();
                }
            }
        }
    }
}
