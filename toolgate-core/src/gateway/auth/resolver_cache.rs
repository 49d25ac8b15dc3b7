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

//! Cache of resolved tool sets by claims fingerprint.

use super::ResolvedAccess;
use crossbeam_skiplist::SkipMap;
use crossbeam_skiplist::map::Entry;
use std::sync::Arc;
use toolgate_store::time;

/// Cache of resolved tool sets keyed by a stable claims fingerprint.
pub struct ResolverCache {
    ttl_micros: u64,
    cache_with_expiration: SkipMap<String, (u64, Arc<ResolvedAccess>)>,
}

impl ResolverCache {
    /// Return a new instance.
    pub async fn new(ttl_micros: u64) -> Arc<Self> {
        Arc::new(Self {
            ttl_micros,
            cache_with_expiration: SkipMap::default(),
        })
        .init()
        .await
    }

    /// Initialize background tasks.
    async fn init(self: Arc<Self>) -> Arc<Self> {
        let ret = Arc::clone(&self);
        tokio::spawn(async move {
            self.purge_expired().await;
        });
        ret
    }

    /// Remove all expired cache entries.
    async fn purge_expired(&self) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_micros(std::cmp::max(
                self.ttl_micros / 10,
                1_000_000,
            )))
            .await;
            let now = time::get_timestamp_micros();
            for entry in self.cache_with_expiration.iter() {
                if entry.value().0 < now {
                    entry.remove();
                }
            }
        }
    }

    /// Return the unexpired cached resolution for a fingerprint.
    pub fn by_fingerprint(&self, fingerprint: &str) -> Option<Arc<ResolvedAccess>> {
        let now = time::get_timestamp_micros();
        self.cache_with_expiration
            .get(fingerprint)
            .as_ref()
            .map(Entry::value)
            .filter(|(expiration, _)| expiration > &now)
            .map(|(_, resolved)| Arc::clone(resolved))
    }

    /// Insert a resolution for a fingerprint.
    pub fn insert(&self, fingerprint: &str, resolved: &Arc<ResolvedAccess>) {
        let now = time::get_timestamp_micros();
        self.cache_with_expiration.insert(
            fingerprint.to_owned(),
            (now + self.ttl_micros, Arc::clone(resolved)),
        );
    }

    /// Drop every cached resolution.
    ///
    /// Called when policy, group or tool state changes so that stale grants
    /// don't outlive the configured TTL.
    pub fn invalidate_all(&self) {
        for entry in self.cache_with_expiration.iter() {
            entry.remove();
        }
    }
}
