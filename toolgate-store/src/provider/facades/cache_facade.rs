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

//! Store facade for the expiring key-value cache.

/// Store facade for the expiring key-value cache.
///
/// Used for user sessions (`sess:{session_id}`) and exchanged tokens
/// (`xch:{sha256}:{audience}:{scopes}`). Entries are treated as linearizable
/// per key.
#[async_trait::async_trait]
pub trait CacheFacade: Send + Sync {
    /// Insert or replace a value that expires at `expires_micros`.
    async fn kv_put(&self, key: &str, value: &str, expires_micros: u64);

    /// Get a value. Expired entries are never returned.
    async fn kv_get(&self, key: &str) -> Option<String>;

    /// Remove a value. Removing a missing key is a no-op.
    async fn kv_remove(&self, key: &str);
}
