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

//! Shared load-decide-append loop of the command handlers.

use super::Gateway;
use rand::Rng;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::PendingEvent;
use toolgate_store::provider::facades::StoreProviderFacades;

impl Gateway {
    /// Bounded optimistic concurrency retries per command.
    const COMMAND_RETRIES: u32 = 3;

    /// Run one command through the load-decide-append loop.
    ///
    /// `decide` folds the stream and returns the events to append. A
    /// concurrent append to the same stream retries the whole loop with
    /// jitter; after the bounded retries the conflict surfaces to the
    /// caller. A decision without events is a no-op command and appends
    /// nothing.
    pub(crate) async fn handle_command<F>(
        &self,
        stream_id: &str,
        decide: F,
    ) -> Result<u64, GatewayError>
    where
        F: Fn(&[DomainEvent]) -> Result<Vec<PendingEvent>, GatewayError>,
    {
        let journal = self.store.event_journal_facade();
        let mut last_conflict = None;
        for attempt in 0..=Self::COMMAND_RETRIES {
            if attempt > 0 {
                let jitter_micros = rand::rng().random_range(5_000..50_000u64);
                tokio::time::sleep(tokio::time::Duration::from_micros(
                    jitter_micros * attempt as u64,
                ))
                .await;
            }
            let events = journal.read(stream_id, 0).await?;
            let expected_version = events.last().map(DomainEvent::get_sequence).unwrap_or(0);
            let pending = decide(&events)?;
            if pending.is_empty() {
                return Ok(expected_version);
            }
            match journal.append(stream_id, expected_version, &pending).await {
                Ok(new_version) => {
                    // Queries read their own writes once the projection
                    // caught up.
                    self.projector.await_caught_up().await;
                    return Ok(new_version);
                }
                Err(e) if e.kind() == &GatewayErrorKind::ConcurrencyConflict => {
                    log::debug!("Concurrent append to '{stream_id}' (attempt {attempt}).");
                    last_conflict = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            GatewayErrorKind::ConcurrencyConflict
                .error_with_msg(format!("Gave up appending to '{stream_id}'."))
        }))
    }

    /// The access resolver serves cached grants until the TTL expires;
    /// commands that change what agents may see invalidate right away.
    pub(crate) fn invalidate_access_cache(&self) {
        self.resolver.invalidate_cache();
    }
}
