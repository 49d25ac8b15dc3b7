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

//! Fan-out of journal events to live event stream subscribers.

use super::domain::event_types;
use std::sync::Arc;
use tokio::sync::broadcast;
use toolgate_store::StoreProvider;
use toolgate_store::model::DomainEvent;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

/// One event as delivered to live subscribers.
#[derive(Clone, Debug)]
pub struct BusEvent {
    /// Subscriber facing event type.
    pub event_type: String,
    /// Serialized JSON payload.
    pub data: String,
}

/** Broadcast channel fanning out the journal tail.

A single background task reads the global journal tail and multiplexes to
per-subscriber bounded queues. Delivery is best-effort and lossy: a
subscriber that lags behind the channel capacity is disconnected and must
re-fetch from the read model after reconnecting.
*/
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Bound of each subscriber queue.
    const CHANNEL_CAPACITY: usize = 256;
    /// Journal poll interval when the tail is drained.
    const POLL_INTERVAL_MICROS: u64 = 100_000;
    /// Batch size of one journal tail read.
    const BATCH_SIZE: usize = 256;

    /// Return a new instance and start the tail pump.
    ///
    /// Only events appended after startup are fanned out; the read model is
    /// the authority for anything earlier.
    pub async fn new(store: &Arc<StoreProvider>) -> Arc<Self> {
        let (sender, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        let instance = Arc::new(Self { sender });
        let self_clone = Arc::clone(&instance);
        let store = Arc::clone(store);
        tokio::spawn(async move { self_clone.pump_journal_tail(&store).await });
        instance
    }

    /// Subscribe to the live event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Announce a graceful shutdown to all subscribers.
    pub fn announce_shutdown(&self) {
        let _ = self.sender.send(BusEvent {
            event_type: "shutdown".to_owned(),
            data: format!(
                "{{\"ts\":\"{}\"}}",
                time::as_rfc3339(time::get_timestamp_micros())
            ),
        });
    }

    /// Read the journal tail forever and broadcast each event.
    async fn pump_journal_tail(&self, store: &Arc<StoreProvider>) {
        let journal = store.event_journal_facade();
        let mut checkpoint = journal.head_checkpoint().await;
        loop {
            match journal.read_global(checkpoint, Self::BATCH_SIZE).await {
                Ok(batch) if batch.is_empty() => {
                    tokio::time::sleep(tokio::time::Duration::from_micros(
                        Self::POLL_INTERVAL_MICROS,
                    ))
                    .await;
                }
                Ok(batch) => {
                    for (batch_checkpoint, event) in batch {
                        checkpoint = batch_checkpoint;
                        if let Some(event_type) = Self::subscriber_event_type(&event) {
                            // No receivers is fine; fan-out is best-effort.
                            let _ = self.sender.send(BusEvent {
                                event_type: event_type.to_owned(),
                                data: serde_json::to_string(&event).unwrap_or_default(),
                            });
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Event bus failed to read the journal tail: {e}");
                    tokio::time::sleep(tokio::time::Duration::from_micros(
                        Self::POLL_INTERVAL_MICROS * 10,
                    ))
                    .await;
                }
            }
        }
    }

    /// Map a journal event type to the subscriber facing event type.
    fn subscriber_event_type(event: &DomainEvent) -> Option<&'static str> {
        match event.get_event_type() {
            event_types::SOURCE_REGISTERED => Some("source_registered"),
            event_types::SOURCE_INVENTORY_REFRESHED => Some("source_inventory_updated"),
            event_types::SOURCE_REFRESH_FAILED => Some("source_refresh_failed"),
            event_types::SOURCE_UNREGISTERED => Some("source_deleted"),
            event_types::TOOL_ENABLED => Some("tool_enabled"),
            event_types::TOOL_DISABLED => Some("tool_disabled"),
            event_types::GROUP_CREATED => Some("group_created"),
            event_types::GROUP_UPDATED
            | event_types::GROUP_SELECTOR_ADDED
            | event_types::GROUP_SELECTOR_REMOVED
            | event_types::GROUP_EXPLICIT_TOOL_ADDED
            | event_types::GROUP_EXPLICIT_TOOL_REMOVED
            | event_types::GROUP_TOOL_EXCLUDED
            | event_types::GROUP_TOOL_INCLUDED
            | event_types::GROUP_ACTIVATED
            | event_types::GROUP_DEACTIVATED => Some("group_updated"),
            event_types::GROUP_DELETED => Some("group_deleted"),
            event_types::POLICY_DEFINED => Some("policy_defined"),
            event_types::POLICY_ACTIVATED => Some("policy_activated"),
            event_types::POLICY_MATCHERS_UPDATED
            | event_types::POLICY_GROUPS_UPDATED
            | event_types::POLICY_PRIORITY_CHANGED
            | event_types::POLICY_DEACTIVATED => Some("policy_updated"),
            event_types::POLICY_DELETED => Some("policy_deleted"),
            event_types::BREAKER_OPENED => Some("circuit_breaker.opened"),
            event_types::BREAKER_CLOSED => Some("circuit_breaker.closed"),
            event_types::BREAKER_HALF_OPENED => Some("circuit_breaker.half_opened"),
            other => {
                log::debug!("Journal event type '{other}' has no subscriber mapping.");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::model::PendingEvent;
    use toolgate_store_mem::InMemStoreProvider;

    #[tokio::test]
    async fn appended_events_reach_subscribers() {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let bus = EventBus::new(&store).await;
        let mut subscriber = bus.subscribe();
        store
            .event_journal_facade()
            .append(
                "source-s1",
                0,
                &[PendingEvent::new(
                    event_types::SOURCE_REGISTERED,
                    serde_json::json!({ "source_id": "s1", "name": "Pizzeria" }),
                    "c1",
                )],
            )
            .await
            .unwrap();
        let received = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            subscriber.recv(),
        )
        .await
        .expect("subscriber timed out")
        .unwrap();
        assert_eq!(received.event_type, "source_registered");
        let event = serde_json::from_str::<DomainEvent>(&received.data).unwrap();
        assert_eq!(event.get_stream_id(), "source-s1");
    }

    #[tokio::test]
    async fn shutdown_is_announced() {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let bus = EventBus::new(&store).await;
        let mut subscriber = bus.subscribe();
        bus.announce_shutdown();
        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.event_type, "shutdown");
    }
}
