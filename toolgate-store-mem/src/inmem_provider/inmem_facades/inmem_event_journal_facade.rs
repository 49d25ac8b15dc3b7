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

//! Ephemeral in-memory implementation of [EventJournalFacade].

use crate::InMemStoreProvider;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::PendingEvent;
use toolgate_store::provider::facades::EventJournalFacade;

/// Ephemeral in-memory implementation of [EventJournalFacade].
pub struct InMemEventJournalFacade {
    inmem_provider: Arc<InMemStoreProvider>,
}

impl InMemEventJournalFacade {
    /// Return a new instance.
    pub fn new(inmem_provider: &Arc<InMemStoreProvider>) -> Self {
        Self {
            inmem_provider: Arc::clone(inmem_provider),
        }
    }
}

#[async_trait::async_trait]
impl EventJournalFacade for InMemEventJournalFacade {
    async fn append(
        &self,
        stream_id: &str,
        expected_version: u64,
        events: &[PendingEvent],
    ) -> Result<u64, GatewayError> {
        let stream = self.inmem_provider.stream_by_id(stream_id);
        let _append_guard = stream.append_lock.lock().await;
        let current_version = stream.version.load(Ordering::Acquire);
        if current_version != expected_version {
            return Err(GatewayErrorKind::ConcurrencyConflict.error_with_msg(format!(
                "Append to '{stream_id}' expected version {expected_version}, but stream is at {current_version}."
            )));
        }
        let mut sequence = current_version;
        for pending in events {
            sequence += 1;
            let event = DomainEvent::from_pending(stream_id, sequence, pending);
            stream.events.insert(sequence, event.clone());
            // Checkpoint assignment happens under the stream's append lock,
            // so the global log preserves per-stream append order.
            let checkpoint = self
                .inmem_provider
                .global_head
                .fetch_add(1, Ordering::SeqCst)
                + 1;
            self.inmem_provider.global_log.insert(checkpoint, event);
        }
        stream.version.store(sequence, Ordering::Release);
        Ok(sequence)
    }

    async fn read(
        &self,
        stream_id: &str,
        from_sequence: u64,
    ) -> Result<Vec<DomainEvent>, GatewayError> {
        Ok(self
            .inmem_provider
            .stream_by_id(stream_id)
            .events
            .range(from_sequence..)
            .map(|entry| entry.value().to_owned())
            .collect())
    }

    async fn stream_version(&self, stream_id: &str) -> u64 {
        self.inmem_provider
            .stream_by_id(stream_id)
            .version
            .load(Ordering::Acquire)
    }

    async fn read_global(
        &self,
        from_checkpoint: u64,
        limit: usize,
    ) -> Result<Vec<(u64, DomainEvent)>, GatewayError> {
        let mut ret = Vec::new();
        // Checkpoints are allocated densely. Stop at the first hole so a
        // concurrent append that got its checkpoint but hasn't inserted yet
        // is never skipped over.
        let mut expected = from_checkpoint + 1;
        for entry in self
            .inmem_provider
            .global_log
            .range((Bound::Excluded(from_checkpoint), Bound::Unbounded))
        {
            if *entry.key() != expected || ret.len() >= limit {
                break;
            }
            ret.push((*entry.key(), entry.value().to_owned()));
            expected += 1;
        }
        Ok(ret)
    }

    async fn head_checkpoint(&self) -> u64 {
        self.inmem_provider.global_head.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::provider::facades::StoreProviderFacades;

    pub fn initialize_env_logger() {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init()
            .map_err(|e| {
                log::trace!("Env logger for testing was probably already initialized: {e:?}")
            })
            .ok();
    }

    fn pending(event_type: &str) -> PendingEvent {
        PendingEvent::new(event_type, serde_json::json!({}), "corr-1")
    }

    #[tokio::test]
    async fn append_is_sequential_and_gap_free() {
        initialize_env_logger();
        let provider = InMemStoreProvider::new().await;
        let store = provider.as_store_provider();
        let journal = store.event_journal_facade();
        let version = journal
            .append("source-a", 0, &[pending("a.one.v1"), pending("a.two.v1")])
            .await
            .unwrap();
        assert_eq!(version, 2);
        let version = journal
            .append("source-a", 2, &[pending("a.three.v1")])
            .await
            .unwrap();
        assert_eq!(version, 3);
        let events = journal.read("source-a", 0).await.unwrap();
        let sequences = events
            .iter()
            .map(DomainEvent::get_sequence)
            .collect::<Vec<_>>();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn append_detects_concurrency_conflict() {
        initialize_env_logger();
        let provider = InMemStoreProvider::new().await;
        let store = provider.as_store_provider();
        let journal = store.event_journal_facade();
        journal
            .append("policy-a", 0, &[pending("p.defined.v1")])
            .await
            .unwrap();
        let res = journal.append("policy-a", 0, &[pending("p.defined.v1")]).await;
        assert_eq!(
            res.unwrap_err().kind(),
            &GatewayErrorKind::ConcurrencyConflict
        );
        // Nothing was written by the conflicting append.
        assert_eq!(journal.read("policy-a", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_stream_reads_empty() {
        initialize_env_logger();
        let provider = InMemStoreProvider::new().await;
        let store = provider.as_store_provider();
        assert!(
            store
                .event_journal_facade()
                .read("no-such-stream", 0)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn global_tail_preserves_per_stream_order() {
        initialize_env_logger();
        let provider = InMemStoreProvider::new().await;
        let store = provider.as_store_provider();
        let journal = store.event_journal_facade();
        journal.append("s-1", 0, &[pending("one.v1")]).await.unwrap();
        journal.append("s-2", 0, &[pending("two.v1")]).await.unwrap();
        journal.append("s-1", 1, &[pending("three.v1")]).await.unwrap();
        let tail = journal.read_global(0, 100).await.unwrap();
        assert_eq!(tail.len(), 3);
        let s1_sequences = tail
            .iter()
            .filter(|(_, event)| event.get_stream_id() == "s-1")
            .map(|(_, event)| event.get_sequence())
            .collect::<Vec<_>>();
        assert_eq!(s1_sequences, vec![1, 2]);
        // Resume from a checkpoint in the middle of the tail.
        let from = tail[1].0;
        let resumed = journal.read_global(from, 100).await.unwrap();
        assert_eq!(resumed.len(), 1);
    }
}
