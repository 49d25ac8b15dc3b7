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

//! Store facade for the append-only event journal.

use crate::model::DomainEvent;
use crate::model::GatewayError;
use crate::model::PendingEvent;

/// Store facade for the append-only event journal.
#[async_trait::async_trait]
pub trait EventJournalFacade: Send + Sync {
    /// Append events to an aggregate stream.
    ///
    /// `expected_version` is the number of events already in the stream
    /// (`0` for a new stream). The append is atomic and linearizable per
    /// stream: on a version mismatch nothing is written and
    /// [crate::model::GatewayErrorKind::ConcurrencyConflict] is returned.
    ///
    /// Returns the new stream version.
    async fn append(
        &self,
        stream_id: &str,
        expected_version: u64,
        events: &[PendingEvent],
    ) -> Result<u64, GatewayError>;

    /// Read an aggregate stream from `from_sequence` (inclusive) in append
    /// order.
    ///
    /// Reading a stream that does not exist returns an empty `Vec`, never an
    /// error.
    async fn read(&self, stream_id: &str, from_sequence: u64) -> Result<Vec<DomainEvent>, GatewayError>;

    /// Return the current version of a stream (`0` for a missing stream).
    async fn stream_version(&self, stream_id: &str) -> u64;

    /// Read the global tail.
    ///
    /// Returns up to `limit` events with a checkpoint strictly greater than
    /// `from_checkpoint`, together with their checkpoints. Events of a single
    /// stream appear in append order; cross-stream ordering follows append
    /// interleaving.
    async fn read_global(
        &self,
        from_checkpoint: u64,
        limit: usize,
    ) -> Result<Vec<(u64, DomainEvent)>, GatewayError>;

    /// Return the checkpoint of the newest journaled event (`0` when empty).
    async fn head_checkpoint(&self) -> u64;
}
