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

//! Journal event model.

use crate::time;
use serde::Deserialize;
use serde::Serialize;

/// An event that has not been appended to the journal yet.
///
/// The journal assigns `sequence` and `occurred_at` at append time.
#[derive(Clone, Debug)]
pub struct PendingEvent {
    event_type: String,
    payload: serde_json::Value,
    correlation_id: String,
}

impl PendingEvent {
    /// Return a new instance.
    pub fn new(event_type: &str, payload: serde_json::Value, correlation_id: &str) -> Self {
        Self {
            event_type: event_type.to_owned(),
            payload,
            correlation_id: correlation_id.to_owned(),
        }
    }

    /// Return the versioned event type identifier.
    pub fn get_event_type(&self) -> &str {
        &self.event_type
    }

    /// Return the event payload.
    pub fn get_payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Return the correlation identifier of the triggering command.
    pub fn get_correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/** Journal entry.

Events are the durable source of truth. Each event belongs to exactly one
aggregate stream and carries a per-stream `sequence` that is strictly
monotonic and gap-free.
*/
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainEvent {
    stream_id: String,
    sequence: u64,
    event_type: String,
    payload: serde_json::Value,
    correlation_id: String,
    occurred_at: String,
}

impl DomainEvent {
    /// Return a new instance stamped with the current time.
    pub fn from_pending(stream_id: &str, sequence: u64, pending: &PendingEvent) -> Self {
        Self {
            stream_id: stream_id.to_owned(),
            sequence,
            event_type: pending.event_type.to_owned(),
            payload: pending.payload.to_owned(),
            correlation_id: pending.correlation_id.to_owned(),
            occurred_at: time::as_rfc3339(time::get_timestamp_micros()),
        }
    }

    /// Return the identifier of the aggregate stream this event belongs to.
    pub fn get_stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Return the per-stream sequence number (first event is `1`).
    pub fn get_sequence(&self) -> u64 {
        self.sequence
    }

    /// Return the versioned event type identifier.
    pub fn get_event_type(&self) -> &str {
        &self.event_type
    }

    /// Return the event payload.
    pub fn get_payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Return the correlation identifier of the triggering command.
    pub fn get_correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Return the RFC 3339 timestamp of when the event was appended.
    pub fn get_occurred_at(&self) -> &str {
        &self.occurred_at
    }
}
