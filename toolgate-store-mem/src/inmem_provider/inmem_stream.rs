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

//! Ephemeral in-memory implementation of one aggregate event stream.

use crossbeam_skiplist::SkipMap;
use std::sync::atomic::AtomicU64;
use tokio::sync::Mutex;
use toolgate_store::model::DomainEvent;

/// Ephemeral in-memory implementation of one aggregate event stream.
///
/// `version` equals the sequence of the newest event. Appends serialize on
/// `append_lock` so that version check, sequence assignment and global log
/// interleaving are atomic per stream.
#[derive(Default)]
pub struct InMemStream {
    pub events: SkipMap<u64, DomainEvent>,
    pub version: AtomicU64,
    pub append_lock: Mutex<()>,
}
