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

//! Ephemeral in-memory specific store code.

mod inmem_cache_facade;
mod inmem_event_journal_facade;
mod inmem_read_model_facade;

pub use self::inmem_cache_facade::*;
pub use self::inmem_event_journal_facade::*;
pub use self::inmem_read_model_facade::*;
use super::InMemStoreProvider;
use std::sync::Arc;
use toolgate_store::provider::facades::*;

/// Ephemeral in-memory specific store code.
pub struct InMemProviderFacades {
    event_journal_facade: InMemEventJournalFacade,
    read_model_facade: InMemReadModelFacade,
    cache_facade: InMemCacheFacade,
}

impl InMemProviderFacades {
    /// Return a new instance.
    pub fn new(inmem_provider: &Arc<InMemStoreProvider>) -> Self {
        Self {
            event_journal_facade: InMemEventJournalFacade::new(inmem_provider),
            read_model_facade: InMemReadModelFacade::new(inmem_provider),
            cache_facade: InMemCacheFacade::new(inmem_provider),
        }
    }
}

impl StoreProviderFacades for InMemProviderFacades {
    fn event_journal_facade(&self) -> &dyn EventJournalFacade {
        &self.event_journal_facade
    }

    fn read_model_facade(&self) -> &dyn ReadModelFacade {
        &self.read_model_facade
    }

    fn cache_facade(&self) -> &dyn CacheFacade {
        &self.cache_facade
    }
}
